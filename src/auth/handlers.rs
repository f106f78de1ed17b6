use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        claims::TokenKind,
        dto::{Credentials, DetailResponse, PublicUser, TokenResponse},
        extractors::CurrentUser,
        password::hash_password,
        repo::UserRepo,
        services::{authenticate, is_valid_email, normalize_email, AuthError},
    },
    state::AppState,
    tasks::Job,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/token", post(login))
        .route("/confirm/:token", get(confirm_email))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<Credentials>,
) -> Result<(StatusCode, Json<DetailResponse>), AuthError> {
    payload.email = normalize_email(&payload.email);

    if !is_valid_email(&payload.email) {
        warn!(email = %state.masked_email(&payload.email), "invalid email");
        return Err(AuthError::InvalidEmail);
    }
    if payload.password.is_empty() {
        return Err(AuthError::EmptyPassword);
    }

    if state.db.find_user_by_email(&payload.email).await?.is_some() {
        warn!(email = %state.masked_email(&payload.email), "email already registered");
        return Err(AuthError::EmailTaken);
    }

    let hash = hash_password(&payload.password)?;
    let user = state
        .db
        .create_user(&payload.email, &hash)
        .await?
        .ok_or(AuthError::EmailTaken)?;

    let token = state.jwt.issue_confirmation(&user.email)?;
    state.tasks.enqueue(Job::RegistrationEmail {
        email: user.email.clone(),
        confirmation_url: format!("{}/confirm/{}", state.config.public_base_url, token),
    });

    info!(user_id = user.id, email = %state.masked_email(&user.email), "user registered");
    Ok((
        StatusCode::CREATED,
        Json(DetailResponse::new(
            "User created successfully. Please confirm your email.",
        )),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> Result<Json<TokenResponse>, AuthError> {
    let email = normalize_email(&payload.email);
    let user = authenticate(&*state.db, &email, &payload.password).await?;
    let access_token = state.jwt.issue_access(&user.email)?;

    info!(user_id = user.id, email = %state.masked_email(&user.email), "user logged in");
    Ok(Json(TokenResponse::bearer(access_token)))
}

#[instrument(skip(state, token))]
pub async fn confirm_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<DetailResponse>, AuthError> {
    let email = state.jwt.resolve_subject(&token, TokenKind::Confirmation)?;
    if !state.db.confirm_user(&email).await? {
        return Err(AuthError::UserNotFound);
    }

    info!(email = %state.masked_email(&email), "email confirmed");
    Ok(Json(DetailResponse::new("Email confirmed successfully")))
}

pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(PublicUser {
        id: user.id,
        email: user.email,
        confirmed: user.confirmed,
    })
}
