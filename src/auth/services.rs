use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::{
    claims::TokenKind,
    dto::DetailResponse,
    jwt::{JwtKeys, TokenError},
    password::{hash_password, verify_password},
    repo::UserRepo,
    repo_types::User,
};

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email and wrong password look the same to the caller.
    #[error("Incorrect email or password")]
    InvalidCredentials,
    #[error("User has not confirmed email")]
    NotConfirmed,
    #[error("Not authenticated")]
    MissingCredentials,
    #[error(transparent)]
    InvalidToken(#[from] TokenError),
    #[error("Could not validate credentials")]
    UserNotFound,
    #[error("Invalid email")]
    InvalidEmail,
    #[error("Password must not be empty")]
    EmptyPassword,
    #[error("User with this email already exists")]
    EmailTaken,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::NotConfirmed
            | AuthError::MissingCredentials
            | AuthError::InvalidToken(_)
            | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
            AuthError::InvalidEmail | AuthError::EmptyPassword | AuthError::EmailTaken => {
                StatusCode::BAD_REQUEST
            }
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn log(&self) {
        match self {
            AuthError::Internal(e) => {
                let cause = format!("{e:#}");
                error!(error = %cause, "auth internal error");
            }
            AuthError::InvalidCredentials | AuthError::NotConfirmed => {
                warn!(error = %self, "login rejected")
            }
            _ => debug!(error = %self, "auth error"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status_code();
        let detail = match &self {
            AuthError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        if status == StatusCode::UNAUTHORIZED {
            (
                status,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                Json(DetailResponse::new(detail)),
            )
                .into_response()
        } else {
            (status, Json(DetailResponse::new(detail))).into_response()
        }
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

lazy_static! {
    /// Checked against when the email is unknown, so that path also pays for
    /// an argon2 verification.
    static ref DUMMY_HASH: String =
        hash_password("postboard-unknown-account").unwrap_or_default();
}

/// Login check. Only a caller who knows the password can learn that the
/// account is unconfirmed.
pub async fn authenticate<R: UserRepo + ?Sized>(
    repo: &R,
    email: &str,
    password: &str,
) -> Result<User, AuthError> {
    let Some(user) = repo.find_user_by_email(email).await? else {
        verify_password(password, &DUMMY_HASH);
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash) {
        return Err(AuthError::InvalidCredentials);
    }
    if !user.confirmed {
        return Err(AuthError::NotConfirmed);
    }
    Ok(user)
}

/// Resolves an access token to the user it names, re-reading the row store.
pub async fn current_user<R: UserRepo + ?Sized>(
    repo: &R,
    keys: &JwtKeys,
    token: &str,
) -> Result<User, AuthError> {
    let email = keys.resolve_subject(token, TokenKind::Access)?;
    repo.find_user_by_email(&email)
        .await?
        .ok_or(AuthError::UserNotFound)
}
