use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::{
    repo_types::User,
    services::{current_user, AuthError},
};
use crate::state::AppState;

/// The user behind a valid `Authorization: Bearer <access token>` header,
/// freshly loaded from the row store.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingCredentials)?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or(AuthError::MissingCredentials)?;

        let user = current_user(&*state.db, &state.jwt, token)
            .await
            .inspect_err(|e| warn!(error = %e, "bearer token rejected"))?;
        Ok(CurrentUser(user))
    }
}
