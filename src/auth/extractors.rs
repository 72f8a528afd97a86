use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::{jwt::JwtKeys, repo_types::User};
use crate::{error::AppError, state::AppState};

/// Resolves the bearer token to a stored user.
///
/// Every failure maps to the same [`AppError::Unauthenticated`]; only the
/// warning log says which check failed.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Read Authorization header
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                warn!("missing Authorization header");
                AppError::Unauthenticated
            })?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                warn!("invalid auth scheme");
                AppError::Unauthenticated
            })?;

        let keys: &JwtKeys = &state.jwt;
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired JWT token");
            AppError::Unauthenticated
        })?;

        let email = claims.sub.ok_or_else(|| {
            warn!("JWT token missing subject claim");
            AppError::Unauthenticated
        })?;

        let user = state.users.find_by_email(&email).await?.ok_or_else(|| {
            warn!(%email, "user not found for email in JWT");
            AppError::Unauthenticated
        })?;

        Ok(CurrentUser(user))
    }
}
