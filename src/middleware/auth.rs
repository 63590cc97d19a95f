use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::errors::ErrorKind;

use crate::error::ApiError;
use crate::models::user::UserProfile;
use crate::state::AppState;

/// The acting account for a protected request.
///
/// Add `AuthenticatedUser(user): AuthenticatedUser` to a handler and the
/// request is rejected with 401 unless the bearer token verifies and its
/// subject still exists. The re-fetch is the point: deleting an account
/// invalidates every token it ever issued, and handlers see current profile
/// data rather than whatever was true at signing time.
pub struct AuthenticatedUser(pub UserProfile);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Authentication("Missing Authorization header".to_string()))?;

        if !auth_header.starts_with("Bearer ") {
            return Err(ApiError::Authentication(
                "Invalid Authorization header format".to_string(),
            ));
        }
        let token = &auth_header[7..];

        let state = AppState::from_ref(state);

        let claims = state.auth.decode(token).map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => ApiError::Authentication("Token expired".to_string()),
            _ => ApiError::Authentication("Invalid token".to_string()),
        })?;

        // The token only proves who the caller was at signing time; the row
        // is the source of truth now.
        let user = sqlx::query_as::<_, UserProfile>(
            "SELECT id, username, email, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(claims.sub)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| {
            ApiError::Authentication("Token invalid - user no longer exists".to_string())
        })?;

        Ok(AuthenticatedUser(user))
    }
}
