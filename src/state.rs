use crate::utils::auth::AuthKeys;
use sqlx::PgPool;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub auth: AuthKeys,
}
