use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

/// Pings the pool so a dead database shows up here before it shows up as a
/// wave of 500s.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "Connected",
        Err(_) => "Disconnected",
    };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "Taskboard API is healthy".to_string(),
            database: database.to_string(),
        }),
    )
}
