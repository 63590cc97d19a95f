use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    auth::{get_profile, login, register, update_profile},
    health::health_check,
    tasks::{create_task, delete_completed_tasks, delete_task, list_tasks, update_task},
};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(get_profile).put(update_profile));

    let task_routes = Router::new()
        .route("/", get(list_tasks).post(create_task))
        // Registered alongside `{id}`; the router prefers the literal
        // segment, so bulk delete is never captured as an id.
        .route("/completed", delete(delete_completed_tasks))
        .route("/{id}", put(update_task).delete(delete_task));

    Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth_routes)
        .nest("/tasks", task_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
