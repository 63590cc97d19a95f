use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Everything a handler can fail with, mapped onto the API's status codes.
///
/// `NotFound` covers both a genuinely missing row and a row owned by another
/// account; callers cannot tell the two apart.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Authentication(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            // Detail goes to the logs, never to the client.
            ApiError::Database(err) => {
                tracing::error!("database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Returns the violated constraint name when `err` is a Postgres unique
/// violation (SQLSTATE 23505), so callers can name the offending field.
pub fn unique_violation(err: &sqlx::Error) -> Option<String> {
    let db_err = err.as_database_error()?;
    if db_err.code().as_deref() != Some("23505") {
        return None;
    }
    Some(db_err.constraint().unwrap_or_default().to_string())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_error_taxonomy_to_status_codes() {
        let cases = [
            (ApiError::Validation("v".into()), StatusCode::BAD_REQUEST),
            (
                ApiError::Authentication("a".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (ApiError::NotFound("n".into()), StatusCode::NOT_FOUND),
            (ApiError::Conflict("c".into()), StatusCode::CONFLICT),
            (
                ApiError::Database(sqlx::Error::RowNotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::Internal("i".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn server_errors_do_not_leak_detail() {
        let response = ApiError::Internal("connection pool exhausted".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Internal server error");
    }

    #[test]
    fn unique_violations_name_the_constraint() {
        let err = test_support::duplicate_key("users_email_key");
        assert_eq!(unique_violation(&err), Some("users_email_key".to_string()));

        let err = test_support::duplicate_key("users_username_key");
        assert_eq!(unique_violation(&err), Some("users_username_key".to_string()));
    }

    #[test]
    fn non_unique_violations_are_not_conflicts() {
        assert_eq!(unique_violation(&sqlx::Error::RowNotFound), None);
        assert_eq!(unique_violation(&test_support::sqlstate("23503")), None);
    }
}
