use axum::{extract::State, http::StatusCode};
use serde_json::json;
use uuid::Uuid;

use crate::error::{ApiError, unique_violation};
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::json::Json;
use crate::models::user::{
    LoginRequest, RegisterRequest, UpdateProfileRequest, User, UserProfile,
};
use crate::state::AppState;
use crate::utils::auth::{hash_password, verify_password};
use crate::utils::validation::{validate_email, validate_password};

/// Creates an account.
///
/// Email and username must both be unused; each collision gets its own 409
/// message so the client can point at the right field.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let username = payload.username.as_deref().map(str::trim).unwrap_or_default();
    let email = payload.email.as_deref().map(str::trim).unwrap_or_default();
    let password = payload.password.as_deref().unwrap_or_default();

    if username.is_empty() || email.is_empty() || password.is_empty() {
        return Err(ApiError::Validation(
            "Username, email and password are required".to_string(),
        ));
    }

    validate_email(email).map_err(ApiError::Validation)?;
    validate_password(password).map_err(ApiError::Validation)?;

    // Checked in order so the caller learns which field collided. The UNIQUE
    // constraints remain the arbiter when two registrations race.
    let email_taken: Option<i32> = sqlx::query_scalar("SELECT 1 FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(&state.db)
        .await?;
    if email_taken.is_some() {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let username_taken: Option<i32> = sqlx::query_scalar("SELECT 1 FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(&state.db)
        .await?;
    if username_taken.is_some() {
        return Err(ApiError::Conflict("Username already taken".to_string()));
    }

    let password_hash = hash_password(password)
        .map_err(|err| ApiError::Internal(format!("Password hashing failed: {err}")))?;

    let created = sqlx::query_as::<_, UserProfile>(
        r#"
        INSERT INTO users (username, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING id, username, email, created_at, updated_at
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(&password_hash)
    .fetch_one(&state.db)
    .await
    .map_err(registration_conflict)?;

    tracing::info!(user = %created.id, "registered new account");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user": created,
        })),
    ))
}

/// Verifies credentials and issues a signed bearer token.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let email = payload.email.as_deref().map(str::trim).unwrap_or_default();
    let password = payload.password.as_deref().unwrap_or_default();

    if email.is_empty() || password.is_empty() {
        return Err(ApiError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    // Unknown email and wrong password get the same answer; callers cannot
    // learn which accounts exist.
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(&state.db)
        .await?;

    let Some(user) = user else {
        return Err(ApiError::Authentication("Invalid credentials".to_string()));
    };

    let password_ok = verify_password(password, &user.password_hash)
        .map_err(|err| ApiError::Internal(format!("Password verification failed: {err}")))?;
    if !password_ok {
        return Err(ApiError::Authentication("Invalid credentials".to_string()));
    }

    let token = state
        .auth
        .issue(user.id, &user.username)
        .map_err(|err| ApiError::Internal(format!("Token generation failed: {err}")))?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Login successful",
            "token": token,
            "user": {
                "id": user.id,
                "username": user.username,
                "email": user.email,
            },
        })),
    ))
}

pub async fn get_profile(
    AuthenticatedUser(user): AuthenticatedUser,
) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "id": user.id,
            "username": user.username,
            "email": user.email,
        })),
    )
}

/// Updates the caller's username and/or email. At least one must be given;
/// password changes are handled nowhere, on purpose.
pub async fn update_profile(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let username = payload
        .username
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    if username.is_none() && email.is_none() {
        return Err(ApiError::Validation(
            "No data provided for update (username or email)".to_string(),
        ));
    }

    if let Some(email) = email {
        validate_email(email).map_err(ApiError::Validation)?;

        // Conflict only when the address belongs to somebody else;
        // re-submitting your own email is a no-op, not an error.
        let holder: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&state.db)
            .await?;
        if holder.is_some_and(|id| id != user.id) {
            return Err(ApiError::Conflict(
                "This email is already in use by another account".to_string(),
            ));
        }
    }

    // Two optional columns; inline clause assembly keeps the placeholder
    // numbering obvious.
    let mut set_clauses = Vec::new();
    let mut values = Vec::new();
    if let Some(username) = username {
        set_clauses.push(format!("username = ${}", values.len() + 1));
        values.push(username.to_string());
    }
    if let Some(email) = email {
        set_clauses.push(format!("email = ${}", values.len() + 1));
        values.push(email.to_string());
    }

    let sql = format!(
        "UPDATE users SET {}, updated_at = CURRENT_TIMESTAMP WHERE id = ${} \
         RETURNING id, username, email, created_at, updated_at",
        set_clauses.join(", "),
        values.len() + 1
    );

    let mut query = sqlx::query_as::<_, UserProfile>(&sql);
    for value in &values {
        query = query.bind(value);
    }

    let updated: Option<UserProfile> = query
        .bind(user.id)
        .fetch_optional(&state.db)
        .await
        .map_err(profile_conflict)?;

    let Some(updated) = updated else {
        return Err(ApiError::NotFound("User not found".to_string()));
    };

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Profile updated successfully",
            "user": {
                "id": updated.id,
                "username": updated.username,
                "email": updated.email,
            },
        })),
    ))
}

fn registration_conflict(err: sqlx::Error) -> ApiError {
    match unique_violation(&err) {
        Some(constraint) if constraint.contains("email") => {
            ApiError::Conflict("Email already registered".to_string())
        }
        Some(constraint) if constraint.contains("username") => {
            ApiError::Conflict("Username already taken".to_string())
        }
        _ => ApiError::Database(err),
    }
}

fn profile_conflict(err: sqlx::Error) -> ApiError {
    match unique_violation(&err) {
        Some(constraint) if constraint.contains("email") => {
            ApiError::Conflict("This email is already in use by another account".to_string())
        }
        Some(constraint) if constraint.contains("username") => {
            ApiError::Conflict("This username is already in use by another account".to_string())
        }
        _ => ApiError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::test_support::{duplicate_key, sqlstate};

    #[test]
    fn racing_registrations_still_get_field_conflicts() {
        let err = registration_conflict(duplicate_key("users_email_key"));
        assert!(matches!(err, ApiError::Conflict(msg) if msg == "Email already registered"));

        let err = registration_conflict(duplicate_key("users_username_key"));
        assert!(matches!(err, ApiError::Conflict(msg) if msg == "Username already taken"));
    }

    #[test]
    fn profile_collisions_blame_the_other_account() {
        let err = profile_conflict(duplicate_key("users_email_key"));
        assert!(matches!(
            err,
            ApiError::Conflict(msg) if msg == "This email is already in use by another account"
        ));

        let err = profile_conflict(duplicate_key("users_username_key"));
        assert!(matches!(
            err,
            ApiError::Conflict(msg) if msg == "This username is already in use by another account"
        ));
    }

    #[test]
    fn unrelated_database_errors_are_not_conflicts() {
        assert!(matches!(
            registration_conflict(sqlstate("23503")),
            ApiError::Database(_)
        ));
        assert!(matches!(
            registration_conflict(duplicate_key("tasks_pkey")),
            ApiError::Database(_)
        ));
        assert!(matches!(
            profile_conflict(sqlx::Error::RowNotFound),
            ApiError::Database(_)
        ));
    }
}
