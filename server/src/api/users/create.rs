use crate::api::users::profile::UserProfile;
use crate::api::ErrorResponse;
use crate::auth::hash_password;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{NewUser, User};
use crate::schema::users;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

fn validate(req: &CreateUserRequest) -> Result<(), String> {
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err("A valid email is required".to_string());
    }
    if req.username.trim().is_empty() {
        return Err("Username cannot be empty".to_string());
    }
    if req.first_name.trim().is_empty() {
        return Err("First name cannot be empty".to_string());
    }
    if req.last_name.trim().is_empty() {
        return Err("Last name cannot be empty".to_string());
    }
    if req.password.len() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    request_body(content = CreateUserRequest, example = json!({
        "email": "cook@example.com",
        "username": "cook",
        "first_name": "Julia",
        "last_name": "Child",
        "password": "correct horse"
    })),
    responses(
        (status = 201, description = "User created successfully", body = UserProfile),
        (status = 400, description = "Invalid request or email/username taken", body = ErrorResponse)
    )
)]
pub async fn create_user(
    State(pool): State<Arc<DbPool>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    if let Err(message) = validate(&req) {
        return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response();
    }

    let password_hash = match hash_password(&req.password) {
        Ok(h) => h,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to hash password".to_string(),
                }),
            )
                .into_response()
        }
    };

    let mut conn = get_conn!(pool);

    let new_user = NewUser {
        email: &req.email,
        username: &req.username,
        first_name: &req.first_name,
        last_name: &req.last_name,
        password_hash: &password_hash,
    };

    let user: User = match diesel::insert_into(users::table)
        .values(&new_user)
        .returning(User::as_returning())
        .get_result(&mut conn)
    {
        Ok(u) => u,
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "A user with that email or username already exists".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to create user: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to create user".to_string(),
                }),
            )
                .into_response();
        }
    };

    (
        StatusCode::CREATED,
        Json(UserProfile::new(&user, false)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateUserRequest {
        CreateUserRequest {
            email: "cook@example.com".to_string(),
            username: "cook".to_string(),
            first_name: "Julia".to_string(),
            last_name: "Child".to_string(),
            password: "correct horse".to_string(),
        }
    }

    #[test]
    fn test_valid_request_accepted() {
        assert!(validate(&request()).is_ok());
    }

    #[test]
    fn test_email_without_at_rejected() {
        let mut req = request();
        req.email = "not-an-email".to_string();
        assert!(validate(&req).is_err());
    }

    #[test]
    fn test_blank_username_rejected() {
        let mut req = request();
        req.username = "   ".to_string();
        assert!(validate(&req).is_err());
    }

    #[test]
    fn test_short_password_rejected() {
        let mut req = request();
        req.password = "short".to_string();
        assert!(validate(&req).is_err());
    }
}
