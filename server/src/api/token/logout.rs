use crate::api::ErrorResponse;
use crate::auth::{bearer_token, revoke_session};
use crate::db::DbPool;
use crate::get_conn;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/api/auth/token/logout",
    tag = "auth",
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn logout(State(pool): State<Arc<DbPool>>, headers: HeaderMap) -> impl IntoResponse {
    let token = match bearer_token(&headers) {
        Ok(t) => t,
        Err(rejection) => return rejection.into_response(),
    };

    let mut conn = get_conn!(pool);

    match revoke_session(&mut conn, token) {
        Ok(0) => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Invalid or expired token".to_string(),
            }),
        )
            .into_response(),
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::error!("Failed to revoke session: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to revoke session".to_string(),
                }),
            )
                .into_response()
        }
    }
}
