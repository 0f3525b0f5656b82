use crate::api::pagination::{PageParams, PaginationMetadata};
use crate::api::users::profile::{subscribed_set, UserProfile};
use crate::api::ErrorResponse;
use crate::auth::MaybeUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::raw_sql;
use crate::schema::users;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UsersResponse {
    pub users: Vec<UserProfile>,
    pub pagination: PaginationMetadata,
}

#[derive(Queryable)]
struct UserForList {
    id: Uuid,
    email: String,
    username: String,
    first_name: String,
    last_name: String,
    total_count: i64,
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    params(PageParams),
    responses(
        (status = 200, description = "Registered users, oldest first", body = UsersResponse),
        (status = 401, description = "Invalid token", body = ErrorResponse)
    )
)]
pub async fn list_users(
    MaybeUser(viewer): MaybeUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<PageParams>,
) -> impl IntoResponse {
    let (limit, offset) = params.resolve();
    let viewer_id = viewer.map(|u| u.id);

    let mut conn = get_conn!(pool);

    let results: Vec<UserForList> = match users::table
        .order(users::created_at.asc())
        .select((
            users::id,
            users::email,
            users::username,
            users::first_name,
            users::last_name,
            raw_sql::count_over(),
        ))
        .limit(limit)
        .offset(offset)
        .load(&mut conn)
    {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to fetch users: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch users".to_string(),
                }),
            )
                .into_response();
        }
    };

    let total = results.first().map(|r| r.total_count).unwrap_or(0);

    let ids: Vec<Uuid> = results.iter().map(|r| r.id).collect();
    let followed = match subscribed_set(&mut conn, viewer_id, &ids) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to fetch subscriptions: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch users".to_string(),
                }),
            )
                .into_response();
        }
    };

    let users = results
        .into_iter()
        .map(|r| UserProfile {
            email: r.email,
            id: r.id,
            username: r.username,
            first_name: r.first_name,
            last_name: r.last_name,
            is_subscribed: followed.contains(&r.id),
        })
        .collect();

    (
        StatusCode::OK,
        Json(UsersResponse {
            users,
            pagination: PaginationMetadata {
                total,
                limit,
                offset,
            },
        }),
    )
        .into_response()
}
