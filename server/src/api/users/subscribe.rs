use crate::api::pagination::MAX_LIMIT;
use crate::api::users::profile::{subscription_profile, SubscriptionProfile};
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{NewSubscription, User};
use crate::schema::{subscriptions, users};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct SubscribeParams {
    /// Cap on the number of recipes embedded in the response (max: 100)
    pub recipes_limit: Option<i64>,
}

pub(super) fn resolve_recipes_limit(raw: Option<i64>) -> Option<i64> {
    raw.map(|limit| limit.clamp(1, MAX_LIMIT))
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/subscribe",
    tag = "users",
    params(
        ("id" = Uuid, Path, description = "Author to follow"),
        SubscribeParams
    ),
    responses(
        (status = 201, description = "Subscribed; author profile with recipes", body = SubscriptionProfile),
        (status = 400, description = "Self-subscription or already subscribed", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn subscribe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
    Query(params): Query<SubscribeParams>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let author: User = match users::table.find(id).select(User::as_select()).first(&mut conn) {
        Ok(u) => u,
        Err(diesel::NotFound) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "User not found".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to fetch user: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch user".to_string(),
                }),
            )
                .into_response();
        }
    };

    if author.id == user.id {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Cannot subscribe to yourself".to_string(),
            }),
        )
            .into_response();
    }

    let inserted = match diesel::insert_into(subscriptions::table)
        .values(&NewSubscription {
            user_id: user.id,
            author_id: author.id,
        })
        .on_conflict_do_nothing()
        .execute(&mut conn)
    {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("Failed to create subscription: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to subscribe".to_string(),
                }),
            )
                .into_response();
        }
    };

    if inserted == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Already subscribed to this user".to_string(),
            }),
        )
            .into_response();
    }

    let recipes_limit = resolve_recipes_limit(params.recipes_limit);
    match subscription_profile(&mut conn, &author, user.id, recipes_limit) {
        Ok(profile) => (StatusCode::CREATED, Json(profile)).into_response(),
        Err(e) => {
            tracing::error!("Failed to build subscription profile: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch author profile".to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}/subscribe",
    tag = "users",
    params(
        ("id" = Uuid, Path, description = "Author to unfollow")
    ),
    responses(
        (status = 204, description = "Unsubscribed"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "User or subscription not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn unsubscribe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let author_exists: bool = match diesel::select(diesel::dsl::exists(
        users::table.filter(users::id.eq(id)),
    ))
    .get_result(&mut conn)
    {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to check user: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch user".to_string(),
                }),
            )
                .into_response();
        }
    };

    if !author_exists {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "User not found".to_string(),
            }),
        )
            .into_response();
    }

    let deleted = match diesel::delete(
        subscriptions::table
            .filter(subscriptions::user_id.eq(user.id))
            .filter(subscriptions::author_id.eq(id)),
    )
    .execute(&mut conn)
    {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("Failed to delete subscription: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to unsubscribe".to_string(),
                }),
            )
                .into_response();
        }
    };

    if deleted == 0 {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Not subscribed to this user".to_string(),
            }),
        )
            .into_response();
    }

    StatusCode::NO_CONTENT.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipes_limit_unset_means_uncapped() {
        assert_eq!(resolve_recipes_limit(None), None);
    }

    #[test]
    fn test_recipes_limit_clamped() {
        assert_eq!(resolve_recipes_limit(Some(0)), Some(1));
        assert_eq!(resolve_recipes_limit(Some(3)), Some(3));
        assert_eq!(resolve_recipes_limit(Some(1000)), Some(MAX_LIMIT));
    }
}
