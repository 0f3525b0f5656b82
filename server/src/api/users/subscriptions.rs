use crate::api::pagination::{PageParams, PaginationMetadata};
use crate::api::users::profile::{subscription_profile, SubscriptionProfile};
use crate::api::users::subscribe::resolve_recipes_limit;
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::User;
use crate::raw_sql;
use crate::schema::{subscriptions, users};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct SubscriptionsParams {
    /// Number of items to return (default: 20, max: 100)
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0)
    pub offset: Option<i64>,
    /// Cap on the number of recipes embedded per author (max: 100)
    pub recipes_limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubscriptionsResponse {
    pub authors: Vec<SubscriptionProfile>,
    pub pagination: PaginationMetadata,
}

#[utoipa::path(
    get,
    path = "/api/users/subscriptions",
    tag = "users",
    params(SubscriptionsParams),
    responses(
        (status = 200, description = "Authors the requester follows, with their recipes", body = SubscriptionsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_subscriptions(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<SubscriptionsParams>,
) -> impl IntoResponse {
    let (limit, offset) = PageParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();
    let recipes_limit = resolve_recipes_limit(params.recipes_limit);

    let mut conn = get_conn!(pool);

    // Page of followed author ids, ordered by username
    let page: Vec<(Uuid, i64)> = match users::table
        .inner_join(subscriptions::table.on(subscriptions::author_id.eq(users::id)))
        .filter(subscriptions::user_id.eq(user.id))
        .order(users::username.asc())
        .select((users::id, raw_sql::count_over()))
        .limit(limit)
        .offset(offset)
        .load(&mut conn)
    {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to fetch subscriptions: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch subscriptions".to_string(),
                }),
            )
                .into_response();
        }
    };

    let total = page.first().map(|(_, count)| *count).unwrap_or(0);
    let author_ids: Vec<Uuid> = page.iter().map(|(id, _)| *id).collect();

    let mut authors_by_id: HashMap<Uuid, User> = match users::table
        .filter(users::id.eq_any(&author_ids))
        .select(User::as_select())
        .load::<User>(&mut conn)
    {
        Ok(rows) => rows.into_iter().map(|u| (u.id, u)).collect(),
        Err(e) => {
            tracing::error!("Failed to fetch authors: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch subscriptions".to_string(),
                }),
            )
                .into_response();
        }
    };

    let mut authors = Vec::with_capacity(author_ids.len());
    for author_id in author_ids {
        let Some(author) = authors_by_id.remove(&author_id) else {
            continue;
        };

        match subscription_profile(&mut conn, &author, user.id, recipes_limit) {
            Ok(profile) => authors.push(profile),
            Err(e) => {
                tracing::error!("Failed to build subscription profile: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Failed to fetch subscriptions".to_string(),
                    }),
                )
                    .into_response();
            }
        }
    }

    (
        StatusCode::OK,
        Json(SubscriptionsResponse {
            authors,
            pagination: PaginationMetadata {
                total,
                limit,
                offset,
            },
        }),
    )
        .into_response()
}
