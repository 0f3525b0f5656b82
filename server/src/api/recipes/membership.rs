//! Shared state machine for the favorite and shopping-cart toggle relations.
//!
//! Both relations support exactly two operations: insert-if-absent (POST) and
//! delete-if-present (DELETE). Duplicate inserts are rejected by the unique
//! constraint, which keeps concurrent double-POSTs race-safe.

use crate::api::recipes::serialize::load_recipe_summary;
use crate::api::ErrorResponse;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{NewFavorite, NewShoppingCartItem};
use crate::schema::{favorites, recipes, shopping_cart_items};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use diesel::prelude::*;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub enum ToggleRelation {
    Favorites,
    ShoppingCart,
}

impl ToggleRelation {
    fn insert(self, conn: &mut PgConnection, user_id: Uuid, recipe_id: Uuid) -> QueryResult<usize> {
        match self {
            ToggleRelation::Favorites => diesel::insert_into(favorites::table)
                .values(&NewFavorite { user_id, recipe_id })
                .on_conflict_do_nothing()
                .execute(conn),
            ToggleRelation::ShoppingCart => diesel::insert_into(shopping_cart_items::table)
                .values(&NewShoppingCartItem { user_id, recipe_id })
                .on_conflict_do_nothing()
                .execute(conn),
        }
    }

    fn remove(self, conn: &mut PgConnection, user_id: Uuid, recipe_id: Uuid) -> QueryResult<usize> {
        match self {
            ToggleRelation::Favorites => diesel::delete(
                favorites::table
                    .filter(favorites::user_id.eq(user_id))
                    .filter(favorites::recipe_id.eq(recipe_id)),
            )
            .execute(conn),
            ToggleRelation::ShoppingCart => diesel::delete(
                shopping_cart_items::table
                    .filter(shopping_cart_items::user_id.eq(user_id))
                    .filter(shopping_cart_items::recipe_id.eq(recipe_id)),
            )
            .execute(conn),
        }
    }

    fn already_message(self) -> &'static str {
        match self {
            ToggleRelation::Favorites => "Recipe is already in favorites",
            ToggleRelation::ShoppingCart => "Recipe is already in the shopping cart",
        }
    }

    fn missing_message(self) -> &'static str {
        match self {
            ToggleRelation::Favorites => "Recipe is not in favorites",
            ToggleRelation::ShoppingCart => "Recipe is not in the shopping cart",
        }
    }
}

fn recipe_exists(conn: &mut PgConnection, recipe_id: Uuid) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        recipes::table.filter(recipes::id.eq(recipe_id)),
    ))
    .get_result(conn)
}

fn recipe_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Recipe not found".to_string(),
        }),
    )
        .into_response()
}

/// POST half of the toggle: 201 with the recipe summary, or 400 when the
/// membership row already exists.
pub fn add(relation: ToggleRelation, pool: &DbPool, user_id: Uuid, recipe_id: Uuid) -> Response {
    let mut conn = get_conn!(pool);

    match recipe_exists(&mut conn, recipe_id) {
        Ok(true) => {}
        Ok(false) => return recipe_not_found(),
        Err(e) => {
            tracing::error!("Failed to check recipe: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch recipe".to_string(),
                }),
            )
                .into_response();
        }
    }

    match relation.insert(&mut conn, user_id, recipe_id) {
        Ok(0) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: relation.already_message().to_string(),
                }),
            )
                .into_response()
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!("Failed to insert membership row: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to update list".to_string(),
                }),
            )
                .into_response();
        }
    }

    match load_recipe_summary(&mut conn, recipe_id) {
        Ok(Some(summary)) => (StatusCode::CREATED, Json(summary)).into_response(),
        // The recipe vanished between the insert and the read
        Ok(None) => recipe_not_found(),
        Err(e) => {
            tracing::error!("Failed to fetch recipe summary: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch recipe".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// DELETE half of the toggle: 204, or 404 when there was no membership row.
pub fn remove(relation: ToggleRelation, pool: &DbPool, user_id: Uuid, recipe_id: Uuid) -> Response {
    let mut conn = get_conn!(pool);

    match recipe_exists(&mut conn, recipe_id) {
        Ok(true) => {}
        Ok(false) => return recipe_not_found(),
        Err(e) => {
            tracing::error!("Failed to check recipe: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch recipe".to_string(),
                }),
            )
                .into_response();
        }
    }

    match relation.remove(&mut conn, user_id, recipe_id) {
        Ok(0) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: relation.missing_message().to_string(),
            }),
        )
            .into_response(),
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::error!("Failed to delete membership row: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to update list".to_string(),
                }),
            )
                .into_response()
        }
    }
}
