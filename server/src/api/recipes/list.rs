use crate::api::pagination::{PageParams, PaginationMetadata};
use crate::api::recipes::serialize::{load_recipe_responses, RecipeResponse, RecipeRow};
use crate::api::ErrorResponse;
use crate::auth::MaybeUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::raw_sql;
use crate::schema::{favorites, recipe_tags, recipes, shopping_cart_items, tags};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListRecipesParams {
    /// Number of items to return (default: 20, max: 100)
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0)
    pub offset: Option<i64>,
    /// Only recipes by this author
    pub author: Option<Uuid>,
    /// Comma-separated tag slugs; a recipe matches if it has ANY of them
    pub tags: Option<String>,
    /// "1": only recipes the requester favorited; "0": the complement.
    /// Requires authentication; anonymous requesters get an empty result.
    pub is_favorited: Option<String>,
    /// Same ternary semantics as is_favorited, for the shopping cart
    pub is_in_shopping_cart: Option<String>,
}

/// A membership toggle parsed from its query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Toggle {
    Include,
    Exclude,
}

fn parse_toggle(raw: &str) -> Option<Toggle> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "y" | "yes" | "on" => Some(Toggle::Include),
        "0" | "f" | "false" | "n" | "no" | "off" => Some(Toggle::Exclude),
        _ => None,
    }
}

fn split_slugs(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListRecipesResponse {
    pub recipes: Vec<RecipeResponse>,
    pub pagination: PaginationMetadata,
}

#[derive(Queryable)]
struct RecipeForList {
    id: Uuid,
    author_id: Uuid,
    name: String,
    text: String,
    cooking_time: i32,
    pub_date: DateTime<Utc>,
    /// Total count of all matching rows (from window function)
    total_count: i64,
}

#[utoipa::path(
    get,
    path = "/api/recipes",
    tag = "recipes",
    params(ListRecipesParams),
    responses(
        (status = 200, description = "Recipes, newest first", body = ListRecipesResponse),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 401, description = "Invalid token", body = ErrorResponse)
    )
)]
pub async fn list_recipes(
    MaybeUser(viewer): MaybeUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<ListRecipesParams>,
) -> impl IntoResponse {
    let (limit, offset) = PageParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();

    let favorited = match params.is_favorited.as_deref().map(parse_toggle) {
        Some(None) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "is_favorited must be 0 or 1".to_string(),
                }),
            )
                .into_response()
        }
        other => other.flatten(),
    };

    let in_cart = match params.is_in_shopping_cart.as_deref().map(parse_toggle) {
        Some(None) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "is_in_shopping_cart must be 0 or 1".to_string(),
                }),
            )
                .into_response()
        }
        other => other.flatten(),
    };

    // Membership toggles are relative to the requesting user; without one
    // there is nothing they could match.
    if viewer.is_none() && (favorited.is_some() || in_cart.is_some()) {
        return (
            StatusCode::OK,
            Json(ListRecipesResponse {
                recipes: Vec::new(),
                pagination: PaginationMetadata {
                    total: 0,
                    limit,
                    offset,
                },
            }),
        )
            .into_response();
    }

    let tag_slugs = params.tags.as_deref().map(split_slugs);
    let viewer_id = viewer.as_ref().map(|u| u.id);

    let mut conn = get_conn!(pool);

    let mut query = recipes::table.into_boxed();

    if let Some(author) = params.author {
        query = query.filter(recipes::author_id.eq(author));
    }

    if let Some(slugs) = tag_slugs.filter(|s| !s.is_empty()) {
        let tagged = recipe_tags::table
            .inner_join(tags::table)
            .filter(tags::slug.eq_any(slugs))
            .select(recipe_tags::recipe_id);
        query = query.filter(recipes::id.eq_any(tagged));
    }

    if let Some(toggle) = favorited {
        let mine = favorites::table
            .filter(favorites::user_id.eq(viewer_id.unwrap_or_default()))
            .select(favorites::recipe_id);
        query = match toggle {
            Toggle::Include => query.filter(recipes::id.eq_any(mine)),
            Toggle::Exclude => query.filter(recipes::id.ne_all(mine)),
        };
    }

    if let Some(toggle) = in_cart {
        let mine = shopping_cart_items::table
            .filter(shopping_cart_items::user_id.eq(viewer_id.unwrap_or_default()))
            .select(shopping_cart_items::recipe_id);
        query = match toggle {
            Toggle::Include => query.filter(recipes::id.eq_any(mine)),
            Toggle::Exclude => query.filter(recipes::id.ne_all(mine)),
        };
    }

    let results: Vec<RecipeForList> = match query
        .order(recipes::pub_date.desc())
        .select((
            recipes::id,
            recipes::author_id,
            recipes::name,
            recipes::text,
            recipes::cooking_time,
            recipes::pub_date,
            raw_sql::count_over(),
        ))
        .limit(limit)
        .offset(offset)
        .load(&mut conn)
    {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to fetch recipes: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch recipes".to_string(),
                }),
            )
                .into_response();
        }
    };

    let total = results.first().map(|r| r.total_count).unwrap_or(0);

    let rows: Vec<RecipeRow> = results
        .into_iter()
        .map(|r| RecipeRow {
            id: r.id,
            author_id: r.author_id,
            name: r.name,
            text: r.text,
            cooking_time: r.cooking_time,
            pub_date: r.pub_date,
        })
        .collect();

    let recipes = match load_recipe_responses(&mut conn, rows, viewer_id) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to serialize recipes: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch recipes".to_string(),
                }),
            )
                .into_response();
        }
    };

    (
        StatusCode::OK,
        Json(ListRecipesResponse {
            recipes,
            pagination: PaginationMetadata {
                total,
                limit,
                offset,
            },
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toggle_on_spellings() {
        for raw in ["1", "true", "True", "YES", "on", "t", "y"] {
            assert_eq!(parse_toggle(raw), Some(Toggle::Include), "{raw}");
        }
    }

    #[test]
    fn test_parse_toggle_off_spellings() {
        for raw in ["0", "false", "False", "NO", "off", "f", "n"] {
            assert_eq!(parse_toggle(raw), Some(Toggle::Exclude), "{raw}");
        }
    }

    #[test]
    fn test_parse_toggle_rejects_other_values() {
        for raw in ["", "2", "maybe", "-1", "truee"] {
            assert_eq!(parse_toggle(raw), None, "{raw}");
        }
    }

    #[test]
    fn test_split_slugs() {
        assert_eq!(split_slugs("breakfast,lunch"), vec!["breakfast", "lunch"]);
    }

    #[test]
    fn test_split_slugs_skips_empty_entries() {
        assert_eq!(split_slugs("a,,b,"), vec!["a", "b"]);
        assert!(split_slugs("").is_empty());
    }

    #[test]
    fn test_split_slugs_trims_whitespace() {
        assert_eq!(split_slugs(" a , b "), vec!["a", "b"]);
    }
}
