use crate::api::recipes::serialize::load_recipe_response;
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::images;
use crate::models::{NewRecipe, NewRecipeIngredient, NewRecipeTag};
use crate::schema::{recipe_ingredients, recipe_tags, recipes};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Reference to a catalog ingredient with the amount used by the recipe.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IngredientRef {
    pub id: Uuid,
    pub amount: i32,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRecipeRequest {
    pub name: String,
    pub text: String,
    /// Cooking time in minutes, at least 1
    pub cooking_time: i32,
    /// Base64 data URI: data:image/<ext>;base64,<payload>
    pub image: String,
    pub tags: Vec<Uuid>,
    pub ingredients: Vec<IngredientRef>,
}

/// Validate the ingredient list of a write request. Ingredient ids must be
/// unique within one request and every amount at least 1.
pub(super) fn validate_ingredient_refs(ingredients: &[IngredientRef]) -> Result<(), String> {
    if ingredients.is_empty() {
        return Err("At least one ingredient is required".to_string());
    }

    let mut seen = HashSet::new();
    for r in ingredients {
        if r.amount < 1 {
            return Err("Ingredient amount must be at least 1".to_string());
        }
        if !seen.insert(r.id) {
            return Err("Duplicate ingredient in request".to_string());
        }
    }

    Ok(())
}

pub(super) fn validate_tag_refs(tags: &[Uuid]) -> Result<(), String> {
    if tags.is_empty() {
        return Err("At least one tag is required".to_string());
    }

    let unique: HashSet<&Uuid> = tags.iter().collect();
    if unique.len() != tags.len() {
        return Err("Duplicate tag in request".to_string());
    }

    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/recipes",
    tag = "recipes",
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created successfully", body = super::serialize::RecipeResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Json(request): Json<CreateRecipeRequest>,
) -> impl IntoResponse {
    if request.name.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Name cannot be empty".to_string(),
            }),
        )
            .into_response();
    }

    if request.text.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Text cannot be empty".to_string(),
            }),
        )
            .into_response();
    }

    if request.cooking_time < 1 {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Cooking time must be at least 1 minute".to_string(),
            }),
        )
            .into_response();
    }

    if let Err(message) = validate_tag_refs(&request.tags)
        .and_then(|_| validate_ingredient_refs(&request.ingredients))
    {
        return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response();
    }

    let image = match images::parse_data_uri(&request.image) {
        Ok(i) => i,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message }))
                .into_response()
        }
    };

    let mut conn = get_conn!(pool);

    // Recipe row and both join sets are written atomically
    let result: Result<Uuid, diesel::result::Error> = conn.transaction(|conn| {
        let new_recipe = NewRecipe {
            author_id: user.id,
            name: &request.name,
            image_data: &image.data,
            image_name: &image.file_name,
            text: &request.text,
            cooking_time: request.cooking_time,
        };

        let recipe_id: Uuid = diesel::insert_into(recipes::table)
            .values(&new_recipe)
            .returning(recipes::id)
            .get_result(conn)?;

        let tag_rows: Vec<NewRecipeTag> = request
            .tags
            .iter()
            .map(|&tag_id| NewRecipeTag { recipe_id, tag_id })
            .collect();
        diesel::insert_into(recipe_tags::table)
            .values(&tag_rows)
            .execute(conn)?;

        let ingredient_rows: Vec<NewRecipeIngredient> = request
            .ingredients
            .iter()
            .map(|r| NewRecipeIngredient {
                recipe_id,
                ingredient_id: r.id,
                amount: r.amount,
            })
            .collect();
        diesel::insert_into(recipe_ingredients::table)
            .values(&ingredient_rows)
            .execute(conn)?;

        Ok(recipe_id)
    });

    let recipe_id = match result {
        Ok(id) => id,
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::ForeignKeyViolation,
            _,
        )) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Unknown tag or ingredient id".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to create recipe: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to create recipe".to_string(),
                }),
            )
                .into_response();
        }
    };

    match load_recipe_response(&mut conn, recipe_id, Some(user.id)) {
        Ok(Some(response)) => (StatusCode::CREATED, Json(response)).into_response(),
        Ok(None) | Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to fetch created recipe".to_string(),
            }),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingredient(id: Uuid, amount: i32) -> IngredientRef {
        IngredientRef { id, amount }
    }

    #[test]
    fn test_duplicate_ingredient_rejected() {
        let id = Uuid::new_v4();
        let refs = vec![ingredient(id, 1), ingredient(id, 2)];
        assert!(validate_ingredient_refs(&refs).is_err());
    }

    #[test]
    fn test_distinct_ingredients_accepted() {
        let refs = vec![
            ingredient(Uuid::new_v4(), 1),
            ingredient(Uuid::new_v4(), 200),
        ];
        assert!(validate_ingredient_refs(&refs).is_ok());
    }

    #[test]
    fn test_zero_amount_rejected() {
        let refs = vec![ingredient(Uuid::new_v4(), 0)];
        assert!(validate_ingredient_refs(&refs).is_err());
    }

    #[test]
    fn test_empty_ingredient_list_rejected() {
        assert!(validate_ingredient_refs(&[]).is_err());
    }

    #[test]
    fn test_empty_tag_list_rejected() {
        assert!(validate_tag_refs(&[]).is_err());
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let id = Uuid::new_v4();
        assert!(validate_tag_refs(&[id, id]).is_err());
    }
}
