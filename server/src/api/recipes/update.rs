use crate::api::recipes::create::{validate_ingredient_refs, validate_tag_refs, IngredientRef};
use crate::api::recipes::serialize::load_recipe_response;
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::images::{self, DecodedImage};
use crate::models::{NewRecipeIngredient, NewRecipeTag};
use crate::schema::{recipe_ingredients, recipe_tags, recipes};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateRecipeRequest {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    /// Base64 data URI: data:image/<ext>;base64,<payload>
    pub image: Option<String>,
    /// When present, replaces the recipe's whole tag set
    pub tags: Option<Vec<Uuid>>,
    /// When present, replaces the recipe's whole ingredient set
    pub ingredients: Option<Vec<IngredientRef>>,
}

#[derive(AsChangeset)]
#[diesel(table_name = recipes)]
struct RecipeChanges<'a> {
    name: Option<&'a str>,
    text: Option<&'a str>,
    cooking_time: Option<i32>,
    image_data: Option<&'a [u8]>,
    image_name: Option<&'a str>,
}

#[utoipa::path(
    patch,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    request_body = UpdateRecipeRequest,
    responses(
        (status = 200, description = "Recipe updated successfully", body = super::serialize::RecipeResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not the recipe author", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRecipeRequest>,
) -> impl IntoResponse {
    if let Some(ref name) = request.name {
        if name.trim().is_empty() {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Name cannot be empty".to_string(),
                }),
            )
                .into_response();
        }
    }

    if let Some(ref text) = request.text {
        if text.trim().is_empty() {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Text cannot be empty".to_string(),
                }),
            )
                .into_response();
        }
    }

    if let Some(cooking_time) = request.cooking_time {
        if cooking_time < 1 {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Cooking time must be at least 1 minute".to_string(),
                }),
            )
                .into_response();
        }
    }

    if let Some(ref tags) = request.tags {
        if let Err(message) = validate_tag_refs(tags) {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message }))
                .into_response();
        }
    }

    if let Some(ref ingredients) = request.ingredients {
        if let Err(message) = validate_ingredient_refs(ingredients) {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message }))
                .into_response();
        }
    }

    let image: Option<DecodedImage> = match request.image.as_deref().map(images::parse_data_uri) {
        Some(Ok(i)) => Some(i),
        Some(Err(message)) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message }))
                .into_response()
        }
        None => None,
    };

    let mut conn = get_conn!(pool);

    let author_id: Uuid = match recipes::table
        .find(id)
        .select(recipes::author_id)
        .first(&mut conn)
    {
        Ok(a) => a,
        Err(diesel::NotFound) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "Recipe not found".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to fetch recipe: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch recipe".to_string(),
                }),
            )
                .into_response();
        }
    };

    if author_id != user.id {
        return (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                error: "Only the author can edit this recipe".to_string(),
            }),
        )
            .into_response();
    }

    let changes = RecipeChanges {
        name: request.name.as_deref(),
        text: request.text.as_deref(),
        cooking_time: request.cooking_time,
        image_data: image.as_ref().map(|i| i.data.as_slice()),
        image_name: image.as_ref().map(|i| i.file_name.as_str()),
    };
    let has_scalar_changes = request.name.is_some()
        || request.text.is_some()
        || request.cooking_time.is_some()
        || image.is_some();

    let result: Result<(), diesel::result::Error> = conn.transaction(|conn| {
        if has_scalar_changes {
            diesel::update(recipes::table.find(id))
                .set(&changes)
                .execute(conn)?;
        }

        // Tag and ingredient sets are replaced wholesale, never merged
        if let Some(ref tag_ids) = request.tags {
            diesel::delete(recipe_tags::table.filter(recipe_tags::recipe_id.eq(id)))
                .execute(conn)?;
            let tag_rows: Vec<NewRecipeTag> = tag_ids
                .iter()
                .map(|&tag_id| NewRecipeTag {
                    recipe_id: id,
                    tag_id,
                })
                .collect();
            diesel::insert_into(recipe_tags::table)
                .values(&tag_rows)
                .execute(conn)?;
        }

        if let Some(ref ingredients) = request.ingredients {
            diesel::delete(
                recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(id)),
            )
            .execute(conn)?;
            let ingredient_rows: Vec<NewRecipeIngredient> = ingredients
                .iter()
                .map(|r| NewRecipeIngredient {
                    recipe_id: id,
                    ingredient_id: r.id,
                    amount: r.amount,
                })
                .collect();
            diesel::insert_into(recipe_ingredients::table)
                .values(&ingredient_rows)
                .execute(conn)?;
        }

        Ok(())
    });

    match result {
        Ok(()) => {}
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
            tracing::error!("Failed to update recipe: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to update recipe".to_string(),
                }),
            )
                .into_response();
        }
    }

    match load_recipe_response(&mut conn, id, Some(user.id)) {
        Ok(Some(response)) => (StatusCode::OK, Json(response)).into_response(),
        Ok(None) | Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to fetch updated recipe".to_string(),
            }),
        )
            .into_response(),
    }
}
