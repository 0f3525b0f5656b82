//! Read representation of recipes.
//!
//! Create and update respond through this module too, so the write and read
//! shapes are allowed to diverge.

use crate::api::users::profile::{subscribed_set, UserProfile};
use crate::db::DbConn;
use crate::models::{Tag, User};
use crate::schema::{
    favorites, ingredients, recipe_ingredients, recipe_tags, recipes, shopping_cart_items, tags,
    users,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use utoipa::ToSchema;
use uuid::Uuid;

/// Recipe columns needed for serialization; the image blob stays in the
/// database and is referenced by URL.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::recipes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RecipeRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

/// One ingredient of a recipe together with its amount from the join row.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeResponse {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: UserProfile,
    pub ingredients: Vec<IngredientAmount>,
    /// Whether the requesting user favorited this recipe; false for anonymous
    pub is_favorited: bool,
    /// Whether the recipe is in the requesting user's shopping cart; false for anonymous
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

/// Minimal recipe summary returned by the favorite/shopping-cart toggles and
/// embedded in subscription profiles.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeSummary {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

pub fn image_url(recipe_id: Uuid) -> String {
    format!("/api/recipes/{}/image", recipe_id)
}

/// Build read representations for a page of recipes.
///
/// Tags, ingredients, authors, and the viewer's favorite/cart membership are
/// loaded in one query each for the whole page.
pub fn load_recipe_responses(
    conn: &mut DbConn,
    rows: Vec<RecipeRow>,
    viewer: Option<Uuid>,
) -> QueryResult<Vec<RecipeResponse>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let recipe_ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let author_ids: Vec<Uuid> = rows
        .iter()
        .map(|r| r.author_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let authors: HashMap<Uuid, User> = users::table
        .filter(users::id.eq_any(&author_ids))
        .select(User::as_select())
        .load::<User>(conn)?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let followed = subscribed_set(conn, viewer, &author_ids)?;

    let mut tags_by_recipe: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    let tag_rows: Vec<(Uuid, Uuid, String, String, String)> = recipe_tags::table
        .inner_join(tags::table)
        .filter(recipe_tags::recipe_id.eq_any(&recipe_ids))
        .order(tags::name.asc())
        .select((
            recipe_tags::recipe_id,
            tags::id,
            tags::name,
            tags::color,
            tags::slug,
        ))
        .load(conn)?;
    for (recipe_id, id, name, color, slug) in tag_rows {
        tags_by_recipe.entry(recipe_id).or_default().push(Tag {
            id,
            name,
            color,
            slug,
        });
    }

    let mut ingredients_by_recipe: HashMap<Uuid, Vec<IngredientAmount>> = HashMap::new();
    let ingredient_rows: Vec<(Uuid, i32, Uuid, String, String)> = recipe_ingredients::table
        .inner_join(ingredients::table)
        .filter(recipe_ingredients::recipe_id.eq_any(&recipe_ids))
        .order(ingredients::name.asc())
        .select((
            recipe_ingredients::recipe_id,
            recipe_ingredients::amount,
            ingredients::id,
            ingredients::name,
            ingredients::measurement_unit,
        ))
        .load(conn)?;
    for (recipe_id, amount, id, name, measurement_unit) in ingredient_rows {
        ingredients_by_recipe
            .entry(recipe_id)
            .or_default()
            .push(IngredientAmount {
                id,
                name,
                measurement_unit,
                amount,
            });
    }

    let favorited: HashSet<Uuid> = match viewer {
        Some(v) => favorites::table
            .filter(favorites::user_id.eq(v))
            .filter(favorites::recipe_id.eq_any(&recipe_ids))
            .select(favorites::recipe_id)
            .load::<Uuid>(conn)?
            .into_iter()
            .collect(),
        None => HashSet::new(),
    };

    let in_cart: HashSet<Uuid> = match viewer {
        Some(v) => shopping_cart_items::table
            .filter(shopping_cart_items::user_id.eq(v))
            .filter(shopping_cart_items::recipe_id.eq_any(&recipe_ids))
            .select(shopping_cart_items::recipe_id)
            .load::<Uuid>(conn)?
            .into_iter()
            .collect(),
        None => HashSet::new(),
    };

    rows.into_iter()
        .map(|row| {
            let author = authors
                .get(&row.author_id)
                .ok_or(diesel::result::Error::NotFound)?;

            Ok(RecipeResponse {
                id: row.id,
                tags: tags_by_recipe.remove(&row.id).unwrap_or_default(),
                author: UserProfile::new(author, followed.contains(&author.id)),
                ingredients: ingredients_by_recipe.remove(&row.id).unwrap_or_default(),
                is_favorited: favorited.contains(&row.id),
                is_in_shopping_cart: in_cart.contains(&row.id),
                name: row.name,
                image: image_url(row.id),
                text: row.text,
                cooking_time: row.cooking_time,
                pub_date: row.pub_date,
            })
        })
        .collect()
}

/// Read representation of a single recipe, or None when it doesn't exist.
pub fn load_recipe_response(
    conn: &mut DbConn,
    recipe_id: Uuid,
    viewer: Option<Uuid>,
) -> QueryResult<Option<RecipeResponse>> {
    let row: Option<RecipeRow> = recipes::table
        .find(recipe_id)
        .select(RecipeRow::as_select())
        .first(conn)
        .optional()?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(load_recipe_responses(conn, vec![row], viewer)?.pop())
}

/// Minimal summary of a single recipe, or None when it doesn't exist.
pub fn load_recipe_summary(conn: &mut DbConn, recipe_id: Uuid) -> QueryResult<Option<RecipeSummary>> {
    let row: Option<(Uuid, String, i32)> = recipes::table
        .find(recipe_id)
        .select((recipes::id, recipes::name, recipes::cooking_time))
        .first(conn)
        .optional()?;

    Ok(row.map(|(id, name, cooking_time)| RecipeSummary {
        id,
        name,
        image: image_url(id),
        cooking_time,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::users::profile::UserProfile;

    #[test]
    fn test_image_url_points_at_image_endpoint() {
        let id = Uuid::new_v4();
        assert_eq!(image_url(id), format!("/api/recipes/{}/image", id));
    }

    #[test]
    fn test_response_json_preserves_tags_ingredients_and_cooking_time() {
        let tag_id = Uuid::new_v4();
        let ingredient_id = Uuid::new_v4();
        let response = RecipeResponse {
            id: Uuid::new_v4(),
            tags: vec![Tag {
                id: tag_id,
                name: "Breakfast".to_string(),
                color: "#E26C2D".to_string(),
                slug: "breakfast".to_string(),
            }],
            author: UserProfile {
                email: "cook@example.com".to_string(),
                id: Uuid::new_v4(),
                username: "cook".to_string(),
                first_name: "Julia".to_string(),
                last_name: "Child".to_string(),
                is_subscribed: false,
            },
            ingredients: vec![IngredientAmount {
                id: ingredient_id,
                name: "flour".to_string(),
                measurement_unit: "g".to_string(),
                amount: 200,
            }],
            is_favorited: false,
            is_in_shopping_cart: false,
            name: "Pancakes".to_string(),
            image: "/api/recipes/x/image".to_string(),
            text: "Mix and fry.".to_string(),
            cooking_time: 15,
            pub_date: chrono::Utc::now(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["tags"][0]["slug"], "breakfast");
        assert_eq!(json["ingredients"][0]["id"], ingredient_id.to_string());
        assert_eq!(json["ingredients"][0]["amount"], 200);
        assert_eq!(json["cooking_time"], 15);
        assert_eq!(json["is_favorited"], false);
        assert_eq!(json["is_in_shopping_cart"], false);
    }
}
