use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::schema::{ingredients, recipe_ingredients, shopping_cart_items};
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use diesel::dsl::sum;
use diesel::prelude::*;
use std::sync::Arc;

const FILE_NAME: &str = "shopping_cart.txt";

/// Render the aggregated shopping list as the downloadable text document.
/// Rows are (ingredient name, measurement unit, total amount).
fn render_shopping_list(rows: &[(String, String, i64)]) -> String {
    let lines: Vec<String> = rows
        .iter()
        .map(|(name, unit, total)| format!("{} - {} {}", name, total, unit))
        .collect();

    format!("Shopping list:\n{}", lines.join("\n"))
}

#[utoipa::path(
    get,
    path = "/api/recipes/download_shopping_cart",
    tag = "recipes",
    responses(
        (status = 200, description = "Aggregated shopping list as a text attachment", content_type = "text/plain"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn download_shopping_cart(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let cart_recipes = shopping_cart_items::table
        .filter(shopping_cart_items::user_id.eq(user.id))
        .select(shopping_cart_items::recipe_id);

    // Total amount per distinct ingredient across every recipe in the cart
    let rows: Vec<(String, String, Option<i64>)> = match recipe_ingredients::table
        .inner_join(ingredients::table)
        .filter(recipe_ingredients::recipe_id.eq_any(cart_recipes))
        .group_by((
            ingredients::id,
            ingredients::name,
            ingredients::measurement_unit,
        ))
        .select((
            ingredients::name,
            ingredients::measurement_unit,
            sum(recipe_ingredients::amount),
        ))
        .order(ingredients::name.asc())
        .load(&mut conn)
    {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to aggregate shopping cart: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to build shopping list".to_string(),
                }),
            )
                .into_response();
        }
    };

    let rows: Vec<(String, String, i64)> = rows
        .into_iter()
        .map(|(name, unit, total)| (name, unit, total.unwrap_or(0)))
        .collect();

    let body = render_shopping_list(&rows);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", FILE_NAME),
        )
        .body(Body::from(body))
        .unwrap()
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, unit: &str, total: i64) -> (String, String, i64) {
        (name.to_string(), unit.to_string(), total)
    }

    #[test]
    fn test_render_aggregated_lines() {
        let rows = vec![row("flour", "g", 500), row("sugar", "g", 50)];
        assert_eq!(
            render_shopping_list(&rows),
            "Shopping list:\nflour - 500 g\nsugar - 50 g"
        );
    }

    #[test]
    fn test_render_empty_cart() {
        assert_eq!(render_shopping_list(&[]), "Shopping list:\n");
    }

    #[test]
    fn test_render_single_row() {
        let rows = vec![row("eggs", "pcs", 12)];
        assert_eq!(render_shopping_list(&rows), "Shopping list:\neggs - 12 pcs");
    }
}
