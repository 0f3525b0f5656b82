//! User profile serialization shared by the user, recipe, and subscription
//! endpoints.

use crate::api::recipes::serialize::{image_url, RecipeSummary};
use crate::db::DbConn;
use crate::models::User;
use crate::schema::{recipes, subscriptions};
use diesel::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Whether the requesting user follows this user; false for anonymous
    pub is_subscribed: bool,
}

impl UserProfile {
    pub fn new(user: &User, is_subscribed: bool) -> Self {
        UserProfile {
            email: user.email.clone(),
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_subscribed,
        }
    }
}

/// An author profile annotated with their recipes, as returned by the
/// subscription endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubscriptionProfile {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: i64,
}

/// Which of `author_ids` the viewer follows. Empty for anonymous viewers.
pub fn subscribed_set(
    conn: &mut DbConn,
    viewer: Option<Uuid>,
    author_ids: &[Uuid],
) -> QueryResult<HashSet<Uuid>> {
    let Some(viewer) = viewer else {
        return Ok(HashSet::new());
    };

    Ok(subscriptions::table
        .filter(subscriptions::user_id.eq(viewer))
        .filter(subscriptions::author_id.eq_any(author_ids))
        .select(subscriptions::author_id)
        .load::<Uuid>(conn)?
        .into_iter()
        .collect())
}

/// Build an author profile with their newest recipes (optionally capped) and
/// total recipe count.
pub fn subscription_profile(
    conn: &mut DbConn,
    author: &User,
    viewer: Uuid,
    recipes_limit: Option<i64>,
) -> QueryResult<SubscriptionProfile> {
    let is_subscribed = subscribed_set(conn, Some(viewer), &[author.id])?.contains(&author.id);

    let mut query = recipes::table
        .filter(recipes::author_id.eq(author.id))
        .order(recipes::pub_date.desc())
        .select((recipes::id, recipes::name, recipes::cooking_time))
        .into_boxed();
    if let Some(cap) = recipes_limit {
        query = query.limit(cap);
    }
    let recipe_rows: Vec<(Uuid, String, i32)> = query.load(conn)?;

    let recipes_count: i64 = recipes::table
        .filter(recipes::author_id.eq(author.id))
        .count()
        .get_result(conn)?;

    Ok(SubscriptionProfile {
        email: author.email.clone(),
        id: author.id,
        username: author.username.clone(),
        first_name: author.first_name.clone(),
        last_name: author.last_name.clone(),
        is_subscribed,
        recipes: recipe_rows
            .into_iter()
            .map(|(id, name, cooking_time)| RecipeSummary {
                id,
                name,
                image: image_url(id),
                cooking_time,
            })
            .collect(),
        recipes_count,
    })
}
