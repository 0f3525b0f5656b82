//! Idempotent loading of the read-only tag and ingredient catalogs from JSON
//! files, driven by the --load-ingredients / --load-tags CLI flags.

use crate::db::DbPool;
use crate::models::{NewIngredient, NewTag};
use crate::schema::{ingredients, tags};
use diesel::prelude::*;
use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
struct IngredientSeed {
    name: String,
    measurement_unit: String,
}

#[derive(Debug, Deserialize)]
struct TagSeed {
    name: String,
    color: String,
    slug: String,
}

/// Matches the CHECK constraint on tags.color.
fn valid_color(color: &str) -> bool {
    let Some(hex) = color.strip_prefix('#') else {
        return false;
    };
    hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

pub fn load_ingredients(pool: &DbPool, path: &str) {
    let raw = fs::read_to_string(path).expect("Failed to read ingredients file");
    let seeds: Vec<IngredientSeed> = serde_json::from_str(&raw).expect("Invalid ingredients JSON");

    let mut conn = pool.get().expect("Failed to get DB connection");

    let mut inserted = 0usize;
    for seed in &seeds {
        let rows = diesel::insert_into(ingredients::table)
            .values(&NewIngredient {
                name: &seed.name,
                measurement_unit: &seed.measurement_unit,
            })
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .expect("Failed to insert ingredient");

        if rows == 0 {
            tracing::info!("{} already loaded, skipping", seed.name);
        } else {
            inserted += 1;
        }
    }

    tracing::info!("Loaded {} of {} ingredients", inserted, seeds.len());
}

pub fn load_tags(pool: &DbPool, path: &str) {
    let raw = fs::read_to_string(path).expect("Failed to read tags file");
    let seeds: Vec<TagSeed> = serde_json::from_str(&raw).expect("Invalid tags JSON");

    let mut conn = pool.get().expect("Failed to get DB connection");

    let mut inserted = 0usize;
    for seed in &seeds {
        if !valid_color(&seed.color) {
            tracing::warn!("Tag {} has invalid color {}, skipping", seed.slug, seed.color);
            continue;
        }

        let rows = diesel::insert_into(tags::table)
            .values(&NewTag {
                name: &seed.name,
                color: &seed.color,
                slug: &seed.slug,
            })
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .expect("Failed to insert tag");

        if rows == 0 {
            tracing::info!("{} already loaded, skipping", seed.slug);
        } else {
            inserted += 1;
        }
    }

    tracing::info!("Loaded {} of {} tags", inserted, seeds.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_colors() {
        assert!(valid_color("#49B64E"));
        assert!(valid_color("#ffffff"));
    }

    #[test]
    fn test_invalid_colors() {
        assert!(!valid_color("49B64E"));
        assert!(!valid_color("#49B64"));
        assert!(!valid_color("#49B64EE"));
        assert!(!valid_color("#49B64G"));
        assert!(!valid_color(""));
    }

    #[test]
    fn test_seed_files_parse() {
        let ingredients: Vec<IngredientSeed> =
            serde_json::from_str(r#"[{"name": "flour", "measurement_unit": "g"}]"#).unwrap();
        assert_eq!(ingredients[0].name, "flour");

        let tags: Vec<TagSeed> = serde_json::from_str(
            r##"[{"name": "Breakfast", "color": "#E26C2D", "slug": "breakfast"}]"##,
        )
        .unwrap();
        assert_eq!(tags[0].slug, "breakfast");
    }
}
