use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ingredient::Ingredient;

/// A cataloged recipe.
///
/// Ingredient quantities are defined relative to `base_servings` (e.g.
/// "500 g flour for 4 servings"). The aggregation engine rescales them to the
/// serving count the user selected.
///
/// Invariant: no two ingredients in the same meal share a (lowercased name,
/// unit) pair. Inputs are normalized with [`dedupe_ingredients`] so the
/// invariant holds by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub id: Uuid,
    pub name: String,
    pub ingredients: Vec<Ingredient>,
    pub base_servings: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for cataloging a new meal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMealInput {
    pub name: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    /// Serving count the ingredient quantities are written for.
    /// Defaults to 1 (per-person recipe).
    pub base_servings: Option<u32>,
}

/// Input for updating an existing meal. All fields are optional for partial
/// updates; invalid field values (empty name, zero servings) leave that field
/// unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMealInput {
    pub name: Option<String>,
    pub ingredients: Option<Vec<Ingredient>>,
    pub base_servings: Option<u32>,
}

/// Collapse duplicate (lowercased name, unit) pairs by summing their
/// quantities, keeping first-seen order and display casing. This is the same
/// merge rule the aggregation engine applies across meals.
pub fn dedupe_ingredients(ingredients: Vec<Ingredient>) -> Vec<Ingredient> {
    let mut merged: Vec<Ingredient> = Vec::with_capacity(ingredients.len());
    for ingredient in ingredients {
        let key = ingredient.merge_key();
        match merged.iter_mut().find(|i| i.merge_key() == key) {
            Some(existing) => existing.quantity += ingredient.quantity,
            None => merged.push(ingredient),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Unit;

    #[test]
    fn dedupe_merges_case_insensitive_pairs() {
        let merged = dedupe_ingredients(vec![
            Ingredient {
                name: "Flour".to_string(),
                quantity: 100.0,
                unit: Unit::Weight,
            },
            Ingredient {
                name: "flour".to_string(),
                quantity: 50.0,
                unit: Unit::Weight,
            },
            Ingredient {
                name: "flour".to_string(),
                quantity: 2.0,
                unit: Unit::Count,
            },
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].name, "Flour");
        assert_eq!(merged[0].quantity, 150.0);
        assert_eq!(merged[1].unit, Unit::Count);
    }
}
