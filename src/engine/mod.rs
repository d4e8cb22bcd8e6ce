//! The ingredient aggregation engine.
//!
//! [`aggregate`] is a pure function over four inputs — the meal catalog, the
//! selection map, the manual items and the suppression set — producing the
//! consolidated shopping list. It performs no I/O, touches no shared state
//! and is deterministic: equal inputs yield deep-equal output, including
//! contributor ordering. Callers recompute it from scratch on every read.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AggregatedIngredient, ManualItem, Meal, MANUAL_ITEM_LABEL};

/// Result of one aggregation pass.
///
/// `malformed_meals` lists selected meals whose `base_servings` is zero.
/// Their contribution is skipped rather than divided into non-finite
/// quantities; callers should report them as data integrity problems.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation {
    pub items: Vec<AggregatedIngredient>,
    pub malformed_meals: Vec<Uuid>,
}

/// Merge scaled recipe ingredients with manual items into the final shopping
/// list.
///
/// Lines merge on (lowercased name, unit); the display name of the first
/// occurrence wins. Each meal contributes `quantity / base_servings *
/// servings` per ingredient. Manual items merge next under the
/// [`MANUAL_ITEM_LABEL`] contributor label. Suppressed keys are removed
/// last, regardless of how many sources contributed. Output is sorted
/// case-insensitively by name, ties broken by first insertion.
///
/// Deliberately *not* validated here: zero or negative scaled quantities are
/// kept as-is (business sanity is the caller's concern), and a selection
/// entry of zero servings is treated as "not selected".
pub fn aggregate(
    meals: &[Meal],
    selection: &BTreeMap<Uuid, u32>,
    manual_items: &[ManualItem],
    suppressed: &BTreeSet<String>,
) -> Aggregation {
    let mut insertion_order: Vec<String> = Vec::new();
    let mut entries: HashMap<String, AggregatedIngredient> = HashMap::new();
    let mut malformed_meals: Vec<Uuid> = Vec::new();

    for meal in meals {
        let servings = match selection.get(&meal.id) {
            Some(&n) if n > 0 => n,
            _ => continue,
        };
        if meal.base_servings == 0 {
            malformed_meals.push(meal.id);
            continue;
        }
        for ingredient in &meal.ingredients {
            let key = ingredient.merge_key();
            let scaled =
                ingredient.quantity / f64::from(meal.base_servings) * f64::from(servings);
            match entries.get_mut(&key) {
                Some(entry) => {
                    entry.quantity += scaled;
                    if !entry.from_meals.contains(&meal.name) {
                        entry.from_meals.push(meal.name.clone());
                    }
                }
                None => {
                    insertion_order.push(key.clone());
                    entries.insert(
                        key,
                        AggregatedIngredient {
                            name: ingredient.name.clone(),
                            quantity: scaled,
                            unit: ingredient.unit,
                            from_meals: vec![meal.name.clone()],
                        },
                    );
                }
            }
        }
    }

    for item in manual_items {
        let key = item.merge_key();
        match entries.get_mut(&key) {
            Some(entry) => {
                entry.quantity += item.quantity;
                if !entry.from_meals.iter().any(|m| m == MANUAL_ITEM_LABEL) {
                    entry.from_meals.push(MANUAL_ITEM_LABEL.to_string());
                }
            }
            None => {
                insertion_order.push(key.clone());
                entries.insert(
                    key,
                    AggregatedIngredient {
                        name: item.name.clone(),
                        quantity: item.quantity,
                        unit: item.unit,
                        from_meals: vec![MANUAL_ITEM_LABEL.to_string()],
                    },
                );
            }
        }
    }

    let mut items: Vec<AggregatedIngredient> = insertion_order
        .iter()
        .filter(|key| !suppressed.contains(*key))
        .filter_map(|key| entries.remove(key))
        .collect();

    // Stable sort: equal lowercased names keep insertion order.
    items.sort_by_cached_key(|item| item.name.to_lowercase());

    Aggregation {
        items,
        malformed_meals,
    }
}
