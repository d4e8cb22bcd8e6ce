use serde::{Deserialize, Serialize};

use super::ingredient::{merge_key, Unit};

/// Contributor label used on shopping-list lines that a manual item fed into.
pub const MANUAL_ITEM_LABEL: &str = "manual addition";

/// A shopping-list entry added directly by the user, not derived from any
/// meal. Same shape as an ingredient but with no serving baseline — the
/// quantity is taken at face value.
///
/// Invariant: a manual-items list holds at most one entry per (lowercased
/// name, unit) pair; adding a duplicate merges quantities instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManualItem {
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
}

impl ManualItem {
    pub fn merge_key(&self) -> String {
        merge_key(&self.name, self.unit)
    }
}

/// One line of the consolidated shopping list.
///
/// `from_meals` lists every distinct contributor in first-seen order, each at
/// most once: meal display names, plus [`MANUAL_ITEM_LABEL`] when a manual
/// item contributed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedIngredient {
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
    pub from_meals: Vec<String>,
}

impl AggregatedIngredient {
    pub fn merge_key(&self) -> String {
        merge_key(&self.name, self.unit)
    }
}
