use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::meal::Meal;
use super::shopping::ManualItem;
use super::tabs::TabId;

/// The import/export backup document: every store bundled into one JSON
/// object. Import replaces all current state wholesale — there is no partial
/// or merge import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub meals: Vec<Meal>,
    #[serde(default)]
    pub selected_meals_config: BTreeMap<Uuid, u32>,
    #[serde(default)]
    pub manual_shopping_items: Vec<ManualItem>,
    #[serde(default)]
    pub suppressed_item_keys: BTreeSet<String>,
    #[serde(default)]
    pub tabs_order: Option<Vec<TabId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_api_key: Option<String>,
}

/// Why a snapshot document was rejected or failed to apply.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("snapshot is missing required fields (meals, plus tabsOrder or manualApiKey)")]
    MissingFields,

    #[error("failed to persist imported state")]
    Persist(#[source] anyhow::Error),
}

impl Snapshot {
    /// Parse and minimally validate a backup document. `meals` must be
    /// present, along with at least one of `tabsOrder` / `manualApiKey` —
    /// enough to tell a backup of ours from an arbitrary JSON file.
    pub fn parse(text: &str) -> Result<Self, SnapshotError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let has = |field: &str| value.get(field).is_some_and(|v| !v.is_null());
        if !has("meals") || !(has("tabsOrder") || has("manualApiKey")) {
            return Err(SnapshotError::MissingFields);
        }
        Ok(serde_json::from_value(value)?)
    }
}
