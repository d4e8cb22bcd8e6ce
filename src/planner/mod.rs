//! The planner owns every store — meal catalog, selection, manual items,
//! suppression, tab order — behind one cloneable handle, and is the only
//! code that mutates them. Each mutation updates the in-memory state and
//! then writes that store's key back to the database, so the key-value
//! medium always mirrors the last accepted state.
//!
//! The consolidated shopping list is never stored: [`Planner::shopping_list`]
//! recomputes it from a snapshot of the current state on every call.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use crate::db::Database;
use crate::engine::{self, Aggregation};
use crate::models::{
    dedupe_ingredients, move_tab, CreateMealInput, Ingredient, ManualItem, Meal, Snapshot,
    SnapshotError, TabId, UpdateMealInput,
};

/// Serving count a meal gets when first selected.
pub const DEFAULT_SERVINGS: u32 = 4;

/// Serving baseline the suggestion service quotes quantities for.
pub const SUGGESTION_BASE_SERVINGS: u32 = 4;

const KEY_MEALS: &str = "meals";
const KEY_SELECTION: &str = "selectedMealsConfig";
const KEY_MANUAL_ITEMS: &str = "manualShoppingItems";
const KEY_SUPPRESSED: &str = "suppressedItemKeys";
const KEY_TABS: &str = "tabsOrder";

struct PlannerState {
    meals: Vec<Meal>,
    selection: BTreeMap<Uuid, u32>,
    manual_items: Vec<ManualItem>,
    suppressed: BTreeSet<String>,
    tabs: Vec<TabId>,
    manual_api_key: Option<String>,
}

#[derive(Clone)]
pub struct Planner {
    db: Database,
    state: Arc<Mutex<PlannerState>>,
}

impl Planner {
    /// Read every store from the database, falling back to empty defaults
    /// for missing or malformed keys.
    pub fn load(db: Database) -> Result<Self> {
        let meals: Vec<Meal> = db.get_json(KEY_MEALS)?.unwrap_or_default();
        let selection: BTreeMap<Uuid, u32> = db.get_json(KEY_SELECTION)?.unwrap_or_default();
        let manual_items: Vec<ManualItem> = db.get_json(KEY_MANUAL_ITEMS)?.unwrap_or_default();
        let suppressed: BTreeSet<String> = db.get_json(KEY_SUPPRESSED)?.unwrap_or_default();
        let tabs = match db.get_json::<Vec<TabId>>(KEY_TABS)? {
            Some(saved) => TabId::restore_order(&saved),
            None => TabId::default_order(),
        };

        // The selection invariant (all counts >= 1) survives whatever was on
        // disk.
        let selection = selection.into_iter().filter(|(_, n)| *n > 0).collect();

        Ok(Self {
            db,
            state: Arc::new(Mutex::new(PlannerState {
                meals,
                selection,
                manual_items,
                suppressed,
                tabs,
                manual_api_key: None,
            })),
        })
    }

    fn lock(&self) -> MutexGuard<'_, PlannerState> {
        self.state.lock().expect("planner lock poisoned")
    }

    // ============================================================
    // Meal catalog
    // ============================================================

    pub fn meals(&self) -> Vec<Meal> {
        self.lock().meals.clone()
    }

    pub fn meal(&self, id: Uuid) -> Option<Meal> {
        self.lock().meals.iter().find(|m| m.id == id).cloned()
    }

    /// Catalog a new meal. Returns `None` without mutating anything when the
    /// input is invalid (blank name, or an explicit base serving count of
    /// zero).
    pub fn add_meal(&self, input: CreateMealInput) -> Result<Option<Meal>> {
        let name = input.name.trim().to_string();
        let base_servings = input.base_servings.unwrap_or(1);
        if name.is_empty() || base_servings == 0 {
            return Ok(None);
        }

        let now = Utc::now();
        let meal = Meal {
            id: Uuid::new_v4(),
            name,
            ingredients: dedupe_ingredients(input.ingredients),
            base_servings,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.lock();
        state.meals.push(meal.clone());
        self.persist_meals(&state)?;
        Ok(Some(meal))
    }

    /// Partial update; invalid field values (blank name, zero servings)
    /// leave that field untouched. Returns `None` when the meal is unknown.
    pub fn update_meal(&self, id: Uuid, input: UpdateMealInput) -> Result<Option<Meal>> {
        let mut state = self.lock();
        let Some(meal) = state.meals.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };

        if let Some(name) = input.name {
            let trimmed = name.trim();
            if !trimmed.is_empty() {
                meal.name = trimmed.to_string();
            }
        }
        if let Some(ingredients) = input.ingredients {
            meal.ingredients = dedupe_ingredients(ingredients);
        }
        if let Some(base_servings) = input.base_servings {
            if base_servings > 0 {
                meal.base_servings = base_servings;
            }
        }
        meal.updated_at = Utc::now();
        let updated = meal.clone();

        self.persist_meals(&state)?;
        Ok(Some(updated))
    }

    /// Remove a meal from the catalog. Always deselects it as well, so the
    /// selection map never holds orphaned ids.
    pub fn delete_meal(&self, id: Uuid) -> Result<bool> {
        let mut state = self.lock();
        let before = state.meals.len();
        state.meals.retain(|m| m.id != id);
        if state.meals.len() == before {
            return Ok(false);
        }

        state.selection.remove(&id);
        let suppression_cleared = sync_suppression(&mut state);

        self.persist_meals(&state)?;
        self.persist_selection(&state)?;
        if suppression_cleared {
            self.persist_suppressed(&state)?;
        }
        Ok(true)
    }

    /// Merge suggested ingredients (quoted per [`SUGGESTION_BASE_SERVINGS`])
    /// into a meal, rescaled to the meal's own baseline. Suggestions whose
    /// name already appears in the meal are skipped. Returns `None` when the
    /// meal is unknown.
    pub fn apply_suggestions(
        &self,
        id: Uuid,
        suggestions: Vec<Ingredient>,
    ) -> Result<Option<Meal>> {
        let mut state = self.lock();
        let Some(meal) = state.meals.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };

        let scale = f64::from(meal.base_servings) / f64::from(SUGGESTION_BASE_SERVINGS);
        for suggestion in suggestions {
            let exists = meal
                .ingredients
                .iter()
                .any(|i| i.name.to_lowercase() == suggestion.name.to_lowercase());
            if exists {
                continue;
            }
            meal.ingredients.push(Ingredient {
                name: suggestion.name,
                quantity: suggestion.quantity * scale,
                unit: suggestion.unit,
            });
        }
        meal.updated_at = Utc::now();
        let updated = meal.clone();

        self.persist_meals(&state)?;
        Ok(Some(updated))
    }

    // ============================================================
    // Selection / servings
    // ============================================================

    pub fn selection(&self) -> BTreeMap<Uuid, u32> {
        self.lock().selection.clone()
    }

    /// Toggle a meal in or out of the selection. Newly selected meals start
    /// at [`DEFAULT_SERVINGS`]. Returns the serving count when the meal ends
    /// up selected, `None` when it ends up unselected (or is unknown).
    pub fn toggle_selection(&self, id: Uuid) -> Result<Option<u32>> {
        let mut state = self.lock();
        if !state.meals.iter().any(|m| m.id == id) {
            return Ok(None);
        }

        let now_selected = if state.selection.remove(&id).is_none() {
            state.selection.insert(id, DEFAULT_SERVINGS);
            Some(DEFAULT_SERVINGS)
        } else {
            None
        };
        let suppression_cleared = sync_suppression(&mut state);

        self.persist_selection(&state)?;
        if suppression_cleared {
            self.persist_suppressed(&state)?;
        }
        Ok(now_selected)
    }

    pub fn deselect(&self, id: Uuid) -> Result<()> {
        let mut state = self.lock();
        if state.selection.remove(&id).is_none() {
            return Ok(());
        }
        let suppression_cleared = sync_suppression(&mut state);

        self.persist_selection(&state)?;
        if suppression_cleared {
            self.persist_suppressed(&state)?;
        }
        Ok(())
    }

    /// Set the target serving count for a meal. Zero is rejected outright —
    /// no clamping, no mutation — and `false` is returned. Setting servings
    /// on an unselected (but known) meal selects it.
    pub fn set_servings(&self, id: Uuid, servings: u32) -> Result<bool> {
        if servings == 0 {
            return Ok(false);
        }
        let mut state = self.lock();
        if !state.meals.iter().any(|m| m.id == id) {
            return Ok(false);
        }
        state.selection.insert(id, servings);
        self.persist_selection(&state)?;
        Ok(true)
    }

    // ============================================================
    // Manual items / suppression
    // ============================================================

    pub fn manual_items(&self) -> Vec<ManualItem> {
        self.lock().manual_items.clone()
    }

    pub fn suppressed_keys(&self) -> BTreeSet<String> {
        self.lock().suppressed.clone()
    }

    /// Add a user-entered shopping item. An existing entry with the same
    /// (lowercased name, unit) absorbs the quantity instead of a second line
    /// appearing. Blank names and non-positive quantities are rejected as
    /// no-ops.
    pub fn add_manual_item(&self, item: ManualItem) -> Result<bool> {
        let name = item.name.trim().to_string();
        if name.is_empty() || !(item.quantity > 0.0) {
            return Ok(false);
        }
        let item = ManualItem { name, ..item };

        let mut state = self.lock();
        let key = item.merge_key();
        match state
            .manual_items
            .iter_mut()
            .find(|existing| existing.merge_key() == key)
        {
            Some(existing) => existing.quantity += item.quantity,
            None => state.manual_items.push(item),
        }
        self.persist_manual_items(&state)?;
        Ok(true)
    }

    /// Remove a line from the shopping list: suppress its merge key
    /// (idempotent) and drop any manual item carrying that key, so a deleted
    /// manual line cannot resurrect itself on the next recompute.
    pub fn remove_shopping_line(&self, key: &str) -> Result<()> {
        let mut state = self.lock();
        let newly_suppressed = state.suppressed.insert(key.to_string());
        let before = state.manual_items.len();
        state.manual_items.retain(|item| item.merge_key() != key);
        let manual_changed = state.manual_items.len() != before;

        if newly_suppressed {
            self.persist_suppressed(&state)?;
        }
        if manual_changed {
            self.persist_manual_items(&state)?;
        }
        Ok(())
    }

    /// Clear the suppression set. Invoked automatically whenever the
    /// selection becomes empty — suppression is scoped to the current
    /// planning session, not permanent per-ingredient memory.
    pub fn reset_suppression(&self) -> Result<()> {
        let mut state = self.lock();
        if state.suppressed.is_empty() {
            return Ok(());
        }
        state.suppressed.clear();
        self.persist_suppressed(&state)?;
        Ok(())
    }

    // ============================================================
    // Tabs
    // ============================================================

    pub fn tabs(&self) -> Vec<TabId> {
        self.lock().tabs.clone()
    }

    pub fn move_tab(&self, dragged: TabId, target: TabId) -> Result<Vec<TabId>> {
        let mut state = self.lock();
        move_tab(&mut state.tabs, dragged, target);
        self.persist_tabs(&state)?;
        Ok(state.tabs.clone())
    }

    // ============================================================
    // Suggestion key override
    // ============================================================

    pub fn manual_api_key(&self) -> Option<String> {
        self.lock().manual_api_key.clone()
    }

    // ============================================================
    // Shopping list
    // ============================================================

    /// Recompute the consolidated shopping list from a snapshot of the
    /// current state.
    pub fn shopping_list(&self) -> Aggregation {
        let state = self.lock();
        engine::aggregate(
            &state.meals,
            &state.selection,
            &state.manual_items,
            &state.suppressed,
        )
    }

    // ============================================================
    // Snapshot import / export
    // ============================================================

    pub fn export_snapshot(&self) -> Snapshot {
        let state = self.lock();
        Snapshot {
            meals: state.meals.clone(),
            selected_meals_config: state.selection.clone(),
            manual_shopping_items: state.manual_items.clone(),
            suppressed_item_keys: state.suppressed.clone(),
            tabs_order: Some(state.tabs.clone()),
            manual_api_key: state.manual_api_key.clone(),
        }
    }

    /// Validate a backup document and replace all current state wholesale.
    /// A rejected document leaves the current state untouched.
    pub fn import_snapshot(&self, text: &str) -> Result<(), SnapshotError> {
        let snapshot = Snapshot::parse(text)?;

        let mut state = self.lock();
        state.meals = snapshot.meals;
        state.selection = snapshot
            .selected_meals_config
            .into_iter()
            .filter(|(_, n)| *n > 0)
            .collect();
        state.manual_items = snapshot.manual_shopping_items;
        state.suppressed = snapshot.suppressed_item_keys;
        state.tabs = match snapshot.tabs_order {
            Some(saved) => TabId::restore_order(&saved),
            None => TabId::default_order(),
        };
        state.manual_api_key = snapshot.manual_api_key;
        sync_suppression(&mut state);

        self.persist_all(&state).map_err(SnapshotError::Persist)?;
        Ok(())
    }

    // ============================================================
    // Persistence
    // ============================================================

    fn persist_meals(&self, state: &PlannerState) -> Result<()> {
        self.db.put_json(KEY_MEALS, &state.meals)
    }

    fn persist_selection(&self, state: &PlannerState) -> Result<()> {
        self.db.put_json(KEY_SELECTION, &state.selection)
    }

    fn persist_manual_items(&self, state: &PlannerState) -> Result<()> {
        self.db.put_json(KEY_MANUAL_ITEMS, &state.manual_items)
    }

    fn persist_suppressed(&self, state: &PlannerState) -> Result<()> {
        self.db.put_json(KEY_SUPPRESSED, &state.suppressed)
    }

    fn persist_tabs(&self, state: &PlannerState) -> Result<()> {
        self.db.put_json(KEY_TABS, &state.tabs)
    }

    fn persist_all(&self, state: &PlannerState) -> Result<()> {
        self.persist_meals(state)?;
        self.persist_selection(state)?;
        self.persist_manual_items(state)?;
        self.persist_suppressed(state)?;
        self.persist_tabs(state)?;
        Ok(())
    }
}

/// Suppression is scoped to the current planning session: the moment no meal
/// is selected, the set is cleared. Returns whether anything changed.
fn sync_suppression(state: &mut PlannerState) -> bool {
    if state.selection.is_empty() && !state.suppressed.is_empty() {
        state.suppressed.clear();
        true
    } else {
        false
    }
}
