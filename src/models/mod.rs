//! Domain models for the meal planner.
//!
//! # Core Concepts
//!
//! ## Long-lived entities
//!
//! - [`Meal`]: A cataloged recipe whose ingredient quantities are relative to
//!   its `base_servings`.
//! - [`ManualItem`]: A shopping-list entry typed in directly by the user, not
//!   derived from any meal.
//! - [`TabId`]: Identifier for the re-orderable UI tabs; only the order is
//!   state, the tabs themselves are fixed.
//!
//! ## Ephemeral values
//!
//! - [`AggregatedIngredient`]: One line of the consolidated shopping list.
//!   Recomputed in full from the stores on every read, never mutated in place
//!   and never persisted.
//! - [`Snapshot`]: The import/export document bundling every store into one
//!   JSON backup.
//!
//! Shopping-list lines are identified by a *merge key* — the lowercased
//! ingredient name joined with the unit (see [`merge_key`]). Two lines merge
//! exactly when their keys are equal; the same key format drives suppression.

mod ingredient;
mod meal;
mod shopping;
mod snapshot;
mod tabs;

pub use ingredient::*;
pub use meal::*;
pub use shopping::*;
pub use snapshot::*;
pub use tabs::*;
