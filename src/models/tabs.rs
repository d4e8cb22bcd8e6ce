use serde::{Deserialize, Serialize};

/// Identifier for the three UI tabs. The tabs themselves are fixed; only
/// their order is user state (drag-to-reorder, persisted and exported).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TabId {
    Selected,
    Recipes,
    Shopping,
}

impl TabId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Selected => "selected",
            Self::Recipes => "recipes",
            Self::Shopping => "shopping",
        }
    }

    pub fn default_order() -> Vec<TabId> {
        vec![Self::Selected, Self::Recipes, Self::Shopping]
    }

    /// Rebuild a full tab order from a saved one: known ids keep their saved
    /// relative order, duplicates are dropped, and any tab missing from the
    /// saved list is appended in default order.
    pub fn restore_order(saved: &[TabId]) -> Vec<TabId> {
        let mut order = Vec::with_capacity(3);
        for id in saved {
            if !order.contains(id) {
                order.push(*id);
            }
        }
        for id in Self::default_order() {
            if !order.contains(&id) {
                order.push(id);
            }
        }
        order
    }
}

/// Move `dragged` to the position currently held by `target`, shifting the
/// tabs in between. No-op when either id is missing or they are equal.
pub fn move_tab(order: &mut Vec<TabId>, dragged: TabId, target: TabId) {
    if dragged == target {
        return;
    }
    let (Some(from), Some(to)) = (
        order.iter().position(|t| *t == dragged),
        order.iter().position(|t| *t == target),
    ) else {
        return;
    };
    let tab = order.remove(from);
    order.insert(to, tab);
}
