use std::fmt;

use serde::{Deserialize, Serialize};

/// Measurement unit for an ingredient quantity.
///
/// The set is closed on purpose: no conversion between units is ever
/// performed, so two quantities are only combinable when their units are
/// identical. "Water, 500 ml" and "water, 2 unit" stay separate lines.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Unit {
    /// Grams.
    #[serde(rename = "g")]
    Weight,
    /// Milliliters.
    #[serde(rename = "ml")]
    Volume,
    /// Discrete pieces (eggs, onions, ...).
    #[serde(rename = "unit")]
    Count,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weight => "g",
            Self::Volume => "ml",
            Self::Count => "unit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "g" => Some(Self::Weight),
            "ml" => Some(Self::Volume),
            "unit" => Some(Self::Count),
            _ => None,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recipe ingredient.
///
/// `quantity` is relative to the owning meal's `base_servings`. Name
/// comparison for merging is case-insensitive; the display casing of the
/// first occurrence encountered is the one retained.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
}

impl Ingredient {
    pub fn merge_key(&self) -> String {
        merge_key(&self.name, self.unit)
    }
}

/// Composite key identifying mergeable shopping-list lines: lowercased name
/// joined with the unit, e.g. `flour_g`. Suppression entries use the same
/// format.
pub fn merge_key(name: &str, unit: Unit) -> String {
    format!("{}_{}", name.to_lowercase(), unit.as_str())
}

/// Format a quantity for user-facing text: round to two decimals, strip
/// trailing zeros (`400`, `12.5`, `0.33`). Internal arithmetic stays
/// unrounded; this is presentation only.
pub fn format_quantity(quantity: f64) -> String {
    let rounded = format!("{quantity:.2}");
    rounded
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_key_lowercases_name_and_appends_unit() {
        assert_eq!(merge_key("Flour", Unit::Weight), "flour_g");
        assert_eq!(merge_key("Olive Oil", Unit::Volume), "olive oil_ml");
        assert_eq!(merge_key("Egg", Unit::Count), "egg_unit");
    }

    #[test]
    fn format_quantity_strips_trailing_zeros() {
        assert_eq!(format_quantity(400.0), "400");
        assert_eq!(format_quantity(12.5), "12.5");
        assert_eq!(format_quantity(0.33333), "0.33");
        assert_eq!(format_quantity(2.05), "2.05");
    }

    #[test]
    fn unit_round_trips_through_str() {
        for unit in [Unit::Weight, Unit::Volume, Unit::Count] {
            assert_eq!(Unit::from_str(unit.as_str()), Some(unit));
        }
        assert_eq!(Unit::from_str("cup"), None);
    }
}
