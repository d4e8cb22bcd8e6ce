use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use mealplan::engine::aggregate;
use mealplan::models::{Ingredient, ManualItem, Meal, Unit, MANUAL_ITEM_LABEL};
use speculate2::speculate;
use uuid::Uuid;

fn meal(name: &str, base_servings: u32, ingredients: Vec<Ingredient>) -> Meal {
    let now = Utc::now();
    Meal {
        id: Uuid::new_v4(),
        name: name.to_string(),
        ingredients,
        base_servings,
        created_at: now,
        updated_at: now,
    }
}

fn ingredient(name: &str, quantity: f64, unit: Unit) -> Ingredient {
    Ingredient {
        name: name.to_string(),
        quantity,
        unit,
    }
}

fn manual(name: &str, quantity: f64, unit: Unit) -> ManualItem {
    ManualItem {
        name: name.to_string(),
        quantity,
        unit,
    }
}

fn selection(pairs: &[(Uuid, u32)]) -> BTreeMap<Uuid, u32> {
    pairs.iter().copied().collect()
}

fn suppressed(keys: &[&str]) -> BTreeSet<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

speculate! {
    describe "scaling" {
        it "scales quantities by selected servings over base servings" {
            let pasta = meal("Pasta", 1, vec![ingredient("Flour", 100.0, Unit::Weight)]);
            let result = aggregate(
                &[pasta.clone()],
                &selection(&[(pasta.id, 4)]),
                &[],
                &suppressed(&[]),
            );

            assert_eq!(result.items.len(), 1);
            assert_eq!(result.items[0].name, "Flour");
            assert_eq!(result.items[0].quantity, 400.0);
            assert_eq!(result.items[0].unit, Unit::Weight);
            assert_eq!(result.items[0].from_meals, vec!["Pasta".to_string()]);
            assert!(result.malformed_meals.is_empty());
        }

        it "sums contributions across meals per the scaling formula" {
            let pasta = meal("Pasta", 4, vec![ingredient("Flour", 500.0, Unit::Weight)]);
            let bread = meal("Bread", 2, vec![ingredient("flour", 300.0, Unit::Weight)]);
            let result = aggregate(
                &[pasta.clone(), bread.clone()],
                &selection(&[(pasta.id, 2), (bread.id, 3)]),
                &[],
                &suppressed(&[]),
            );

            // 500/4*2 + 300/2*3
            assert_eq!(result.items.len(), 1);
            assert_eq!(result.items[0].quantity, 250.0 + 450.0);
            assert_eq!(
                result.items[0].from_meals,
                vec!["Pasta".to_string(), "Bread".to_string()]
            );
        }

        it "skips meals absent from the selection" {
            let pasta = meal("Pasta", 1, vec![ingredient("Flour", 100.0, Unit::Weight)]);
            let salad = meal("Salad", 1, vec![ingredient("Tomato", 2.0, Unit::Count)]);
            let result = aggregate(
                &[pasta, salad.clone()],
                &selection(&[(salad.id, 1)]),
                &[],
                &suppressed(&[]),
            );

            assert_eq!(result.items.len(), 1);
            assert_eq!(result.items[0].name, "Tomato");
        }

        it "treats a zero serving count as not selected" {
            let pasta = meal("Pasta", 1, vec![ingredient("Flour", 100.0, Unit::Weight)]);
            let result = aggregate(
                &[pasta.clone()],
                &selection(&[(pasta.id, 0)]),
                &[],
                &suppressed(&[]),
            );

            assert!(result.items.is_empty());
            assert!(result.malformed_meals.is_empty());
        }

        it "keeps zero and negative quantities without flooring" {
            let odd = meal(
                "Odd",
                1,
                vec![
                    ingredient("Nothing", 0.0, Unit::Weight),
                    ingredient("Debt", -50.0, Unit::Weight),
                ],
            );
            let result = aggregate(
                &[odd.clone()],
                &selection(&[(odd.id, 2)]),
                &[],
                &suppressed(&[]),
            );

            assert_eq!(result.items.len(), 2);
            assert_eq!(result.items[0].quantity, -100.0);
            assert_eq!(result.items[1].quantity, 0.0);
        }
    }

    describe "merging" {
        it "merges case-insensitively and keeps the first display name" {
            let pasta = meal("Pasta", 1, vec![ingredient("Flour", 100.0, Unit::Weight)]);
            let bread = meal("Bread", 1, vec![ingredient("FLOUR", 200.0, Unit::Weight)]);
            let result = aggregate(
                &[pasta.clone(), bread.clone()],
                &selection(&[(pasta.id, 1), (bread.id, 1)]),
                &[],
                &suppressed(&[]),
            );

            assert_eq!(result.items.len(), 1);
            assert_eq!(result.items[0].name, "Flour");
            assert_eq!(result.items[0].quantity, 300.0);
        }

        it "keeps identical names with different units on separate lines" {
            let soup = meal("Soup", 1, vec![ingredient("Tomato", 200.0, Unit::Weight)]);
            let juice = meal("Juice", 1, vec![ingredient("Tomato", 300.0, Unit::Volume)]);
            let result = aggregate(
                &[soup.clone(), juice.clone()],
                &selection(&[(soup.id, 1), (juice.id, 1)]),
                &[],
                &suppressed(&[]),
            );

            assert_eq!(result.items.len(), 2);
            let units: Vec<Unit> = result.items.iter().map(|i| i.unit).collect();
            assert!(units.contains(&Unit::Weight));
            assert!(units.contains(&Unit::Volume));
        }

        it "never produces two entries with the same merge key" {
            let a = meal(
                "A",
                2,
                vec![
                    ingredient("Flour", 100.0, Unit::Weight),
                    ingredient("Milk", 200.0, Unit::Volume),
                    ingredient("Egg", 2.0, Unit::Count),
                ],
            );
            let b = meal(
                "B",
                3,
                vec![
                    ingredient("flour", 50.0, Unit::Weight),
                    ingredient("MILK", 100.0, Unit::Volume),
                ],
            );
            let result = aggregate(
                &[a.clone(), b.clone()],
                &selection(&[(a.id, 2), (b.id, 6)]),
                &[manual("egg", 4.0, Unit::Count)],
                &suppressed(&[]),
            );

            let keys: BTreeSet<String> = result.items.iter().map(|i| i.merge_key()).collect();
            assert_eq!(keys.len(), result.items.len());
        }

        it "lists each contributor once in first-seen order" {
            let pasta = meal("Pasta", 1, vec![ingredient("Flour", 100.0, Unit::Weight)]);
            let result = aggregate(
                &[pasta.clone()],
                &selection(&[(pasta.id, 4)]),
                &[
                    manual("flour", 25.0, Unit::Weight),
                    manual("Flour", 25.0, Unit::Weight),
                ],
                &suppressed(&[]),
            );

            assert_eq!(result.items.len(), 1);
            assert_eq!(
                result.items[0].from_meals,
                vec!["Pasta".to_string(), MANUAL_ITEM_LABEL.to_string()]
            );
        }
    }

    describe "manual items" {
        it "merges a manual quantity into an existing recipe line" {
            let pasta = meal("Pasta", 1, vec![ingredient("Flour", 100.0, Unit::Weight)]);
            let result = aggregate(
                &[pasta.clone()],
                &selection(&[(pasta.id, 4)]),
                &[manual("flour", 50.0, Unit::Weight)],
                &suppressed(&[]),
            );

            assert_eq!(result.items.len(), 1);
            assert_eq!(result.items[0].quantity, 450.0);
            assert_eq!(
                result.items[0].from_meals,
                vec!["Pasta".to_string(), MANUAL_ITEM_LABEL.to_string()]
            );
        }

        it "creates standalone lines for unmatched manual items" {
            let result = aggregate(
                &[],
                &selection(&[]),
                &[manual("Sponges", 3.0, Unit::Count)],
                &suppressed(&[]),
            );

            assert_eq!(result.items.len(), 1);
            assert_eq!(result.items[0].name, "Sponges");
            assert_eq!(
                result.items[0].from_meals,
                vec![MANUAL_ITEM_LABEL.to_string()]
            );
        }
    }

    describe "suppression" {
        it "removes a suppressed key no matter how many sources contribute" {
            let pasta = meal("Pasta", 1, vec![ingredient("Flour", 100.0, Unit::Weight)]);
            let bread = meal("Bread", 1, vec![ingredient("flour", 200.0, Unit::Weight)]);
            let result = aggregate(
                &[pasta.clone(), bread.clone()],
                &selection(&[(pasta.id, 1), (bread.id, 1)]),
                &[manual("FLOUR", 10.0, Unit::Weight)],
                &suppressed(&["flour_g"]),
            );

            assert!(result.items.is_empty());
        }

        it "leaves other units of the same name alone" {
            let soup = meal(
                "Soup",
                1,
                vec![
                    ingredient("Tomato", 200.0, Unit::Weight),
                    ingredient("Tomato", 100.0, Unit::Volume),
                ],
            );
            let result = aggregate(
                &[soup.clone()],
                &selection(&[(soup.id, 1)]),
                &[],
                &suppressed(&["tomato_g"]),
            );

            assert_eq!(result.items.len(), 1);
            assert_eq!(result.items[0].unit, Unit::Volume);
        }
    }

    describe "ordering" {
        it "sorts case-insensitively by name" {
            let mixed = meal(
                "Mixed",
                1,
                vec![
                    ingredient("banana", 1.0, Unit::Count),
                    ingredient("Apple", 2.0, Unit::Count),
                    ingredient("cherry", 3.0, Unit::Count),
                ],
            );
            let result = aggregate(
                &[mixed.clone()],
                &selection(&[(mixed.id, 1)]),
                &[],
                &suppressed(&[]),
            );

            let names: Vec<&str> = result.items.iter().map(|i| i.name.as_str()).collect();
            assert_eq!(names, vec!["Apple", "banana", "cherry"]);
        }
    }

    describe "malformed meals" {
        it "skips selected meals with zero base servings and reports them" {
            let broken = meal("Broken", 0, vec![ingredient("Flour", 100.0, Unit::Weight)]);
            let pasta = meal("Pasta", 1, vec![ingredient("Flour", 100.0, Unit::Weight)]);
            let result = aggregate(
                &[broken.clone(), pasta.clone()],
                &selection(&[(broken.id, 2), (pasta.id, 1)]),
                &[],
                &suppressed(&[]),
            );

            assert_eq!(result.malformed_meals, vec![broken.id]);
            assert_eq!(result.items.len(), 1);
            assert_eq!(result.items[0].quantity, 100.0);
            assert!(result.items[0].quantity.is_finite());
        }

        it "does not flag unselected meals with zero base servings" {
            let broken = meal("Broken", 0, vec![ingredient("Flour", 100.0, Unit::Weight)]);
            let result = aggregate(&[broken], &selection(&[]), &[], &suppressed(&[]));

            assert!(result.malformed_meals.is_empty());
        }
    }

    describe "determinism" {
        it "yields deep-equal output for identical inputs" {
            let pasta = meal("Pasta", 2, vec![ingredient("Flour", 250.0, Unit::Weight)]);
            let bread = meal("Bread", 4, vec![ingredient("flour", 500.0, Unit::Weight)]);
            let meals = [pasta.clone(), bread.clone()];
            let sel = selection(&[(pasta.id, 3), (bread.id, 2)]);
            let manual_items = [manual("Yeast", 10.0, Unit::Weight)];
            let keys = suppressed(&[]);

            let first = aggregate(&meals, &sel, &manual_items, &keys);
            let second = aggregate(&meals, &sel, &manual_items, &keys);
            assert_eq!(first, second);
        }
    }
}
