//! Catalog builders shared by the unit tests

use crate::catalog::Catalog;
use crate::models::{CatalogEntry, EntryKind, Ingredient, ItemInfo, RecipeMeta};

pub fn ingredient(id: &str, count: u64) -> Ingredient {
    Ingredient {
        resource_id: id.to_string(),
        original_id: String::new(),
        count,
        info: ItemInfo {
            name: format!("{id} (item)"),
            ..ItemInfo::default()
        },
        craft_recipe: None,
    }
}

pub fn recipe(id: &str, output: &str, ingredients: Vec<Ingredient>) -> CatalogEntry {
    CatalogEntry {
        id: id.to_string(),
        info: ItemInfo {
            name: format!("{output} (recipe)"),
            ..ItemInfo::default()
        },
        kind: EntryKind::Recipe {
            output: output.to_string(),
            ingredients,
            meta: RecipeMeta::default(),
            count: 1,
        },
    }
}

/// Sword needs 2 iron ingots and a wood handle; an ingot needs 3 iron ore
pub fn sword_catalog() -> Catalog {
    Catalog::new(vec![
        recipe(
            "r-sword",
            "sword",
            vec![ingredient("iron-ingot", 2), ingredient("wood-handle", 1)],
        ),
        recipe("r-ingot", "iron-ingot", vec![ingredient("iron-ore", 3)]),
    ])
}
