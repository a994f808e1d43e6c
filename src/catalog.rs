//! Catalog loading and lookup
//!
//! Reads recipe records from JSON files, applies the defaulting pass once at
//! load time and indexes the result by entry id, output resource and
//! ingredient id.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::models::{CatalogEntry, EntryKind, Ingredient, ItemInfo, RecipeMeta, Selection};

/// Small catalog bundled with the binary, written out by `init`
pub const SAMPLE_CATALOG: &str = include_str!("../data/sample_catalog.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no catalog files found in {0}")]
    Empty(PathBuf),
}

/// Treat an explicit JSON `null` the same as a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawCraftItem {
    #[serde(deserialize_with = "nullable")]
    original_res_id: String,
    #[serde(deserialize_with = "nullable")]
    count: u64,
    #[serde(deserialize_with = "nullable")]
    id: String,
    #[serde(deserialize_with = "nullable")]
    type_element: String,
    #[serde(deserialize_with = "nullable")]
    name: String,
    #[serde(deserialize_with = "nullable")]
    weight: f64,
    #[serde(deserialize_with = "nullable")]
    icon: String,
    #[serde(deserialize_with = "nullable")]
    price: f64,
    #[serde(deserialize_with = "nullable")]
    desc: String,
    grade: Option<String>,
    need_exp: Option<u64>,
    craft_recipe: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawRecipe {
    #[serde(deserialize_with = "nullable")]
    id: String,
    #[serde(deserialize_with = "nullable")]
    type_element: String,
    #[serde(deserialize_with = "nullable")]
    name: String,
    #[serde(deserialize_with = "nullable")]
    weight: f64,
    #[serde(deserialize_with = "nullable")]
    icon: String,
    #[serde(deserialize_with = "nullable")]
    price: f64,
    #[serde(deserialize_with = "nullable")]
    desc: String,
    #[serde(deserialize_with = "nullable")]
    is_recipe: bool,
    #[serde(deserialize_with = "nullable")]
    craft_elem: String,
    #[serde(deserialize_with = "nullable")]
    craft_recipe: String,
    #[serde(deserialize_with = "nullable")]
    craft_recipe_type: String,
    #[serde(deserialize_with = "nullable")]
    craft_chance: f64,
    #[serde(deserialize_with = "nullable")]
    craft_min_lvl: u32,
    #[serde(deserialize_with = "nullable")]
    craft_items: Vec<RawCraftItem>,
    grade: Option<String>,
    count: Option<u64>,
    craft_price: Option<f64>,
    craft_elem_icon: Option<String>,
    author_service: Option<String>,
}

impl From<RawCraftItem> for Ingredient {
    fn from(raw: RawCraftItem) -> Self {
        Ingredient {
            resource_id: raw.id,
            original_id: raw.original_res_id,
            count: raw.count,
            info: ItemInfo {
                name: raw.name,
                icon: raw.icon,
                description: raw.desc,
                type_element: raw.type_element,
                grade: raw.grade,
                weight: raw.weight,
                price: raw.price,
                need_exp: raw.need_exp,
            },
            craft_recipe: raw.craft_recipe,
        }
    }
}

impl From<RawRecipe> for CatalogEntry {
    fn from(raw: RawRecipe) -> Self {
        let info = ItemInfo {
            name: raw.name,
            icon: raw.icon,
            description: raw.desc,
            type_element: raw.type_element,
            grade: raw.grade,
            weight: raw.weight,
            price: raw.price,
            need_exp: None,
        };

        let kind = if raw.is_recipe || !raw.craft_elem.is_empty() {
            EntryKind::Recipe {
                output: raw.craft_elem,
                ingredients: raw.craft_items.into_iter().map(Ingredient::from).collect(),
                meta: RecipeMeta {
                    recipe: raw.craft_recipe,
                    recipe_type: raw.craft_recipe_type,
                    chance: raw.craft_chance,
                    min_level: raw.craft_min_lvl,
                    craft_price: raw.craft_price,
                    output_icon: raw.craft_elem_icon,
                    author_service: raw.author_service,
                },
                count: raw.count.unwrap_or(1),
            }
        } else {
            EntryKind::RawResource
        };

        CatalogEntry {
            id: raw.id,
            info,
            kind,
        }
    }
}

/// Parse a JSON array of recipe records into typed catalog entries
pub fn parse_entries(content: &str) -> Result<Vec<CatalogEntry>, serde_json::Error> {
    let raw: Vec<RawRecipe> = serde_json::from_str(content)?;
    Ok(raw.into_iter().map(CatalogEntry::from).collect())
}

/// Find every `.json` file below `dir`, in sorted path order
pub fn find_catalog_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

fn load_file(path: &Path) -> Result<Vec<CatalogEntry>, CatalogError> {
    let content = fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let entries = parse_entries(&content).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), entries = entries.len(), "loaded catalog file");
    Ok(entries)
}

/// Read-only recipe and item table, indexed for the lookups the engine needs.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    by_id: HashMap<String, usize>,
    by_output: HashMap<String, usize>,
    ingredient_by_id: HashMap<String, (usize, usize)>,
}

impl Catalog {
    /// Build a catalog. On duplicate keys the first entry wins.
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        let mut by_id = HashMap::new();
        let mut by_output = HashMap::new();
        let mut ingredient_by_id = HashMap::new();

        for (idx, entry) in entries.iter().enumerate() {
            if by_id.contains_key(&entry.id) {
                warn!(id = %entry.id, "duplicate catalog id, keeping the first entry");
            } else {
                by_id.insert(entry.id.clone(), idx);
            }

            if let Some(output) = entry.output() {
                by_output.entry(output.to_string()).or_insert(idx);
            }

            for (pos, ingredient) in entry.ingredients().iter().enumerate() {
                ingredient_by_id
                    .entry(ingredient.resource_id.clone())
                    .or_insert((idx, pos));
            }
        }

        Self {
            entries,
            by_id,
            by_output,
            ingredient_by_id,
        }
    }

    /// Parse a catalog from a JSON string
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(parse_entries(content)?))
    }

    /// Load a catalog from a JSON file, or from every JSON file in a directory
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        if !path.is_dir() {
            return Ok(Self::new(load_file(path)?));
        }

        let files = find_catalog_files(path);
        if files.is_empty() {
            return Err(CatalogError::Empty(path.to_path_buf()));
        }

        let mut entries = Vec::new();
        for file in &files {
            entries.extend(load_file(file)?);
        }
        debug!(files = files.len(), entries = entries.len(), "loaded catalog directory");
        Ok(Self::new(entries))
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All recipe entries in catalog order
    pub fn recipes(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().filter(|e| e.is_recipe())
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.by_id.get(id).map(|&idx| &self.entries[idx])
    }

    /// The first recipe whose output is `resource_id`
    pub fn recipe_for(&self, resource_id: &str) -> Option<&CatalogEntry> {
        self.by_output.get(resource_id).map(|&idx| &self.entries[idx])
    }

    /// The first ingredient record anywhere in the catalog referencing `resource_id`
    pub fn ingredient_info(&self, resource_id: &str) -> Option<&Ingredient> {
        self.ingredient_by_id
            .get(resource_id)
            .map(|&(idx, pos)| &self.entries[idx].ingredients()[pos])
    }

    /// Turn persisted recipe ids into engine selections.
    ///
    /// The multiplier comes from `counts` when present, otherwise from the
    /// recipe's own default count. Ids that are not recipes in this catalog
    /// are passed through as-is and expand to a single leaf.
    pub fn selections(
        &self,
        recipe_ids: &[String],
        counts: &HashMap<String, u64>,
    ) -> Vec<Selection> {
        recipe_ids
            .iter()
            .map(|id| match self.get(id).filter(|e| e.is_recipe()) {
                Some(entry) => Selection::new(
                    entry.output().unwrap_or(id),
                    counts.get(id).copied().unwrap_or_else(|| entry.default_count()),
                ),
                None => {
                    warn!(id = %id, "selected recipe is not in the catalog");
                    Selection::new(id.clone(), counts.get(id).copied().unwrap_or(1))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"[
        {
            "id": "r-sword",
            "name": "Sword",
            "isRecipe": true,
            "craftElem": "sword",
            "craftChance": 75,
            "craftMinLvl": 3,
            "count": 2,
            "craftItems": [
                { "id": "iron-ingot", "count": 2, "name": "Iron Ingot" },
                { "id": "wood-handle", "count": 1, "name": "Wood Handle", "grade": "B" }
            ]
        },
        {
            "id": "r-ingot",
            "name": "Iron Ingot",
            "craftElem": "iron-ingot",
            "craftItems": [ { "id": "iron-ore", "count": 3, "name": "Iron Ore", "needExp": 10 } ]
        },
        { "id": "stone", "name": "Stone", "desc": null, "weight": null }
    ]"#;

    #[test]
    fn parses_and_classifies_entries() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.recipes().count(), 2);

        let sword = catalog.get("r-sword").unwrap();
        assert_eq!(sword.output(), Some("sword"));
        assert_eq!(sword.default_count(), 2);
        assert_eq!(sword.recipe_meta().unwrap().min_level, 3);

        // craftElem alone marks a recipe even without isRecipe
        assert!(catalog.get("r-ingot").unwrap().is_recipe());
        assert_eq!(catalog.get("r-ingot").unwrap().default_count(), 1);

        let stone = catalog.get("stone").unwrap();
        assert!(!stone.is_recipe());
        assert_eq!(stone.info.description, "");
        assert_eq!(stone.info.weight, 0.0);
    }

    #[test]
    fn lookups_by_output_and_ingredient() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.recipe_for("iron-ingot").unwrap().id, "r-ingot");
        assert!(catalog.recipe_for("iron-ore").is_none());

        let ore = catalog.ingredient_info("iron-ore").unwrap();
        assert_eq!(ore.info.name, "Iron Ore");
        assert_eq!(ore.info.need_exp, Some(10));
        assert_eq!(
            catalog.ingredient_info("wood-handle").unwrap().info.grade.as_deref(),
            Some("B")
        );
        assert!(catalog.ingredient_info("gold").is_none());
    }

    #[test]
    fn first_entry_wins_on_duplicate_output() {
        let catalog = Catalog::from_json(
            r#"[
                { "id": "a", "craftElem": "plank",
                  "craftItems": [ { "id": "log", "count": 1 } ] },
                { "id": "b", "craftElem": "plank",
                  "craftItems": [ { "id": "bamboo", "count": 4 } ] }
            ]"#,
        )
        .unwrap();
        assert_eq!(catalog.recipe_for("plank").unwrap().id, "a");
    }

    #[test]
    fn selections_use_override_then_default_count() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        let ids = vec!["r-sword".to_string(), "r-ingot".to_string(), "ghost".to_string()];
        let mut counts = HashMap::new();
        counts.insert("r-ingot".to_string(), 5);

        let selections = catalog.selections(&ids, &counts);
        assert_eq!(
            selections,
            vec![
                Selection::new("sword", 2),
                Selection::new("iron-ingot", 5),
                Selection::new("ghost", 1),
            ]
        );
    }

    #[test]
    fn sample_catalog_parses() {
        let catalog = Catalog::from_json(SAMPLE_CATALOG).unwrap();
        assert!(catalog.recipes().count() > 0);
    }

    #[test]
    fn loads_directory_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("b.json"),
            r#"[{ "id": "r2", "craftElem": "x", "craftItems": [] }]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("nested").join("c.json"),
            r#"[{ "id": "r3", "craftElem": "y" }]"#,
        )
        .unwrap();
        fs::write(dir.path().join("a.json"), r#"[{ "id": "r1", "craftElem": "x" }]"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let catalog = Catalog::load(dir.path()).unwrap();
        let ids: Vec<_> = catalog.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["r1", "r2", "r3"]);
        assert_eq!(catalog.recipe_for("x").unwrap().id, "r1");
    }

    #[test]
    fn load_reports_typed_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Catalog::load(dir.path()),
            Err(CatalogError::Empty(_))
        ));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(Catalog::load(&bad), Err(CatalogError::Parse { .. })));

        assert!(matches!(
            Catalog::load(&dir.path().join("missing.json")),
            Err(CatalogError::Read { .. })
        ));
    }
}
