//! Data models for catalog entries, selections and requirement trees

use std::collections::HashMap;

/// Collected amount per raw resource id, as persisted by the state store.
pub type Collected = HashMap<String, u64>;

/// Display fields shared by catalog entries, ingredients and tree nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemInfo {
    pub name: String,
    pub icon: String,
    pub description: String,
    pub type_element: String,
    pub grade: Option<String>,
    pub weight: f64,
    pub price: f64,
    pub need_exp: Option<u64>,
}

/// One line of a recipe: `count` units of `resource_id` per single craft.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingredient {
    pub resource_id: String,
    pub original_id: String,
    pub count: u64,
    pub info: ItemInfo,
    pub craft_recipe: Option<String>,
}

/// Recipe-only metadata. Not used by aggregation, carried for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeMeta {
    pub recipe: String,
    pub recipe_type: String,
    pub chance: f64,
    pub min_level: u32,
    pub craft_price: Option<f64>,
    pub output_icon: Option<String>,
    pub author_service: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryKind {
    Recipe {
        output: String, // the craft element this recipe produces
        ingredients: Vec<Ingredient>,
        meta: RecipeMeta,
        count: u64, // default number of crafts when selected
    },
    RawResource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: String,
    pub info: ItemInfo,
    pub kind: EntryKind,
}

impl CatalogEntry {
    pub fn is_recipe(&self) -> bool {
        matches!(self.kind, EntryKind::Recipe { .. })
    }

    /// Output resource id, if this entry is a recipe
    pub fn output(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::Recipe { output, .. } => Some(output),
            EntryKind::RawResource => None,
        }
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        match &self.kind {
            EntryKind::Recipe { ingredients, .. } => ingredients,
            EntryKind::RawResource => &[],
        }
    }

    pub fn recipe_meta(&self) -> Option<&RecipeMeta> {
        match &self.kind {
            EntryKind::Recipe { meta, .. } => Some(meta),
            EntryKind::RawResource => None,
        }
    }

    pub fn default_count(&self) -> u64 {
        match &self.kind {
            EntryKind::Recipe { count, .. } => *count,
            EntryKind::RawResource => 1,
        }
    }
}

/// A request to craft `count` units of the recipe producing `resource_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub resource_id: String,
    pub count: u64,
}

impl Selection {
    pub fn new(resource_id: impl Into<String>, count: u64) -> Self {
        Self {
            resource_id: resource_id.into(),
            count,
        }
    }
}

/// One node of an expanded requirement tree.
///
/// Rebuilt on every aggregation call. `path_id` is unique within one forest,
/// `resource_id` may repeat across nodes and is the key used for merging.
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementNode {
    pub path_id: String,
    pub resource_id: String,
    pub required: u64,
    pub info: ItemInfo,
    pub recipe: Option<RecipeMeta>,
    pub cycle: bool, // branch cut by the cycle guard
    pub children: Vec<RequirementNode>,
}

impl RequirementNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Total requirement for one distinct resource across a whole forest
#[derive(Debug, Clone, PartialEq)]
pub struct MergedResource {
    pub resource_id: String,
    pub total_required: u64,
    pub info: ItemInfo,
    pub recipe: Option<RecipeMeta>,
}
