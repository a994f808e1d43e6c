//! Persistent tracker state
//!
//! A small key-value table in SQLite. Values are stored as JSON and every
//! read supplies the default to use when the key is absent.

use std::collections::HashMap;

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::Collected;

/// Ordered list of selected recipe ids
pub const SELECTED_RECIPES: &str = "selectedRecipes";
/// Craft multiplier per selected recipe id, when it differs from the catalog default
pub const SELECTION_COUNTS: &str = "selectionCounts";
/// Collected amount per raw resource id
pub const COLLECTED_RESOURCES: &str = "collectedResources";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("stored value for '{key}' is not valid: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode value for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// Read a value, falling back to `default` when the key has never been set
pub fn get<T: DeserializeOwned>(conn: &Connection, key: &str, default: T) -> Result<T> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM state WHERE key = ?1", [key], |row| row.get(0))
        .optional()?;

    match raw {
        Some(json) => serde_json::from_str(&json).map_err(|source| StoreError::Decode {
            key: key.to_string(),
            source,
        }),
        None => Ok(default),
    }
}

/// Replace the stored value for `key`
pub fn set<T: Serialize>(conn: &Connection, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value).map_err(|source| StoreError::Encode {
        key: key.to_string(),
        source,
    })?;
    conn.execute(
        "INSERT OR REPLACE INTO state (key, value) VALUES (?1, ?2)",
        (key, &json),
    )?;
    debug!(key, "stored state value");
    Ok(())
}

/// Remove every stored value
pub fn clear_state(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM state", [])?;
    info!("cleared tracker state");
    Ok(())
}

pub fn selected_recipes(conn: &Connection) -> Result<Vec<String>> {
    get(conn, SELECTED_RECIPES, Vec::new())
}

/// Append a recipe id to the selection. Returns false if it was already selected.
pub fn select_recipe(conn: &Connection, recipe_id: &str) -> Result<bool> {
    let mut selected = selected_recipes(conn)?;
    if selected.iter().any(|id| id == recipe_id) {
        return Ok(false);
    }
    selected.push(recipe_id.to_string());
    set(conn, SELECTED_RECIPES, &selected)?;
    info!(recipe = recipe_id, "selected recipe");
    Ok(true)
}

/// Remove a recipe id and its multiplier. Returns false if it was not selected.
///
/// Both keys change in one transaction, so a failure leaves the selection intact.
pub fn unselect_recipe(conn: &Connection, recipe_id: &str) -> Result<bool> {
    let tx = conn.unchecked_transaction()?;
    let mut selected = selected_recipes(&tx)?;
    let before = selected.len();
    selected.retain(|id| id != recipe_id);
    if selected.len() == before {
        return Ok(false);
    }
    set(&tx, SELECTED_RECIPES, &selected)?;

    let mut counts = selection_counts(&tx)?;
    if counts.remove(recipe_id).is_some() {
        set(&tx, SELECTION_COUNTS, &counts)?;
    }
    tx.commit()?;
    info!(recipe = recipe_id, "unselected recipe");
    Ok(true)
}

pub fn selection_counts(conn: &Connection) -> Result<HashMap<String, u64>> {
    get(conn, SELECTION_COUNTS, HashMap::new())
}

pub fn set_selection_count(conn: &Connection, recipe_id: &str, count: u64) -> Result<()> {
    let mut counts = selection_counts(conn)?;
    counts.insert(recipe_id.to_string(), count);
    set(conn, SELECTION_COUNTS, &counts)
}

pub fn collected_resources(conn: &Connection) -> Result<Collected> {
    get(conn, COLLECTED_RESOURCES, Collected::new())
}

/// Record the collected amount for one resource, replacing any previous value
pub fn set_collected(conn: &Connection, resource_id: &str, count: u64) -> Result<()> {
    let mut collected = collected_resources(conn)?;
    collected.insert(resource_id.to_string(), count);
    set(conn, COLLECTED_RESOURCES, &collected)?;
    info!(resource = resource_id, count, "updated collected amount");
    Ok(())
}
