//! Resource requirement calculator
//!
//! Expands selections into requirement trees, flattens the trees and merges
//! the nodes into one total per resource.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::models::{ItemInfo, MergedResource, RequirementNode, Selection};
use crate::progress;

/// Joins path segments inside a path id. Never part of a catalog id.
pub const PATH_SEPARATOR: char = '\u{1f}';

/// Joins a resource id and its occurrence number when siblings repeat an id
pub const OCCURRENCE_SEPARATOR: char = '\u{1e}';

/// Build the requirement tree for `requested` units of `resource_id`.
///
/// Children follow the recipe's declared ingredient order and carry
/// `ingredient.count * requested`. Resources without a recipe become leaves.
/// A resource that already appears on the path above it is cut into a leaf
/// with `cycle` set.
pub fn build_requirement_tree(
    resource_id: &str,
    requested: u64,
    catalog: &Catalog,
    parent_path: Option<&str>,
) -> RequirementNode {
    let mut ancestors: Vec<String> = parent_path
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.split(PATH_SEPARATOR)
                .map(|segment| segment_resource_id(segment).to_string())
                .collect()
        })
        .unwrap_or_default();

    let path_id = join_path(parent_path, resource_id);
    expand(resource_id, requested, catalog, path_id, &mut ancestors)
}

/// Build one tree per selection, in selection order
pub fn build_forest(selections: &[Selection], catalog: &Catalog) -> Vec<RequirementNode> {
    let mut seen = HashMap::new();
    let forest: Vec<RequirementNode> = selections
        .iter()
        .map(|selection| {
            let path_id = unique_segment(&selection.resource_id, &mut seen);
            expand(
                &selection.resource_id,
                selection.count,
                catalog,
                path_id,
                &mut Vec::new(),
            )
        })
        .collect();

    debug!(roots = forest.len(), "built requirement forest");
    forest
}

fn expand(
    resource_id: &str,
    requested: u64,
    catalog: &Catalog,
    path_id: String,
    ancestors: &mut Vec<String>,
) -> RequirementNode {
    if ancestors.iter().any(|a| a == resource_id) {
        warn!(
            resource = resource_id,
            path = %readable_path(&path_id),
            "recipe cycle in catalog, treating resource as raw"
        );
        return RequirementNode {
            cycle: true,
            ..leaf(resource_id, requested, catalog, path_id)
        };
    }

    let Some(recipe) = catalog.recipe_for(resource_id) else {
        return leaf(resource_id, requested, catalog, path_id);
    };

    ancestors.push(resource_id.to_string());
    let mut seen = HashMap::new();
    let mut children = Vec::with_capacity(recipe.ingredients().len());
    for ingredient in recipe.ingredients() {
        let segment = unique_segment(&ingredient.resource_id, &mut seen);
        children.push(expand(
            &ingredient.resource_id,
            ingredient.count.saturating_mul(requested),
            catalog,
            join_path(Some(path_id.as_str()), &segment),
            ancestors,
        ));
    }
    ancestors.pop();

    RequirementNode {
        path_id,
        resource_id: resource_id.to_string(),
        required: requested,
        info: named(recipe.info.clone(), resource_id),
        recipe: recipe.recipe_meta().cloned(),
        cycle: false,
        children,
    }
}

fn leaf(resource_id: &str, requested: u64, catalog: &Catalog, path_id: String) -> RequirementNode {
    let info = catalog
        .ingredient_info(resource_id)
        .map(|ingredient| ingredient.info.clone())
        .unwrap_or_default();

    RequirementNode {
        path_id,
        resource_id: resource_id.to_string(),
        required: requested,
        info: named(info, resource_id),
        recipe: None,
        cycle: false,
        children: Vec::new(),
    }
}

fn named(mut info: ItemInfo, resource_id: &str) -> ItemInfo {
    if info.name.is_empty() {
        info.name = resource_id.to_string();
    }
    info
}

fn join_path(parent: Option<&str>, segment: &str) -> String {
    match parent {
        Some(parent) if !parent.is_empty() => format!("{parent}{PATH_SEPARATOR}{segment}"),
        _ => segment.to_string(),
    }
}

/// First occurrence keeps the bare id, repeats get `id<sep>2`, `id<sep>3`, ...
fn unique_segment(resource_id: &str, seen: &mut HashMap<String, usize>) -> String {
    let n = seen.entry(resource_id.to_string()).or_insert(0);
    *n += 1;
    if *n == 1 {
        resource_id.to_string()
    } else {
        format!("{resource_id}{OCCURRENCE_SEPARATOR}{n}")
    }
}

fn segment_resource_id(segment: &str) -> &str {
    segment.split(OCCURRENCE_SEPARATOR).next().unwrap_or(segment)
}

/// Render a path id for humans, e.g. `sword > iron-ingot > iron-ore`
pub fn readable_path(path_id: &str) -> String {
    path_id
        .split(PATH_SEPARATOR)
        .map(|segment| segment.replace(OCCURRENCE_SEPARATOR, "#"))
        .collect::<Vec<_>>()
        .join(" > ")
}

/// Pre-order list of every node in the forest
pub fn flatten(forest: &[RequirementNode]) -> Vec<&RequirementNode> {
    fn traverse<'a>(node: &'a RequirementNode, out: &mut Vec<&'a RequirementNode>) {
        out.push(node);
        for child in &node.children {
            traverse(child, out);
        }
    }

    let mut result = Vec::new();
    for root in forest {
        traverse(root, &mut result);
    }
    result
}

/// Merge nodes sharing a resource id into one total.
///
/// Output order is first occurrence; display fields come from the first node
/// seen for each resource.
pub fn merge(nodes: &[&RequirementNode]) -> Vec<MergedResource> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut merged: Vec<MergedResource> = Vec::new();

    for node in nodes {
        match index.get(node.resource_id.as_str()) {
            Some(&i) => {
                merged[i].total_required = merged[i].total_required.saturating_add(node.required);
            }
            None => {
                index.insert(&node.resource_id, merged.len());
                merged.push(MergedResource {
                    resource_id: node.resource_id.clone(),
                    total_required: node.required,
                    info: node.info.clone(),
                    recipe: node.recipe.clone(),
                });
            }
        }
    }

    merged
}

/// Format a requirement tree as an indented outline.
///
/// `allocated` maps path ids to the collected amount credited to that node.
pub fn format_tree(
    node: &RequirementNode,
    allocated: &HashMap<String, u64>,
    indent: usize,
) -> String {
    let mut output = String::new();
    let prefix = "  ".repeat(indent);
    let have = allocated.get(&node.path_id).copied().unwrap_or(0);
    let mark = if progress::node_complete(node, allocated) { "[x]" } else { "[ ]" };

    output.push_str(&format!(
        "{}{} {}x {} ({}/{})",
        prefix, mark, node.required, node.info.name, have, node.required
    ));
    if node.cycle {
        output.push_str(" (cycle, not expanded)");
    }
    output.push('\n');

    for child in &node.children {
        output.push_str(&format_tree(child, allocated, indent + 1));
    }

    output
}
