//! Collection progress against a calculated plan

use std::collections::HashMap;

use crate::models::{Collected, MergedResource, RequirementNode};

/// Collected versus required for one merged resource
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceProgress<'a> {
    pub resource: &'a MergedResource,
    pub collected: u64,
}

impl ResourceProgress<'_> {
    pub fn required(&self) -> u64 {
        self.resource.total_required
    }

    pub fn remaining(&self) -> u64 {
        self.required().saturating_sub(self.collected)
    }

    pub fn is_complete(&self) -> bool {
        self.collected >= self.required()
    }
}

pub fn progress<'a>(
    merged: &'a [MergedResource],
    collected: &Collected,
) -> Vec<ResourceProgress<'a>> {
    merged
        .iter()
        .map(|resource| ResourceProgress {
            resource,
            collected: collected.get(&resource.resource_id).copied().unwrap_or(0),
        })
        .collect()
}

/// Resources that still need collecting, in plan order
pub fn remaining<'a>(
    merged: &'a [MergedResource],
    collected: &Collected,
) -> Vec<ResourceProgress<'a>> {
    progress(merged, collected)
        .into_iter()
        .filter(|p| !p.is_complete())
        .collect()
}

/// Credit collected amounts to individual tree nodes.
///
/// Each resource's collected amount is handed out to its nodes in pre-order,
/// each node taking up to its own requirement. The result is keyed by path id.
pub fn allocate(nodes: &[&RequirementNode], collected: &Collected) -> HashMap<String, u64> {
    let mut pool: HashMap<&str, u64> = HashMap::new();
    let mut allocated = HashMap::with_capacity(nodes.len());

    for node in nodes {
        let left = pool
            .entry(node.resource_id.as_str())
            .or_insert_with(|| collected.get(&node.resource_id).copied().unwrap_or(0));
        let take = (*left).min(node.required);
        *left -= take;
        allocated.insert(node.path_id.clone(), take);
    }

    allocated
}

/// Whether a tree node has been credited its full requirement by [`allocate`]
pub fn node_complete(node: &RequirementNode, allocated: &HashMap<String, u64>) -> bool {
    allocated.get(&node.path_id).copied().unwrap_or(0) >= node.required
}

/// Summary of a plan and its collection progress
#[derive(Debug)]
pub struct PlanSummary {
    pub selections: usize,
    pub nodes: usize,
    pub resources: usize,
    pub complete: usize,
    pub cycles: usize,
    pub outstanding: Vec<(String, u64)>,
}

/// Summarize a plan. `nodes` is the flattened forest, `merged` its totals.
pub fn summarize_plan(
    forest: &[RequirementNode],
    nodes: &[&RequirementNode],
    merged: &[MergedResource],
    collected: &Collected,
) -> PlanSummary {
    let progress = progress(merged, collected);

    PlanSummary {
        selections: forest.len(),
        nodes: nodes.len(),
        resources: merged.len(),
        complete: progress.iter().filter(|p| p.is_complete()).count(),
        cycles: nodes.iter().filter(|n| n.cycle).count(),
        outstanding: progress
            .iter()
            .filter(|p| !p.is_complete())
            .map(|p| (p.resource.info.name.clone(), p.remaining()))
            .collect(),
    }
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Collection Summary ===")?;
        writeln!(
            f,
            "Selected recipes: {}  Tree nodes: {}  Distinct resources: {}",
            self.selections, self.nodes, self.resources
        )?;
        writeln!(f, "Complete: {}/{}", self.complete, self.resources)?;

        if self.cycles > 0 {
            writeln!(f, "Warning: {} branch(es) cut by recipe cycles", self.cycles)?;
        }

        if self.outstanding.is_empty() {
            writeln!(f, "All resources collected.")?;
        } else {
            writeln!(f)?;
            writeln!(f, "Still needed:")?;
            for (name, left) in &self.outstanding {
                writeln!(f, "  {:>6}x {}", left, name)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::{build_forest, flatten, merge};
    use crate::catalog::Catalog;
    use crate::models::Selection;
    use crate::test_utils::{ingredient, recipe, sword_catalog};

    fn collected(pairs: &[(&str, u64)]) -> Collected {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn progress_compares_with_totals() {
        let forest = build_forest(&[Selection::new("sword", 2)], &sword_catalog());
        let merged = merge(&flatten(&forest));
        let have = collected(&[("iron-ore", 20), ("wood-handle", 1)]);

        let progress = progress(&merged, &have);
        let ore = progress.iter().find(|p| p.resource.resource_id == "iron-ore").unwrap();
        assert!(ore.is_complete());
        assert_eq!(ore.remaining(), 0);

        let handle = progress
            .iter()
            .find(|p| p.resource.resource_id == "wood-handle")
            .unwrap();
        assert!(!handle.is_complete());
        assert_eq!(handle.remaining(), 1);

        let ids: Vec<_> = remaining(&merged, &have)
            .iter()
            .map(|p| p.resource.resource_id.as_str())
            .collect();
        assert_eq!(ids, ["sword", "iron-ingot", "wood-handle"]);
    }

    #[test]
    fn allocation_fills_branches_in_order() {
        let catalog = Catalog::new(vec![
            recipe("r-shield", "shield", vec![ingredient("plank", 2), ingredient("wood", 1)]),
            recipe("r-plank", "plank", vec![ingredient("wood", 3)]),
        ]);
        let forest = build_forest(&[Selection::new("shield", 1)], &catalog);
        let nodes = flatten(&forest);
        let allocated = allocate(&nodes, &collected(&[("wood", 5)]));

        // shield > plank > wood needs 6, shield > wood needs 1
        let via_plank = &forest[0].children[0].children[0];
        let direct = &forest[0].children[1];
        assert_eq!(allocated[&via_plank.path_id], 5);
        assert_eq!(allocated[&direct.path_id], 0);
        assert_eq!(allocated[&forest[0].path_id], 0);

        let allocated = allocate(&nodes, &collected(&[("wood", 50)]));
        assert_eq!(allocated[&via_plank.path_id], 6);
        assert_eq!(allocated[&direct.path_id], 1);
    }

    #[test]
    fn shared_resource_completes_per_branch() {
        let catalog = Catalog::new(vec![
            recipe("r-shield", "shield", vec![ingredient("plank", 2), ingredient("wood", 1)]),
            recipe("r-plank", "plank", vec![ingredient("wood", 3)]),
        ]);
        let forest = build_forest(&[Selection::new("shield", 1)], &catalog);
        let nodes = flatten(&forest);
        let via_plank = &forest[0].children[0].children[0];
        let direct = &forest[0].children[1];

        // 7 wood in total covers both branches, but 5 covers neither
        let allocated = allocate(&nodes, &collected(&[("wood", 5)]));
        assert!(!node_complete(via_plank, &allocated));
        assert!(!node_complete(direct, &allocated));

        let allocated = allocate(&nodes, &collected(&[("wood", 6)]));
        assert!(node_complete(via_plank, &allocated));
        assert!(!node_complete(direct, &allocated));

        let allocated = allocate(&nodes, &collected(&[("wood", 7)]));
        assert!(node_complete(via_plank, &allocated));
        assert!(node_complete(direct, &allocated));
        assert!(!node_complete(&forest[0], &allocated));

        let text = crate::calculator::format_tree(&forest[0], &allocated, 0);
        assert_eq!(text.matches("[x]").count(), 2);
        assert_eq!(text.matches("[ ]").count(), 2);
    }

    #[test]
    fn summary_lists_outstanding() {
        let forest = build_forest(&[Selection::new("sword", 1)], &sword_catalog());
        let nodes = flatten(&forest);
        let merged = merge(&nodes);
        let have = collected(&[("sword", 1), ("iron-ingot", 2), ("iron-ore", 6)]);

        let summary = summarize_plan(&forest, &nodes, &merged, &have);
        assert_eq!(summary.selections, 1);
        assert_eq!(summary.nodes, 4);
        assert_eq!(summary.resources, 4);
        assert_eq!(summary.complete, 3);
        assert_eq!(summary.cycles, 0);
        assert_eq!(summary.outstanding, vec![("wood-handle (item)".to_string(), 1)]);

        let text = summary.to_string();
        assert!(text.contains("Complete: 3/4"));
        assert!(text.contains("1x wood-handle (item)"));
    }

    #[test]
    fn empty_plan_is_complete() {
        let summary = summarize_plan(&[], &[], &[], &Collected::new());
        assert_eq!(summary.resources, 0);
        assert!(summary.to_string().contains("All resources collected."));
    }
}
