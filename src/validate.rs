//! Whole-graph checks run after linking
//!
//! - Effective and canonical targets must each be unique
//! - The dependency graph must be acyclic
//! - Project rules that depend on the merged settings

use crate::config::ProjectConfig;
use crate::error::ErrorCollector;
use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Run every graph-level check, recording violations as recoverable errors
pub fn validate(registry: &Registry, config: &ProjectConfig, errors: &mut ErrorCollector) {
    check_duplicates(registry, errors);
    check_cycles(registry, errors);
    check_project_rules(config, errors);
}

fn check_duplicates(registry: &Registry, errors: &mut ErrorCollector) {
    for (target, indices) in registry.duplicate_targets() {
        let file_name = duplicate_file(registry, indices);
        errors.push(
            file_name,
            Some(&target.to_string()),
            format!(
                "Duplicate action name detected. Names within a schema must be unique across tables, declarations, assertions, and operations: \"{}\"",
                target
            ),
        );
    }
    for (target, indices) in registry.duplicate_canonical_targets() {
        let file_name = duplicate_file(registry, indices);
        errors.push(
            file_name,
            Some(&target.to_string()),
            format!(
                "Duplicate canonical target detected. Canonical targets must be unique across tables, declarations, assertions, and operations: \"{}\"",
                target
            ),
        );
    }
}

/// File of the last action registered under a duplicated target
fn duplicate_file<'a>(registry: &'a Registry, indices: &[usize]) -> Option<&'a str> {
    indices
        .last()
        .map(|&index| registry.get(index).action.common().file_name.as_str())
}

/// Index-based adjacency; unresolved dependency targets are skipped
fn adjacency(registry: &Registry) -> Vec<Vec<usize>> {
    registry
        .iter()
        .map(|entry| {
            entry
                .action
                .common()
                .dependency_targets
                .iter()
                .filter_map(|target| registry.index_of(target))
                .collect()
        })
        .collect()
}

fn check_cycles(registry: &Registry, errors: &mut ErrorCollector) {
    for chain in find_cycles(&adjacency(registry)) {
        let Some(&start) = chain.first() else {
            continue;
        };
        let action = &registry.get(start).action;
        let names: Vec<String> = chain
            .iter()
            .map(|&index| registry.get(index).action.target().to_string())
            .collect();
        errors.push(
            Some(&action.common().file_name),
            Some(&action.target().to_string()),
            format!("Circular dependency detected in chain: [{}]", names.join(" > ")),
        );
    }
}

/// Depth-first search reporting each back edge as a closed chain `[a, b, .., a]`
fn find_cycles(edges: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut marks = vec![Mark::Unvisited; edges.len()];
    let mut cycles = Vec::new();

    for root in 0..edges.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        // (node, next edge to follow)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        marks[root] = Mark::OnStack;

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let Some(&child) = edges[node].get(frame.1) else {
                marks[node] = Mark::Done;
                stack.pop();
                continue;
            };
            frame.1 += 1;

            match marks[child] {
                Mark::Unvisited => {
                    marks[child] = Mark::OnStack;
                    stack.push((child, 0));
                }
                Mark::OnStack => {
                    let start = stack
                        .iter()
                        .position(|&(n, _)| n == child)
                        .unwrap_or_default();
                    let mut chain: Vec<usize> = stack[start..].iter().map(|&(n, _)| n).collect();
                    chain.push(child);
                    cycles.push(chain);
                }
                Mark::Done => {}
            }
        }
    }
    cycles
}

fn check_project_rules(config: &ProjectConfig, errors: &mut ErrorCollector) {
    let missing_location = config
        .default_location
        .as_deref()
        .map_or(true, str::is_empty);
    if config.warehouse.requires_default_location() && missing_location {
        errors.push(
            None,
            None,
            "A defaultLocation is required for BigQuery. This can be configured in workflow_settings.yaml.",
        );
    }
}
