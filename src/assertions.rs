//! Built-in assertion synthesis
//!
//! Tables, views, incremental tables and operations may carry shorthand
//! data-quality checks. Each unique-key group becomes one assertion
//! (`uniqueKey_0`, `uniqueKey_1`, ...); every row condition and non-null
//! column is folded into a single `rowConditions` assertion.

use crate::actions::BuiltinAssertions;
use crate::config::Warehouse;
use crate::models::{Action, ActionCommon, Assertion, Hermeticity, Target};
use crate::registry::{LinkSpec, Registry};
use crate::target::TargetResolver;

/// Parent attributes a synthesized assertion is derived from
#[derive(Debug, Clone, Copy)]
pub struct AssertionParent<'a> {
    pub common: &'a ActionCommon,
    /// Database written on the parent's config, if any
    pub explicit_database: Option<&'a str>,
}

/// Query failing when any combination of `columns` occurs more than once
pub fn unique_key_query(warehouse: Warehouse, target: &Target, columns: &[String]) -> String {
    let columns = columns.join(", ");
    format!(
        "SELECT\n  *\nFROM (\n  SELECT\n    {columns},\n    COUNT(1) AS index_row_count\n  FROM {table}\n  GROUP BY {columns}\n  ) AS data\nWHERE index_row_count > 1",
        columns = columns,
        table = warehouse.quote_target(target),
    )
}

/// Query returning every row that breaks one of `conditions`, tagged with the condition
pub fn row_conditions_query(warehouse: Warehouse, target: &Target, conditions: &[String]) -> String {
    let table = warehouse.quote_target(target);
    conditions
        .iter()
        .map(|condition| {
            format!(
                "SELECT\n  {} AS failing_row_condition,\n  *\nFROM {}\nWHERE NOT ({})",
                warehouse.quote_string(condition),
                table,
                condition
            )
        })
        .collect::<Vec<_>>()
        .join("\nUNION ALL\n")
}

/// Row conditions followed by one `IS NOT NULL` check per non-null column
fn combined_conditions(assertions: &BuiltinAssertions) -> Vec<String> {
    assertions
        .row_conditions
        .iter()
        .cloned()
        .chain(
            assertions
                .non_null
                .iter()
                .map(|column| format!("{} IS NOT NULL", column)),
        )
        .collect()
}

/// Register the assertions implied by `assertions` and return their registry indices
pub fn synthesize(
    registry: &mut Registry,
    resolver: &TargetResolver<'_>,
    warehouse: Warehouse,
    parent: AssertionParent<'_>,
    assertions: &BuiltinAssertions,
) -> Vec<usize> {
    let mut queries: Vec<(String, String)> = assertions
        .unique_keys
        .iter()
        .enumerate()
        .map(|(index, columns)| {
            (
                format!("uniqueKey_{}", index),
                unique_key_query(warehouse, &parent.common.target, columns),
            )
        })
        .collect();

    let conditions = combined_conditions(assertions);
    if !conditions.is_empty() {
        queries.push((
            "rowConditions".to_string(),
            row_conditions_query(warehouse, &parent.common.target, &conditions),
        ));
    }

    let indices: Vec<usize> = queries
        .into_iter()
        .map(|(discriminator, query)| {
            let resolved = resolver.builtin_assertion(
                &parent.common.canonical_target,
                parent.explicit_database,
                &discriminator,
            );
            let assertion = Assertion {
                common: ActionCommon {
                    target: resolved.target,
                    canonical_target: resolved.canonical,
                    file_name: parent.common.file_name.clone(),
                    disabled: parent.common.disabled,
                    tags: parent.common.tags.clone(),
                    dependency_targets: vec![parent.common.target.clone()],
                    hermeticity: Hermeticity::Hermetic,
                    ..ActionCommon::default()
                },
                query,
                parent_action: Some(parent.common.target.clone()),
            };
            registry.register(Action::Assertion(assertion), LinkSpec::default())
        })
        .collect();

    if !indices.is_empty() {
        tracing::debug!(
            parent = %parent.common.target,
            count = indices.len(),
            "synthesized built-in assertions"
        );
    }
    indices
}
