//! Dependency linking
//!
//! Runs once every file has been registered. For each action it renders the
//! SQL templates, resolves declared and inline references against the
//! registry, and applies `includeDependentAssertions` propagation. All
//! outcomes are computed against the frozen registry first and written back
//! afterwards.

pub(crate) mod render;

use std::collections::BTreeMap;

use indexmap::{IndexMap, IndexSet};

use crate::compiler::script::ScriptEvaluator;
use crate::config::ProjectConfig;
use crate::error::ErrorCollector;
use crate::models::{Action, DependencyReference, TableType, Target};
use crate::registry::{LinkSpec, Lookup, Registry, SqlTemplates};

use render::{RenderOutput, Renderer};

/// Shared inputs of the link phase
pub struct LinkContext<'a> {
    pub config: &'a ProjectConfig,
    pub evaluator: &'a dyn ScriptEvaluator,
    pub includes: &'a BTreeMap<String, String>,
}

/// `includeDependentAssertions` as seen across every site referencing one target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagState {
    Unset,
    Set(bool),
    Conflict,
}

impl FlagState {
    fn from_site(flag: Option<bool>) -> Self {
        flag.map_or(FlagState::Unset, FlagState::Set)
    }

    fn merge(self, flag: Option<bool>) -> Self {
        match (self, flag) {
            (FlagState::Conflict, _) => FlagState::Conflict,
            (state, None) => state,
            (FlagState::Unset, Some(value)) => FlagState::Set(value),
            (FlagState::Set(current), Some(value)) if current == value => self,
            (FlagState::Set(_), Some(_)) => FlagState::Conflict,
        }
    }
}

#[derive(Debug)]
enum RenderedSql {
    Table {
        query: String,
        incremental: Option<IncrementalSql>,
        pre_ops: Vec<String>,
        post_ops: Vec<String>,
    },
    Operation {
        queries: Vec<String>,
    },
    Assertion {
        query: String,
    },
}

#[derive(Debug)]
struct IncrementalSql {
    query: String,
    pre_ops: Vec<String>,
    post_ops: Vec<String>,
}

#[derive(Debug)]
struct LinkOutcome {
    rendered: Option<RenderedSql>,
    dependency_targets: Vec<Target>,
    errors: Vec<String>,
}

/// Link every registered action in place
pub fn link(registry: &mut Registry, context: &LinkContext<'_>, errors: &mut ErrorCollector) {
    let outcomes: Vec<LinkOutcome> = (0..registry.len())
        .map(|index| link_one(registry, index, context))
        .collect();

    for (index, outcome) in outcomes.into_iter().enumerate() {
        let action = &mut registry.get_mut(index).action;
        let file_name = action.common().file_name.clone();
        let action_name = action.target().to_string();
        for message in outcome.errors {
            errors.push(Some(&file_name), Some(&action_name), message);
        }
        if let Some(rendered) = outcome.rendered {
            apply_rendered(action, rendered);
        }
        action.common_mut().dependency_targets = outcome.dependency_targets;
    }
    tracing::debug!(actions = registry.len(), "linked dependencies");
}

fn link_one(registry: &Registry, index: usize, context: &LinkContext<'_>) -> LinkOutcome {
    let entry = registry.get(index);
    let action = &entry.action;
    let link = &entry.link;
    let mut out = RenderOutput::default();

    let rendered = render_templates(registry, action, link, context, &mut out);

    let mut sites: Vec<(Target, Option<bool>)> = Vec::new();
    for reference in &link.dependencies {
        match registry.find(reference) {
            Lookup::Found(found) => sites.push((
                registry.get(found).action.target().clone(),
                reference.include_dependent_assertions,
            )),
            Lookup::Missing => out.errors.push(format!(
                "Missing dependency detected: Action \"{}\" depends on \"{}\" which does not exist",
                action.target(),
                reference
            )),
            Lookup::Ambiguous(candidates) => {
                out.errors.push(ambiguous_message(reference, &candidates))
            }
        }
    }
    sites.append(&mut out.refs);

    let mut dependencies: IndexSet<Target> =
        action.common().dependency_targets.iter().cloned().collect();
    let mut flags: IndexMap<Target, FlagState> = IndexMap::new();
    for (target, flag) in sites {
        dependencies.insert(target.clone());
        flags
            .entry(target)
            .and_modify(|state| *state = state.merge(flag))
            .or_insert_with(|| FlagState::from_site(flag));
    }

    for (target, state) in &flags {
        let include = match state {
            FlagState::Conflict => {
                out.errors.push(format!(
                    "Conflicting \"includeDependentAssertions\" properties are not allowed. Dependency {} has different values set for this property.",
                    target
                ));
                continue;
            }
            FlagState::Unset => link.depend_on_dependency_assertions,
            FlagState::Set(value) => *value,
        };
        if !include {
            continue;
        }
        for &assertion in registry.assertions_of(target) {
            let assertion_target = registry.get(assertion).action.target();
            if assertion_target != action.target() {
                dependencies.insert(assertion_target.clone());
            }
        }
    }

    LinkOutcome {
        rendered,
        dependency_targets: dependencies.into_iter().collect(),
        errors: out.errors,
    }
}

fn render_templates(
    registry: &Registry,
    action: &Action,
    link: &LinkSpec,
    context: &LinkContext<'_>,
    out: &mut RenderOutput,
) -> Option<RenderedSql> {
    let renderer = |incremental: bool| Renderer {
        registry,
        config: context.config,
        evaluator: context.evaluator,
        includes: context.includes,
        file_name: &action.common().file_name,
        self_target: action.target(),
        script: link.script.as_deref(),
        incremental,
    };
    let render_all = |renderer: &Renderer<'_>, sql: &[String], out: &mut RenderOutput| {
        render_each(renderer, sql, link.interpolate, out)
    };

    match &link.templates {
        SqlTemplates::None => None,
        SqlTemplates::Table {
            query,
            incremental_query,
            pre_ops,
            post_ops,
        } => {
            let base = renderer(false);
            let incremental = match action {
                Action::Table(table) if table.table_type == TableType::Incremental => {
                    let incremental_renderer = renderer(true);
                    Some(IncrementalSql {
                        query: finish(
                            &incremental_renderer,
                            incremental_query.as_deref().unwrap_or(query),
                            link.interpolate,
                            out,
                        ),
                        pre_ops: render_all(&incremental_renderer, pre_ops.as_slice(), out),
                        post_ops: render_all(&incremental_renderer, post_ops.as_slice(), out),
                    })
                }
                _ => None,
            };
            Some(RenderedSql::Table {
                query: finish(&base, query, link.interpolate, out),
                incremental,
                pre_ops: render_all(&base, pre_ops.as_slice(), out),
                post_ops: render_all(&base, post_ops.as_slice(), out),
            })
        }
        SqlTemplates::Operation { queries } => Some(RenderedSql::Operation {
            queries: render_all(&renderer(false), queries.as_slice(), out),
        }),
        SqlTemplates::Assertion { query } => Some(RenderedSql::Assertion {
            query: finish(&renderer(false), query, link.interpolate, out),
        }),
    }
}

fn render_each(
    renderer: &Renderer<'_>,
    sql: &[String],
    interpolate: bool,
    out: &mut RenderOutput,
) -> Vec<String> {
    sql.iter()
        .map(|s| finish(renderer, s, interpolate, out))
        .collect()
}

/// Render (when enabled) and trim outer whitespace
fn finish(renderer: &Renderer<'_>, sql: &str, interpolate: bool, out: &mut RenderOutput) -> String {
    if interpolate {
        renderer.render(sql, out).trim().to_string()
    } else {
        sql.trim().to_string()
    }
}

fn apply_rendered(action: &mut Action, rendered: RenderedSql) {
    match (action, rendered) {
        (
            Action::Table(table),
            RenderedSql::Table {
                query,
                incremental,
                pre_ops,
                post_ops,
            },
        ) => {
            table.query = query;
            table.pre_ops = pre_ops;
            table.post_ops = post_ops;
            if let Some(incremental) = incremental {
                table.incremental_query = Some(incremental.query);
                table.incremental_pre_ops = incremental.pre_ops;
                table.incremental_post_ops = incremental.post_ops;
            }
        }
        (Action::Operation(operation), RenderedSql::Operation { queries }) => {
            operation.queries = queries
        }
        (Action::Assertion(assertion), RenderedSql::Assertion { query }) => {
            assertion.query = query
        }
        _ => {}
    }
}

/// Error for a short name matching several differently scoped actions
pub(crate) fn ambiguous_message(reference: &DependencyReference, candidates: &[Target]) -> String {
    let names: Vec<String> = candidates.iter().map(Target::qualified_name).collect();
    format!(
        "Ambiguous Action name: {}. Did you mean one of: {}.",
        reference,
        names.join(", ")
    )
}
