//! Compilation entry point
//!
//! A compilation runs in two phases over one isolated [`Registry`]:
//!
//! 1. **Build**: every file under `definitions/` is turned into actions and
//!    registered, in path order. Built-in assertions are synthesized as soon
//!    as their parent is registered.
//! 2. **Link**: templates are rendered, references resolved and the finished
//!    graph validated.
//!
//! Fatal errors return `Err` straight away; everything else is collected into
//! the graph's error list.

pub mod script;
mod sources;

use std::collections::BTreeMap;

use crate::config::{load_project_settings, ProjectConfigOverride, ProjectSettings};
use crate::error::{CompileResult, ErrorCollector};
use crate::linker::{self, LinkContext};
use crate::models::CompiledGraph;
use crate::project::ProjectFiles;
use crate::registry::Registry;
use crate::validate;

use script::ScriptEvaluator;

/// Directory holding action sources
pub const DEFINITIONS_DIR: &str = "definitions/";
/// Directory holding shared script sources
pub const INCLUDES_DIR: &str = "includes/";

/// Options for one compilation
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    /// Merged onto the loaded settings
    pub project_config_override: Option<ProjectConfigOverride>,
    /// Version a project's `dataformCoreVersion` pin must equal
    pub compiler_version: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            project_config_override: None,
            compiler_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// How a project file takes part in compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourceKind {
    SqlTemplate,
    Script,
    ActionConfigs,
    /// Only read when an action config points at it
    Referenced,
}

impl SourceKind {
    pub(crate) fn of(path: &str) -> Self {
        if !path.starts_with(DEFINITIONS_DIR) {
            return SourceKind::Referenced;
        }
        let file_name = path.rsplit('/').next().unwrap_or(path);
        if file_name == "actions.yaml" || file_name == "actions.yml" {
            SourceKind::ActionConfigs
        } else if file_name.ends_with(".sqlx") {
            SourceKind::SqlTemplate
        } else if file_name.ends_with(".js") {
            SourceKind::Script
        } else {
            SourceKind::Referenced
        }
    }
}

/// State of the build phase
pub(crate) struct Build<'a> {
    pub files: &'a ProjectFiles,
    pub evaluator: &'a dyn ScriptEvaluator,
    pub settings: &'a ProjectSettings,
    pub includes: &'a BTreeMap<String, String>,
    pub registry: Registry,
    pub errors: ErrorCollector,
}

/// Compile a project into its dependency graph
pub fn compile(
    files: &ProjectFiles,
    evaluator: &dyn ScriptEvaluator,
    options: &CompileOptions,
) -> CompileResult<CompiledGraph> {
    let settings = load_project_settings(
        files,
        options.project_config_override.as_ref(),
        &options.compiler_version,
    )?;
    let includes: BTreeMap<String, String> = files
        .iter()
        .filter(|(path, _)| path.starts_with(INCLUDES_DIR) && path.ends_with(".js"))
        .map(|(path, contents)| (path.to_string(), contents.to_string()))
        .collect();

    let mut build = Build {
        files,
        evaluator,
        settings: &settings,
        includes: &includes,
        registry: Registry::new(),
        errors: ErrorCollector::new(),
    };
    for (path, contents) in files.iter() {
        let kind = SourceKind::of(path);
        tracing::debug!(file = path, kind = ?kind, "processing file");
        match kind {
            SourceKind::SqlTemplate => build.sql_template_file(path, contents)?,
            SourceKind::Script => build.script_file(path, contents)?,
            SourceKind::ActionConfigs => build.action_configs_file(path, contents)?,
            SourceKind::Referenced => {}
        }
    }
    tracing::debug!(actions = build.registry.len(), "build phase complete");

    let Build {
        mut registry,
        mut errors,
        ..
    } = build;
    let context = LinkContext {
        config: &settings.active,
        evaluator,
        includes: &includes,
    };
    linker::link(&mut registry, &context, &mut errors);
    validate::validate(&registry, &settings.active, &mut errors);
    tracing::debug!(errors = errors.len(), "validation complete");

    let graph = CompiledGraph::from_actions(
        settings.active,
        registry.into_actions(),
        errors.into_vec(),
        options.compiler_version.clone(),
    );
    tracing::info!(
        actions = graph.action_count(),
        errors = graph.errors().len(),
        "compilation finished"
    );
    Ok(graph)
}
