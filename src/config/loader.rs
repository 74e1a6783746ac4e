//! Project settings loading
//!
//! Exactly one of `workflow_settings.yaml` or the deprecated `dataform.json`
//! must exist. Unknown keys, malformed files, non-string variables and a
//! pinned compiler version that differs from the running one are fatal.

use std::collections::BTreeMap;

use crate::docs;
use crate::error::{CompileError, CompileResult};
use crate::project::ProjectFiles;

use super::types::{
    LegacyProjectSettings, ProjectConfig, ProjectConfigOverride, Warehouse, WorkflowSettings,
    LEGACY_SETTINGS_KEYS, WORKFLOW_SETTINGS_KEYS,
};

pub const WORKFLOW_SETTINGS_FILE: &str = "workflow_settings.yaml";
pub const LEGACY_SETTINGS_FILE: &str = "dataform.json";

/// Active and canonical project configuration for one compilation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectSettings {
    /// Settings file merged with runtime overrides
    pub active: ProjectConfig,
    /// Settings file only, with suffix/prefix transforms cleared
    pub canonical: ProjectConfig,
}

/// Load settings from the project files, merge overrides and check the version pin.
pub fn load_project_settings(
    files: &ProjectFiles,
    overrides: Option<&ProjectConfigOverride>,
    compiler_version: &str,
) -> CompileResult<ProjectSettings> {
    let file_config = match (
        files.get(WORKFLOW_SETTINGS_FILE),
        files.get(LEGACY_SETTINGS_FILE),
    ) {
        (Some(_), Some(_)) => return Err(CompileError::AmbiguousSettings),
        (None, None) => return Err(CompileError::MissingSettings),
        (Some(yaml), None) => parse_workflow_settings(yaml)?,
        (None, Some(json)) => parse_legacy_settings(json)?,
    };

    if let Some(requested) = &file_config.dataform_core_version {
        if requested != compiler_version {
            return Err(CompileError::VersionMismatch {
                requested: requested.clone(),
                installed: compiler_version.to_string(),
            });
        }
    }

    let canonical = file_config.canonical();
    let mut active = file_config;
    if let Some(overrides) = overrides {
        active.apply_override(overrides);
    }

    tracing::debug!(
        warehouse = ?active.warehouse,
        default_schema = active.default_schema.as_deref().unwrap_or("-"),
        "loaded project settings"
    );

    Ok(ProjectSettings { active, canonical })
}

/// Parse `workflow_settings.yaml`
pub fn parse_workflow_settings(content: &str) -> CompileResult<ProjectConfig> {
    if content.trim().is_empty() {
        return Ok(ProjectConfig::default());
    }

    let mut unknown_paths: Vec<String> = Vec::new();
    let deserializer = serde_yaml_ng::Deserializer::from_str(content);
    let settings: WorkflowSettings = serde_ignored::deserialize(deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| CompileError::InvalidSettings {
        file: WORKFLOW_SETTINGS_FILE.to_string(),
        message: e.to_string(),
    })?;
    reject_unknown(WORKFLOW_SETTINGS_FILE, unknown_paths, WORKFLOW_SETTINGS_KEYS)?;

    Ok(ProjectConfig {
        warehouse: Warehouse::Bigquery,
        default_database: settings.default_project,
        default_schema: settings.default_dataset,
        default_location: settings.default_location,
        assertion_schema: settings.default_assertion_dataset,
        database_suffix: settings.project_suffix,
        schema_suffix: settings.dataset_suffix,
        table_prefix: settings.name_prefix,
        vars: string_vars(settings.vars)?,
        dataform_core_version: settings.dataform_core_version,
        default_notebook_runtime_options: settings.default_notebook_runtime_options,
    })
}

/// Parse the deprecated `dataform.json`
pub fn parse_legacy_settings(content: &str) -> CompileResult<ProjectConfig> {
    let mut unknown_paths: Vec<String> = Vec::new();
    let mut deserializer = serde_json::Deserializer::from_str(content);
    let settings: LegacyProjectSettings = serde_ignored::deserialize(&mut deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| CompileError::InvalidSettings {
        file: LEGACY_SETTINGS_FILE.to_string(),
        message: e.to_string(),
    })?;
    reject_unknown(LEGACY_SETTINGS_FILE, unknown_paths, LEGACY_SETTINGS_KEYS)?;

    Ok(ProjectConfig {
        warehouse: settings.warehouse.unwrap_or_default(),
        default_database: settings.default_database,
        default_schema: settings.default_schema,
        default_location: settings.default_location,
        assertion_schema: settings.assertion_schema,
        database_suffix: settings.database_suffix,
        schema_suffix: settings.schema_suffix,
        table_prefix: settings.table_prefix,
        vars: string_vars(settings.vars)?,
        dataform_core_version: settings.dataform_core_version,
        default_notebook_runtime_options: settings.default_notebook_runtime_options,
    })
}

fn string_vars(raw: BTreeMap<String, serde_json::Value>) -> CompileResult<BTreeMap<String, String>> {
    raw.into_iter()
        .map(|(name, value)| match value {
            serde_json::Value::String(s) => Ok((name, s)),
            _ => Err(CompileError::NonStringVariable { name }),
        })
        .collect()
}

fn reject_unknown(file: &str, unknown_paths: Vec<String>, candidates: &[&str]) -> CompileResult<()> {
    let Some(path) = unknown_paths.into_iter().next() else {
        return Ok(());
    };
    let key = path
        .split('.')
        .next_back()
        .unwrap_or(path.as_str())
        .to_string();
    Err(CompileError::UnknownSetting {
        file: file.to_string(),
        suggestion: suggest_key(&key, candidates),
        key: path,
        docs: docs::workflow_settings_url(),
    })
}

/// Closest allowed key within edit distance 2
pub(crate) fn suggest_key(unknown: &str, candidates: &[&str]) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for candidate in candidates {
        let dist = levenshtein(unknown, candidate);
        best = match best {
            None => Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => Some((candidate, dist)),
            Some(current) => Some(current),
        };
    }

    match best {
        Some((candidate, dist)) if dist <= 2 => Some(candidate.to_string()),
        _ => None,
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut prev: Vec<usize> = (0..=b_bytes.len()).collect();
    let mut curr = vec![0usize; b_bytes.len() + 1];

    for (i, &ac) in a_bytes.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &bc) in b_bytes.iter().enumerate() {
            let cost = if ac == bc { 0 } else { 1 };
            curr[j + 1] =
                std::cmp::min(std::cmp::min(prev[j + 1] + 1, curr[j] + 1), prev[j] + cost);
        }
        prev.clone_from_slice(&curr);
    }

    prev[b_bytes.len()]
}
