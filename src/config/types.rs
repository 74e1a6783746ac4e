//! Project configuration type definitions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::Target;

/// Schema used for assertions when the project does not configure one
pub const DEFAULT_ASSERTION_SCHEMA: &str = "dataform_assertions";

/// Target warehouse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Warehouse {
    #[default]
    Bigquery,
    Snowflake,
    Postgres,
    Redshift,
    Presto,
    Sqldatawarehouse,
}

impl Warehouse {
    /// Whether compilation requires `defaultLocation` to be set
    pub fn requires_default_location(&self) -> bool {
        matches!(self, Warehouse::Bigquery)
    }

    /// Quote a target the way compiled SQL refers to it
    pub fn quote_target(&self, target: &Target) -> String {
        let parts = [target.database.as_deref(), target.schema.as_deref()]
            .into_iter()
            .flatten()
            .chain(std::iter::once(target.name.as_str()));
        match self {
            Warehouse::Bigquery => format!("`{}`", parts.collect::<Vec<_>>().join(".")),
            _ => parts
                .map(|p| format!("\"{}\"", p))
                .collect::<Vec<_>>()
                .join("."),
        }
    }

    /// Quote a string literal (used for failing-row-condition tags)
    pub fn quote_string(&self, value: &str) -> String {
        match self {
            Warehouse::Bigquery => {
                format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
            }
            _ => format!("'{}'", value.replace('\'', "''")),
        }
    }
}

/// Defaults for notebook runtimes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookRuntimeOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_template_name: Option<String>,
}

/// Resolved project configuration
///
/// Both settings file formats normalize into this shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    pub warehouse: Warehouse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion_schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataform_core_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_notebook_runtime_options: Option<NotebookRuntimeOptions>,
}

impl ProjectConfig {
    /// The environment-independent view: same defaults, no suffix/prefix transforms
    pub fn canonical(&self) -> Self {
        Self {
            database_suffix: None,
            schema_suffix: None,
            table_prefix: None,
            ..self.clone()
        }
    }

    /// Merge runtime overrides on top; shallow except `vars`, which merge key-wise
    pub fn apply_override(&mut self, overrides: &ProjectConfigOverride) {
        fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }

        if let Some(warehouse) = overrides.warehouse {
            self.warehouse = warehouse;
        }
        set(&mut self.default_database, &overrides.default_database);
        set(&mut self.default_schema, &overrides.default_schema);
        set(&mut self.default_location, &overrides.default_location);
        set(&mut self.assertion_schema, &overrides.assertion_schema);
        set(&mut self.database_suffix, &overrides.database_suffix);
        set(&mut self.schema_suffix, &overrides.schema_suffix);
        set(&mut self.table_prefix, &overrides.table_prefix);
        set(
            &mut self.default_notebook_runtime_options,
            &overrides.default_notebook_runtime_options,
        );
        for (key, value) in &overrides.vars {
            self.vars.insert(key.clone(), value.clone());
        }
    }

    pub fn assertion_schema(&self) -> &str {
        self.assertion_schema
            .as_deref()
            .unwrap_or(DEFAULT_ASSERTION_SCHEMA)
    }
}

/// Runtime overrides merged onto the loaded settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectConfigOverride {
    #[serde(default)]
    pub warehouse: Option<Warehouse>,
    #[serde(default)]
    pub default_database: Option<String>,
    #[serde(default)]
    pub default_schema: Option<String>,
    #[serde(default)]
    pub default_location: Option<String>,
    #[serde(default)]
    pub assertion_schema: Option<String>,
    #[serde(default)]
    pub database_suffix: Option<String>,
    #[serde(default)]
    pub schema_suffix: Option<String>,
    #[serde(default)]
    pub table_prefix: Option<String>,
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    #[serde(default)]
    pub default_notebook_runtime_options: Option<NotebookRuntimeOptions>,
}

/// `workflow_settings.yaml` as written by users
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WorkflowSettings {
    #[serde(default)]
    pub default_project: Option<String>,
    #[serde(default)]
    pub default_dataset: Option<String>,
    #[serde(default)]
    pub default_location: Option<String>,
    #[serde(default)]
    pub default_assertion_dataset: Option<String>,
    #[serde(default)]
    pub project_suffix: Option<String>,
    #[serde(default)]
    pub dataset_suffix: Option<String>,
    #[serde(default)]
    pub name_prefix: Option<String>,
    #[serde(default)]
    pub vars: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub dataform_core_version: Option<String>,
    #[serde(default)]
    pub default_notebook_runtime_options: Option<NotebookRuntimeOptions>,
}

/// Deprecated `dataform.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LegacyProjectSettings {
    #[serde(default)]
    pub warehouse: Option<Warehouse>,
    #[serde(default)]
    pub default_database: Option<String>,
    #[serde(default)]
    pub default_schema: Option<String>,
    #[serde(default)]
    pub default_location: Option<String>,
    #[serde(default)]
    pub assertion_schema: Option<String>,
    #[serde(default)]
    pub database_suffix: Option<String>,
    #[serde(default)]
    pub schema_suffix: Option<String>,
    #[serde(default)]
    pub table_prefix: Option<String>,
    #[serde(default)]
    pub vars: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub dataform_core_version: Option<String>,
    #[serde(default)]
    pub default_notebook_runtime_options: Option<NotebookRuntimeOptions>,
}

/// Keys accepted in `workflow_settings.yaml`, for suggestions
pub(crate) const WORKFLOW_SETTINGS_KEYS: &[&str] = &[
    "defaultProject",
    "defaultDataset",
    "defaultLocation",
    "defaultAssertionDataset",
    "projectSuffix",
    "datasetSuffix",
    "namePrefix",
    "vars",
    "dataformCoreVersion",
    "defaultNotebookRuntimeOptions",
    "outputBucket",
    "runtimeTemplateName",
];

/// Keys accepted in `dataform.json`, for suggestions
pub(crate) const LEGACY_SETTINGS_KEYS: &[&str] = &[
    "warehouse",
    "defaultDatabase",
    "defaultSchema",
    "defaultLocation",
    "assertionSchema",
    "databaseSuffix",
    "schemaSuffix",
    "tablePrefix",
    "vars",
    "dataformCoreVersion",
    "defaultNotebookRuntimeOptions",
    "outputBucket",
    "runtimeTemplateName",
];
