//! Action config normalization
//!
//! Every config object, whether it came from a `config { }` block, an
//! `actions.yaml` entry or a script builder call, goes through [`normalize`].
//! Each kind has a closed set of keys; anything else, a mistyped value, or a
//! broken cross-field rule aborts compilation.

mod raw;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::config::suggest_key;
use crate::docs;
use crate::error::{CompileError, CompileResult};
use crate::models::{
    BigQueryOptions, ColumnDescriptor, DependencyReference, OnSchemaChange, TableType,
};

use raw::{RawAssertions, RawBigQuery, RawConfig};

/// The kind an action config claims to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKind {
    Table,
    View,
    Incremental,
    Operation,
    Assertion,
    Declaration,
    Notebook,
    DataPreparation,
}

/// Where a config object came from; decides which source-only keys apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// `config { }` block of a SQL-template file
    Sqlx,
    /// Entry of an `actions.yaml` file
    ActionsYaml,
    /// Builder entry returned by the script evaluator
    Script,
}

const COMMON_KEYS: &[&str] = &[
    "name",
    "schema",
    "dataset",
    "database",
    "project",
    "description",
    "tags",
    "disabled",
    "dependencies",
    "dependencyTargets",
    "hermetic",
    "dependOnDependencyAssertions",
    "columns",
];

const TABLE_KEYS: &[&str] = &[
    "protected",
    "materialized",
    "uniqueKey",
    "onSchemaChange",
    "assertions",
    "bigquery",
];

const OPERATION_KEYS: &[&str] = &["hasOutput", "assertions"];

const PARTITION_EXPIRATION_OPTION: &str = "partition_expiration_days";
const REQUIRE_PARTITION_FILTER_OPTION: &str = "require_partition_filter";

impl ConfigKind {
    /// Kind named by `type` in a SQL-template config block
    pub fn from_sqlx_type(value: &str) -> Option<Self> {
        match value {
            "table" => Some(ConfigKind::Table),
            "view" => Some(ConfigKind::View),
            "incremental" => Some(ConfigKind::Incremental),
            "operations" => Some(ConfigKind::Operation),
            "assertion" => Some(ConfigKind::Assertion),
            "declaration" => Some(ConfigKind::Declaration),
            _ => None,
        }
    }

    /// Kind named by the entry key in `actions.yaml`
    pub fn from_yaml_key(value: &str) -> Option<Self> {
        match value {
            "table" => Some(ConfigKind::Table),
            "view" => Some(ConfigKind::View),
            "incrementalTable" => Some(ConfigKind::Incremental),
            "operation" => Some(ConfigKind::Operation),
            "assertion" => Some(ConfigKind::Assertion),
            "declaration" => Some(ConfigKind::Declaration),
            "notebook" => Some(ConfigKind::Notebook),
            "dataPreparation" => Some(ConfigKind::DataPreparation),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConfigKind::Table => "table",
            ConfigKind::View => "view",
            ConfigKind::Incremental => "incrementalTable",
            ConfigKind::Operation => "operation",
            ConfigKind::Assertion => "assertion",
            ConfigKind::Declaration => "declaration",
            ConfigKind::Notebook => "notebook",
            ConfigKind::DataPreparation => "dataPreparation",
        }
    }

    pub fn is_table_like(&self) -> bool {
        matches!(
            self,
            ConfigKind::Table | ConfigKind::View | ConfigKind::Incremental
        )
    }

    fn table_type(&self) -> TableType {
        match self {
            ConfigKind::View => TableType::View,
            ConfigKind::Incremental => TableType::Incremental,
            _ => TableType::Table,
        }
    }

    /// Closed key set for this kind from the given source
    pub fn allowed_keys(&self, source: ConfigSource) -> Vec<&'static str> {
        let mut keys = COMMON_KEYS.to_vec();
        match self {
            ConfigKind::Table | ConfigKind::View | ConfigKind::Incremental => {
                keys.extend_from_slice(TABLE_KEYS)
            }
            ConfigKind::Operation => keys.extend_from_slice(OPERATION_KEYS),
            _ => {}
        }
        let accepts_type = match source {
            ConfigSource::Sqlx => true,
            ConfigSource::Script => self.is_table_like(),
            ConfigSource::ActionsYaml => false,
        };
        if accepts_type {
            keys.push("type");
        }
        if source == ConfigSource::ActionsYaml {
            keys.push("filename");
        }
        keys
    }
}

/// Built-in assertion shorthands on a table or operation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuiltinAssertions {
    pub unique_keys: Vec<Vec<String>>,
    pub non_null: Vec<String>,
    pub row_conditions: Vec<String>,
}

impl BuiltinAssertions {
    pub fn is_empty(&self) -> bool {
        self.unique_keys.is_empty() && self.non_null.is_empty() && self.row_conditions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableConfig {
    pub table_type: TableType,
    pub protected: bool,
    pub materialized: bool,
    pub unique_key: Vec<String>,
    pub on_schema_change: Option<OnSchemaChange>,
    pub assertions: BuiltinAssertions,
    pub bigquery: Option<BigQueryOptions>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OperationConfig {
    pub has_output: bool,
    pub assertions: BuiltinAssertions,
}

/// Kind-specific part of a normalized config
#[derive(Debug, Clone, PartialEq)]
pub enum KindConfig {
    Table(TableConfig),
    Operation(OperationConfig),
    Assertion,
    Declaration,
    Notebook,
    DataPreparation,
}

/// A validated action config
#[derive(Debug, Clone, PartialEq)]
pub struct ActionConfig {
    pub kind: ConfigKind,
    pub name: Option<String>,
    pub schema: Option<String>,
    pub database: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub disabled: bool,
    pub dependencies: Vec<DependencyReference>,
    pub hermetic: Option<bool>,
    pub depend_on_dependency_assertions: bool,
    pub columns: BTreeMap<String, ColumnDescriptor>,
    pub filename: Option<String>,
    pub details: KindConfig,
}

impl ActionConfig {
    pub fn builtin_assertions(&self) -> Option<&BuiltinAssertions> {
        match &self.details {
            KindConfig::Table(table) => Some(&table.assertions),
            KindConfig::Operation(operation) => Some(&operation.assertions),
            _ => None,
        }
    }
}

/// Validate `value` against the schema of `kind`
pub fn normalize(
    value: &Value,
    kind: ConfigKind,
    source: ConfigSource,
    file: &str,
) -> CompileResult<ActionConfig> {
    let Some(object) = value.as_object() else {
        return Err(invalid(
            file,
            format!(
                "The {} config must be an object, found {}. See {}",
                kind.name(),
                json_type(value),
                docs::configs_reference_url(kind.name())
            ),
        ));
    };

    let allowed = kind.allowed_keys(source);
    if let Some((key, value)) = object
        .iter()
        .find(|(key, _)| !allowed.iter().any(|allowed| *allowed == key.as_str()))
    {
        let mut message = unexpected_property_message(kind, key, value);
        if let Some(suggestion) = suggest_key(key, &allowed) {
            message.push_str(&format!(" Did you mean \"{}\"?", suggestion));
        }
        return Err(invalid(file, message));
    }

    let raw: RawConfig = serde_json::from_value(value.clone())
        .map_err(|err| type_error(file, kind, object, &err))?;

    // A .sqlx declaration is named after its file
    if kind == ConfigKind::Declaration && source != ConfigSource::Sqlx && raw.name.is_none() {
        return Err(invalid(
            file,
            format!(
                "declarations require a non-empty \"name\". See {}",
                docs::configs_reference_url(kind.name())
            ),
        ));
    }
    tracing::trace!(file, kind = kind.name(), "normalizing action config");
    build(kind, raw, file)
}

fn build(kind: ConfigKind, raw: RawConfig, file: &str) -> CompileResult<ActionConfig> {
    if raw.name.as_deref() == Some("") {
        return Err(invalid(
            file,
            format!(
                "The {} \"name\" must not be empty. See {}",
                kind.name(),
                docs::configs_reference_url(kind.name())
            ),
        ));
    }
    let details = match kind {
        ConfigKind::Table | ConfigKind::View | ConfigKind::Incremental => {
            KindConfig::Table(table_config(kind, &raw, file)?)
        }
        ConfigKind::Operation => KindConfig::Operation(OperationConfig {
            has_output: raw.has_output.unwrap_or(false),
            assertions: builtin_assertions(raw.assertions.clone(), file)?,
        }),
        ConfigKind::Assertion => KindConfig::Assertion,
        ConfigKind::Declaration => {
            if raw.filename.is_some() {
                return Err(CompileError::DeclarationWithBody {
                    file: file.to_string(),
                    name: raw.name.clone().unwrap_or_default(),
                });
            }
            KindConfig::Declaration
        }
        ConfigKind::Notebook | ConfigKind::DataPreparation => {
            if raw.filename.as_deref().map_or(true, str::is_empty) {
                return Err(invalid(
                    file,
                    format!(
                        "\"filename\" is required for {} actions. See {}",
                        kind.name(),
                        docs::configs_reference_url(kind.name())
                    ),
                ));
            }
            if kind == ConfigKind::Notebook {
                KindConfig::Notebook
            } else {
                KindConfig::DataPreparation
            }
        }
    };

    Ok(ActionConfig {
        kind,
        name: raw.name,
        schema: raw.schema,
        database: raw.database,
        description: raw.description,
        tags: raw.tags.map(|t| t.into_vec()).unwrap_or_default(),
        disabled: raw.disabled.unwrap_or(false),
        dependencies: raw
            .dependencies
            .map(|d| d.into_vec().into_iter().map(Into::into).collect())
            .unwrap_or_default(),
        hermetic: raw.hermetic,
        depend_on_dependency_assertions: raw.depend_on_dependency_assertions.unwrap_or(false),
        columns: raw
            .columns
            .map(|columns| {
                columns
                    .into_iter()
                    .map(|(column, spec)| (column, spec.into_descriptor()))
                    .collect()
            })
            .unwrap_or_default(),
        filename: raw.filename,
        details,
    })
}

fn table_config(kind: ConfigKind, raw: &RawConfig, file: &str) -> CompileResult<TableConfig> {
    let materialized = raw.materialized.unwrap_or(false);
    if raw.materialized.is_some() && kind != ConfigKind::View {
        return Err(invalid(
            file,
            format!(
                "The \"materialized\" option is only valid for views, not for {} actions",
                kind.name()
            ),
        ));
    }
    if kind != ConfigKind::Incremental {
        if let Some(option) = [
            raw.unique_key.as_ref().map(|_| "uniqueKey"),
            raw.on_schema_change.as_ref().map(|_| "onSchemaChange"),
        ]
        .into_iter()
        .flatten()
        .next()
        {
            return Err(invalid(
                file,
                format!(
                    "The \"{}\" option is only valid for incremental tables, not for {} actions",
                    option,
                    kind.name()
                ),
            ));
        }
    }

    let unique_key = raw
        .unique_key
        .clone()
        .map(|k| k.into_vec())
        .unwrap_or_default();
    if raw.unique_key.is_some() && unique_key.is_empty() {
        return Err(invalid(file, "\"uniqueKey\" must list at least one column"));
    }

    let bigquery = match &raw.bigquery {
        Some(bigquery) => Some(bigquery_options(kind, materialized, bigquery.clone(), file)?),
        None => None,
    };

    Ok(TableConfig {
        table_type: kind.table_type(),
        protected: raw.protected.unwrap_or(false),
        materialized,
        unique_key,
        on_schema_change: raw.on_schema_change,
        assertions: builtin_assertions(raw.assertions.clone(), file)?,
        bigquery,
    })
}

fn bigquery_options(
    kind: ConfigKind,
    materialized: bool,
    raw: RawBigQuery,
    file: &str,
) -> CompileResult<BigQueryOptions> {
    let additional_options = raw.additional_options.unwrap_or_default();

    for (typed, typed_name, option) in [
        (
            raw.partition_expiration_days.is_some(),
            "partitionExpirationDays",
            PARTITION_EXPIRATION_OPTION,
        ),
        (
            raw.require_partition_filter.is_some(),
            "requirePartitionFilter",
            REQUIRE_PARTITION_FILTER_OPTION,
        ),
    ] {
        if !typed {
            continue;
        }
        if additional_options.contains_key(option) {
            return Err(invalid(
                file,
                format!(
                    "\"{}\" has been declared twice: as bigquery.{} and in bigquery.additionalOptions",
                    option, typed_name
                ),
            ));
        }
        if kind == ConfigKind::View && !materialized {
            return Err(invalid(
                file,
                format!(
                    "\"{}\" is not valid for views that are not materialized; use bigquery.additionalOptions instead",
                    typed_name
                ),
            ));
        }
        if raw.partition_by.is_none() {
            return Err(invalid(
                file,
                format!(
                    "\"{}\" requires the table to be partitioned with bigquery.partitionBy",
                    typed_name
                ),
            ));
        }
    }

    Ok(BigQueryOptions {
        partition_by: raw.partition_by,
        cluster_by: raw.cluster_by.unwrap_or_default(),
        update_partition_filter: raw.update_partition_filter,
        labels: raw.labels.unwrap_or_default(),
        partition_expiration_days: raw.partition_expiration_days,
        require_partition_filter: raw.require_partition_filter,
        additional_options,
    })
}

fn builtin_assertions(raw: Option<RawAssertions>, file: &str) -> CompileResult<BuiltinAssertions> {
    let Some(raw) = raw else {
        return Ok(BuiltinAssertions::default());
    };

    let unique_keys = match (raw.unique_key, raw.unique_keys) {
        (Some(_), Some(_)) => {
            return Err(invalid(
                file,
                "Specify at most one of \"assertions.uniqueKey\" and \"assertions.uniqueKeys\"",
            ))
        }
        (Some(key), None) => vec![key],
        (None, Some(keys)) => keys,
        (None, None) => Vec::new(),
    };
    if unique_keys.iter().any(Vec::is_empty) {
        return Err(invalid(
            file,
            "Unique key assertions must list at least one column per key",
        ));
    }

    Ok(BuiltinAssertions {
        unique_keys,
        non_null: raw.non_null.map(|n| n.into_vec()).unwrap_or_default(),
        row_conditions: raw.row_conditions.unwrap_or_default(),
    })
}

/// Name the property a deserialization failure came from
fn type_error(
    file: &str,
    kind: ConfigKind,
    object: &serde_json::Map<String, Value>,
    err: &serde_json::Error,
) -> CompileError {
    for (key, value) in object {
        let mut single = serde_json::Map::new();
        single.insert(key.clone(), value.clone());
        if let Err(single_err) = serde_json::from_value::<RawConfig>(Value::Object(single)) {
            return invalid(
                file,
                format!(
                    "{} ({})",
                    unexpected_property_message(kind, key, value),
                    single_err
                ),
            );
        }
    }
    invalid(
        file,
        format!(
            "Invalid {} config: {}. See {}",
            kind.name(),
            err,
            docs::configs_reference_url(kind.name())
        ),
    )
}

fn unexpected_property_message(kind: ConfigKind, key: &str, value: &Value) -> String {
    format!(
        "Unexpected property \"{}\", or property value type of \"{}\" is incorrect. See {} for allowed properties.",
        key,
        json_type(value),
        docs::configs_reference_url(kind.name())
    )
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn invalid(file: &str, message: impl Into<String>) -> CompileError {
    CompileError::InvalidActionConfig {
        file: file.to_string(),
        message: message.into(),
    }
}
