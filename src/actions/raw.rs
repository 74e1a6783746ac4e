//! Wire shape of action configs, before normalization

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::models::{ColumnDescriptor, DependencyReference, OnSchemaChange};

/// A single value or a list of them
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

/// `"name"`, `"schema.name"`, `"db.schema.name"` or an object target
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum DependencySpec {
    Name(String),
    Target(DependencyTarget),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct DependencyTarget {
    pub name: String,
    #[serde(default, alias = "dataset")]
    pub schema: Option<String>,
    #[serde(default, alias = "project")]
    pub database: Option<String>,
    #[serde(default)]
    pub include_dependent_assertions: Option<bool>,
}

impl From<DependencySpec> for DependencyReference {
    fn from(spec: DependencySpec) -> Self {
        match spec {
            DependencySpec::Name(name) => DependencyReference::parse(&name),
            DependencySpec::Target(target) => DependencyReference {
                database: target.database,
                schema: target.schema,
                name: target.name,
                include_dependent_assertions: target.include_dependent_assertions,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ColumnSpec {
    Description(String),
    Detailed(ColumnDetail),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct ColumnDetail {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub bigquery_policy_tags: Option<OneOrMany<String>>,
}

impl ColumnSpec {
    pub fn into_descriptor(self) -> ColumnDescriptor {
        match self {
            ColumnSpec::Description(description) => ColumnDescriptor {
                description,
                ..ColumnDescriptor::default()
            },
            ColumnSpec::Detailed(detail) => ColumnDescriptor {
                description: detail.description.unwrap_or_default(),
                bigquery_policy_tags: detail
                    .bigquery_policy_tags
                    .map(OneOrMany::into_vec)
                    .unwrap_or_default(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct RawAssertions {
    #[serde(default)]
    pub unique_key: Option<Vec<String>>,
    #[serde(default)]
    pub unique_keys: Option<Vec<Vec<String>>>,
    #[serde(default)]
    pub non_null: Option<OneOrMany<String>>,
    #[serde(default)]
    pub row_conditions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct RawBigQuery {
    #[serde(default)]
    pub partition_by: Option<String>,
    #[serde(default)]
    pub cluster_by: Option<Vec<String>>,
    #[serde(default)]
    pub update_partition_filter: Option<String>,
    #[serde(default)]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub partition_expiration_days: Option<u32>,
    #[serde(default)]
    pub require_partition_filter: Option<bool>,
    #[serde(default)]
    pub additional_options: Option<BTreeMap<String, String>>,
}

/// Every field any kind accepts; which ones a kind may use is checked
/// separately, against the key list of that kind
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "dataset")]
    pub schema: Option<String>,
    #[serde(default, alias = "project")]
    pub database: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<OneOrMany<String>>,
    #[serde(default)]
    pub disabled: Option<bool>,
    #[serde(default, alias = "dependencyTargets")]
    pub dependencies: Option<OneOrMany<DependencySpec>>,
    #[serde(default)]
    pub hermetic: Option<bool>,
    #[serde(default)]
    pub depend_on_dependency_assertions: Option<bool>,
    #[serde(default)]
    pub columns: Option<BTreeMap<String, ColumnSpec>>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub protected: Option<bool>,
    #[serde(default)]
    pub materialized: Option<bool>,
    #[serde(default)]
    pub unique_key: Option<OneOrMany<String>>,
    #[serde(default)]
    pub on_schema_change: Option<OnSchemaChange>,
    #[serde(default)]
    pub assertions: Option<RawAssertions>,
    #[serde(default)]
    pub bigquery: Option<RawBigQuery>,
    #[serde(default)]
    pub has_output: Option<bool>,
}
