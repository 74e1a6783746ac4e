//! Core data model
//!
//! - `Target`: database/schema/name address of an action's output
//! - `DependencyReference`: a by-name reference plus its assertion-propagation flag
//! - `Action`: tagged variant over every compilable kind
//! - `CompiledGraph`: the single artifact handed to downstream executors

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::config::{NotebookRuntimeOptions, ProjectConfig};
use crate::error::CompilationError;

/// Address of an object in the warehouse
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Target {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub name: String,
}

impl Target {
    pub fn new(
        database: Option<String>,
        schema: Option<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            database,
            schema,
            name: name.into(),
        }
    }

    /// `schema.name`, the form used when suggesting candidates
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(database) = &self.database {
            write!(f, "{}.", database)?;
        }
        if let Some(schema) = &self.schema {
            write!(f, "{}.", schema)?;
        }
        write!(f, "{}", self.name)
    }
}

/// Whether an action's output depends only on its declared dependencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Hermeticity {
    Hermetic,
    #[default]
    NonHermetic,
}

impl Hermeticity {
    /// Assertions are hermetic unless told otherwise; everything else is not.
    pub fn resolve(explicit: Option<bool>, hermetic_by_default: bool) -> Self {
        match explicit.unwrap_or(hermetic_by_default) {
            true => Hermeticity::Hermetic,
            false => Hermeticity::NonHermetic,
        }
    }
}

/// A reference to another action by (possibly partial) name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DependencyReference {
    pub database: Option<String>,
    pub schema: Option<String>,
    pub name: String,
    /// Tri-state: unset, or explicitly true/false at this reference site
    pub include_dependent_assertions: Option<bool>,
}

impl DependencyReference {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse `name`, `schema.name` or `database.schema.name`
    pub fn parse(reference: &str) -> Self {
        let parts: Vec<&str> = reference.split('.').collect();
        match parts.as_slice() {
            [schema, name] => Self {
                schema: Some(schema.to_string()),
                name: name.to_string(),
                ..Self::default()
            },
            [database, schema, name] => Self {
                database: Some(database.to_string()),
                schema: Some(schema.to_string()),
                name: name.to_string(),
                ..Self::default()
            },
            _ => Self::named(reference),
        }
    }

    pub fn with_include_dependent_assertions(mut self, include: Option<bool>) -> Self {
        self.include_dependent_assertions = include;
        self
    }
}

impl fmt::Display for DependencyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(database) = &self.database {
            write!(f, "{}.", database)?;
        }
        if let Some(schema) = &self.schema {
            write!(f, "{}.", schema)?;
        }
        write!(f, "{}", self.name)
    }
}

/// Attributes shared by every action kind
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCommon {
    pub target: Target,
    pub canonical_target: Target,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependency_targets: Vec<Target>,
    pub hermeticity: Hermeticity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub columns: BTreeMap<String, ColumnDescriptor>,
}

/// Documentation attached to one output column
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bigquery_policy_tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TableType {
    #[default]
    Table,
    View,
    Incremental,
}

impl TableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableType::Table => "table",
            TableType::View => "view",
            TableType::Incremental => "incremental",
        }
    }
}

/// What an incremental table does when its schema changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnSchemaChange {
    Ignore,
    Fail,
    Extend,
    Synchronize,
}

/// BigQuery-specific table options
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BigQueryOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_by: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_partition_filter: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_expiration_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_partition_filter: Option<bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    #[serde(flatten)]
    pub common: ActionCommon,
    #[serde(rename = "type")]
    pub table_type: TableType,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incremental_query: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_ops: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_ops: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incremental_pre_ops: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incremental_post_ops: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique_key: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_schema_change: Option<OnSchemaChange>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub materialized: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub protected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bigquery: Option<BigQueryOptions>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(flatten)]
    pub common: ActionCommon,
    pub queries: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_output: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assertion {
    #[serde(flatten)]
    pub common: ActionCommon,
    pub query: String,
    /// Set only on synthesized built-in assertions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_action: Option<Target>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Declaration {
    #[serde(flatten)]
    pub common: ActionCommon,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notebook {
    #[serde(flatten)]
    pub common: ActionCommon,
    /// Notebook JSON with cell outputs cleared
    pub notebook_contents: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_options: Option<NotebookRuntimeOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataPreparationContents {
    Yaml(String),
    Sql(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPreparation {
    #[serde(flatten)]
    pub common: ActionCommon,
    pub contents: DataPreparationContents,
}

/// Kind discriminator for actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Table,
    Operation,
    Assertion,
    Declaration,
    Notebook,
    DataPreparation,
}

/// One named, compilable unit
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Table(Table),
    Operation(Operation),
    Assertion(Assertion),
    Declaration(Declaration),
    Notebook(Notebook),
    DataPreparation(DataPreparation),
}

impl Action {
    pub fn common(&self) -> &ActionCommon {
        match self {
            Action::Table(a) => &a.common,
            Action::Operation(a) => &a.common,
            Action::Assertion(a) => &a.common,
            Action::Declaration(a) => &a.common,
            Action::Notebook(a) => &a.common,
            Action::DataPreparation(a) => &a.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut ActionCommon {
        match self {
            Action::Table(a) => &mut a.common,
            Action::Operation(a) => &mut a.common,
            Action::Assertion(a) => &mut a.common,
            Action::Declaration(a) => &mut a.common,
            Action::Notebook(a) => &mut a.common,
            Action::DataPreparation(a) => &mut a.common,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Table(_) => ActionKind::Table,
            Action::Operation(_) => ActionKind::Operation,
            Action::Assertion(_) => ActionKind::Assertion,
            Action::Declaration(_) => ActionKind::Declaration,
            Action::Notebook(_) => ActionKind::Notebook,
            Action::DataPreparation(_) => ActionKind::DataPreparation,
        }
    }

    pub fn target(&self) -> &Target {
        &self.common().target
    }

    pub fn canonical_target(&self) -> &Target {
        &self.common().canonical_target
    }

    /// Parent of a synthesized built-in assertion
    pub fn parent_action(&self) -> Option<&Target> {
        match self {
            Action::Assertion(a) => a.parent_action.as_ref(),
            _ => None,
        }
    }
}

/// Recoverable errors of one compilation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphErrors {
    pub compilation_errors: Vec<CompilationError>,
}

/// The compiled, fully resolved dependency graph
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledGraph {
    pub project_config: ProjectConfig,
    pub tables: Vec<Table>,
    pub operations: Vec<Operation>,
    pub assertions: Vec<Assertion>,
    pub declarations: Vec<Declaration>,
    pub notebooks: Vec<Notebook>,
    pub data_preparations: Vec<DataPreparation>,
    /// Distinct action targets in registration order
    pub targets: Vec<Target>,
    pub graph_errors: GraphErrors,
    pub dataform_core_version: String,
}

impl CompiledGraph {
    /// Assemble a graph from frozen actions, preserving registration order per kind
    pub fn from_actions(
        project_config: ProjectConfig,
        actions: Vec<Action>,
        errors: Vec<CompilationError>,
        version: impl Into<String>,
    ) -> Self {
        let mut graph = CompiledGraph {
            project_config,
            dataform_core_version: version.into(),
            graph_errors: GraphErrors {
                compilation_errors: errors,
            },
            ..CompiledGraph::default()
        };
        let mut targets = IndexSet::new();
        for action in actions {
            targets.insert(action.target().clone());
            match action {
                Action::Table(a) => graph.tables.push(a),
                Action::Operation(a) => graph.operations.push(a),
                Action::Assertion(a) => graph.assertions.push(a),
                Action::Declaration(a) => graph.declarations.push(a),
                Action::Notebook(a) => graph.notebooks.push(a),
                Action::DataPreparation(a) => graph.data_preparations.push(a),
            }
        }
        graph.targets = targets.into_iter().collect();
        graph
    }

    pub fn errors(&self) -> &[CompilationError] {
        &self.graph_errors.compilation_errors
    }

    pub fn has_errors(&self) -> bool {
        !self.graph_errors.compilation_errors.is_empty()
    }

    pub fn action_count(&self) -> usize {
        self.tables.len()
            + self.operations.len()
            + self.assertions.len()
            + self.declarations.len()
            + self.notebooks.len()
            + self.data_preparations.len()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.common.target.name == name)
    }

    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|o| o.common.target.name == name)
    }

    pub fn assertion(&self, name: &str) -> Option<&Assertion> {
        self.assertions.iter().find(|a| a.common.target.name == name)
    }
}
