//! Build-phase handlers, one per source kind

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::actions::{normalize, ActionConfig, ConfigKind, ConfigSource, KindConfig};
use crate::assertions::{self, AssertionParent};
use crate::config::suggest_key;
use crate::docs;
use crate::error::{CompileError, CompileResult};
use crate::models::{
    Action, ActionCommon, Assertion, DataPreparation, DataPreparationContents, Declaration,
    Hermeticity, Notebook, Operation, Table,
};
use crate::parser::{
    self, derive_action_name, has_trailing_semicolon, split_statements, SqlxBlocks,
    TRAILING_SEMICOLON_MESSAGE,
};
use crate::registry::{LinkSpec, SqlTemplates};
use crate::target::{ExplicitTarget, TargetResolver, TargetRole};

use super::script::{ScriptContext, ScriptPurpose};
use super::Build;

/// Entry kinds accepted under `actions:` in an action-config file
const ACTION_CONFIG_KINDS: &[&str] = &[
    "table",
    "view",
    "incrementalTable",
    "operation",
    "assertion",
    "declaration",
    "notebook",
    "dataPreparation",
];

/// What an action is compiled from, besides its config
#[derive(Debug)]
enum Content {
    Sql {
        templates: SqlTemplates,
        interpolate: bool,
        script: Option<String>,
    },
    Notebook(String),
    DataPreparation(DataPreparationContents),
    Empty,
}

/// One entry of the array a definition script evaluates to
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct BuilderEntry {
    action: BuilderAction,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    config: Option<Value>,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    incremental_query: Option<String>,
    #[serde(default)]
    pre_ops: Vec<String>,
    #[serde(default)]
    post_ops: Vec<String>,
    #[serde(default)]
    queries: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum BuilderAction {
    Publish,
    Operate,
    Assert,
    Declare,
}

impl Build<'_> {
    // === SQL-template files ===

    pub(super) fn sql_template_file(&mut self, path: &str, text: &str) -> CompileResult<()> {
        let blocks = match parser::extract_blocks(text) {
            Ok(blocks) => blocks,
            Err(err) => {
                self.errors.file_error(path, err.to_string());
                return Ok(());
            }
        };
        let Some(value) = self.config_block_value(path, &blocks) else {
            return Ok(());
        };

        let kind = sqlx_kind(path, &value)?;
        let config = normalize(&value, kind, ConfigSource::Sqlx, path)?;
        let has_blocks = !blocks.pre_operations.is_empty() || !blocks.post_operations.is_empty();

        let SqlxBlocks {
            script,
            pre_operations,
            post_operations,
            body,
            ..
        } = blocks;
        let templates = match kind {
            ConfigKind::Declaration => {
                if !body.trim().is_empty() || has_blocks {
                    return Err(CompileError::DeclarationWithBody {
                        file: path.to_string(),
                        name: config.name.clone().unwrap_or_else(|| derive_action_name(path)),
                    });
                }
                SqlTemplates::None
            }
            ConfigKind::Table | ConfigKind::View | ConfigKind::Incremental => SqlTemplates::Table {
                query: body,
                incremental_query: None,
                pre_ops: pre_operations,
                post_ops: post_operations,
            },
            ConfigKind::Operation => {
                self.reject_operation_blocks(path, has_blocks);
                SqlTemplates::Operation {
                    queries: split_statements(&body),
                }
            }
            _ => {
                self.reject_operation_blocks(path, has_blocks);
                SqlTemplates::Assertion { query: body }
            }
        };

        let default_name = derive_action_name(path);
        self.register(
            path,
            config,
            &default_name,
            Content::Sql {
                templates,
                interpolate: true,
                script,
            },
        );
        Ok(())
    }

    /// The config block as JSON; `None` after a recorded evaluation failure
    fn config_block_value(&mut self, path: &str, blocks: &SqlxBlocks) -> Option<Value> {
        let Some(content) = blocks.config.as_deref() else {
            return Some(Value::Object(Map::new()));
        };
        if let Some(value) = parser::literal::parse_object_body(content)
            .ok()
            .and_then(|expr| expr.to_json())
        {
            return Some(value);
        }

        let context = ScriptContext {
            file_name: path,
            purpose: ScriptPurpose::ConfigLiteral,
            project_config: &self.settings.active,
            includes: self.includes,
            self_target: None,
            incremental: false,
            preamble: blocks.script.as_deref(),
        };
        match self
            .evaluator
            .evaluate(&format!("({{{}}})", content), &context)
        {
            Ok(value) => Some(value),
            Err(err) => {
                self.errors
                    .file_error(path, format!("Error evaluating config block: {}", err));
                None
            }
        }
    }

    fn reject_operation_blocks(&mut self, path: &str, has_blocks: bool) {
        if has_blocks {
            self.errors.file_error(
                path,
                "pre_operations and post_operations are only allowed for tables, views and incremental tables",
            );
        }
    }

    // === Definition scripts ===

    pub(super) fn script_file(&mut self, path: &str, text: &str) -> CompileResult<()> {
        let context = ScriptContext {
            file_name: path,
            purpose: ScriptPurpose::DefinitionFile,
            project_config: &self.settings.active,
            includes: self.includes,
            self_target: None,
            incremental: false,
            preamble: None,
        };
        let value = match self.evaluator.evaluate(text, &context) {
            Ok(value) => value,
            Err(err) => {
                self.errors.file_error(path, err.to_string());
                return Ok(());
            }
        };

        let entries: Vec<BuilderEntry> =
            serde_json::from_value(value).map_err(|err| CompileError::InvalidScriptResult {
                file: path.to_string(),
                message: err.to_string(),
            })?;
        tracing::debug!(file = path, entries = entries.len(), "evaluated definition script");

        for (index, entry) in entries.into_iter().enumerate() {
            self.builder_entry(path, index, entry)?;
        }
        Ok(())
    }

    fn builder_entry(&mut self, path: &str, index: usize, entry: BuilderEntry) -> CompileResult<()> {
        let invalid_entry = |message: String| CompileError::InvalidScriptResult {
            file: path.to_string(),
            message: format!("entry {}: {}", index, message),
        };

        let mut value = entry.config.unwrap_or_else(|| Value::Object(Map::new()));
        let Some(object) = value.as_object_mut() else {
            return Err(invalid_entry("\"config\" must be an object".to_string()));
        };
        if let Some(name) = &entry.name {
            object
                .entry("name")
                .or_insert_with(|| Value::String(name.clone()));
        }

        let kind = match entry.action {
            BuilderAction::Publish => {
                let kind = sqlx_kind(path, &value)?;
                if !kind.is_table_like() {
                    return Err(invalid_entry(format!(
                        "publish() cannot create a {} action",
                        kind.name()
                    )));
                }
                kind
            }
            BuilderAction::Operate => ConfigKind::Operation,
            BuilderAction::Assert => ConfigKind::Assertion,
            BuilderAction::Declare => ConfigKind::Declaration,
        };
        let config = normalize(&value, kind, ConfigSource::Script, path)?;
        let Some(name) = config.name.clone().filter(|n| !n.is_empty()) else {
            return Err(invalid_entry("every action needs a non-empty name".to_string()));
        };

        let templates = match entry.action {
            BuilderAction::Publish => SqlTemplates::Table {
                query: entry.query.unwrap_or_default(),
                incremental_query: entry.incremental_query,
                pre_ops: entry.pre_ops,
                post_ops: entry.post_ops,
            },
            BuilderAction::Operate => SqlTemplates::Operation {
                queries: match entry.queries {
                    Some(queries) => queries,
                    None => entry
                        .query
                        .as_deref()
                        .map(split_statements)
                        .unwrap_or_default(),
                },
            },
            BuilderAction::Assert => SqlTemplates::Assertion {
                query: entry.query.unwrap_or_default(),
            },
            BuilderAction::Declare => {
                if entry.query.is_some() || entry.queries.is_some() {
                    return Err(CompileError::DeclarationWithBody {
                        file: path.to_string(),
                        name,
                    });
                }
                SqlTemplates::None
            }
        };

        self.register(
            path,
            config,
            &name,
            Content::Sql {
                templates,
                interpolate: true,
                script: None,
            },
        );
        Ok(())
    }

    // === Action-config files ===

    pub(super) fn action_configs_file(&mut self, path: &str, text: &str) -> CompileResult<()> {
        let document: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_yaml_ng::from_str(text).map_err(|err| invalid(path, err.to_string()))?
        };

        let entries = match document {
            Value::Null => Vec::new(),
            Value::Object(mut object) => {
                if let Some(key) = object.keys().find(|key| key.as_str() != "actions") {
                    return Err(unknown_key(path, key, &["actions"]));
                }
                match object.remove("actions") {
                    None | Some(Value::Null) => Vec::new(),
                    Some(Value::Array(entries)) => entries,
                    Some(_) => return Err(invalid(path, "\"actions\" must be a list")),
                }
            }
            _ => return Err(invalid(path, "expected a mapping with an \"actions\" list")),
        };
        if entries.is_empty() {
            return Err(CompileError::EmptyActionConfigs {
                file: path.to_string(),
            });
        }

        for entry in entries {
            self.action_config_entry(path, entry)?;
        }
        Ok(())
    }

    fn action_config_entry(&mut self, path: &str, entry: Value) -> CompileResult<()> {
        let Value::Object(entry) = entry else {
            return Err(invalid(path, "each action must be a mapping with one kind key"));
        };
        let mut entry = entry.into_iter();
        let (Some((key, value)), None) = (entry.next(), entry.next()) else {
            return Err(invalid(path, "each action must have exactly one kind key"));
        };
        let Some(kind) = ConfigKind::from_yaml_key(&key) else {
            return Err(unknown_key(path, &key, ACTION_CONFIG_KINDS));
        };
        let value = match value {
            Value::Null => Value::Object(Map::new()),
            value => value,
        };
        let config = normalize(&value, kind, ConfigSource::ActionsYaml, path)?;

        if kind == ConfigKind::Declaration {
            let name = config.name.clone().unwrap_or_default();
            self.register(path, config, &name, Content::Empty);
            return Ok(());
        }

        let Some(filename) = config.filename.as_deref() else {
            return Err(invalid(
                path,
                format!(
                    "\"filename\" is required for {} actions. See {}",
                    kind.name(),
                    docs::configs_reference_url(kind.name())
                ),
            ));
        };
        let resolved = resolve_relative(path, filename);
        let Some(contents) = self.files.get(&resolved) else {
            return Err(CompileError::FileNotFound {
                file: resolved,
                referenced_from: path.to_string(),
            });
        };
        let contents = contents.to_string();
        let default_name = derive_action_name(&resolved);

        let content = match kind {
            ConfigKind::Notebook => Content::Notebook(self.notebook_contents(&resolved, contents)),
            ConfigKind::DataPreparation => {
                Content::DataPreparation(if resolved.ends_with(".sql") {
                    DataPreparationContents::Sql(contents)
                } else {
                    DataPreparationContents::Yaml(contents)
                })
            }
            ConfigKind::Operation => Content::Sql {
                templates: SqlTemplates::Operation {
                    queries: split_statements(&contents),
                },
                interpolate: false,
                script: None,
            },
            ConfigKind::Assertion => Content::Sql {
                templates: SqlTemplates::Assertion { query: contents },
                interpolate: false,
                script: None,
            },
            _ => Content::Sql {
                templates: SqlTemplates::Table {
                    query: contents,
                    incremental_query: None,
                    pre_ops: Vec::new(),
                    post_ops: Vec::new(),
                },
                interpolate: false,
                script: None,
            },
        };

        self.register(&resolved, config, &default_name, content);
        Ok(())
    }

    /// Notebook JSON with every cell's outputs cleared
    ///
    /// Unparseable notebooks are kept verbatim and reported.
    fn notebook_contents(&mut self, path: &str, contents: String) -> String {
        let mut notebook: Value = match serde_json::from_str(&contents) {
            Ok(notebook) => notebook,
            Err(err) => {
                self.errors
                    .file_error(path, format!("Invalid notebook JSON: {}", err));
                return contents;
            }
        };
        if let Some(cells) = notebook.get_mut("cells").and_then(Value::as_array_mut) {
            for cell in cells {
                if let Some(outputs) = cell.get_mut("outputs") {
                    *outputs = Value::Array(Vec::new());
                }
            }
        }
        serde_json::to_string(&notebook).unwrap_or(contents)
    }

    // === Registration ===

    fn register(&mut self, file_name: &str, config: ActionConfig, default_name: &str, content: Content) {
        let role = match config.kind {
            ConfigKind::Assertion => TargetRole::Assertion,
            ConfigKind::Declaration => TargetRole::Declaration,
            _ => TargetRole::Table,
        };
        let resolver = TargetResolver::new(self.settings);
        let resolved = resolver.resolve(
            ExplicitTarget {
                database: config.database.as_deref(),
                schema: config.schema.as_deref(),
                name: config.name.as_deref().unwrap_or(default_name),
            },
            role,
        );

        let common = ActionCommon {
            target: resolved.target,
            canonical_target: resolved.canonical,
            file_name: file_name.to_string(),
            disabled: config.disabled,
            tags: config.tags.clone(),
            dependency_targets: Vec::new(),
            hermeticity: Hermeticity::resolve(
                config.hermetic,
                config.kind == ConfigKind::Assertion,
            ),
            description: config.description.clone(),
            columns: config.columns.clone(),
        };

        let (templates, interpolate, script, payload) = match content {
            Content::Sql {
                templates,
                interpolate,
                script,
            } => (templates, interpolate, script, Payload::None),
            Content::Notebook(contents) => {
                (SqlTemplates::None, false, None, Payload::Notebook(contents))
            }
            Content::DataPreparation(contents) => (
                SqlTemplates::None,
                false,
                None,
                Payload::DataPreparation(contents),
            ),
            Content::Empty => (SqlTemplates::None, false, None, Payload::None),
        };
        let action = match (&config.details, payload) {
            (KindConfig::Table(table), _) => Action::Table(Table {
                common,
                table_type: table.table_type,
                unique_key: table.unique_key.clone(),
                on_schema_change: table.on_schema_change,
                materialized: table.materialized,
                protected: table.protected,
                bigquery: table.bigquery.clone(),
                ..Table::default()
            }),
            (KindConfig::Operation(operation), _) => Action::Operation(Operation {
                common,
                queries: Vec::new(),
                has_output: operation.has_output,
            }),
            (KindConfig::Assertion, _) => Action::Assertion(Assertion {
                common,
                ..Assertion::default()
            }),
            (KindConfig::Notebook, Payload::Notebook(notebook_contents)) => {
                Action::Notebook(Notebook {
                    common,
                    notebook_contents,
                    runtime_options: self.settings.active.default_notebook_runtime_options.clone(),
                })
            }
            (KindConfig::DataPreparation, Payload::DataPreparation(contents)) => {
                Action::DataPreparation(DataPreparation { common, contents })
            }
            _ => Action::Declaration(Declaration { common }),
        };

        let action_name = action.target().to_string();
        let builtins = config.builtin_assertions().filter(|b| !b.is_empty());
        let parent = builtins.map(|_| action.common().clone());
        self.registry.register(
            action,
            LinkSpec {
                dependencies: config.dependencies.clone(),
                depend_on_dependency_assertions: config.depend_on_dependency_assertions,
                templates: templates.clone(),
                interpolate,
                script,
            },
        );
        self.check_semicolons(file_name, &action_name, &templates);

        if let (Some(builtins), Some(parent)) = (builtins, parent) {
            assertions::synthesize(
                &mut self.registry,
                &resolver,
                self.settings.active.warehouse,
                AssertionParent {
                    common: &parent,
                    explicit_database: config.database.as_deref(),
                },
                builtins,
            );
        }
    }

    fn check_semicolons(&mut self, file_name: &str, action_name: &str, templates: &SqlTemplates) {
        let sql: Vec<&String> = match templates {
            SqlTemplates::Table {
                query,
                incremental_query,
                pre_ops,
                post_ops,
            } => std::iter::once(query)
                .chain(incremental_query)
                .chain(pre_ops)
                .chain(post_ops)
                .collect(),
            SqlTemplates::Assertion { query } => vec![query],
            SqlTemplates::Operation { .. } | SqlTemplates::None => Vec::new(),
        };
        if sql.iter().any(|s| has_trailing_semicolon(s)) {
            self.errors
                .push(Some(file_name), Some(action_name), TRAILING_SEMICOLON_MESSAGE);
        }
    }
}

/// Non-SQL content an action carries
enum Payload {
    Notebook(String),
    DataPreparation(DataPreparationContents),
    None,
}

/// Kind named by a config's `type`, defaulting to a table
fn sqlx_kind(path: &str, value: &Value) -> CompileResult<ConfigKind> {
    match value.get("type") {
        None => Ok(ConfigKind::Table),
        Some(Value::String(name)) => ConfigKind::from_sqlx_type(name).ok_or_else(|| {
            invalid(
                path,
                format!(
                    "Unknown action type \"{}\". Expected one of table, view, incremental, operations, assertion, declaration. See {}",
                    name,
                    docs::configs_reference_url("type")
                ),
            )
        }),
        Some(other) => Err(invalid(
            path,
            format!(
                "The \"type\" property must be a string, found {}. See {}",
                other,
                docs::configs_reference_url("type")
            ),
        )),
    }
}

/// Join `filename` onto the directory of `from`, folding `.` and `..`
fn resolve_relative(from: &str, filename: &str) -> String {
    let mut parts: Vec<&str> = from.split('/').collect();
    parts.pop();
    for segment in filename.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            segment => parts.push(segment),
        }
    }
    parts.join("/")
}

fn invalid(file: &str, message: impl Into<String>) -> CompileError {
    CompileError::InvalidActionConfig {
        file: file.to_string(),
        message: message.into(),
    }
}

fn unknown_key(file: &str, key: &str, allowed: &[&str]) -> CompileError {
    let mut message = format!("Unexpected property \"{}\"", key);
    if let Some(suggestion) = suggest_key(key, allowed) {
        message.push_str(&format!(". Did you mean \"{}\"?", suggestion));
    }
    message.push_str(&format!(" See {}", docs::configs_reference_url("actions")));
    invalid(file, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_folds_dots() {
        assert_eq!(
            resolve_relative("definitions/actions.yaml", "table.sql"),
            "definitions/table.sql"
        );
        assert_eq!(
            resolve_relative("definitions/sub/actions.yaml", "./a.sql"),
            "definitions/sub/a.sql"
        );
        assert_eq!(
            resolve_relative("definitions/sub/actions.yaml", "../shared/b.sql"),
            "definitions/shared/b.sql"
        );
    }

    #[test]
    fn test_sqlx_kind_defaults_to_table() {
        let value = serde_json::json!({});
        assert_eq!(sqlx_kind("f.sqlx", &value).unwrap(), ConfigKind::Table);
        let value = serde_json::json!({"type": "operations"});
        assert_eq!(sqlx_kind("f.sqlx", &value).unwrap(), ConfigKind::Operation);
        let value = serde_json::json!({"type": "tabel"});
        assert!(matches!(
            sqlx_kind("f.sqlx", &value),
            Err(CompileError::InvalidActionConfig { .. })
        ));
        let value = serde_json::json!({"type": 3});
        assert!(sqlx_kind("f.sqlx", &value).is_err());
    }
}
