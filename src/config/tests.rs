//! Tests for the config module

use super::loader::*;
use super::types::*;
use crate::error::CompileError;
use crate::models::Target;
use crate::project::ProjectFiles;

const VERSION: &str = "3.0.0";

fn files(entries: &[(&str, &str)]) -> ProjectFiles {
    let mut files = ProjectFiles::new();
    for (path, contents) in entries {
        files.insert(*path, *contents);
    }
    files
}

#[test]
fn test_workflow_settings_maps_to_project_config() {
    let yaml = r#"
defaultProject: my-project
defaultDataset: analytics
defaultLocation: US
defaultAssertionDataset: checks
projectSuffix: dev
datasetSuffix: staging
namePrefix: pr
vars:
  region: emea
defaultNotebookRuntimeOptions:
  outputBucket: gs://bucket
"#;
    let config = parse_workflow_settings(yaml).unwrap();

    assert_eq!(config.warehouse, Warehouse::Bigquery);
    assert_eq!(config.default_database.as_deref(), Some("my-project"));
    assert_eq!(config.default_schema.as_deref(), Some("analytics"));
    assert_eq!(config.default_location.as_deref(), Some("US"));
    assert_eq!(config.assertion_schema(), "checks");
    assert_eq!(config.database_suffix.as_deref(), Some("dev"));
    assert_eq!(config.schema_suffix.as_deref(), Some("staging"));
    assert_eq!(config.table_prefix.as_deref(), Some("pr"));
    assert_eq!(config.vars.get("region").map(String::as_str), Some("emea"));
    assert_eq!(
        config
            .default_notebook_runtime_options
            .and_then(|o| o.output_bucket)
            .as_deref(),
        Some("gs://bucket")
    );
}

#[test]
fn test_empty_workflow_settings_is_default() {
    let config = parse_workflow_settings("  \n").unwrap();
    assert_eq!(config, ProjectConfig::default());
    assert_eq!(config.assertion_schema(), DEFAULT_ASSERTION_SCHEMA);
}

#[test]
fn test_unknown_workflow_setting_is_fatal_with_suggestion() {
    let err = parse_workflow_settings("defaultDatset: analytics\n").unwrap_err();
    match err {
        CompileError::UnknownSetting {
            key, suggestion, ..
        } => {
            assert_eq!(key, "defaultDatset");
            assert_eq!(suggestion.as_deref(), Some("defaultDataset"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_malformed_workflow_settings_is_fatal() {
    let err = parse_workflow_settings("defaultDataset: [unclosed\n").unwrap_err();
    assert!(matches!(err, CompileError::InvalidSettings { .. }));
}

#[test]
fn test_non_string_var_is_fatal() {
    let err = parse_workflow_settings("vars:\n  retries: 3\n").unwrap_err();
    match err {
        CompileError::NonStringVariable { name } => assert_eq!(name, "retries"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_legacy_settings_parse() {
    let json = r#"{
        "warehouse": "snowflake",
        "defaultSchema": "public",
        "schemaSuffix": "dev",
        "tablePrefix": "x",
        "vars": {"a": "b"}
    }"#;
    let config = parse_legacy_settings(json).unwrap();
    assert_eq!(config.warehouse, Warehouse::Snowflake);
    assert_eq!(config.default_schema.as_deref(), Some("public"));
    assert_eq!(config.schema_suffix.as_deref(), Some("dev"));
    assert_eq!(config.table_prefix.as_deref(), Some("x"));
}

#[test]
fn test_legacy_settings_unknown_key_is_fatal() {
    let err = parse_legacy_settings(r#"{"defaultSchemas": "x"}"#).unwrap_err();
    assert!(matches!(err, CompileError::UnknownSetting { .. }));
}

#[test]
fn test_both_settings_files_is_fatal() {
    let files = files(&[
        ("workflow_settings.yaml", "defaultDataset: a\n"),
        ("dataform.json", "{}"),
    ]);
    let err = load_project_settings(&files, None, VERSION).unwrap_err();
    assert!(matches!(err, CompileError::AmbiguousSettings));
}

#[test]
fn test_no_settings_file_is_fatal() {
    let files = files(&[("definitions/a.sqlx", "SELECT 1")]);
    let err = load_project_settings(&files, None, VERSION).unwrap_err();
    assert!(matches!(err, CompileError::MissingSettings));
}

#[test]
fn test_version_mismatch_is_fatal() {
    let files = files(&[("workflow_settings.yaml", "dataformCoreVersion: 2.9.0\n")]);
    let err = load_project_settings(&files, None, VERSION).unwrap_err();
    assert!(matches!(err, CompileError::VersionMismatch { .. }));

    let files = self::files(&[("workflow_settings.yaml", "dataformCoreVersion: 3.0.0\n")]);
    assert!(load_project_settings(&files, None, VERSION).is_ok());
}

#[test]
fn test_override_merges_shallow_and_vars_keywise() {
    let files = files(&[(
        "workflow_settings.yaml",
        "defaultDataset: analytics\ndatasetSuffix: a\nvars:\n  keep: k\n  replace: old\n",
    )]);
    let overrides = ProjectConfigOverride {
        schema_suffix: Some("b".to_string()),
        vars: [("replace".to_string(), "new".to_string())].into(),
        ..ProjectConfigOverride::default()
    };

    let settings = load_project_settings(&files, Some(&overrides), VERSION).unwrap();
    assert_eq!(settings.active.default_schema.as_deref(), Some("analytics"));
    assert_eq!(settings.active.schema_suffix.as_deref(), Some("b"));
    assert_eq!(settings.active.vars["keep"], "k");
    assert_eq!(settings.active.vars["replace"], "new");

    assert_eq!(settings.canonical.schema_suffix, None);
    assert_eq!(settings.canonical.vars["replace"], "old");
}

#[test]
fn test_override_json_rejects_unknown_fields() {
    let result: Result<ProjectConfigOverride, _> =
        serde_json::from_str(r#"{"schemaSufix": "x"}"#);
    assert!(result.is_err());
}

#[test]
fn test_quote_target_per_warehouse() {
    let target = Target::new(Some("p".into()), Some("s".into()), "t");
    assert_eq!(Warehouse::Bigquery.quote_target(&target), "`p.s.t`");
    assert_eq!(Warehouse::Snowflake.quote_target(&target), "\"p\".\"s\".\"t\"");

    let target = Target::new(None, Some("s".into()), "t");
    assert_eq!(Warehouse::Bigquery.quote_target(&target), "`s.t`");
    assert_eq!(Warehouse::Postgres.quote_target(&target), "\"s\".\"t\"");
}

#[test]
fn test_quote_string_escapes_per_warehouse() {
    assert_eq!(Warehouse::Bigquery.quote_string("a = 'x'"), r"'a = \'x\''");
    assert_eq!(Warehouse::Postgres.quote_string("a = 'x'"), "'a = ''x'''");
}

#[test]
fn test_suggest_key_threshold() {
    assert_eq!(
        suggest_key("namePrefx", WORKFLOW_SETTINGS_KEYS).as_deref(),
        Some("namePrefix")
    );
    assert_eq!(suggest_key("totallyUnrelated", WORKFLOW_SETTINGS_KEYS), None);
}
