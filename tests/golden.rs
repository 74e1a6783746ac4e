//! Golden tests for compiled SQL
//!
//! Inline snapshots of the SQL the compiler generates for built-in
//! assertions and of a small project's rendered graph.

use dataform_compiler::{compile, CompileOptions, CompiledGraph, NoScriptRuntime, ProjectFiles};
use insta::assert_snapshot;

const BIGQUERY_SETTINGS: &str =
    "defaultProject: proj\ndefaultDataset: analytics\ndefaultLocation: US\n";

fn compile_project(settings: (&str, &str), files: &[(&str, &str)]) -> CompiledGraph {
    let mut project = ProjectFiles::new();
    project.insert(settings.0, settings.1);
    for (path, contents) in files {
        project.insert(*path, *contents);
    }
    let graph = compile(&project, &NoScriptRuntime, &CompileOptions::default())
        .expect("golden project compiles");
    assert!(!graph.has_errors(), "{:?}", graph.errors());
    graph
}

fn assertion_query<'a>(graph: &'a CompiledGraph, suffix: &str) -> &'a str {
    graph
        .assertions
        .iter()
        .find(|a| a.common.target.name.ends_with(suffix))
        .map(|a| a.query.as_str())
        .unwrap_or_else(|| panic!("no assertion ending in {suffix}"))
}

#[test]
fn golden_unique_key_assertion() {
    let graph = compile_project(
        ("workflow_settings.yaml", BIGQUERY_SETTINGS),
        &[(
            "definitions/t.sqlx",
            r#"config { assertions: { uniqueKey: ["a", "b"] } } SELECT 1 AS a, 2 AS b"#,
        )],
    );
    assert_snapshot!(assertion_query(&graph, "uniqueKey_0"), @r"
    SELECT
      *
    FROM (
      SELECT
        a, b,
        COUNT(1) AS index_row_count
      FROM `proj.analytics.t`
      GROUP BY a, b
      ) AS data
    WHERE index_row_count > 1
    ");
}

#[test]
fn golden_row_conditions_assertion() {
    let graph = compile_project(
        ("workflow_settings.yaml", BIGQUERY_SETTINGS),
        &[(
            "definitions/t.sqlx",
            r#"config { assertions: { rowConditions: ["x > 1"], nonNull: ["y"] } } SELECT 2 AS x, 3 AS y"#,
        )],
    );
    assert_snapshot!(assertion_query(&graph, "rowConditions"), @r"
    SELECT
      'x > 1' AS failing_row_condition,
      *
    FROM `proj.analytics.t`
    WHERE NOT (x > 1)
    UNION ALL
    SELECT
      'y IS NOT NULL' AS failing_row_condition,
      *
    FROM `proj.analytics.t`
    WHERE NOT (y IS NOT NULL)
    ");
}

#[test]
fn golden_row_condition_with_quote_is_escaped() {
    let graph = compile_project(
        ("workflow_settings.yaml", BIGQUERY_SETTINGS),
        &[(
            "definitions/t.sqlx",
            r#"config { assertions: { rowConditions: ["name != 'n/a'"] } } SELECT 'x' AS name"#,
        )],
    );
    assert_snapshot!(assertion_query(&graph, "rowConditions"), @r"
    SELECT
      'name != \'n/a\'' AS failing_row_condition,
      *
    FROM `proj.analytics.t`
    WHERE NOT (name != 'n/a')
    ");
}

#[test]
fn golden_snowflake_quoting() {
    let graph = compile_project(
        (
            "dataform.json",
            r#"{"warehouse": "snowflake", "defaultDatabase": "DB", "defaultSchema": "PUBLIC"}"#,
        ),
        &[
            (
                "definitions/t.sqlx",
                r#"config { assertions: { nonNull: ["id"] } } SELECT 1 AS id"#,
            ),
            ("definitions/v.sqlx", r#"config { type: "view" } SELECT * FROM ${ref("t")}"#),
        ],
    );
    assert_snapshot!(&graph.table("v").unwrap().query, @r#"SELECT * FROM "DB"."PUBLIC"."t""#);
    assert_snapshot!(assertion_query(&graph, "rowConditions"), @r#"
    SELECT
      'id IS NOT NULL' AS failing_row_condition,
      *
    FROM "DB"."PUBLIC"."t"
    WHERE NOT (id IS NOT NULL)
    "#);
}

#[test]
fn golden_rendered_graph_outline() {
    let graph = compile_project(
        ("workflow_settings.yaml", BIGQUERY_SETTINGS),
        &[
            ("definitions/sources/raw.sqlx", r#"config { type: "declaration", schema: "landing" }"#),
            (
                "definitions/staging/orders.sqlx",
                "config { type: \"incremental\", uniqueKey: [\"id\"] }\nSELECT * FROM ${ref(\"raw\")}\n${when(incremental(), `WHERE ts > (SELECT MAX(ts) FROM ${self()})`)}\n",
            ),
            (
                "definitions/reporting/daily.sqlx",
                "config { type: \"view\", schema: \"reporting\" }\nSELECT COUNT(*) AS n FROM ${ref(\"orders\")}\n",
            ),
        ],
    );

    let mut outline = String::new();
    for table in &graph.tables {
        outline.push_str(&format!(
            "{} [{}]\n  query: {}\n",
            table.common.target,
            table.table_type.as_str(),
            table.query
        ));
        if let Some(incremental) = &table.incremental_query {
            outline.push_str(&format!("  incremental: {}\n", incremental));
        }
        for dependency in &table.common.dependency_targets {
            outline.push_str(&format!("  depends on: {}\n", dependency));
        }
    }
    assert_snapshot!(&outline, @r"
    proj.reporting.daily [view]
      query: SELECT COUNT(*) AS n FROM `proj.analytics.orders`
      depends on: proj.analytics.orders
    proj.analytics.orders [incremental]
      query: SELECT * FROM `proj.landing.raw`
      incremental: SELECT * FROM `proj.landing.raw`
    WHERE ts > (SELECT MAX(ts) FROM `proj.analytics.orders`)
      depends on: proj.landing.raw
    ");
}
