//! Action-count contracts (ACTIONS-001, ACTIONS-002)
//!
//! The graph holds one action per source config entry, plus exactly the
//! assertions its shorthand `assertions` config implies.

use crate::common::*;

/// CONTRACT ACTIONS-001: One action per config entry
mod one_per_entry {
    use super::*;

    #[test]
    fn contract_each_entry_becomes_one_action() {
        let graph = Project::new()
            .definition("sources.sqlx", SOURCE_DECLARATION)
            .definition("orders.sqlx", "SELECT 1 AS order_id")
            .definition("daily.sqlx", DAILY_VIEW)
            .definition(
                "actions.yaml",
                "actions:\n- table:\n    filename: plain.sql\n- operation:\n    filename: cleanup.sql\n- declaration:\n    name: lookup\n",
            )
            .definition("plain.sql", "SELECT 2 AS y")
            .definition("cleanup.sql", "DELETE FROM t WHERE TRUE")
            .compile();

        assert!(!graph.has_errors(), "{:?}", messages(&graph));
        assert_eq!(graph.tables.len(), 3);
        assert_eq!(graph.operations.len(), 1);
        assert_eq!(graph.declarations.len(), 2);
        assert!(graph.assertions.is_empty());
        assert_eq!(graph.action_count(), 6);
    }

    #[test]
    fn contract_plain_sql_files_outside_action_configs_are_not_actions() {
        let graph = Project::new()
            .definition("t.sqlx", "SELECT 1")
            .definition("stray.sql", "SELECT 2")
            .file("includes/helpers.js", "module.exports = {};")
            .compile();
        assert_eq!(graph.action_count(), 1);
    }
}

/// CONTRACT ACTIONS-002: Synthesized assertions match the shorthand config
mod synthesized {
    use super::*;

    #[test]
    fn contract_unique_keys_and_row_conditions_add_exact_count() {
        let graph = Project::new()
            .definition(
                "t.sqlx",
                r#"config {
  type: "table",
  assertions: {
    uniqueKeys: [["a"], ["b", "c"]],
    nonNull: ["a"],
    rowConditions: ["b > 0"]
  }
}
SELECT 1 AS a, 2 AS b, 3 AS c"#,
            )
            .compile();

        assert!(!graph.has_errors(), "{:?}", messages(&graph));
        assert_eq!(graph.tables.len(), 1);
        let names: Vec<&str> = graph
            .assertions
            .iter()
            .map(|a| a.common.target.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "analytics_t_assertions_uniqueKey_0",
                "analytics_t_assertions_uniqueKey_1",
                "analytics_t_assertions_rowConditions",
            ]
        );
    }

    #[test]
    fn contract_empty_assertions_config_adds_nothing() {
        let graph = Project::new()
            .definition("t.sqlx", r#"config { assertions: {} } SELECT 1"#)
            .compile();
        assert!(graph.assertions.is_empty());
        assert_eq!(graph.action_count(), 1);
    }
}
