//! Built-in assertion contracts (ASSERT-001)
//!
//! `rowConditions` yields one assertion that checks every condition and
//! points back at its parent.

use dataform_compiler::Target;

use crate::common::*;

/// CONTRACT ASSERT-001: Row conditions become one linked assertion
mod row_conditions {
    use super::*;

    #[test]
    fn contract_row_condition_assertion_points_at_parent() {
        let graph = Project::new()
            .definition(
                "t.sqlx",
                r#"config { assertions: { rowConditions: ["x > 1"] } } SELECT 2 AS x"#,
            )
            .compile();
        assert!(!graph.has_errors(), "{:?}", messages(&graph));
        assert_eq!(graph.assertions.len(), 1);

        let parent = Target::new(Some("proj".into()), Some("analytics".into()), "t");
        let assertion = &graph.assertions[0];
        assert_eq!(assertion.parent_action.as_ref(), Some(&parent));
        assert_eq!(assertion.common.dependency_targets, vec![parent]);
        assert!(assertion.query.contains("'x > 1' AS failing_row_condition"));
        assert!(assertion.query.contains("`proj.analytics.t`"));
    }

    #[test]
    fn contract_parent_action_uses_effective_target() {
        let graph = Project::with_settings(SETTINGS_WITH_TRANSFORMS)
            .definition(
                "t.sqlx",
                r#"config { assertions: { rowConditions: ["x > 1"] } } SELECT 2 AS x"#,
            )
            .compile();
        let parent = graph.assertions[0].parent_action.clone().unwrap();
        assert_eq!(parent, graph.table("tmp_t").unwrap().common.target);
    }

    #[test]
    fn contract_disabled_parent_disables_assertion() {
        let graph = Project::new()
            .definition(
                "t.sqlx",
                r#"config { disabled: true, assertions: { nonNull: ["x"] } } SELECT 2 AS x"#,
            )
            .compile();
        assert!(graph.assertions[0].common.disabled);
    }
}
