//! Target contracts (TARGET-001, TARGET-002)
//!
//! Canonical targets never see the environment transforms; effective
//! targets apply them deterministically, except declaration names.

use dataform_compiler::{ProjectConfigOverride, Target};

use crate::common::*;

fn transformed_project(settings: &str) -> Project {
    Project::with_settings(settings)
        .definition("raw.sqlx", SOURCE_DECLARATION)
        .definition("orders.sqlx", ORDERS_TABLE)
        .definition("daily.sqlx", DAILY_VIEW)
}

fn canonical_targets(graph: &dataform_compiler::CompiledGraph) -> Vec<Target> {
    let mut targets: Vec<Target> = graph
        .tables
        .iter()
        .map(|t| t.common.canonical_target.clone())
        .chain(graph.declarations.iter().map(|d| d.common.canonical_target.clone()))
        .chain(graph.assertions.iter().map(|a| a.common.canonical_target.clone()))
        .collect();
    targets.sort_by_key(|t| t.to_string());
    targets
}

/// CONTRACT TARGET-001: Canonical targets are transform-invariant
mod canonical {
    use super::*;

    #[test]
    fn contract_settings_transforms_leave_canonical_targets_alone() {
        let plain = transformed_project(SETTINGS).compile();
        let transformed = transformed_project(SETTINGS_WITH_TRANSFORMS).compile();

        assert!(!plain.has_errors(), "{:?}", messages(&plain));
        assert!(!transformed.has_errors(), "{:?}", messages(&transformed));
        assert_eq!(canonical_targets(&plain), canonical_targets(&transformed));
    }

    #[test]
    fn contract_runtime_transforms_leave_canonical_targets_alone() {
        let plain = transformed_project(SETTINGS).compile();
        let overridden = transformed_project(SETTINGS)
            .overrides(ProjectConfigOverride {
                database_suffix: Some("ci".into()),
                schema_suffix: Some("pr42".into()),
                table_prefix: Some("pr42".into()),
                ..ProjectConfigOverride::default()
            })
            .compile();
        assert_eq!(canonical_targets(&plain), canonical_targets(&overridden));
        assert_eq!(plain.project_config.default_schema.as_deref(), Some("analytics"));
        assert_eq!(
            overridden.project_config.schema_suffix.as_deref(),
            Some("pr42")
        );
    }
}

/// CONTRACT TARGET-002: Effective targets follow the transforms
mod effective {
    use super::*;

    #[test]
    fn contract_transforms_apply_to_effective_targets() {
        let graph = transformed_project(SETTINGS_WITH_TRANSFORMS).compile();
        let orders = graph.table("tmp_orders").expect("prefixed table");
        assert_eq!(
            orders.common.target,
            Target::new(
                Some("proj_dev".into()),
                Some("analytics_staging".into()),
                "tmp_orders"
            )
        );
        assert_eq!(
            orders.query,
            "SELECT order_id, amount FROM `proj_dev.analytics_staging.raw_orders`"
        );
    }

    #[test]
    fn contract_declaration_names_are_never_prefixed() {
        let graph = transformed_project(SETTINGS_WITH_TRANSFORMS).compile();
        let declaration = &graph.declarations[0];
        assert_eq!(declaration.common.target.name, "raw_orders");
        assert_eq!(
            declaration.common.target.schema.as_deref(),
            Some("analytics_staging")
        );
    }

    #[test]
    fn contract_transforms_are_deterministic() {
        let first = transformed_project(SETTINGS_WITH_TRANSFORMS).compile();
        let second = transformed_project(SETTINGS_WITH_TRANSFORMS).compile();
        assert_eq!(first, second);
    }
}
