//! Resolution contracts (RESOLVE-001)
//!
//! A short name matching several differently scoped actions is a single
//! recoverable error listing every candidate, never a crash.

use crate::common::*;

/// CONTRACT RESOLVE-001: Ambiguous names list all candidates
mod ambiguity {
    use super::*;

    fn two_schemas() -> Project {
        Project::new()
            .definition("one/a.sqlx", r#"config { schema: "schema1" } SELECT 1"#)
            .definition("two/a.sqlx", r#"config { schema: "schema2" } SELECT 2"#)
    }

    #[test]
    fn contract_dependency_on_ambiguous_name_is_one_error() {
        let graph = two_schemas()
            .definition("c.sqlx", r#"config { dependencies: ["a"] } SELECT 3"#)
            .compile();

        let messages = messages(&graph);
        assert_eq!(messages.len(), 1, "{messages:?}");
        assert!(messages[0].contains("schema1.a"), "{}", messages[0]);
        assert!(messages[0].contains("schema2.a"), "{}", messages[0]);
        assert_eq!(graph.errors()[0].file_name.as_deref(), Some("definitions/c.sqlx"));
    }

    #[test]
    fn contract_ref_to_ambiguous_name_is_one_error() {
        let graph = two_schemas()
            .definition("c.sqlx", r#"SELECT * FROM ${ref("a")}"#)
            .compile();
        let messages = messages(&graph);
        assert_eq!(messages.len(), 1, "{messages:?}");
        assert!(messages[0].starts_with("Ambiguous Action name: a."));
    }

    #[test]
    fn contract_qualified_reference_is_not_ambiguous() {
        let graph = two_schemas()
            .definition("c.sqlx", r#"SELECT * FROM ${ref("schema2", "a")}"#)
            .compile();
        assert!(!graph.has_errors(), "{:?}", messages(&graph));
        assert_eq!(graph.table("c").unwrap().query, "SELECT * FROM `proj.schema2.a`");
    }
}
