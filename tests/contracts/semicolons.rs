//! Semicolon contracts (SEMI-001)
//!
//! A trailing semicolon in table SQL compiles, with exactly one error.

use crate::common::*;

const MESSAGE: &str = "Semi-colons are not allowed at the end of SQL statements.";

/// CONTRACT SEMI-001: One recoverable error per offending statement
mod trailing {
    use super::*;

    #[test]
    fn contract_table_with_trailing_semicolon() {
        let graph = Project::new()
            .definition("t.sqlx", r#"config { type: "table" } SELECT 1;"#)
            .compile();
        assert_eq!(messages(&graph), vec![MESSAGE]);
        assert_eq!(graph.errors()[0].file_name.as_deref(), Some("definitions/t.sqlx"));
        assert_eq!(graph.tables.len(), 1);
    }

    #[test]
    fn contract_semicolon_inside_string_or_comment_is_fine() {
        let graph = Project::new()
            .definition("t.sqlx", "SELECT ';' AS s -- trailing;\n")
            .compile();
        assert!(!graph.has_errors(), "{:?}", messages(&graph));
    }

    #[test]
    fn contract_operations_may_end_with_semicolons() {
        let graph = Project::new()
            .definition("op.sqlx", "config { type: \"operations\" }\nDELETE FROM t WHERE TRUE;\n")
            .compile();
        assert!(!graph.has_errors(), "{:?}", messages(&graph));
    }
}
