//! Round-trip contracts (ROUNDTRIP-001)
//!
//! Compiled SQL is the file's raw SQL, byte for byte, even when it holds
//! triple-quoted strings, backticks and escaped backslashes.

use crate::common::*;

const TRICKY_BODY: &str = r#"SELECT '''multi
line } with brace''' AS a, `weird-name`.col, 'back\\slash \' quote' AS b, "x\"}" AS c
FROM `proj.analytics.src`"#;

const TRICKY_PRE: &str = r#"SET x = """{ not a block }""""#;

/// CONTRACT ROUNDTRIP-001: Block extraction never rewrites SQL
mod raw_sql {
    use super::*;

    #[test]
    fn contract_body_survives_compilation() {
        let graph = Project::new()
            .definition("t.sqlx", &format!("config {{ type: \"table\" }}\n{}\n", TRICKY_BODY))
            .compile();
        assert!(!graph.has_errors(), "{:?}", messages(&graph));
        assert_eq!(graph.table("t").unwrap().query, TRICKY_BODY);
    }

    #[test]
    fn contract_pre_and_post_operations_survive_compilation() {
        let source = format!(
            "config {{ type: \"table\" }}\npre_operations {{\n{pre}\n}}\n{body}\npost_operations {{\n{pre}\n}}\n",
            pre = TRICKY_PRE,
            body = TRICKY_BODY
        );
        let graph = Project::new().definition("t.sqlx", &source).compile();
        assert!(!graph.has_errors(), "{:?}", messages(&graph));

        let table = graph.table("t").unwrap();
        assert_eq!(table.pre_ops, vec![TRICKY_PRE]);
        assert_eq!(table.post_ops, vec![TRICKY_PRE]);
        assert_eq!(table.query, TRICKY_BODY);
    }
}
