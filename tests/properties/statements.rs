//! Property tests for statement splitting and the trailing-semicolon check.

use proptest::prelude::*;

use dataform_compiler::parser::{has_trailing_semicolon, split_statements};

fn statement() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z][A-Za-z0-9 _,.*=()]{0,40}")
        .unwrap()
        .prop_map(|s| s.trim().to_string())
        .prop_filter("non-empty", |s| !s.is_empty())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 96,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: joining statements with `---` lines and splitting is lossless.
    #[test]
    fn property_split_inverts_join(statements in proptest::collection::vec(statement(), 1..6)) {
        let joined = statements.join("\n---\n");
        prop_assert_eq!(split_statements(&joined), statements);
    }

    /// PROPERTY: a trailing `;` is detected regardless of trailing whitespace
    /// and comments.
    #[test]
    fn property_trailing_semicolon_detected(
        sql in statement(),
        padding in "[ \\n\\t]{0,4}",
    ) {
        prop_assert!(!has_trailing_semicolon(&sql));
        let terminated = format!("{sql};{padding}");
        prop_assert!(has_trailing_semicolon(&terminated));
        let terminated_with_comment = format!("{sql};{padding}-- note\n");
        prop_assert!(has_trailing_semicolon(&terminated_with_comment));
        let semicolon_in_comment = format!("{sql} -- done;{padding}");
        prop_assert!(!has_trailing_semicolon(&semicolon_in_comment));
    }

    /// PROPERTY: `split_statements` never panics.
    #[test]
    fn property_split_never_panics(sql in "(?s).{0,256}") {
        let _ = split_statements(&sql);
        let _ = has_trailing_semicolon(&sql);
    }
}
