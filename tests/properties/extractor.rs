//! Property tests for block extraction.

use proptest::prelude::*;

use dataform_compiler::extract_blocks;

/// SQL-ish text with no braces, so no keyword block can start inside it
fn body_text() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z0-9 _,.*=<>()\\n-]{0,120}").unwrap()
}

/// Block content with balanced quoting and no braces
fn block_text() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z0-9 _,.=\\n]{0,40}").unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 96,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: `extract_blocks` never panics on arbitrary input.
    #[test]
    fn property_extract_never_panics(text in "(?s).{0,256}") {
        let _ = extract_blocks(&text);
    }

    /// PROPERTY: a file without blocks is its own body.
    #[test]
    fn property_body_without_blocks_round_trips(body in body_text()) {
        let blocks = extract_blocks(&body).expect("brace-free text always extracts");
        prop_assert_eq!(blocks.body, body);
        prop_assert!(blocks.config.is_none());
        prop_assert!(blocks.pre_operations.is_empty());
    }

    /// PROPERTY: blocks are cut out whole; everything else is kept verbatim.
    #[test]
    fn property_blocks_cut_out_exactly(
        config in block_text(),
        pre in block_text(),
        before in body_text(),
        after in body_text(),
    ) {
        let text = format!(
            "config {{{config}}}\n{before}\npre_operations {{{pre}}}\n{after}"
        );
        let blocks = extract_blocks(&text).expect("well-formed blocks extract");

        prop_assert_eq!(blocks.config.as_deref(), Some(config.as_str()));
        prop_assert_eq!(blocks.pre_operations, vec![pre]);
        prop_assert_eq!(blocks.body, format!("\n{before}\n\n{after}"));
    }

    /// PROPERTY: quoted braces never close a block early.
    #[test]
    fn property_quoted_braces_stay_inside_block(
        inner in proptest::string::string_regex("[A-Za-z0-9 {}]{0,30}").unwrap(),
    ) {
        let text = format!("pre_operations {{ SELECT '''{inner}''' }}\nSELECT 1");
        let blocks = extract_blocks(&text).expect("quoted braces extract");
        prop_assert_eq!(
            blocks.pre_operations,
            vec![format!(" SELECT '''{inner}''' ")]
        );
        prop_assert_eq!(blocks.body, "\nSELECT 1");
    }
}
