//! Property tests for the config object-literal reader.

use proptest::prelude::*;
use serde_json::json;

use dataform_compiler::parser::literal::{parse_expression, parse_object_body};

fn identifier() -> impl Strategy<Value = String> {
    proptest::string::string_regex("k[A-Za-z0-9_]{0,12}").unwrap()
}

fn plain_string() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z0-9 _.,:-]{0,24}").unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 96,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: the reader never panics on arbitrary input.
    #[test]
    fn property_parse_never_panics(source in "(?s).{0,256}") {
        let _ = parse_expression(&source);
        let _ = parse_object_body(&source);
    }

    /// PROPERTY: a flat object of string and number fields reads back as JSON.
    #[test]
    fn property_flat_object_to_json(
        fields in proptest::collection::btree_map(identifier(), plain_string(), 0..6),
        number in 0u32..100_000,
    ) {
        let mut body: Vec<String> = fields
            .iter()
            .map(|(key, value)| format!("{key}: \"{value}\""))
            .collect();
        body.push(format!("N: {number}"));

        let expr = parse_object_body(&body.join(", ")).expect("literal object parses");
        let value = expr.to_json().expect("pure literal converts");

        for (key, expected) in &fields {
            prop_assert_eq!(&value[key.as_str()], &json!(expected));
        }
        prop_assert_eq!(&value["N"], &json!(number));
    }

    /// PROPERTY: single- and double-quoted strings read the same.
    #[test]
    fn property_quote_style_is_irrelevant(text in plain_string()) {
        let single = parse_expression(&format!("'{text}'")).unwrap();
        let double = parse_expression(&format!("\"{text}\"")).unwrap();
        prop_assert_eq!(single, double);
    }
}
