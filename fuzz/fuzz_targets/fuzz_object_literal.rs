#![no_main]

use libfuzzer_sys::fuzz_target;

use dataform_compiler::parser::literal::{parse_expression, parse_object_body};

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        // Config literals should parse or fail cleanly
        if let Ok(expr) = parse_object_body(content) {
            let _ = expr.to_json();
        }
        let _ = parse_expression(content);
    }
});
