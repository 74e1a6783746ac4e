#![no_main]

use libfuzzer_sys::fuzz_target;

use dataform_compiler::parser::{extract_blocks, has_trailing_semicolon, split_statements};

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        // Block extraction and SQL scanning should never panic
        if let Ok(blocks) = extract_blocks(content) {
            let _ = has_trailing_semicolon(&blocks.body);
            let _ = split_statements(&blocks.body);
        }
        let _ = dataform_compiler::parser::template::segments(content);
    }
});
