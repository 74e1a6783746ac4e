#![no_main]

use libfuzzer_sys::fuzz_target;

use dataform_compiler::config::{parse_legacy_settings, parse_workflow_settings};

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        // Settings parsing should reject bad input with an error, never panic
        let _ = parse_workflow_settings(content);
        let _ = parse_legacy_settings(content);
    }
});
