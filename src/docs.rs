//! Documentation URL helpers
//!
//! Centralized location for documentation URLs used in fatal error messages.
//! Update the base URL constant if the documentation site moves.

/// Base URL for the reference documentation
pub const DOCS_BASE_URL: &str = "https://cloud.google.com/dataform/docs";

/// Reference pages that fatal errors point at
pub const EXPECTED_DOC_PAGES: &[&str] = &[
    "/config-reference",
    "/workflow-settings",
];

/// Reference for the action config schema, anchored at the given kind
pub fn configs_reference_url(anchor: &str) -> String {
    format!("{}/config-reference#{}", DOCS_BASE_URL, anchor)
}

/// Reference for `workflow_settings.yaml` / `dataform.json`
pub fn workflow_settings_url() -> String {
    format!("{}/workflow-settings", DOCS_BASE_URL)
}
