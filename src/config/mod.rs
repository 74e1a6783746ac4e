//! Project configuration
//!
//! Settings are resolved in this order (later wins):
//! 1. Built-in defaults
//! 2. `workflow_settings.yaml` (or the deprecated `dataform.json`)
//! 3. Runtime overrides passed to the compiler
//!
//! The canonical configuration stops at step 2 and drops the environment
//! transforms (suffixes and name prefix).

mod loader;
#[cfg(test)]
mod tests;
mod types;

pub use loader::{
    load_project_settings, parse_legacy_settings, parse_workflow_settings, ProjectSettings,
    LEGACY_SETTINGS_FILE, WORKFLOW_SETTINGS_FILE,
};
pub(crate) use loader::suggest_key;
pub use types::{
    NotebookRuntimeOptions, ProjectConfig, ProjectConfigOverride, Warehouse,
    DEFAULT_ASSERTION_SCHEMA,
};
