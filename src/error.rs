//! Error types for the compiler
//!
//! Two severities:
//! - [`CompileError`]: fatal. Compilation stops and no graph is produced.
//! - [`CompilationError`]: recoverable. Collected by [`ErrorCollector`] and
//!   returned inside the compiled graph.

use std::path::PathBuf;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for fatal compilation failures
pub type CompileResult<T> = Result<T, CompileError>;

/// Fatal error: aborts the whole compilation
#[derive(Error, Debug)]
pub enum CompileError {
    /// Both settings files exist
    #[error("dataform.json has been deprecated and cannot be defined alongside workflow_settings.yaml")]
    AmbiguousSettings,

    /// Neither settings file exists
    #[error("Failed to resolve workflow_settings.yaml: the project root must contain workflow_settings.yaml (or the deprecated dataform.json)")]
    MissingSettings,

    /// Settings file could not be parsed
    #[error("invalid project settings in {file}: {message}")]
    InvalidSettings { file: String, message: String },

    /// Settings file contains a key outside the settings schema
    #[error("unknown setting '{key}' in {file}{}. See {docs}", suggestion_suffix(.suggestion))]
    UnknownSetting {
        file: String,
        key: String,
        suggestion: Option<String>,
        docs: String,
    },

    /// Project pins a different compiler version
    #[error("Version mismatch: workflow settings require dataformCoreVersion \"{requested}\", but the installed compiler is \"{installed}\"")]
    VersionMismatch { requested: String, installed: String },

    /// A project variable is not a string
    #[error("Custom variables defined in workflow settings can only be strings. Variable \"{name}\" is not a string")]
    NonStringVariable { name: String },

    /// Action configuration violates the schema for its kind
    #[error("{file}: {message}")]
    InvalidActionConfig { file: String, message: String },

    /// A declaration was given SQL or a backing file
    #[error("{file}: declaration \"{name}\" cannot have a file body; declarations model pre-existing objects")]
    DeclarationWithBody { file: String, name: String },

    /// An action-config file declares no actions
    #[error("{file}: empty action configs are not permitted; declare at least one entry under \"actions\"")]
    EmptyActionConfigs { file: String },

    /// An action-config entry points at a file that is not part of the project
    #[error("{referenced_from}: file \"{file}\" referenced by \"filename\" does not exist")]
    FileNotFound { file: String, referenced_from: String },

    /// The script evaluator returned an object graph of the wrong shape
    #[error("{file}: invalid definitions returned by the script evaluator: {message}")]
    InvalidScriptResult { file: String, message: String },

    /// IO error while loading a project from disk
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Project directory is missing
    #[error("project directory not found: {path}")]
    ProjectNotFound { path: PathBuf },
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{}'?)", s),
        None => String::new(),
    }
}

/// Recoverable error recorded in the compiled graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_name: Option<String>,
    pub message: String,
}

impl std::fmt::Display for CompilationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.file_name, &self.action_name) {
            (Some(file), Some(action)) => write!(f, "{} ({}): {}", file, action, self.message),
            (Some(file), None) => write!(f, "{}: {}", file, self.message),
            (None, Some(action)) => write!(f, "{}: {}", action, self.message),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

/// Collects recoverable errors for one compilation
///
/// Re-recording an identical error is a no-op.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: IndexSet<CompilationError>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        file_name: Option<&str>,
        action_name: Option<&str>,
        message: impl Into<String>,
    ) {
        let error = CompilationError {
            file_name: file_name.map(str::to_string),
            action_name: action_name.map(str::to_string),
            message: message.into(),
        };
        tracing::debug!(
            file = error.file_name.as_deref().unwrap_or("-"),
            action = error.action_name.as_deref().unwrap_or("-"),
            message = %error.message,
            "recoverable compilation error"
        );
        self.errors.insert(error);
    }

    pub fn file_error(&mut self, file_name: &str, message: impl Into<String>) {
        self.push(Some(file_name), None, message);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_vec(self) -> Vec<CompilationError> {
        self.errors.into_iter().collect()
    }
}
