//! Boundary to the external script runtime
//!
//! The compiler never interprets JavaScript itself beyond the literal subset
//! in [`crate::parser::literal`]. Whole definition files, non-literal config
//! blocks and unsupported placeholder expressions are handed to a
//! [`ScriptEvaluator`], which returns plain JSON or fails.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::config::ProjectConfig;
use crate::models::Target;

/// Failure reported by a script evaluator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ScriptError {
    pub message: String,
}

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Why the compiler is asking for an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptPurpose {
    /// A `definitions/**/*.js` file; must return an array of builder entries
    DefinitionFile,
    /// A `config { }` block that is not a pure literal; must return an object
    ConfigLiteral,
    /// One `${...}` placeholder; any JSON value
    Interpolation,
}

impl fmt::Display for ScriptPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScriptPurpose::DefinitionFile => "definition file",
            ScriptPurpose::ConfigLiteral => "config block",
            ScriptPurpose::Interpolation => "placeholder expression",
        })
    }
}

/// Everything an evaluator may need to run one script
#[derive(Debug, Clone, Copy)]
pub struct ScriptContext<'a> {
    pub file_name: &'a str,
    pub purpose: ScriptPurpose,
    pub project_config: &'a ProjectConfig,
    /// `includes/**/*.js`, by path
    pub includes: &'a BTreeMap<String, String>,
    /// The action being rendered, for `Interpolation`
    pub self_target: Option<&'a Target>,
    pub incremental: bool,
    /// Content of the file's `js { }` blocks, to run before the script
    pub preamble: Option<&'a str>,
}

/// External script runtime
pub trait ScriptEvaluator {
    fn evaluate(
        &self,
        script: &str,
        context: &ScriptContext<'_>,
    ) -> Result<serde_json::Value, ScriptError>;
}

impl<F> ScriptEvaluator for F
where
    F: Fn(&str, &ScriptContext<'_>) -> Result<serde_json::Value, ScriptError>,
{
    fn evaluate(
        &self,
        script: &str,
        context: &ScriptContext<'_>,
    ) -> Result<serde_json::Value, ScriptError> {
        self(script, context)
    }
}

/// Evaluator for compilations without a script runtime: every call fails
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScriptRuntime;

impl ScriptEvaluator for NoScriptRuntime {
    fn evaluate(
        &self,
        _script: &str,
        context: &ScriptContext<'_>,
    ) -> Result<serde_json::Value, ScriptError> {
        Err(ScriptError::new(format!(
            "no script runtime is attached; cannot evaluate {} in {}",
            context.purpose, context.file_name
        )))
    }
}
