//! dataform-compiler - compiler for SQL workflow projects
//!
//! A project is a directory of SQL-template files (`.sqlx`), script files,
//! `actions.yaml` listings and a `workflow_settings.yaml`. Compilation turns
//! it into a [`CompiledGraph`]: every table, view, operation, assertion,
//! declaration, notebook and data preparation with fully resolved targets,
//! rendered SQL and dependency edges, plus the recoverable errors found on
//! the way.
//!
//! ```no_run
//! use dataform_compiler::{compile, CompileOptions, NoScriptRuntime, ProjectFiles};
//!
//! let files = ProjectFiles::load(std::path::Path::new("my_project"))?;
//! let graph = compile(&files, &NoScriptRuntime, &CompileOptions::default())?;
//! for table in &graph.tables {
//!     println!("{} -> {}", table.common.target, table.query);
//! }
//! # Ok::<(), dataform_compiler::CompileError>(())
//! ```

pub mod actions;
pub mod assertions;
pub mod compiler;
pub mod config;
pub mod docs;
pub mod error;
pub mod linker;
pub mod models;
pub mod parser;
pub mod project;
pub mod registry;
pub mod target;
pub mod validate;

// Re-exports for convenience
pub use compiler::script::{
    NoScriptRuntime, ScriptContext, ScriptError, ScriptEvaluator, ScriptPurpose,
};
pub use compiler::{compile, CompileOptions};
pub use config::{ProjectConfig, ProjectConfigOverride, Warehouse};
pub use error::{CompilationError, CompileError, CompileResult};
pub use models::{
    Action, ActionKind, Assertion, CompiledGraph, DataPreparation, Declaration, Notebook,
    Operation, Table, TableType, Target,
};
pub use parser::{extract_blocks, SqlxBlocks};
pub use project::ProjectFiles;
