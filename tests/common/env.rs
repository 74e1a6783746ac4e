//! Project builders for isolated compiler testing.
//!
//! `Project` compiles an in-memory file map through the library.
//! `TestEnv` writes a project into a temp directory and runs the
//! `dataform-compiler` binary against it.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use dataform_compiler::{
    compile, CompileError, CompileOptions, CompiledGraph, NoScriptRuntime,
    ProjectConfigOverride, ProjectFiles,
};
use tempfile::TempDir;

use super::fixtures::SETTINGS;

/// In-memory project, compiled without a script runtime
pub struct Project {
    files: ProjectFiles,
    overrides: Option<ProjectConfigOverride>,
}

impl Project {
    /// Project with the standard BigQuery settings file
    pub fn new() -> Self {
        Self::with_settings(SETTINGS)
    }

    pub fn with_settings(settings: &str) -> Self {
        let mut files = ProjectFiles::new();
        files.insert("workflow_settings.yaml", settings);
        Self {
            files,
            overrides: None,
        }
    }

    /// Add a file under `definitions/`
    pub fn definition(mut self, relative: &str, contents: &str) -> Self {
        self.files
            .insert(format!("definitions/{}", relative), contents);
        self
    }

    pub fn file(mut self, path: &str, contents: &str) -> Self {
        self.files.insert(path, contents);
        self
    }

    pub fn overrides(mut self, overrides: ProjectConfigOverride) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn try_compile(&self) -> Result<CompiledGraph, CompileError> {
        let options = CompileOptions {
            project_config_override: self.overrides.clone(),
            ..CompileOptions::default()
        };
        compile(&self.files, &NoScriptRuntime, &options)
    }

    /// Compile, panicking on a fatal error
    pub fn compile(&self) -> CompiledGraph {
        self.try_compile()
            .unwrap_or_else(|e| panic!("compilation failed: {}", e))
    }
}

/// Error messages of a graph, in recording order
pub fn messages(graph: &CompiledGraph) -> Vec<String> {
    graph.errors().iter().map(|e| e.message.clone()).collect()
}

/// Result of running the CLI
#[derive(Debug)]
pub struct TestResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Project directory on disk
pub struct TestEnv {
    pub project_root: TempDir,
    bin: PathBuf,
}

impl TestEnv {
    /// Project directory containing only the standard settings file
    pub fn new() -> Self {
        let env = Self {
            project_root: TempDir::new().expect("Failed to create temp dir"),
            bin: PathBuf::from(env!("CARGO_BIN_EXE_dataform-compiler")),
        };
        env.write_file("workflow_settings.yaml", SETTINGS);
        env
    }

    pub fn path(&self) -> &Path {
        self.project_root.path()
    }

    /// Write a file relative to the project root, creating parent directories
    pub fn write_file(&self, relative: &str, contents: &str) {
        let full_path = self.project_root.path().join(relative);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directories");
        }
        std::fs::write(&full_path, contents).expect("Failed to write file");
    }

    /// Run the binary with the project root as working directory
    pub fn run(&self, args: &[&str]) -> TestResult {
        let output = Command::new(&self.bin)
            .current_dir(self.project_root.path())
            .args(args)
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute dataform-compiler");
        to_result(output)
    }
}

fn to_result(output: Output) -> TestResult {
    TestResult {
        success: output.status.success(),
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}
