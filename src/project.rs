//! Project sources
//!
//! The compiler works on an in-memory map of relative path to file contents.
//! [`ProjectFiles::load`] builds that map from a directory on disk, honoring
//! `.gitignore` and `.dataformignore` files and skipping hidden entries.

use std::collections::BTreeMap;
use std::path::Path;

use ignore::WalkBuilder;

use crate::error::{CompileError, CompileResult};

/// Extensions the compiler reads
const SOURCE_EXTENSIONS: &[&str] = &["sqlx", "js", "yaml", "yml", "json", "sql", "ipynb"];

/// Project-specific ignore file, gitignore syntax
const IGNORE_FILE: &str = ".dataformignore";

/// Relative path (forward slashes) to file contents, in path order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFiles {
    files: BTreeMap<String, String>,
}

impl ProjectFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(normalize_path(&path.into()), contents.into());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Read every source file under `root`
    pub fn load(root: &Path) -> CompileResult<Self> {
        if !root.is_dir() {
            return Err(CompileError::ProjectNotFound {
                path: root.to_path_buf(),
            });
        }

        let mut files = Self::new();
        let walker = WalkBuilder::new(root)
            .hidden(true)
            .require_git(false)
            .add_custom_ignore_filename(IGNORE_FILE)
            .build();

        for entry in walker {
            let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) || !is_source(path) {
                continue;
            }
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let contents = std::fs::read_to_string(path)?;
            files.insert(relative.to_string_lossy(), contents);
        }

        tracing::debug!(root = %root.display(), files = files.len(), "loaded project files");
        Ok(files)
    }
}

impl<P: Into<String>, C: Into<String>> FromIterator<(P, C)> for ProjectFiles {
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        let mut files = Self::new();
        for (path, contents) in iter {
            files.insert(path, contents);
        }
        files
    }
}

fn is_source(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e))
}

fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut trimmed = path.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.to_string()
}
