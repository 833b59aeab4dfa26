//! Unevaluated instances.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use stx_syntax::ParsedFile;

use crate::error::LoadError;

/// One package unit ready to be evaluated on its own.
///
/// Built by the [`Loader`](crate::Loader) and immutable afterwards. Files
/// contributed by ancestor directories are shared between instances.
#[derive(Debug, Clone)]
pub struct Instance {
    display_path: String,
    package: String,
    dir: Option<PathBuf>,
    files: Vec<Arc<ParsedFile>>,
    errors: Vec<LoadError>,
}

impl Instance {
    /// Create an empty instance.
    pub fn new(display_path: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            display_path: display_path.into(),
            package: package.into(),
            dir: None,
            files: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Set the directory the instance was loaded from.
    #[must_use]
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Add a parsed file.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<Arc<ParsedFile>>) -> Self {
        self.files.push(file.into());
        self
    }

    /// Attach a load error.
    #[must_use]
    pub fn with_error(mut self, error: LoadError) -> Self {
        self.errors.push(error);
        self
    }

    pub(crate) fn push_file(&mut self, file: Arc<ParsedFile>) {
        self.files.push(file);
    }

    pub(crate) fn push_error(&mut self, error: LoadError) {
        self.errors.push(error);
    }

    /// Human-readable location, used for filtering and reporting.
    pub fn display_path(&self) -> &str {
        &self.display_path
    }

    /// Package name shared by the files.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Directory the instance was loaded from, if it came from one.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Parsed files, ancestor directories first.
    pub fn files(&self) -> &[Arc<ParsedFile>] {
        &self.files
    }

    /// Problems found while loading.
    pub fn errors(&self) -> &[LoadError] {
        &self.errors
    }

    /// Whether loading found no problems.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}
