//! Instance discovery.
//!
//! Arguments are resolved against the loader root:
//!
//! - `dir/...` (or `...`) walks `dir` recursively; every directory holding a
//!   file of the requested package becomes an instance.
//! - `dir` loads exactly that directory.
//! - `*.cue` arguments are grouped into one `command-line-arguments` instance.
//!
//! Files of the package in directories between the root and an instance
//! directory belong to the instance too. Problems never stop discovery; they
//! are attached to the instance they concern.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use stx_syntax::{ParseOptions, ParsedFile, Revision, package_name, parse_file};
use walkdir::{DirEntry, WalkDir};

use crate::error::LoadError;
use crate::instance::Instance;

/// Grammar revision used for every file the loader parses.
pub const SYNTAX_REVISION: Revision = Revision::Legacy;

/// Package loaded when none is configured.
pub const DEFAULT_PACKAGE: &str = "cfn";

/// Display path of the instance built from file arguments.
pub const COMMAND_LINE_ARGUMENTS: &str = "command-line-arguments";

const RECURSIVE_SUFFIX: &str = "...";

/// Loader settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadConfig {
    /// Package clause files must declare.
    pub package: String,
    /// Directory arguments are resolved against.
    pub root: PathBuf,
    /// Grammar revision.
    pub revision: Revision,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            package: DEFAULT_PACKAGE.to_string(),
            root: PathBuf::from("."),
            revision: SYNTAX_REVISION,
        }
    }
}

impl LoadConfig {
    /// Set the package name.
    #[must_use]
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    /// Set the root directory.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Set the grammar revision.
    #[must_use]
    pub fn with_revision(mut self, revision: Revision) -> Self {
        self.revision = revision;
        self
    }
}

/// Turns path arguments into instances.
#[derive(Debug, Clone, Default)]
pub struct Loader {
    config: LoadConfig,
}

impl Loader {
    /// Create a loader.
    pub fn new(config: LoadConfig) -> Self {
        Self { config }
    }

    /// Loader settings.
    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// Discover the instances named by `args`, in argument order.
    ///
    /// No arguments means `./...`.
    pub fn load<S: AsRef<str>>(&self, args: &[S]) -> Vec<Instance> {
        let started = Instant::now();
        let mut args: Vec<&str> = args.iter().map(|arg| arg.as_ref()).collect();
        if args.is_empty() {
            args.push("./...");
        }

        let mut session = Session::new(&self.config);
        let mut files_loaded = false;
        for arg in &args {
            if is_file_arg(arg) {
                if !files_loaded {
                    let files: Vec<&str> = args.iter().copied().filter(|a| is_file_arg(a)).collect();
                    session.load_files(&files);
                    files_loaded = true;
                }
            } else if let Some(base) = recursive_base(arg) {
                session.load_pattern(arg, base);
            } else {
                session.load_dir(arg);
            }
        }

        let instances = session.instances;
        tracing::debug!(
            package = %self.config.package,
            instances = instances.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded instances"
        );
        instances
    }
}

fn is_file_arg(arg: &str) -> bool {
    Path::new(arg).extension().is_some_and(|ext| ext == "cue")
}

fn recursive_base(arg: &str) -> Option<&str> {
    if arg == RECURSIVE_SUFFIX {
        return Some(".");
    }
    arg.strip_suffix(RECURSIVE_SUFFIX)
        .and_then(|base| base.strip_suffix('/'))
        .map(|base| if base.is_empty() { "/" } else { base })
}

/// Files of one directory that declare the package.
#[derive(Debug, Default)]
struct DirScan {
    files: Vec<Arc<ParsedFile>>,
    errors: Vec<LoadError>,
}

impl DirScan {
    fn is_empty(&self) -> bool {
        self.files.is_empty() && self.errors.is_empty()
    }
}

struct Session<'a> {
    config: &'a LoadConfig,
    root: PathBuf,
    scans: HashMap<PathBuf, Arc<DirScan>>,
    seen: HashSet<PathBuf>,
    instances: Vec<Instance>,
}

impl<'a> Session<'a> {
    fn new(config: &'a LoadConfig) -> Self {
        Self {
            config,
            root: clean(&config.root),
            scans: HashMap::new(),
            seen: HashSet::new(),
            instances: Vec::new(),
        }
    }

    fn resolve(&self, arg: &str) -> PathBuf {
        clean(&self.root.join(arg))
    }

    fn options(&self) -> ParseOptions {
        ParseOptions::new(self.config.revision)
    }

    fn load_dir(&mut self, arg: &str) {
        let dir = self.resolve(arg);
        if !fs_path(&dir).is_dir() {
            self.push_failed(arg.to_string(), LoadError::NotFound { arg: arg.to_string() });
            return;
        }
        if self.seen.contains(&dir) {
            return;
        }
        let scan = self.scan(&dir);
        if scan.is_empty() {
            let error = LoadError::NoFiles {
                dir: fs_path(&dir).to_path_buf(),
                package: self.config.package.clone(),
            };
            self.seen.insert(dir.clone());
            self.push_failed(self.display_path(&dir), error);
            return;
        }
        self.emit(dir, &scan);
    }

    fn load_pattern(&mut self, arg: &str, base: &str) {
        let base = self.resolve(base);
        if !fs_path(&base).is_dir() {
            self.push_failed(arg.to_string(), LoadError::NotFound { arg: arg.to_string() });
            return;
        }

        let mut matched = false;
        let walker = WalkDir::new(fs_path(&base))
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry));
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => {
                    let dir = clean(entry.path());
                    let scan = self.scan(&dir);
                    if scan.is_empty() {
                        continue;
                    }
                    matched = true;
                    if !self.seen.contains(&dir) {
                        self.emit(dir, &scan);
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    matched = true;
                    let path = err.path().map_or_else(|| base.clone(), clean);
                    tracing::warn!(path = %path.display(), error = %err, "directory walk failed");
                    let display_path = self.display_path(&path);
                    self.push_failed(display_path, LoadError::io(fs_path(&path), err.into()));
                }
            }
        }

        if !matched {
            self.push_failed(
                arg.to_string(),
                LoadError::NoMatch {
                    pattern: arg.to_string(),
                    package: self.config.package.clone(),
                },
            );
        }
    }

    fn load_files(&mut self, args: &[&str]) {
        let mut instance = Instance::new(COMMAND_LINE_ARGUMENTS, self.config.package.as_str());
        if let Some(parent) = args.first().and_then(|arg| self.resolve(arg).parent().map(Path::to_path_buf)) {
            instance = instance.with_dir(fs_path(&parent));
        }
        for arg in args {
            let path = self.resolve(arg);
            let text = match fs::read_to_string(fs_path(&path)) {
                Ok(text) => text,
                Err(err) => {
                    instance.push_error(LoadError::io(fs_path(&path), err));
                    continue;
                }
            };
            let declared = package_name(&text);
            if declared.as_deref() != Some(self.config.package.as_str()) {
                instance.push_error(LoadError::PackageMismatch {
                    path: self.file_name(&path),
                    expected: self.config.package.clone(),
                    found: declared,
                });
                continue;
            }
            match parse_file(self.file_name(&path), text, self.options()) {
                Ok(file) => instance.push_file(Arc::new(file)),
                Err(err) => instance.push_error(err.into()),
            }
        }
        self.instances.push(instance);
    }

    fn emit(&mut self, dir: PathBuf, scan: &DirScan) {
        let mut instance = Instance::new(self.display_path(&dir), self.config.package.as_str())
            .with_dir(fs_path(&dir));
        for ancestor in self.ancestors(&dir) {
            let inherited = self.scan(&ancestor);
            extend(&mut instance, &inherited);
        }
        extend(&mut instance, scan);
        self.seen.insert(dir);
        self.instances.push(instance);
    }

    fn push_failed(&mut self, display_path: String, error: LoadError) {
        self.instances
            .push(Instance::new(display_path, self.config.package.as_str()).with_error(error));
    }

    /// Read and parse the package files of `dir`, once per session.
    fn scan(&mut self, dir: &Path) -> Arc<DirScan> {
        if let Some(scan) = self.scans.get(dir) {
            return Arc::clone(scan);
        }
        let scan = Arc::new(self.read_dir(dir));
        self.scans.insert(dir.to_path_buf(), Arc::clone(&scan));
        scan
    }

    fn read_dir(&self, dir: &Path) -> DirScan {
        let mut scan = DirScan::default();
        let entries = match fs::read_dir(fs_path(dir)) {
            Ok(entries) => entries,
            Err(err) => {
                scan.errors.push(LoadError::io(fs_path(dir), err));
                return scan;
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
            .map(|entry| entry.path())
            .filter(|path| is_source_file(path))
            .collect();
        paths.sort();

        for path in paths {
            let path = clean(&path);
            let text = match fs::read_to_string(fs_path(&path)) {
                Ok(text) => text,
                Err(err) => {
                    scan.errors.push(LoadError::io(fs_path(&path), err));
                    continue;
                }
            };
            if package_name(&text).as_deref() != Some(self.config.package.as_str()) {
                continue;
            }
            match parse_file(self.file_name(&path), text, self.options()) {
                Ok(file) => scan.files.push(Arc::new(file)),
                Err(err) => scan.errors.push(err.into()),
            }
        }
        scan
    }

    /// Directories from the root down to, but excluding, `dir`.
    fn ancestors(&self, dir: &Path) -> Vec<PathBuf> {
        let Some(rel) = self.relative(dir) else {
            return Vec::new();
        };
        let mut current = self.root.clone();
        let mut ancestors = Vec::new();
        for component in rel.components() {
            ancestors.push(current.clone());
            current.push(component);
        }
        ancestors
    }

    fn relative<'p>(&self, path: &'p Path) -> Option<&'p Path> {
        let rel = path.strip_prefix(&self.root).ok()?;
        rel.components()
            .all(|c| matches!(c, Component::Normal(_)))
            .then_some(rel)
    }

    fn display_path(&self, dir: &Path) -> String {
        match self.relative(dir) {
            Some(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Some(rel) => format!("./{}", slash(rel)),
            None => slash(dir),
        }
    }

    /// Name recorded in source positions: relative to the root when below it.
    fn file_name(&self, path: &Path) -> PathBuf {
        self.relative(path).map_or_else(|| path.to_path_buf(), Path::to_path_buf)
    }
}

fn extend(instance: &mut Instance, scan: &DirScan) {
    for file in &scan.files {
        instance.push_file(Arc::clone(file));
    }
    for error in &scan.errors {
        instance.push_error(error.clone());
    }
}

fn is_ignored_name(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    is_ignored_name(&name) || name == "cue.mod"
}

fn is_source_file(path: &Path) -> bool {
    let named = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| !is_ignored_name(name));
    named && path.extension().is_some_and(|ext| ext == "cue")
}

/// Lexically normalize `path`: drop `.` and fold `..` into its parent.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn fs_path(path: &Path) -> &Path {
    if path.as_os_str().is_empty() {
        Path::new(".")
    } else {
        path
    }
}

fn slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("./a/b", "a/b")]
    #[case("a/./b/../c", "a/c")]
    #[case(".", "")]
    #[case("../x", "../x")]
    #[case("a/../../x", "../x")]
    #[case("/tmp/../x", "/x")]
    #[case("/..", "/")]
    fn clean_is_lexical(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(clean(Path::new(input)), PathBuf::from(expected));
    }

    #[rstest]
    #[case("...", Some("."))]
    #[case("./...", Some("."))]
    #[case("stacks/...", Some("stacks"))]
    #[case("/...", Some("/"))]
    #[case("stacks", None)]
    #[case("a...", None)]
    fn recursive_patterns(#[case] arg: &str, #[case] base: Option<&str>) {
        assert_eq!(recursive_base(arg), base);
    }

    #[test]
    fn file_args_by_extension() {
        assert!(is_file_arg("a/web.cue"));
        assert!(!is_file_arg("a/web"));
        assert!(!is_file_arg("cue"));
    }

    #[test]
    fn display_paths_relative_to_root() {
        let config = LoadConfig::default();
        let session = Session::new(&config);
        assert_eq!(session.display_path(Path::new("")), ".");
        assert_eq!(session.display_path(Path::new("a/b")), "./a/b");
        assert_eq!(session.display_path(Path::new("../other")), "../other");
    }

    #[test]
    fn ancestors_stop_before_dir() {
        let config = LoadConfig::default().with_root("/work");
        let session = Session::new(&config);
        assert_eq!(
            session.ancestors(Path::new("/work/a/b")),
            vec![PathBuf::from("/work"), PathBuf::from("/work/a")]
        );
        assert!(session.ancestors(Path::new("/work")).is_empty());
        assert!(session.ancestors(Path::new("/elsewhere/a")).is_empty());
    }

    #[test]
    fn source_files_skip_hidden_and_underscore() {
        assert!(is_source_file(Path::new("a/web.cue")));
        assert!(!is_source_file(Path::new("a/_tool.cue")));
        assert!(!is_source_file(Path::new("a/.web.cue")));
        assert!(!is_source_file(Path::new("a/web.json")));
    }

    #[test]
    fn default_config() {
        let config = LoadConfig::default();
        assert_eq!(config.package, "cfn");
        assert_eq!(config.revision, Revision::Legacy);
    }
}
