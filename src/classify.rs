//! Visibility decisions for directories and files.
//!
//! Protection is checked before any pattern: a file with a protected
//! extension is kept even when an extension blocklist glob matches it. The
//! reserved license name is the only thing that beats protection.
//!
//! Hidden and pattern-matched directories are probed: they stay visible when
//! one of their immediate children is a protected file. The probe goes
//! through [`DirLister`] so tests can replace the filesystem.

use crate::output::is_output_path;
use crate::patterns::{PatternSet, is_builtin_dir};
use crate::types::Decision;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Suffixes that force a file to be kept.
pub const PROTECTED_EXTENSIONS: &[&str] = &[".py", ".groovy", ".r", ".rmd", ".md", ".ipynb"];

/// Always excluded, even though `.md` is protected.
pub const RESERVED_FILE_NAME: &str = "license.md";

/// Lists the immediate children of a directory.
pub trait DirLister {
    fn list(&self, dir: &Path) -> io::Result<Vec<OsString>>;
}

/// [`DirLister`] backed by [`fs::read_dir`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLister;

impl DirLister for FsLister {
    fn list(&self, dir: &Path) -> io::Result<Vec<OsString>> {
        fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect()
    }
}

/// True if the lower-cased `name` ends with a protected extension.
pub fn is_protected(name: &str) -> bool {
    let lower = name.to_lowercase();
    PROTECTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Backslashes to forward slashes, lower-cased, no leading `./`.
pub fn normalize_rel_path(rel_path: &str) -> String {
    let path = rel_path.replace('\\', "/").to_lowercase();
    let mut trimmed = path.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.to_string()
}

/// Classifies paths below `root` against a shared [`PatternSet`].
#[derive(Debug, Clone)]
pub struct Classifier<L = FsLister> {
    root: PathBuf,
    patterns: Arc<PatternSet>,
    lister: L,
    output: Option<PathBuf>,
}

impl Classifier<FsLister> {
    pub fn new(root: impl Into<PathBuf>, patterns: Arc<PatternSet>) -> Self {
        Self::with_lister(root, patterns, FsLister)
    }
}

impl<L: DirLister> Classifier<L> {
    pub fn with_lister(root: impl Into<PathBuf>, patterns: Arc<PatternSet>, lister: L) -> Self {
        Self {
            root: root.into(),
            patterns,
            lister,
            output: None,
        }
    }

    /// Hides the dump's own output (and its part files) when it lives below
    /// the root. `rel_path` is relative to the root.
    pub fn exclude_output(mut self, rel_path: impl Into<PathBuf>) -> Self {
        self.output = Some(rel_path.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Decides whether the directory `name` at `rel_path` (relative to the
    /// root) is shown and descended into.
    pub fn classify_dir(&self, name: &str, rel_path: &str) -> Decision {
        if is_builtin_dir(name) {
            tracing::debug!("Skipping directory {} - in always skip list", rel_path);
            return Decision::Skip;
        }
        let name = name.to_lowercase();
        let normalized = normalize_rel_path(rel_path);
        if name.starts_with('.') && name != "." {
            return if self.has_protected_child(rel_path) {
                tracing::debug!("Keeping hidden directory {} - contains protected files", normalized);
                Decision::Keep
            } else {
                tracing::debug!("Skipping hidden directory {}", normalized);
                Decision::Skip
            };
        }
        match self.patterns.match_dir(&name, &normalized) {
            Some(pattern) if self.has_protected_child(rel_path) => {
                tracing::debug!(
                    "Keeping directory {} - matches {} but contains protected files",
                    normalized,
                    pattern
                );
                Decision::Keep
            }
            Some(pattern) => {
                tracing::debug!("Skipping directory {} - matches pattern {}", normalized, pattern);
                Decision::Skip
            }
            None => Decision::Keep,
        }
    }

    /// Decides whether the file `name` at `rel_path` is shown and emitted.
    pub fn classify_file(&self, name: &str, rel_path: &str) -> Decision {
        let rel = Path::new(rel_path);
        if self.output.as_deref().is_some_and(|output| is_output_path(output, rel)) {
            tracing::debug!("Excluding {} - dump output", rel_path);
            return Decision::Skip;
        }
        let name = name.to_lowercase();
        if name == RESERVED_FILE_NAME {
            tracing::debug!("Excluding {} - {} is explicitly excluded", rel_path, RESERVED_FILE_NAME);
            return Decision::Skip;
        }
        if is_protected(&name) {
            tracing::trace!("Keeping {} - protected file type", rel_path);
            return Decision::Keep;
        }
        let normalized = normalize_rel_path(rel_path);
        match self.patterns.match_file(&name, &normalized) {
            Some(pattern) => {
                tracing::debug!("Excluding {} - matches pattern {}", normalized, pattern);
                Decision::Skip
            }
            None => Decision::Keep,
        }
    }

    /// Lists `root/rel_path`; any failure counts as "no protected child".
    fn has_protected_child(&self, rel_path: &str) -> bool {
        let dir = self.root.join(rel_path);
        match self.lister.list(&dir) {
            Ok(children) => children
                .iter()
                .any(|child| is_protected(&child.to_string_lossy())),
            Err(e) => {
                tracing::debug!("Cannot list {}: {}", dir.display(), e);
                false
            }
        }
    }
}
