//! Exclusion rules: the built-in blocklists plus user pattern files, compiled
//! once into glob matchers.
//!
//! A user pattern file is plain text with one rule per line. Everything after
//! the first `#` is a comment. Tokens are classified by shape:
//!
//! | token            | rule                                          |
//! |------------------|-----------------------------------------------|
//! | `**/tmp/*.bak`   | used verbatim                                 |
//! | `*.bak`          | `*.bak` and `**/*.bak`                        |
//! | `cache-?`        | used verbatim                                 |
//! | `generated`      | `generated`, `generated/**`, `**/generated/**` |
//!
//! Matching is case-insensitive and `*` also crosses `/`, like shell `fnmatch`.

use crate::error::DumpError;
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

/// Extensions excluded unless a file is protected.
pub const DEFAULT_EXCLUDED_EXTENSIONS: &[&str] = &[
    // images
    "png", "jpg", "jpeg", "gif", "svg", "ico", "tif", "tiff", "bmp",
    // audio/video
    "mp4", "mp3", "wav", "ogg", "flac", "webm", "mov", "avi",
    // archives
    "rar", "7z", "tar", "gz", "bz2", "zip", "xz",
    // data/config
    "csv", "json", "yaml", "yml",
    // javascript/typescript
    "js", "jsx", "ts", "tsx", "mjs", "cjs", "mts", "cts",
    // bytecode
    "pyc", "pyo", "pyd", "jar",
    // certificates, logs
    "pem", "log",
];

/// Directory names that are never descended into.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".idea",
    ".venv",
    "venv",
    "node_modules",
    "build",
    "dist",
    ".tox",
    "coverage",
    "htmlcov",
    ".mypy_cache",
    ".ruff_cache",
];

/// Where a pattern came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PatternKind {
    DefaultExtension,
    BuiltinDirectory,
    UserLiteral,
    UserGlob,
    UserGlobal,
}

/// The body of a pattern.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rule {
    /// A plain path segment or path, matched as literal text at any depth.
    Literal(String),
    /// A suffix after `*.`, matched at any depth.
    Extension(String),
    /// Arbitrary glob syntax, used as written.
    Glob(String),
}

impl Rule {
    /// The glob expressions this rule stands for.
    pub fn expansions(&self) -> Vec<String> {
        match self {
            Rule::Literal(text) => {
                let escaped = escape_literal(text);
                vec![
                    escaped.clone(),
                    format!("{escaped}/**"),
                    format!("**/{escaped}/**"),
                ]
            }
            Rule::Extension(ext) => vec![format!("*.{ext}"), format!("**/*.{ext}")],
            Rule::Glob(text) => vec![text.clone()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pattern {
    pub kind: PatternKind,
    pub rule: Rule,
}

impl Pattern {
    pub fn new(kind: PatternKind, rule: Rule) -> Self {
        Self { kind, rule }
    }

    /// Classifies one normalized token from a user pattern file.
    pub fn from_token(token: &str) -> Self {
        if token.starts_with("**/") {
            Pattern::new(PatternKind::UserGlobal, Rule::Glob(token.to_string()))
        } else if let Some(ext) = token.strip_prefix("*.") {
            Pattern::new(PatternKind::UserGlob, Rule::Extension(ext.to_string()))
        } else if token.contains(['*', '?', '[']) {
            Pattern::new(PatternKind::UserGlob, Rule::Glob(token.to_string()))
        } else {
            Pattern::new(PatternKind::UserLiteral, Rule::Literal(token.to_string()))
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule {
            Rule::Literal(text) => write!(f, "{text}"),
            Rule::Extension(ext) => write!(f, "*.{ext}"),
            Rule::Glob(text) => write!(f, "{text}"),
        }
    }
}

/// A compiled glob set that remembers the source text of every member.
#[derive(Debug, Clone)]
struct CompiledSet {
    set: GlobSet,
    sources: Vec<String>,
}

impl CompiledSet {
    fn compile(sources: BTreeSet<String>) -> Result<Self, DumpError> {
        let mut builder = GlobSetBuilder::new();
        let mut kept = Vec::with_capacity(sources.len());
        for source in sources {
            if let Some(glob) = compile_glob(&source) {
                builder.add(glob);
                kept.push(source);
            }
        }
        let set = builder
            .build()
            .map_err(|e| DumpError::Pattern(format!("Failed to build glob set: {}", e)))?;
        Ok(Self { set, sources: kept })
    }

    /// Returns the source of the first glob matching any candidate.
    fn first_match(&self, candidates: &[&str]) -> Option<&str> {
        candidates.iter().find_map(|candidate| {
            self.set
                .matches(*candidate)
                .first()
                .map(|&i| self.sources[i].as_str())
        })
    }
}

/// Wraps every glob metacharacter, braces included, in a one-char class.
fn escape_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '*' | '?' | '[' | ']' | '{' | '}' => {
                escaped.push('[');
                escaped.push(c);
                escaped.push(']');
            }
            c => escaped.push(c),
        }
    }
    escaped
}

fn compile_glob(source: &str) -> Option<Glob> {
    let build = |text: &str| {
        GlobBuilder::new(text)
            .case_insensitive(true)
            .literal_separator(false)
            .build()
    };
    match build(source) {
        Ok(glob) => Some(glob),
        Err(e) => {
            tracing::warn!("Invalid glob pattern '{}' ({}), matching it literally", source, e);
            build(&escape_literal(source)).ok()
        }
    }
}

/// The immutable rule set for one run.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: BTreeSet<Pattern>,
    files: CompiledSet,
    dirs: CompiledSet,
}

impl PatternSet {
    /// Builds the defaults plus every readable user pattern file.
    ///
    /// Missing or unreadable files are logged and skipped.
    pub fn build<P: AsRef<Path>>(user_files: &[P]) -> Result<Self, DumpError> {
        let mut patterns = Self::default_patterns();
        for path in user_files {
            let path = path.as_ref();
            match fs::read_to_string(path) {
                Ok(text) => {
                    let rules = Self::parse_rules(&text);
                    tracing::debug!("Loaded {} rules from {}", rules.len(), path.display());
                    for rule in &rules {
                        tracing::trace!("  {:?}: {}", rule.kind, rule);
                    }
                    patterns.extend(rules);
                }
                Err(e) => {
                    tracing::warn!("Skipping pattern file {}: {}", path.display(), e);
                }
            }
        }
        Self::from_patterns(patterns)
    }

    /// The built-in rules alone.
    pub fn defaults() -> Result<Self, DumpError> {
        Self::from_patterns(Self::default_patterns())
    }

    pub fn from_patterns(patterns: impl IntoIterator<Item = Pattern>) -> Result<Self, DumpError> {
        let patterns: BTreeSet<Pattern> = patterns.into_iter().collect();
        let mut file_globs = BTreeSet::new();
        let mut dir_globs = BTreeSet::new();
        for pattern in &patterns {
            for glob in pattern.rule.expansions() {
                // `.*` would hide every dotted path; hidden directories have their own rule.
                if glob != ".*" {
                    let dir_glob = glob.strip_suffix("/**").unwrap_or(&glob);
                    if !dir_glob.is_empty() {
                        dir_globs.insert(dir_glob.to_string());
                    }
                }
                file_globs.insert(glob);
            }
        }
        Ok(Self {
            files: CompiledSet::compile(file_globs)?,
            dirs: CompiledSet::compile(dir_globs)?,
            patterns,
        })
    }

    /// Parses the contents of one pattern file.
    pub fn parse_rules(text: &str) -> Vec<Pattern> {
        text.lines()
            .filter_map(|line| {
                let line = line.split('#').next().unwrap_or("").trim();
                let token = line.replace('\\', "/");
                let token = token.trim_matches('/');
                (!token.is_empty()).then(|| Pattern::from_token(token))
            })
            .collect()
    }

    fn default_patterns() -> BTreeSet<Pattern> {
        let extensions = DEFAULT_EXCLUDED_EXTENSIONS.iter().map(|ext| {
            Pattern::new(PatternKind::DefaultExtension, Rule::Extension(ext.to_string()))
        });
        let dirs = DEFAULT_EXCLUDED_DIRS.iter().map(|dir| {
            Pattern::new(PatternKind::BuiltinDirectory, Rule::Literal(dir.to_string()))
        });
        extensions.chain(dirs).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// First glob matching a file by bare name or relative path.
    pub fn match_file(&self, name: &str, rel_path: &str) -> Option<&str> {
        self.files.first_match(&[name, rel_path])
    }

    /// First glob matching a directory by bare name or relative path.
    ///
    /// Globs are matched with any trailing `/**` removed so that `build/**`
    /// names the directory itself.
    pub fn match_dir(&self, name: &str, rel_path: &str) -> Option<&str> {
        self.dirs.first_match(&[name, rel_path])
    }
}

/// True if `name` is one of [`DEFAULT_EXCLUDED_DIRS`], ignoring case.
pub fn is_builtin_dir(name: &str) -> bool {
    DEFAULT_EXCLUDED_DIRS
        .iter()
        .any(|dir| dir.eq_ignore_ascii_case(name))
}
