use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Bytes per megabyte as used by `--max-chunk-size`.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BinaryDetection {
    Simple,
    Accurate,
    #[default]
    None,
}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpOptions {
    pub root: PathBuf,
    pub output: PathBuf,
    pub pattern_files: Vec<PathBuf>,
    /// Allowlist of file-name suffixes for the body. `None` admits every kept file.
    pub extensions: Option<Vec<String>>,
    /// Byte budget per output part. `None` writes a single file.
    pub max_chunk_bytes: Option<u64>,
    pub skip_substrings: Vec<String>,
    pub strip_notebook_outputs: bool,
    pub binary_detection: BinaryDetection,
}
impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            output: PathBuf::from("dump.txt"),
            pattern_files: Vec::new(),
            extensions: None,
            max_chunk_bytes: None,
            skip_substrings: Vec::new(),
            strip_notebook_outputs: true,
            binary_detection: BinaryDetection::None,
        }
    }
}
#[derive(Debug, Default)]
pub struct DumpBuilder {
    options: DumpOptions,
}
impl DumpBuilder {
    pub fn new(root: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            options: DumpOptions {
                root: root.into(),
                output: output.into(),
                ..Default::default()
            },
        }
    }
    pub fn pattern_files(mut self, files: Vec<PathBuf>) -> Self {
        self.options.pattern_files = files;
        self
    }
    pub fn pattern_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.options.pattern_files.push(file.into());
        self
    }
    pub fn extensions(mut self, extensions: Option<Vec<String>>) -> Self {
        self.options.extensions = extensions.filter(|exts| !exts.is_empty());
        self
    }
    pub fn max_chunk_bytes(mut self, bytes: Option<u64>) -> Self {
        self.options.max_chunk_bytes = bytes.filter(|&b| b > 0);
        self
    }
    /// Sets the chunk budget in megabytes. Zero disables chunking.
    pub fn max_chunk_mb(self, mb: u64) -> Self {
        self.max_chunk_bytes(Some(mb.saturating_mul(BYTES_PER_MB)))
    }
    pub fn skip_substrings(mut self, substrings: Vec<String>) -> Self {
        self.options.skip_substrings = substrings;
        self
    }
    pub fn skip_substring(mut self, substring: impl Into<String>) -> Self {
        self.options.skip_substrings.push(substring.into());
        self
    }
    pub fn strip_notebook_outputs(mut self, yes: bool) -> Self {
        self.options.strip_notebook_outputs = yes;
        self
    }
    pub fn binary_detection(mut self, method: BinaryDetection) -> Self {
        self.options.binary_detection = method;
        self
    }
    pub fn build(self) -> DumpOptions {
        self.options
    }
}
