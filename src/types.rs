use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The verdict for one directory or file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Visible in the tree; directories are descended into, files are emitted.
    Keep,
    /// Omitted entirely.
    Skip,
}

impl Decision {
    pub fn is_keep(self) -> bool {
        self == Decision::Keep
    }
}

/// Summary of a completed dump.
#[derive(Debug, Serialize, Deserialize)]
pub struct DumpReport {
    /// The rendered directory tree, as written to the header.
    pub tree: String,
    /// Relative paths of the files whose contents were emitted, in output order.
    pub files: Vec<String>,
    /// Every output file written. More than one only when chunking is enabled.
    pub outputs: Vec<PathBuf>,
}
