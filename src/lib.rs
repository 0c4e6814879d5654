//! # dirdump
//!
//! `dirdump` walks a directory tree and concatenates the contents of every
//! surviving file, preceded by a tree diagram, into one output file or a
//! series of size-bounded parts.
//!
//! What survives is decided by layered rules:
//!
//! - a built-in blocklist of binary, media, archive, data and script extensions,
//! - a built-in blocklist of tool directories (`.git`, `node_modules`, ...),
//! - user pattern files (one glob or literal per line, `#` comments),
//! - protected extensions (`.py`, `.md`, `.ipynb`, ...) that are always kept,
//! - hidden directories, shown only when they hold a protected file,
//! - `license.md`, which is always dropped.
//!
//! File contents can be redacted line by line with skip-substrings. Jupyter
//! notebooks are re-serialized with their cell outputs cleared.
//!
//! # Example
//!
//! ```no_run
//! use dirdump::{DumpBuilder, dump};
//!
//! let options = DumpBuilder::new(".", "dump.txt")
//!     .pattern_file(".dumpignore")
//!     .skip_substring("API_KEY")
//!     .max_chunk_mb(10)
//!     .build();
//!
//! let report = dump(&options).expect("Failed to dump directory");
//!
//! println!("Directory tree:\n{}", report.tree);
//! for path in &report.outputs {
//!     println!("Wrote {}", path.display());
//! }
//! ```

pub mod classify;
mod emit;
mod engine;
mod error;
mod options;
pub mod output;
pub mod patterns;
mod tree;
mod types;

pub use classify::{Classifier, DirLister, FsLister};
pub use emit::{EmitOptions, emit_file, strip_notebook_outputs};
pub use engine::{dump, dump_to, walk_and_emit};
pub use error::DumpError;
pub use options::{BYTES_PER_MB, BinaryDetection, DumpBuilder, DumpOptions};
pub use output::{ChunkedSink, FileSink, OutputSink, Sink};
pub use patterns::{Pattern, PatternKind, PatternSet, Rule};
pub use tree::render_tree;
pub use types::{Decision, DumpReport};
