//! Output sinks for the dump.
//!
//! Everything the dump produces goes through [`Sink::write_text`]. The file
//! sinks buffer their writes. [`ChunkedSink`] splits the stream across
//! numbered part files once a byte budget would be exceeded.

use crate::error::DumpError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Append-only text destination.
pub trait Sink {
    fn write_text(&mut self, text: &str) -> Result<(), DumpError>;
}

impl Sink for String {
    fn write_text(&mut self, text: &str) -> Result<(), DumpError> {
        self.push_str(text);
        Ok(())
    }
}

/// A single buffered output file.
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, DumpError> {
        let path = path.into();
        let file = File::create(&path).map_err(|e| DumpError::io(&path, e))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Flushes and closes the file, returning its path.
    pub fn finish(mut self) -> Result<PathBuf, DumpError> {
        self.writer
            .flush()
            .map_err(|e| DumpError::io(&self.path, e))?;
        Ok(self.path)
    }
}

impl Sink for FileSink {
    fn write_text(&mut self, text: &str) -> Result<(), DumpError> {
        self.writer
            .write_all(text.as_bytes())
            .map_err(|e| DumpError::io(&self.path, e))
    }
}

struct Part {
    path: PathBuf,
    writer: BufWriter<File>,
    size: u64,
}

impl Part {
    fn close(mut self) -> Result<PathBuf, DumpError> {
        self.writer
            .flush()
            .map_err(|e| DumpError::io(&self.path, e))?;
        Ok(self.path)
    }
}

/// Writes to `<stem>_part_<N><.ext>` files next to the base path.
///
/// A part is rotated before a write that would push it past the budget,
/// unless the part is still empty. A single write larger than the budget
/// therefore lands whole in one part, which then exceeds the budget.
pub struct ChunkedSink {
    base: PathBuf,
    budget: u64,
    next_index: usize,
    current: Part,
    closed: Vec<PathBuf>,
}

impl ChunkedSink {
    /// Opens the first part immediately.
    pub fn create(base: impl Into<PathBuf>, budget: u64) -> Result<Self, DumpError> {
        let base = base.into();
        let current = open_part(&base, 1)?;
        Ok(Self {
            base,
            budget,
            next_index: 2,
            current,
            closed: Vec::new(),
        })
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    fn rotate(&mut self) -> Result<(), DumpError> {
        let next = open_part(&self.base, self.next_index)?;
        self.next_index += 1;
        let previous = std::mem::replace(&mut self.current, next);
        self.closed.push(previous.close()?);
        Ok(())
    }

    /// Flushes and closes the last part, returning every part path in order.
    pub fn finish(self) -> Result<Vec<PathBuf>, DumpError> {
        let mut paths = self.closed;
        paths.push(self.current.close()?);
        Ok(paths)
    }
}

impl Sink for ChunkedSink {
    fn write_text(&mut self, text: &str) -> Result<(), DumpError> {
        let len = text.len() as u64;
        if self.current.size > 0 && self.current.size + len > self.budget {
            self.rotate()?;
        }
        let part = &mut self.current;
        part.writer
            .write_all(text.as_bytes())
            .map_err(|e| DumpError::io(&part.path, e))?;
        part.size += len;
        Ok(())
    }
}

fn open_part(base: &Path, index: usize) -> Result<Part, DumpError> {
    let path = part_path(base, index);
    let file = File::create(&path).map_err(|e| DumpError::io(&path, e))?;
    tracing::debug!("Opened output part {}", path.display());
    Ok(Part {
        path,
        writer: BufWriter::new(file),
        size: 0,
    })
}

/// `out.txt` with index 2 becomes `out_part_2.txt`.
pub fn part_path(base: &Path, index: usize) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{stem}_part_{index}");
    if let Some(ext) = base.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    base.with_file_name(name)
}

/// True if `candidate` is `base` itself or one of its `_part_N` files.
pub fn is_output_path(base: &Path, candidate: &Path) -> bool {
    if candidate == base {
        return true;
    }
    if candidate.parent() != base.parent() || candidate.extension() != base.extension() {
        return false;
    }
    let (Some(stem), Some(candidate_stem)) = (base.file_stem(), candidate.file_stem()) else {
        return false;
    };
    let prefix = format!("{}_part_", stem.to_string_lossy());
    candidate_stem
        .to_string_lossy()
        .strip_prefix(&prefix)
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

/// The sink chosen for a run: one file, or numbered parts.
pub enum OutputSink {
    Single(FileSink),
    Chunked(ChunkedSink),
}

impl OutputSink {
    pub fn open(output: &Path, max_chunk_bytes: Option<u64>) -> Result<Self, DumpError> {
        match max_chunk_bytes {
            Some(budget) if budget > 0 => Ok(OutputSink::Chunked(ChunkedSink::create(
                output, budget,
            )?)),
            _ => Ok(OutputSink::Single(FileSink::create(output)?)),
        }
    }

    pub fn finish(self) -> Result<Vec<PathBuf>, DumpError> {
        match self {
            OutputSink::Single(sink) => Ok(vec![sink.finish()?]),
            OutputSink::Chunked(sink) => sink.finish(),
        }
    }
}

impl Sink for OutputSink {
    fn write_text(&mut self, text: &str) -> Result<(), DumpError> {
        match self {
            OutputSink::Single(sink) => sink.write_text(text),
            OutputSink::Chunked(sink) => sink.write_text(text),
        }
    }
}
