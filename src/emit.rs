//! Per-file content emission.
//!
//! File-level failures never escape: they become one diagnostic line in the
//! output. Only sink errors are returned.

use crate::error::DumpError;
use crate::options::{BinaryDetection, DumpOptions};
use crate::output::Sink;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

/// The parts of [`DumpOptions`] the emitter needs.
#[derive(Debug, Clone, Copy)]
pub struct EmitOptions<'a> {
    pub skip_substrings: &'a [String],
    pub strip_notebook_outputs: bool,
    pub binary_detection: BinaryDetection,
}

impl Default for EmitOptions<'_> {
    fn default() -> Self {
        Self {
            skip_substrings: &[],
            strip_notebook_outputs: true,
            binary_detection: BinaryDetection::None,
        }
    }
}

impl<'a> From<&'a DumpOptions> for EmitOptions<'a> {
    fn from(options: &'a DumpOptions) -> Self {
        Self {
            skip_substrings: &options.skip_substrings,
            strip_notebook_outputs: options.strip_notebook_outputs,
            binary_detection: options.binary_detection,
        }
    }
}

impl EmitOptions<'_> {
    fn skips(&self, line: &str) -> bool {
        self.skip_substrings
            .iter()
            .any(|sub| line.contains(sub.as_str()))
    }
}

/// Writes `Content of <rel_path>:` followed by the file's content.
pub fn emit_file<S: Sink + ?Sized>(
    path: &Path,
    rel_path: &str,
    sink: &mut S,
    options: &EmitOptions<'_>,
) -> Result<(), DumpError> {
    sink.write_text(&format!("Content of {}:\n", rel_path))?;
    if is_notebook(path) {
        emit_notebook(path, sink, options)
    } else {
        emit_lines(path, sink, options)
    }
}

fn is_notebook(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ipynb"))
}

fn emit_notebook<S: Sink + ?Sized>(
    path: &Path,
    sink: &mut S,
    options: &EmitOptions<'_>,
) -> Result<(), DumpError> {
    let rendered = match render_notebook(path, options.strip_notebook_outputs) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Cannot process notebook {}: {}", path.display(), e);
            return sink.write_text(&format!("Error processing .ipynb file: {}\n", e));
        }
    };
    // The rendered JSON has no trailing newline, so neither does the last line.
    for line in rendered.split_inclusive('\n').filter(|line| !options.skips(line)) {
        sink.write_text(line)?;
    }
    Ok(())
}

fn render_notebook(path: &Path, strip: bool) -> Result<String, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    let mut notebook: Value = serde_json::from_str(&text)?;
    if strip {
        strip_notebook_outputs(&mut notebook);
    }
    Ok(serde_json::to_string_pretty(&notebook)?)
}

/// Empties `outputs` and nulls `execution_count` on every cell that has them.
pub fn strip_notebook_outputs(notebook: &mut Value) {
    let Some(cells) = notebook.get_mut("cells").and_then(Value::as_array_mut) else {
        return;
    };
    for cell in cells.iter_mut().filter_map(Value::as_object_mut) {
        if let Some(outputs) = cell.get_mut("outputs") {
            *outputs = Value::Array(Vec::new());
        }
        if let Some(count) = cell.get_mut("execution_count") {
            *count = Value::Null;
        }
    }
}

fn emit_lines<S: Sink + ?Sized>(
    path: &Path,
    sink: &mut S,
    options: &EmitOptions<'_>,
) -> Result<(), DumpError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => return write_read_error(sink, path, &e),
    };
    let mut reader = BufReader::new(file);
    if options.binary_detection != BinaryDetection::None {
        let head = match reader.fill_buf() {
            Ok(head) => head,
            Err(e) => return write_read_error(sink, path, &e),
        };
        let is_binary = match options.binary_detection {
            BinaryDetection::Simple => head.contains(&0),
            BinaryDetection::Accurate => content_inspector::inspect(head).is_binary(),
            BinaryDetection::None => false,
        };
        if is_binary {
            tracing::debug!("Binary file detected: {}", path.display());
            return sink.write_text("Error reading file: binary content detected. Content skipped.\n");
        }
    }

    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => return Ok(()),
            Ok(_) if options.skips(&line) => {}
            Ok(_) => sink.write_text(&line)?,
            Err(e) => return write_read_error(sink, path, &e),
        }
    }
}

fn write_read_error<S: Sink + ?Sized>(
    sink: &mut S,
    path: &Path,
    error: &std::io::Error,
) -> Result<(), DumpError> {
    tracing::warn!("Cannot read {}: {}", path.display(), error);
    sink.write_text(&format!("Error reading file: {}. Content skipped.\n", error))
}
