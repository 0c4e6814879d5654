use crate::classify::{Classifier, DirLister};
use crate::emit::{EmitOptions, emit_file};
use crate::error::DumpError;
use crate::options::DumpOptions;
use crate::output::{OutputSink, Sink};
use crate::patterns::PatternSet;
use crate::tree::render_tree;
use crate::types::DumpReport;
use ignore::{DirEntry, WalkBuilder};
use std::cmp::Ordering;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

const SEPARATOR_WIDTH: usize = 50;

/// Walks the root depth-first and yields kept files with their relative paths.
///
/// Directories are pruned by the classifier before they are entered.
struct Walker {
    inner: ignore::Walk,
    root: PathBuf,
}
impl Walker {
    fn new<L>(classifier: &Classifier<L>) -> Self
    where
        L: DirLister + Clone + Send + Sync + 'static,
    {
        let root = classifier.root().to_path_buf();
        let mut builder = WalkBuilder::new(&root);
        builder
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_path(files_before_dirs);
        let filter = classifier.clone();
        let filter_root = root.clone();
        builder.filter_entry(move |entry| {
            if !is_dir(entry) {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            let rel = rel_path(&filter_root, entry.path());
            filter.classify_dir(&name, &rel).is_keep()
        });
        Self {
            inner: builder.build(),
            root,
        }
    }
    fn into_iter(self) -> impl Iterator<Item = (DirEntry, String)> {
        let root = self.root;
        self.inner.filter_map(move |result| match result {
            Ok(entry) if entry.depth() > 0 && !is_dir(&entry) => {
                let rel = rel_path(&root, entry.path());
                Some((entry, rel))
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Walk error: {}", e);
                None
            }
        })
    }
}

fn is_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_some_and(|t| t.is_dir())
}

/// Files of a directory come before its subdirectories, each group by name.
fn files_before_dirs(a: &Path, b: &Path) -> Ordering {
    let dir = |p: &Path| fs::symlink_metadata(p).is_ok_and(|m| m.is_dir());
    dir(a)
        .cmp(&dir(b))
        .then_with(|| a.file_name().cmp(&b.file_name()))
}

/// `root/a/b.py` becomes `a/b.py`.
fn rel_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn allowed(name: &str, extensions: Option<&[String]>) -> bool {
    let Some(extensions) = extensions else {
        return true;
    };
    let name = name.to_lowercase();
    extensions
        .iter()
        .any(|ext| name.ends_with(&ext.to_lowercase()))
}

/// Walks the tree and emits every kept, allowed file to `sink`.
///
/// Returns the relative paths of the emitted files in output order.
pub fn walk_and_emit<L, S>(
    options: &DumpOptions,
    classifier: &Classifier<L>,
    sink: &mut S,
) -> Result<Vec<String>, DumpError>
where
    L: DirLister + Clone + Send + Sync + 'static,
    S: Sink + ?Sized,
{
    let emit_options = EmitOptions::from(options);
    let separator = "-".repeat(SEPARATOR_WIDTH);
    let mut emitted = Vec::new();
    for (entry, rel) in Walker::new(classifier).into_iter() {
        let name = entry.file_name().to_string_lossy();
        if !classifier.classify_file(&name, &rel).is_keep() {
            continue;
        }
        if !allowed(&name, options.extensions.as_deref()) {
            continue;
        }
        tracing::info!("Processing: {}", rel);
        sink.write_text(&format!("\nFile: {}\n", rel))?;
        sink.write_text(&format!("{}\n", separator))?;
        emit_file(entry.path(), &rel, sink, &emit_options)?;
        sink.write_text("\n")?;
        emitted.push(rel);
    }
    Ok(emitted)
}

/// Writes the header and body for `options.root` into `sink`.
///
/// The returned report has no `outputs`; those belong to whoever owns the sink.
pub fn dump_to<L, S>(
    options: &DumpOptions,
    classifier: &Classifier<L>,
    sink: &mut S,
) -> Result<DumpReport, DumpError>
where
    L: DirLister + Clone + Send + Sync + 'static,
    S: Sink + ?Sized,
{
    let tree = render_tree(classifier)?;
    sink.write_text("Directory Structure:\n")?;
    sink.write_text("-------------------\n")?;
    sink.write_text(&tree)?;
    sink.write_text("\n\n")?;

    sink.write_text("File Contents:\n")?;
    sink.write_text("--------------\n")?;
    let files = walk_and_emit(options, classifier, sink)?;
    Ok(DumpReport {
        tree,
        files,
        outputs: Vec::new(),
    })
}

/// The output path relative to `root`, if the output lands inside it.
fn output_below_root(root: &Path, output: &Path) -> Option<PathBuf> {
    let root = root.canonicalize().ok()?;
    let file_name = output.file_name()?;
    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let output = parent.canonicalize().ok()?.join(file_name);
    output.strip_prefix(&root).ok().map(Path::to_path_buf)
}

/// Runs a complete dump: builds the pattern set, opens the output, writes
/// the tree header and every kept file.
pub fn dump(options: &DumpOptions) -> Result<DumpReport, DumpError> {
    tracing::debug!("Starting dump of {}", options.root.display());
    if !options.root.is_dir() {
        return Err(DumpError::InvalidPath(format!(
            "{} is not a directory",
            options.root.display()
        )));
    }
    let patterns = Arc::new(PatternSet::build(&options.pattern_files)?);
    tracing::debug!("{} exclusion patterns in effect", patterns.len());
    let mut classifier = Classifier::new(&options.root, patterns);
    if let Some(rel) = output_below_root(&options.root, &options.output) {
        tracing::debug!("Output {} is inside the root; excluding it", rel.display());
        classifier = classifier.exclude_output(rel);
    }
    let mut sink = OutputSink::open(&options.output, options.max_chunk_bytes)?;
    let mut report = dump_to(options, &classifier, &mut sink)?;
    report.outputs = sink.finish()?;
    Ok(report)
}
