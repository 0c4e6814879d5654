//! Rendering of the filtered directory tree shown in the dump header.

use crate::classify::{Classifier, DirLister};
use crate::error::DumpError;
use std::fs;
use std::io;
use std::path::Path;

struct Node {
    name: String,
    is_dir: bool,
}

/// Renders the tree below the classifier's root.
///
/// The first line is `/ `. Entries are listed directories first, then by
/// case-insensitive name. Skipped entries are left out and never descended
/// into. Kept directories carry a trailing `/`.
///
/// # Errors
///
/// Returns an error if the root itself cannot be listed. Nested directories
/// that cannot be listed are shown without children.
pub fn render_tree<L: DirLister>(classifier: &Classifier<L>) -> Result<String, DumpError> {
    let root = classifier.root();
    let nodes = list_sorted(root).map_err(|e| DumpError::io(root, e))?;
    let mut lines = vec!["/ ".to_string()];
    render_level(classifier, root, "", nodes, "", &mut lines);
    Ok(lines.join("\n"))
}

fn render_level<L: DirLister>(
    classifier: &Classifier<L>,
    dir: &Path,
    rel_dir: &str,
    nodes: Vec<Node>,
    prefix: &str,
    lines: &mut Vec<String>,
) {
    let visible: Vec<(Node, String)> = nodes
        .into_iter()
        .filter_map(|node| {
            let rel_path = join_rel(rel_dir, &node.name);
            let decision = if node.is_dir {
                classifier.classify_dir(&node.name, &rel_path)
            } else {
                classifier.classify_file(&node.name, &rel_path)
            };
            decision.is_keep().then_some((node, rel_path))
        })
        .collect();

    let count = visible.len();
    for (i, (node, rel_path)) in visible.into_iter().enumerate() {
        let last = i + 1 == count;
        let (connector, child_prefix) = if last {
            ("└── ", format!("{prefix}    "))
        } else {
            ("├── ", format!("{prefix}│   "))
        };
        if !node.is_dir {
            lines.push(format!("{prefix}{connector}{}", node.name));
            continue;
        }
        lines.push(format!("{prefix}{connector}{}/", node.name));
        let path = dir.join(&node.name);
        match list_sorted(&path) {
            Ok(children) => {
                render_level(classifier, &path, &rel_path, children, &child_prefix, lines)
            }
            Err(e) => tracing::warn!("Cannot list {}: {}", path.display(), e),
        }
    }
}

fn list_sorted(dir: &Path) -> io::Result<Vec<Node>> {
    let mut nodes = fs::read_dir(dir)?
        .map(|entry| {
            let entry = entry?;
            Ok(Node {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type()?.is_dir(),
            })
        })
        .collect::<io::Result<Vec<_>>>()?;
    nodes.sort_by_cached_key(|n| (!n.is_dir, n.name.to_lowercase()));
    Ok(nodes)
}

fn join_rel(rel_dir: &str, name: &str) -> String {
    if rel_dir.is_empty() {
        name.to_string()
    } else {
        format!("{rel_dir}/{name}")
    }
}
