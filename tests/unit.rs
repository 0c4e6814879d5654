use dirdump::classify::{PROTECTED_EXTENSIONS, normalize_rel_path};
use dirdump::output::{is_output_path, part_path};
use dirdump::patterns::{DEFAULT_EXCLUDED_DIRS, DEFAULT_EXCLUDED_EXTENSIONS};
use dirdump::{
    BinaryDetection, ChunkedSink, Classifier, Decision, DirLister, EmitOptions, PatternKind,
    PatternSet, Rule, Sink, emit_file, strip_notebook_outputs,
};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

#[derive(Clone, Default)]
struct StubLister(HashMap<PathBuf, Vec<&'static str>>);
impl StubLister {
    fn with(mut self, dir: &str, children: &[&'static str]) -> Self {
        self.0.insert(PathBuf::from(dir), children.to_vec());
        self
    }
}
impl DirLister for StubLister {
    fn list(&self, dir: &Path) -> io::Result<Vec<OsString>> {
        self.0
            .get(dir)
            .map(|names| names.iter().map(OsString::from).collect())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such directory"))
    }
}

fn classifier(patterns: PatternSet, lister: StubLister) -> Classifier<StubLister> {
    Classifier::with_lister("/proj", Arc::new(patterns), lister)
}

fn defaults() -> Classifier<StubLister> {
    classifier(PatternSet::defaults().unwrap(), StubLister::default())
}

#[test]
fn test_protected_files_survive_any_pattern() {
    let patterns = PatternSet::from_patterns(PatternSet::parse_rules("*\n*.py\n*.md\nsrc\n")).unwrap();
    let c = classifier(patterns, StubLister::default());
    for ext in PROTECTED_EXTENSIONS {
        let name = format!("module{}", ext);
        assert_eq!(c.classify_file(&name, &format!("src/{}", name)), Decision::Keep, "{}", name);
    }
    assert_eq!(c.classify_file("NOTES.MD", "NOTES.MD"), Decision::Keep);
    assert_eq!(c.classify_file("analysis.R", "stats/analysis.R"), Decision::Keep);
    assert_eq!(c.classify_file("other.txt", "other.txt"), Decision::Skip);
}
#[test]
fn test_license_always_skipped() {
    let c = defaults();
    assert_eq!(c.classify_file("license.md", "license.md"), Decision::Skip);
    assert_eq!(c.classify_file("LICENSE.md", "docs/LICENSE.md"), Decision::Skip);
    assert_eq!(c.classify_file("License.MD", "License.MD"), Decision::Skip);
    assert_eq!(c.classify_file("LICENSE", "LICENSE"), Decision::Keep);
}
#[test]
fn test_builtin_dirs_skipped_even_with_protected_children() {
    let mut lister = StubLister::default();
    for dir in DEFAULT_EXCLUDED_DIRS {
        lister = lister.with(&format!("/proj/{}", dir), &["main.py", "README.md"]);
    }
    let c = classifier(PatternSet::defaults().unwrap(), lister);
    for dir in DEFAULT_EXCLUDED_DIRS {
        assert_eq!(c.classify_dir(dir, dir), Decision::Skip, "{}", dir);
    }
    assert_eq!(c.classify_dir("Node_Modules", "Node_Modules"), Decision::Skip);
}
#[test]
fn test_hidden_dirs_need_protected_child() {
    let lister = StubLister::default()
        .with("/proj/.config", &["settings.toml", "colors.conf"])
        .with("/proj/.scripts", &["run.py"])
        .with("/proj/.github", &["README.MD"])
        .with("/proj/src/.cache", &[]);
    let c = classifier(PatternSet::defaults().unwrap(), lister);
    assert_eq!(c.classify_dir(".config", ".config"), Decision::Skip);
    assert_eq!(c.classify_dir(".scripts", ".scripts"), Decision::Keep);
    assert_eq!(c.classify_dir(".github", ".github"), Decision::Keep);
    assert_eq!(c.classify_dir(".cache", "src/.cache"), Decision::Skip);
    // Listing failure counts as no protected child.
    assert_eq!(c.classify_dir(".missing", ".missing"), Decision::Skip);
    assert_eq!(c.classify_dir(".", "."), Decision::Keep);
}
#[test]
fn test_default_extensions_skipped() {
    let c = defaults();
    for ext in DEFAULT_EXCLUDED_EXTENSIONS {
        let name = format!("x.{}", ext);
        assert_eq!(c.classify_file(&name, &name), Decision::Skip, "{}", name);
    }
    assert_eq!(c.classify_file("logo.PNG", "assets/img/logo.PNG"), Decision::Skip);
    assert_eq!(c.classify_file("main.rs", "src/main.rs"), Decision::Keep);
    assert_eq!(c.classify_file("Makefile", "Makefile"), Decision::Keep);
}
#[test]
fn test_matched_dir_kept_for_protected_child() {
    let patterns = PatternSet::from_patterns(PatternSet::parse_rules("generated\n")).unwrap();
    let lister = StubLister::default()
        .with("/proj/generated", &["schema.py"])
        .with("/proj/pkg/generated", &["table.txt"]);
    let c = classifier(patterns, lister);
    assert_eq!(c.classify_dir("generated", "generated"), Decision::Keep);
    assert_eq!(c.classify_dir("generated", "pkg/generated"), Decision::Skip);
    assert_eq!(c.classify_dir("src", "src"), Decision::Keep);
    // Inside a kept-by-probe directory, unprotected files still match `generated/**`.
    assert_eq!(c.classify_file("table.txt", "generated/table.txt"), Decision::Skip);
    assert_eq!(c.classify_file("schema.py", "generated/schema.py"), Decision::Keep);
}
#[test]
fn test_parse_rules() {
    let text = "# comment only\n\n  *.bak  # trailing comment\n\\tmp\\cache\\\n**/out/*.o\nsecret?\nlogs/\n/\n";
    let rules = PatternSet::parse_rules(text);
    let parsed: Vec<_> = rules.iter().map(|p| (p.kind, p.rule.clone())).collect();
    assert_eq!(
        parsed,
        vec![
            (PatternKind::UserGlob, Rule::Extension("bak".into())),
            (PatternKind::UserLiteral, Rule::Literal("tmp/cache".into())),
            (PatternKind::UserGlobal, Rule::Glob("**/out/*.o".into())),
            (PatternKind::UserGlob, Rule::Glob("secret?".into())),
            (PatternKind::UserLiteral, Rule::Literal("logs".into())),
        ]
    );
}
#[test]
fn test_literal_rules_match_at_any_depth() {
    let patterns = PatternSet::from_patterns(PatternSet::parse_rules("docs/internal\nweird{name}\n")).unwrap();
    let c = classifier(patterns, StubLister::default());
    assert_eq!(c.classify_file("a.txt", "docs/internal/a.txt"), Decision::Skip);
    assert_eq!(c.classify_file("a.txt", "other/docs/internal/a.txt"), Decision::Skip);
    assert_eq!(c.classify_file("a.txt", "docs/a.txt"), Decision::Keep);
    assert_eq!(c.classify_file("weird{name}", "weird{name}"), Decision::Skip);
    assert_eq!(c.classify_file("weirdname", "weirdname"), Decision::Keep);
}
#[test]
fn test_invalid_glob_matches_literally() {
    let patterns = PatternSet::from_patterns(PatternSet::parse_rules("data[\n")).unwrap();
    let c = classifier(patterns, StubLister::default());
    assert_eq!(c.classify_file("data[", "data["), Decision::Skip);
    assert_eq!(c.classify_file("data1", "data1"), Decision::Keep);
}
#[test]
fn test_missing_pattern_file_is_ignored() {
    let defaults = PatternSet::defaults().unwrap();
    let built = PatternSet::build(&[PathBuf::from("/nonexistent/dirdump/patterns")]).unwrap();
    assert_eq!(built.len(), defaults.len());
}
#[test]
fn test_pattern_file_is_loaded() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("exclude.txt");
    fs::write(&file, "scratch-*\n").unwrap();
    let patterns = PatternSet::build(&[file]).unwrap();
    assert!(patterns.match_file("scratch-1.txt", "scratch-1.txt").is_some());
    assert!(patterns.match_file("notes.txt", "notes.txt").is_none());
}
#[test]
fn test_normalize_rel_path() {
    assert_eq!(normalize_rel_path("./Src\\Lib\\A.py"), "src/lib/a.py");
    assert_eq!(normalize_rel_path("docs/guide.md"), "docs/guide.md");
}
#[test]
fn test_part_path() {
    assert_eq!(part_path(Path::new("out.txt"), 3), PathBuf::from("out_part_3.txt"));
    assert_eq!(
        part_path(Path::new("dir/archive.tar.gz"), 1),
        PathBuf::from("dir/archive.tar_part_1.gz")
    );
    assert_eq!(part_path(Path::new("noext"), 2), PathBuf::from("noext_part_2"));
}
#[test]
fn test_chunked_sink_respects_budget() {
    let dir = tempdir().unwrap();
    let mut sink = ChunkedSink::create(dir.path().join("out.txt"), 10).unwrap();
    for _ in 0..5 {
        sink.write_text("12345").unwrap();
    }
    let parts = sink.finish().unwrap();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], dir.path().join("out_part_1.txt"));
    assert_eq!(parts[2], dir.path().join("out_part_3.txt"));
    let total: usize = parts
        .iter()
        .map(|p| {
            let len = fs::read(p).unwrap().len();
            assert!(len <= 10);
            len
        })
        .sum();
    assert_eq!(total, 25);
}
#[test]
fn test_chunked_sink_oversized_write() {
    let dir = tempdir().unwrap();
    let mut sink = ChunkedSink::create(dir.path().join("big.log"), 4).unwrap();
    sink.write_text("abcdefghij").unwrap();
    sink.write_text("xy").unwrap();
    let parts = sink.finish().unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(fs::read_to_string(&parts[0]).unwrap(), "abcdefghij");
    assert_eq!(fs::read_to_string(&parts[1]).unwrap(), "xy");
}
#[test]
fn test_emit_skips_lines_and_keeps_endings() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.txt");
    fs::write(&path, "one\r\ntwo SECRET\nthree").unwrap();
    let skips = vec!["SECRET".to_string()];
    let options = EmitOptions {
        skip_substrings: &skips,
        ..Default::default()
    };
    let mut out = String::new();
    emit_file(&path, "a.txt", &mut out, &options).unwrap();
    assert_eq!(out, "Content of a.txt:\none\r\nthree");
}
#[test]
fn test_emit_reports_decode_error_inline() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.txt");
    fs::write(&path, b"ok\n\xff\xfe\n").unwrap();
    let mut out = String::new();
    emit_file(&path, "bad.txt", &mut out, &EmitOptions::default()).unwrap();
    assert!(out.starts_with("Content of bad.txt:\nok\nError reading file: "));
    assert!(out.ends_with(". Content skipped.\n"));
}
#[test]
fn test_emit_missing_file() {
    let dir = tempdir().unwrap();
    let mut out = String::new();
    emit_file(&dir.path().join("gone.txt"), "gone.txt", &mut out, &EmitOptions::default()).unwrap();
    assert!(out.contains("Error reading file:"));
}
#[test]
fn test_emit_binary_detection() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("blob.dat");
    fs::write(&path, vec![b'a', 0, 1, 2]).unwrap();
    let options = EmitOptions {
        binary_detection: BinaryDetection::Simple,
        ..Default::default()
    };
    let mut out = String::new();
    emit_file(&path, "blob.dat", &mut out, &options).unwrap();
    assert!(out.contains("binary content detected"));
}
#[test]
fn test_emit_malformed_notebook() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.ipynb");
    fs::write(&path, "{ not json").unwrap();
    let mut out = String::new();
    emit_file(&path, "broken.ipynb", &mut out, &EmitOptions::default()).unwrap();
    assert!(out.starts_with("Content of broken.ipynb:\nError processing .ipynb file: "));
}
#[test]
fn test_strip_notebook_outputs() {
    let mut notebook = serde_json::json!({
        "cells": [
            {"cell_type": "code", "execution_count": 3, "outputs": [{"output_type": "stream"}]},
            {"cell_type": "markdown", "source": ["# Title"]}
        ]
    });
    strip_notebook_outputs(&mut notebook);
    assert_eq!(notebook["cells"][0]["outputs"], serde_json::json!([]));
    assert!(notebook["cells"][0]["execution_count"].is_null());
    assert!(notebook["cells"][1].get("outputs").is_none());
    assert!(notebook["cells"][1].get("execution_count").is_none());
}
#[test]
fn test_hidden_catch_all_dir_glob() {
    let bare = PatternSet::from_patterns(PatternSet::parse_rules(".*\n")).unwrap();
    assert!(bare.match_dir(".cache", ".cache").is_none());
    assert!(bare.match_file(".env", ".env").is_some());
    let nested = PatternSet::from_patterns(PatternSet::parse_rules(".*/**\n")).unwrap();
    assert_eq!(nested.match_dir(".cache", ".cache"), Some(".*"));
}
#[test]
fn test_output_files_are_excluded() {
    assert!(is_output_path(Path::new("out/dump.txt"), Path::new("out/dump.txt")));
    assert!(is_output_path(Path::new("out/dump.txt"), Path::new("out/dump_part_12.txt")));
    assert!(!is_output_path(Path::new("out/dump.txt"), Path::new("dump_part_1.txt")));
    assert!(!is_output_path(Path::new("out/dump.txt"), Path::new("out/dump_part_.txt")));
    assert!(!is_output_path(Path::new("out/dump.txt"), Path::new("out/dump_part_1.md")));
    assert!(is_output_path(Path::new("dump"), Path::new("dump_part_3")));

    let c = defaults().exclude_output("notes/dump.md");
    assert_eq!(c.classify_file("dump.md", "notes/dump.md"), Decision::Skip);
    assert_eq!(c.classify_file("dump_part_2.md", "notes/dump_part_2.md"), Decision::Skip);
    assert_eq!(c.classify_file("dump.md", "dump.md"), Decision::Keep);
}
#[test]
fn test_notebook_lines_written_whole() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nb.ipynb");
    let notebook = serde_json::json!({
        "cells": [{"cell_type": "markdown", "source": ["# Title", "secret cell"]}],
        "nbformat": 4
    });
    fs::write(&path, notebook.to_string()).unwrap();
    let options = EmitOptions {
        skip_substrings: &["secret".to_string()],
        ..Default::default()
    };

    let mut out = String::new();
    emit_file(&path, "nb.ipynb", &mut out, &options).unwrap();
    assert!(out.ends_with("\"nbformat\": 4\n}"));
    assert!(!out.contains("secret"));

    let mut sink = ChunkedSink::create(dir.path().join("nb.txt"), 16).unwrap();
    emit_file(&path, "nb.ipynb", &mut sink, &options).unwrap();
    let parts = sink.finish().unwrap();
    assert!(parts.len() > 2);
    let (last, rest) = parts.split_last().unwrap();
    for part in rest {
        assert!(fs::read_to_string(part).unwrap().ends_with('\n'));
    }
    assert_eq!(fs::read_to_string(last).unwrap(), "}");
    let joined: String = parts.iter().map(|p| fs::read_to_string(p).unwrap()).collect();
    assert_eq!(joined, out);
}
