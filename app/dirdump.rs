//! Command-line interface for dirdump.
//!
//! ```text
//! dirdump <ROOT> <OUTPUT> [PATTERN_FILES...] [.EXT...]
//!         [--max-chunk-size <MB>] [--skip-substring <TEXT>]... [--no-ipynb-strip]
//! ```
//!
//! Positionals after OUTPUT are pattern files until the first token starting
//! with `.`; that token and everything after it is the extension allowlist.
//! A token that starts with `-` but is not a known option is a positional too.

use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, Parser};
use dirdump::{BinaryDetection, DumpBuilder, DumpOptions, dump};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::exit;

/// dirdump — concatenate a directory tree into text dumps
#[derive(Parser)]
#[command(name = "dirdump", version, about, long_about = None)]
struct Cli {
    /// Directory to scan
    root: PathBuf,

    /// Output file (base name of the parts when chunking)
    output: PathBuf,

    /// Exclusion pattern files, then optional extensions to include (e.g. .py .md)
    #[arg(value_name = "PATTERN_FILE|.EXT")]
    rest: Vec<String>,

    /// Split output into parts of at most this many megabytes
    #[arg(long, value_name = "MB", allow_negative_numbers = true)]
    max_chunk_size: Option<i64>,

    /// Skip lines containing this text (can be repeated)
    #[arg(long = "skip-substring", value_name = "TEXT", allow_hyphen_values = true)]
    skip_substrings: Vec<String>,

    /// Keep cell outputs in .ipynb files
    #[arg(long)]
    no_ipynb_strip: bool,

    /// Binary detection strategy
    #[arg(long, default_value = "none", value_parser = parse_binary_detection)]
    binary_detection: BinaryDetection,

    /// Log more (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Disable logging
    #[arg(short, long)]
    quiet: bool,
}

/// Parse string into BinaryDetection enum.
fn parse_binary_detection(s: &str) -> Result<BinaryDetection, String> {
    match s {
        "simple" => Ok(BinaryDetection::Simple),
        "accurate" => Ok(BinaryDetection::Accurate),
        "none" => Ok(BinaryDetection::None),
        _ => Err(format!("invalid binary detection method: {}", s)),
    }
}

/// Splits trailing positionals at the first token starting with `.`.
fn split_positionals(mut rest: Vec<String>) -> (Vec<PathBuf>, Option<Vec<String>>) {
    match rest.iter().position(|token| token.starts_with('.')) {
        Some(i) => {
            let extensions = rest.split_off(i);
            (rest.into_iter().map(PathBuf::from).collect(), Some(extensions))
        }
        None => (rest.into_iter().map(PathBuf::from).collect(), None),
    }
}

/// Moves known options ahead of a `--` so every other token, hyphenated or
/// not, reaches the positionals in its original order.
fn reorder_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut command = Cli::command();
    command.build();
    let mut args = args.into_iter().map(Into::into);
    let mut options: Vec<OsString> = args.next().into_iter().collect();
    let mut positionals = Vec::new();
    while let Some(arg) = args.next() {
        let token = arg.to_string_lossy().into_owned();
        if token == "--" {
            positionals.extend(args.by_ref());
            break;
        }
        match option_arity(&command, &token) {
            Some(takes_value) => {
                options.push(arg);
                if takes_value {
                    options.extend(args.next());
                }
            }
            None => positionals.push(arg),
        }
    }
    options.push(OsString::from("--"));
    options.extend(positionals);
    options
}

/// `Some(takes_value)` if `token` is one of the command's options.
fn option_arity(command: &clap::Command, token: &str) -> Option<bool> {
    if let Some(long) = token.strip_prefix("--") {
        let (name, inline_value) = match long.split_once('=') {
            Some((name, _)) => (name, true),
            None => (long, false),
        };
        let arg = command
            .get_arguments()
            .find(|arg| !name.is_empty() && arg.get_long() == Some(name))?;
        return Some(!inline_value && arg.get_action().takes_values());
    }
    let shorts = token.strip_prefix('-').filter(|s| !s.is_empty())?;
    let known = shorts.chars().all(|c| {
        command
            .get_arguments()
            .any(|arg| arg.get_short() == Some(c) && !arg.get_action().takes_values())
    });
    known.then_some(false)
}

impl Cli {
    fn into_options(self) -> DumpOptions {
        let (pattern_files, extensions) = split_positionals(self.rest);
        let mut builder = DumpBuilder::new(self.root, self.output)
            .pattern_files(pattern_files)
            .extensions(extensions)
            .skip_substrings(self.skip_substrings)
            .strip_notebook_outputs(!self.no_ipynb_strip)
            .binary_detection(self.binary_detection);
        if let Some(mb) = self.max_chunk_size {
            builder = builder.max_chunk_mb(mb.max(0) as u64);
        }
        builder.build()
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info,ignore=warn,globset=warn"),
            _ => tracing_subscriber::EnvFilter::new("debug,ignore=warn,globset=warn"),
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = match Cli::try_parse_from(reorder_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            exit(1);
        }
    };
    setup_logging(cli.verbose, cli.quiet);
    let options = cli.into_options();

    if !options.pattern_files.is_empty() {
        tracing::info!("Exclusion pattern files: {:?}", options.pattern_files);
    }
    if let Some(extensions) = &options.extensions {
        tracing::info!("Filtering for these file types: {:?}", extensions);
    }
    if !options.skip_substrings.is_empty() {
        tracing::info!("Skipping lines containing: {:?}", options.skip_substrings);
    }
    if options.strip_notebook_outputs {
        tracing::info!("Will strip outputs from .ipynb files.");
    }

    match dump(&options) {
        Ok(report) => {
            tracing::info!(
                "Dumped {} files into {} output file(s)",
                report.files.len(),
                report.outputs.len()
            );
            println!(
                "Completed. Output written to file(s) starting with '{}'",
                options.output.display()
            );
        }
        Err(e) => {
            eprintln!("Error during execution: {}", e);
            exit(1);
        }
    }
}
