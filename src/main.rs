//! dirdump - Dump the contents of a directory tree, honouring gitignore rules.
//!
//! Usage:
//!   dirdump [DIR]                    Print every included file under DIR
//!   dirdump --ext rs,toml src        Only Rust and TOML files
//!   dirdump --json -o dump.json      Base64-encoded JSON array
//!   dirdump --markdown --show-skipped
//!   dirdump --help                   Show help

mod output;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{ArgAction, Parser, ValueEnum};
use color_eyre::eyre::{Context, Result};
use itertools::Itertools;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use dirdump_core::{IgnoreConfig, ProgressStats, SkippedItem, WalkConfig, WalkError};
use dirdump_ignore::IgnoreMatcher;
use dirdump_walk::{WalkOptions, walk};

use crate::output::{OutputStyle, Printer};

#[derive(Parser)]
#[command(
    name = "dirdump",
    version,
    about = "Dump the contents of a directory tree, honouring gitignore rules",
    long_about = "dirdump walks a directory and prints the content of every file that is \
                  not excluded by hidden-file, version-control, .gitignore or custom rules.\n\n\
                  Output goes to stdout (or --output) as plain text, Markdown or JSON; \
                  logs and progress go to stderr."
)]
struct Cli {
    /// Directory to scan (defaults to current directory)
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log level (overrides --verbose and --quiet)
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    /// Read files on a pool of worker threads
    #[arg(short, long)]
    concurrent: bool,

    /// Number of workers in concurrent mode
    #[arg(short, long, default_value_t = default_workers())]
    workers: usize,

    /// Skip files larger than this many megabytes (0 = no limit)
    #[arg(long, default_value_t = 0)]
    max_size: u64,

    /// Ignore hidden files and directories
    #[arg(long, default_value_t = true, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    hidden: bool,

    /// Ignore the .git directory
    #[arg(long, default_value_t = true, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    git: bool,

    /// Extra ignore patterns in gitignore syntax (comma-separated)
    #[arg(long, value_delimiter = ',')]
    ignore: Vec<String>,

    /// Disable every ignore rule
    #[arg(long)]
    no_ignore: bool,

    /// Only include these file extensions (comma-separated, e.g. "go,md")
    #[arg(long, value_delimiter = ',')]
    ext: Vec<String>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show a progress line on stderr
    #[arg(long)]
    progress: bool,

    /// Abort the scan after this long (e.g., "30s", "5m", "1h")
    #[arg(long, value_parser = parse_duration)]
    timeout: Option<Duration>,

    /// List skipped files and directories at the end
    #[arg(long)]
    show_skipped: bool,

    /// Output a JSON array with base64-encoded content
    #[arg(long, conflicts_with = "markdown")]
    json: bool,

    /// Output Markdown with fenced code blocks
    #[arg(long)]
    markdown: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

fn default_workers() -> usize {
    WalkConfig::new().effective_workers()
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    setup_logging(&cli);

    run(&cli)
}

fn setup_logging(cli: &Cli) {
    let level = match cli.log_level {
        Some(level) => level.as_str(),
        None if cli.verbose => "debug",
        None if cli.quiet => "warn",
        None => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(!cli.no_color && console::colors_enabled_stderr())
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let start = Instant::now();

    let root = cli
        .dir
        .canonicalize()
        .map_err(|e| WalkError::root_io(&cli.dir, e))?;
    if !root.is_dir() {
        return Err(WalkError::NotADirectory { path: root }.into());
    }

    let patterns: Vec<String> = cli
        .ignore
        .iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if !patterns.is_empty() {
        info!("Using custom ignore patterns: {}", patterns.join(", "));
    }

    let ignore_config = IgnoreConfig::builder()
        .root(root.clone())
        .ignore_hidden(cli.hidden)
        .ignore_vcs(cli.git)
        .custom_patterns(patterns)
        .disabled(cli.no_ignore)
        .build()
        .wrap_err("Invalid ignore configuration")?;
    let matcher = IgnoreMatcher::new(&ignore_config).wrap_err("Error initializing ignore rules")?;

    if cli.no_ignore {
        info!("Ignore rules disabled.");
    } else if cli.hidden {
        info!("Ignoring hidden files/directories (starting with '.').");
    } else {
        info!("Including hidden files/directories.");
    }

    let mut builder = WalkConfig::builder();
    builder
        .concurrent(cli.concurrent)
        .workers(cli.workers)
        .max_file_size(cli.max_size.saturating_mul(1024 * 1024))
        .extensions(cli.ext.clone());
    if let Some(timeout) = cli.timeout {
        builder.timeout(timeout);
    }
    let walk_config = builder.build().wrap_err("Invalid walk configuration")?;

    let extensions = walk_config.extension_set();
    if extensions.is_empty() {
        info!("No extension filtering (including all file types).");
    } else {
        let list = extensions.iter().sorted().map(|e| format!(".{e}")).join(", ");
        info!("Filtering enabled. Only including extensions: {list}");
    }
    if let Some(limit) = walk_config.size_limit() {
        info!("Ignoring files larger than {}.", format_size(limit));
    }

    let printer = Printer::new(open_output(cli)?, output_style(cli));

    let mut options = WalkOptions::new(walk_config);
    let show_progress = cli.progress && !cli.quiet;
    if show_progress {
        options = options.with_progress(|stats| {
            eprint!("{}", status_line(&stats));
        });
    }

    info!("Scanning directory: {}", root.display());
    if cli.concurrent {
        info!("Using concurrent processing with {} workers.", cli.workers);
    }

    let outcome = walk(
        &root,
        &matcher,
        |rel, content| match content {
            Ok(bytes) => printer.print_file(rel, &bytes),
            Err(e) => {
                warn!("Skipping file '{rel}' due to error: {e}");
                Ok(())
            }
        },
        &options,
    );

    if show_progress {
        eprintln!();
    }
    printer.finalize().wrap_err("Failed to write output")?;

    info!(
        "Found and processed {} files ({}).",
        printer.count(),
        format_size(printer.bytes())
    );
    info!(
        "Scan complete in {:.2?} ({:.1} files/s).",
        start.elapsed(),
        outcome.stats.files_per_second()
    );
    debug!(stats = ?outcome.stats, "Final counters");

    let faults = fault_count(&outcome.skipped);
    if faults > 0 {
        warn!("{faults} path(s) could not be read; use --show-skipped for details.");
    }

    if cli.show_skipped {
        print_skipped(&outcome.skipped);
    }

    if let Some(err) = outcome.error {
        return Err(err).wrap_err("Directory walk did not complete");
    }

    Ok(())
}

fn output_style(cli: &Cli) -> OutputStyle {
    if cli.json {
        OutputStyle::Json
    } else if cli.markdown {
        OutputStyle::Markdown
    } else {
        OutputStyle::Plain {
            color: !cli.no_color && cli.output.is_none() && console::colors_enabled(),
        }
    }
}

fn open_output(cli: &Cli) -> Result<Box<dyn Write + Send>> {
    match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .wrap_err_with(|| format!("Failed to create output file {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

/// Single-line progress status, prefixed with a carriage return.
fn status_line(stats: &ProgressStats) -> String {
    match &stats.current_path {
        Some(path) => format!(
            "\rProcessing: {:<40} | Files: {}/{} | Dirs: {}",
            truncate_front(path, 40),
            stats.processed_files,
            stats.total_files,
            stats.total_dirs
        ),
        None => format!(
            "\rScanning... | Files: {}/{} | Dirs: {}",
            stats.processed_files, stats.total_files, stats.total_dirs
        ),
    }
}

/// Keep the tail of a path, marking the cut with "...".
fn truncate_front(s: &str, max_len: usize) -> String {
    let len = s.chars().count();
    if len <= max_len {
        s.to_string()
    } else {
        let tail: String = s.chars().skip(len - (max_len - 3)).collect();
        format!("...{tail}")
    }
}

/// Print the skipped items sorted by path, then a count per reason.
fn print_skipped(items: &[SkippedItem]) {
    info!("--- Skipped Items ({}) ---", items.len());
    if items.is_empty() {
        info!("No items were skipped.");
    }

    for item in items.iter().sorted_by(|a, b| a.path.cmp(&b.path)) {
        let kind = if item.is_dir { "DIR " } else { "FILE" };
        eprintln!("Skipped {kind}: {:.50} [{}]", item.path, item.reason);
    }

    for (reason, count) in items.iter().map(|item| item.reason).counts().into_iter().sorted() {
        info!("{count:>6}  {reason}");
    }
    info!("--- End Skipped Items ---");
}

/// Skipped paths that failed on I/O rather than being filtered out.
fn fault_count(items: &[SkippedItem]) -> usize {
    items.iter().filter(|item| item.reason.is_fault()).count()
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Parse a duration string (e.g., "500ms", "30s", "5m", "1h", "1d").
/// A bare number is taken as seconds.
fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();

    let (num, multiplier) = if let Some(n) = s.strip_suffix("ms") {
        (n.parse::<f64>()?, 0.001)
    } else if let Some(n) = s.strip_suffix('s') {
        (n.parse::<f64>()?, 1.0)
    } else if let Some(n) = s.strip_suffix('m') {
        (n.parse::<f64>()?, 60.0)
    } else if let Some(n) = s.strip_suffix('h') {
        (n.parse::<f64>()?, 60.0 * 60.0)
    } else if let Some(n) = s.strip_suffix('d') {
        (n.parse::<f64>()?, 24.0 * 60.0 * 60.0)
    } else {
        (s.parse::<f64>()?, 1.0)
    };

    Duration::try_from_secs_f64(num * multiplier).wrap_err_with(|| format!("Invalid duration: {s}"))
}
