//! Directory traversal built on jwalk.
//!
//! jwalk runs in serial mode so directories are read on the calling thread
//! in sorted, depth-first order. Ignore decisions are made in
//! `process_read_dir`, before jwalk decides which children to read, so an
//! ignored directory is never listed. In concurrent mode the traversal
//! thread only filters and queues files; reading happens on the workers.

use std::collections::HashSet;
use std::fmt::Display;
use std::io;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use crossbeam_channel::{SendTimeoutError, Sender};
use dirdump_core::{FileError, ProgressStats, SkipReason, SkippedItem, WalkError};
use dirdump_ignore::{IgnoreMatcher, IgnoreReason};
use jwalk::{DirEntry, Parallelism, WalkDirGeneric};
use tracing::{debug, info, warn};

use crate::cancel::Cancellation;
use crate::options::WalkOptions;
use crate::progress::ProgressReporter;
use crate::worker::{FileJob, POLL_INTERVAL, WalkState, process_file, run_worker};

/// Decision made for an entry while its parent directory was read.
#[derive(Debug, Default, Clone)]
struct EntryState {
    /// Path relative to the root, or the absolute path when that fails.
    rel_path: String,
    skip: Option<SkipReason>,
}

type Client = ((), EntryState);

/// Result of a walk.
///
/// The skipped items and counters are always filled in, including when the
/// walk ended with an error.
#[derive(Debug)]
pub struct WalkOutcome {
    /// Every skip event, in the order it was recorded.
    pub skipped: Vec<SkippedItem>,
    /// Final counters.
    pub stats: ProgressStats,
    /// Set when the root was unusable or the walk was cancelled.
    pub error: Option<WalkError>,
}

impl WalkOutcome {
    fn failed(error: WalkError) -> Self {
        Self {
            skipped: Vec::new(),
            stats: ProgressStats::default(),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Split into the skipped items and the walk error.
    pub fn into_parts(self) -> (Vec<SkippedItem>, Option<WalkError>) {
        (self.skipped, self.error)
    }
}

/// Walk `root`, handing the content of every included file to `handler`.
///
/// `handler` receives the root-relative path and either the file content or
/// the [`FileError`] that kept it from being read. Errors it returns are
/// logged and the walk carries on.
///
/// Relative paths are passed to `matcher` unchanged, so the matcher should
/// be built for the same root.
///
/// # Example
///
/// ```no_run
/// use dirdump_core::IgnoreConfig;
/// use dirdump_ignore::IgnoreMatcher;
/// use dirdump_walk::{WalkOptions, walk};
///
/// let matcher = IgnoreMatcher::new(&IgnoreConfig::new("."))?;
/// let outcome = walk(".", &matcher, |path, content| {
///     if let Ok(bytes) = content {
///         println!("{path}: {} bytes", bytes.len());
///     }
///     Ok::<(), std::convert::Infallible>(())
/// }, &WalkOptions::default());
/// println!("skipped {}", outcome.skipped.len());
/// # Ok::<(), dirdump_ignore::MatcherError>(())
/// ```
pub fn walk<F, E>(
    root: impl AsRef<Path>,
    matcher: &IgnoreMatcher,
    handler: F,
    options: &WalkOptions,
) -> WalkOutcome
where
    F: Fn(&str, Result<Vec<u8>, FileError>) -> Result<(), E> + Sync,
    E: Display,
{
    let root = root.as_ref();
    let root = match root.canonicalize() {
        Ok(path) => path,
        Err(e) => return WalkOutcome::failed(WalkError::root_io(root, e)),
    };
    if !root.is_dir() {
        return WalkOutcome::failed(WalkError::NotADirectory { path: root });
    }

    let config = &options.config;
    let cancel = Cancellation::new(&options.cancel, config.timeout);
    let state = WalkState::new();
    let extensions = config.extension_set();
    let size_limit = config.size_limit();

    let reporter = options.progress.clone().map(|callback| {
        ProgressReporter::start(
            state.counters.clone(),
            callback,
            options.progress_interval,
            cancel.clone(),
        )
    });

    debug!(
        root = %root.display(),
        concurrent = config.concurrent,
        workers = config.effective_workers(),
        "Walk started"
    );

    let traversal = Traversal {
        root: &root,
        matcher,
        extensions: &extensions,
        state: &state,
        cancel: &cancel,
    };

    if config.concurrent {
        let workers = config.effective_workers();
        let (tx, rx) = crossbeam_channel::bounded::<FileJob>(workers * 2);

        std::thread::scope(|s| {
            for id in 1..=workers {
                let rx = rx.clone();
                let (state, handler, cancel) = (&state, &handler, &cancel);
                s.spawn(move || run_worker(id, rx, state, size_limit, handler, cancel));
            }
            drop(rx);

            traversal.run(|job| enqueue(&tx, job, &cancel));
            // Closing the queue lets idle workers exit once it drains.
            drop(tx);
        });
    } else {
        traversal.run(|job| {
            process_file(&job, &state, size_limit, &handler);
            true
        });
    }

    if let Some(reporter) = reporter {
        reporter.stop();
    }

    let error = cancel.error();
    let stats = state.counters.snapshot();
    match &error {
        Some(e) => info!("Walk stopped after {:?}: {e}", stats.elapsed),
        None => debug!(
            files = stats.processed_files,
            skipped = stats.skipped_files + stats.skipped_dirs,
            "Walk finished in {:?}",
            stats.elapsed
        ),
    }

    WalkOutcome {
        skipped: state.tracker.into_items(),
        stats,
        error,
    }
}

/// Push a job, blocking while the queue is full. Returns `false` once the
/// walk is cancelled.
fn enqueue(tx: &Sender<FileJob>, job: FileJob, cancel: &Cancellation) -> bool {
    let mut job = job;
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        match tx.send_timeout(job, POLL_INTERVAL) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(pending)) => job = pending,
            Err(SendTimeoutError::Disconnected(_)) => return false,
        }
    }
}

/// The enumeration half of a walk.
struct Traversal<'a> {
    root: &'a Path,
    matcher: &'a IgnoreMatcher,
    extensions: &'a HashSet<String>,
    state: &'a WalkState,
    cancel: &'a Cancellation,
}

impl Traversal<'_> {
    /// Enumerate the tree and pass every eligible file to `dispatch`.
    /// Stops when `dispatch` returns `false` or the walk is cancelled.
    fn run(&self, mut dispatch: impl FnMut(FileJob) -> bool) {
        let walker = self.build_walker();

        for result in walker {
            if self.cancel.is_cancelled() {
                debug!("Traversal observed cancellation");
                break;
            }

            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    self.record_walk_error(err);
                    continue;
                }
            };

            if let Some(job) = self.visit(entry) {
                if !dispatch(job) {
                    debug!("Dispatch stopped, ending traversal");
                    break;
                }
            }
        }
    }

    fn build_walker(&self) -> WalkDirGeneric<Client> {
        let root = self.root.to_path_buf();
        let matcher = self.matcher.clone();
        let cancel = self.cancel.clone();

        WalkDirGeneric::<Client>::new(self.root)
            .sort(true)
            .skip_hidden(false)
            .follow_links(false)
            .parallelism(Parallelism::Serial)
            .process_read_dir(move |_depth, _dir, _read_dir_state, children| {
                if cancel.is_cancelled() {
                    children.clear();
                    return;
                }
                for child in children.iter_mut().flatten() {
                    classify_child(&root, &matcher, child);
                }
            })
    }

    /// Apply the per-entry state machine. Returns a job for eligible files.
    fn visit(&self, mut entry: DirEntry<Client>) -> Option<FileJob> {
        let is_dir = entry.file_type.is_dir();

        if entry.depth == 0 {
            if let Some(err) = &entry.read_children_error {
                warn!("Cannot read root directory: {err}");
                self.state.tracker.track(".", read_error_reason(err), true);
            }
            return None;
        }

        self.state.counters.record_entry(is_dir);
        let rel = entry.client_state.rel_path.as_str();

        if let Some(reason) = entry.client_state.skip {
            debug!("Skipping {rel}: {reason}");
            self.state.skip(rel, reason, is_dir);
            return None;
        }

        if is_dir {
            match &entry.read_children_error {
                Some(err) => {
                    let reason = read_error_reason(err);
                    warn!("Cannot read directory {rel}: {err}");
                    self.state.skip(rel, reason, true);
                }
                None => debug!("Descending into {rel}"),
            }
            return None;
        }

        if !self.extensions.is_empty() {
            let ext = file_extension(rel);
            if !self.extensions.contains(&ext) {
                debug!("Skipping {rel}: extension {ext:?} not allowed");
                self.state.skip(rel, SkipReason::FilteredExtension, false);
                return None;
            }
        }

        debug!("Queueing {rel}");
        Some(FileJob {
            path: entry.path(),
            rel_path: std::mem::take(&mut entry.client_state.rel_path),
        })
    }

    /// An entry jwalk could not produce. Its type is unknown, so it is
    /// counted as a file.
    fn record_walk_error(&self, err: jwalk::Error) {
        let path = err
            .path()
            .map(|p| relative_or_absolute(self.root, p))
            .unwrap_or_default();
        let reason = read_error_reason(&err);
        warn!("Walk error at {path:?}: {err}");
        self.state.counters.record_entry(false);
        self.state.skip(path, reason, false);
    }
}

/// Decide the fate of one freshly listed entry and prune ignored directories.
fn classify_child(root: &Path, matcher: &IgnoreMatcher, child: &mut DirEntry<Client>) {
    let is_dir = child.file_type.is_dir();
    let path = child.path();

    let (rel_path, skip) = match path.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => (String::new(), None),
        Ok(rel) => {
            let rel = rel.to_string_lossy().into_owned();
            let skip = matcher.classify(&rel, is_dir).map(|reason| match reason {
                IgnoreReason::Hidden => SkipReason::IgnoredHidden,
                IgnoreReason::VersionControl | IgnoreReason::Rule => SkipReason::IgnoredRule,
            });
            (rel, skip)
        }
        Err(_) => (path.display().to_string(), Some(SkipReason::PathError)),
    };

    if skip.is_some() && is_dir {
        child.read_children_path = None;
    }
    child.client_state = EntryState { rel_path, skip };
}

fn read_error_reason(err: &jwalk::Error) -> SkipReason {
    match err.io_error().map(io::Error::kind) {
        Some(io::ErrorKind::PermissionDenied) => SkipReason::PermissionError,
        _ => SkipReason::WalkError,
    }
}

fn relative_or_absolute(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .into_owned()
}

/// Lowercased text after the last `.` of the file name, or `""`.
///
/// A leading dot counts, so `.bashrc` has extension `bashrc`.
fn file_extension(rel_path: &str) -> String {
    let name = rel_path
        .rsplit(['/', MAIN_SEPARATOR])
        .next()
        .unwrap_or(rel_path);
    name.rfind('.')
        .map(|i| name[i + 1..].to_lowercase())
        .unwrap_or_default()
}
