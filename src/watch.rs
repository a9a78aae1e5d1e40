//! Live watch mode: organize files as they appear.
//!
//! Subscribes to filesystem creation events under a root, discards
//! obviously-incomplete files (hidden names, partial-download suffixes),
//! waits for the write to stabilize and then runs the same per-file
//! pipeline as the batch organizer. Each passing event gets its own worker
//! thread, so one slow stability wait never blocks delivery of other
//! events.

use crossbeam_channel::{RecvTimeoutError, unbounded};
use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::ProtectedSet;
use crate::organizer::{self, FileOutcome};
use crate::prune;
use crate::report::Reporter;
use crate::stability::StabilityDetector;

/// Extensions used by browsers and download managers for in-progress files.
const PARTIAL_SUFFIXES: &[&str] = &["crdownload", "part", "tmp"];

/// How often the dispatch loop wakes up to check the cancel flag.
const DISPATCH_TICK: Duration = Duration::from_millis(200);

/// Knobs for a watch session.
#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    /// Prune effectively empty directories after each successful move.
    pub prune_after: bool,
    /// Write-stability detection parameters.
    pub stability: StabilityDetector,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            prune_after: false,
            stability: StabilityDetector::default(),
        }
    }
}

/// Errors that prevent a watch session from starting.
#[derive(Debug)]
pub enum WatchError {
    /// The root is missing or not a directory.
    InvalidRoot { path: PathBuf },
    /// The filesystem event subscription could not be established.
    SubscribeFailed { source: notify::Error },
}

impl std::fmt::Display for WatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRoot { path } => {
                write!(f, "'{}' is not a valid directory", path.display())
            }
            Self::SubscribeFailed { source } => {
                write!(f, "Failed to watch for filesystem events: {}", source)
            }
        }
    }
}

impl std::error::Error for WatchError {}

/// Watches `root` recursively and organizes new files until cancelled.
///
/// Runs until `cancel` is raised (operator interrupt). Cancellation stops
/// event dispatch, drops the subscription and then joins the in-flight
/// workers; their stability waits observe the same flag and abandon, so
/// shutdown is bounded by one organize step rather than a full stability
/// timeout.
pub fn watch(
    root: &Path,
    options: &WatchOptions,
    protected: Arc<ProtectedSet>,
    reporter: Arc<dyn Reporter>,
    cancel: Arc<AtomicBool>,
) -> Result<(), WatchError> {
    if !root.is_dir() {
        return Err(WatchError::InvalidRoot {
            path: root.to_path_buf(),
        });
    }

    let (tx, rx) = unbounded();
    let mut watcher =
        notify::recommended_watcher(move |event: Result<notify::Event, notify::Error>| {
            let _ = tx.send(event);
        })
        .map_err(|e| WatchError::SubscribeFailed { source: e })?;
    watcher
        .watch(root, RecursiveMode::Recursive)
        .map_err(|e| WatchError::SubscribeFailed { source: e })?;

    tracing::info!(root = %root.display(), "watching for new files");
    reporter.note(&format!(
        "Watching {} for new files (Ctrl-C to stop)",
        root.display()
    ));

    let mut workers: Vec<JoinHandle<()>> = Vec::new();
    while !cancel.load(Ordering::SeqCst) {
        workers.retain(|handle| !handle.is_finished());

        let event = match rx.recv_timeout(DISPATCH_TICK) {
            Ok(Ok(event)) => event,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "filesystem event backend reported an error");
                continue;
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        for path in creation_paths(event) {
            if path.is_dir() {
                continue;
            }
            if in_dated_bucket(root, &path) {
                tracing::debug!(path = %path.display(), "ignoring event inside a dated bucket");
                continue;
            }
            if let Some(reason) = discard_reason(&path) {
                tracing::info!(path = %path.display(), reason, "discarded creation event");
                continue;
            }

            let root = root.to_path_buf();
            let options = *options;
            let protected = protected.clone();
            let reporter = reporter.clone();
            let cancel = cancel.clone();
            workers.push(std::thread::spawn(move || {
                handle_created(&root, &path, &options, &protected, reporter.as_ref(), &cancel);
            }));
        }
    }

    // Stop new event delivery first, then let in-flight work drain.
    drop(watcher);
    for handle in workers {
        if handle.join().is_err() {
            tracing::error!("watch worker panicked");
        }
    }

    Ok(())
}

/// Extracts the paths a creation event makes newly visible.
///
/// Creation events proper plus renames into place count: a finished
/// download is typically a rename from its partial name, not a fresh
/// create. A paired rename carries `[from, to]`; only the destination is
/// newly visible.
fn creation_paths(event: notify::Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().cloned().into_iter().collect()
        }
        _ => Vec::new(),
    }
}

/// True when `path` already sits in a `CATEGORY/YYYY/MM` bucket under
/// `root`. The watcher's own moves emit creation events at their
/// destinations; such a file would only resolve back to its current
/// location, so dropping the event here saves a stability wait and a
/// "Skipped" line for every file the session organizes.
fn in_dated_bucket(root: &Path, path: &Path) -> bool {
    let Ok(rel) = path.strip_prefix(root) else {
        return false;
    };
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    parts.len() == 4
        && parts[1].len() == 4
        && parts[1].chars().all(|c| c.is_ascii_digit())
        && parts[2].len() == 2
        && parts[2].chars().all(|c| c.is_ascii_digit())
}

/// Returns why an event should be dropped before any stability wait, if so.
fn discard_reason(path: &Path) -> Option<&'static str> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    if name.starts_with('.') {
        return Some("hidden file");
    }
    if let Some(ext) = path.extension().map(|e| e.to_string_lossy().to_lowercase())
        && PARTIAL_SUFFIXES.contains(&ext.as_str())
    {
        return Some("incomplete download");
    }
    None
}

/// Handles one passed-filter creation event on its own worker thread.
///
/// Per-event errors stay on this thread; a failure here never affects the
/// dispatch loop or unrelated events.
fn handle_created(
    root: &Path,
    path: &Path,
    options: &WatchOptions,
    protected: &ProtectedSet,
    reporter: &dyn Reporter,
    cancel: &AtomicBool,
) {
    tracing::info!(path = %path.display(), "new file detected");

    if !options.stability.wait_for(path, cancel) {
        if cancel.load(Ordering::SeqCst) {
            return;
        }
        // No retry is scheduled; the next event for this path starts over.
        tracing::warn!(path = %path.display(), "file never stabilized; leaving in place");
        reporter.skipped(path, "did not stabilize before timeout");
        return;
    }

    let outcome = organizer::organize_file(root, path, false, protected, reporter);
    if options.prune_after && matches!(outcome, FileOutcome::Moved { .. }) {
        prune::prune(root, false, reporter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::CreateKind;

    fn event(kind: EventKind, paths: &[&str]) -> notify::Event {
        let mut event = notify::Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    #[test]
    fn test_create_and_rename_to_count_as_creation() {
        let created = event(EventKind::Create(CreateKind::File), &["/dl/a.txt"]);
        assert_eq!(creation_paths(created), vec![PathBuf::from("/dl/a.txt")]);

        let renamed = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/dl/a.txt"],
        );
        assert_eq!(creation_paths(renamed), vec![PathBuf::from("/dl/a.txt")]);
    }

    #[test]
    fn test_paired_rename_keeps_only_the_destination() {
        let renamed = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/dl/a.txt.part", "/dl/a.txt"],
        );
        assert_eq!(creation_paths(renamed), vec![PathBuf::from("/dl/a.txt")]);
    }

    #[test]
    fn test_other_events_are_ignored() {
        let modified = event(EventKind::Modify(ModifyKind::Any), &["/dl/a.txt"]);
        assert!(creation_paths(modified).is_empty());

        let removed = event(
            EventKind::Remove(notify::event::RemoveKind::File),
            &["/dl/a.txt"],
        );
        assert!(creation_paths(removed).is_empty());

        let rename_from = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/dl/a.txt.part"],
        );
        assert!(creation_paths(rename_from).is_empty());
    }

    #[test]
    fn test_dated_bucket_destinations_are_ignored() {
        let root = Path::new("/inbox");
        assert!(in_dated_bucket(root, Path::new("/inbox/IMAGE/2026/08/a.jpg")));
        assert!(in_dated_bucket(
            root,
            Path::new("/inbox/APPLICATION_GZIP/1999/12/a.gz")
        ));

        // Fresh drops, non-dated layouts and foreign roots still count.
        assert!(!in_dated_bucket(root, Path::new("/inbox/a.jpg")));
        assert!(!in_dated_bucket(root, Path::new("/inbox/IMAGE/notes/08/a.jpg")));
        assert!(!in_dated_bucket(root, Path::new("/inbox/IMAGE/2026/aug/a.jpg")));
        assert!(!in_dated_bucket(
            root,
            Path::new("/inbox/IMAGE/2026/08/sub/a.jpg")
        ));
        assert!(!in_dated_bucket(
            Path::new("/elsewhere"),
            Path::new("/inbox/IMAGE/2026/08/a.jpg")
        ));
    }

    #[test]
    fn test_partial_downloads_are_discarded() {
        assert_eq!(
            discard_reason(Path::new("/dl/movie.mkv.crdownload")),
            Some("incomplete download")
        );
        assert_eq!(
            discard_reason(Path::new("/dl/archive.PART")),
            Some("incomplete download")
        );
        assert_eq!(
            discard_reason(Path::new("/dl/staging.tmp")),
            Some("incomplete download")
        );
        assert_eq!(discard_reason(Path::new("/dl/movie.mkv")), None);
    }

    #[test]
    fn test_hidden_files_are_discarded() {
        assert_eq!(discard_reason(Path::new("/dl/.DS_Store")), Some("hidden file"));
        assert_eq!(discard_reason(Path::new("/dl/visible.txt")), None);
    }

    #[test]
    fn test_watch_requires_a_directory() {
        let result = watch(
            Path::new("/nonexistent/root"),
            &WatchOptions::default(),
            Arc::new(ProtectedSet::defaults()),
            Arc::new(crate::report::RecordingReporter::new()),
            Arc::new(AtomicBool::new(false)),
        );
        assert!(matches!(result, Err(WatchError::InvalidRoot { .. })));
    }
}
