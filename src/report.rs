//! User-visible reporting for organize, prune and watch runs.
//!
//! The core takes an explicit [`Reporter`] instead of printing directly, so
//! every skip and failure is auditable and the library can be exercised in
//! tests without touching stdout. [`ConsoleReporter`] is the CLI
//! implementation with colored output and an optional progress bar;
//! [`RecordingReporter`] collects events in memory.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Sink for per-file and per-directory outcomes.
///
/// Implementations must tolerate concurrent calls; in watch mode several
/// event workers report at once.
pub trait Reporter: Send + Sync {
    /// Called before a batch run with the number of candidate files.
    fn begin(&self, _total: u64) {}

    /// Called after a batch run.
    fn finish(&self) {}

    fn moved(&self, from: &Path, to: &Path);
    fn would_move(&self, from: &Path, to: &Path);
    fn skipped(&self, path: &Path, reason: &str);
    fn failed(&self, path: &Path, error: &str);
    fn pruned(&self, dir: &Path);
    fn would_prune(&self, dir: &Path);
    fn note(&self, message: &str);
}

/// Console reporter with colored output and a progress bar for batch runs.
pub struct ConsoleReporter {
    progress: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self {
            progress: Mutex::new(None),
        }
    }

    /// Prints a line, routing through the progress bar while one is active
    /// so output and bar redraws do not interleave.
    fn print(&self, line: String) {
        if let Ok(guard) = self.progress.lock()
            && let Some(pb) = guard.as_ref()
        {
            pb.println(line);
            return;
        }
        println!("{}", line);
    }

    fn tick(&self) {
        if let Ok(guard) = self.progress.lock()
            && let Some(pb) = guard.as_ref()
        {
            pb.inc(1);
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ConsoleReporter {
    fn begin(&self, total: u64) {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        if let Ok(mut guard) = self.progress.lock() {
            *guard = Some(pb);
        }
    }

    fn finish(&self) {
        if let Ok(mut guard) = self.progress.lock()
            && let Some(pb) = guard.take()
        {
            pb.finish_and_clear();
        }
    }

    fn moved(&self, from: &Path, to: &Path) {
        self.print(format!(
            "{} {} → {}",
            "✓".green(),
            from.display(),
            to.display()
        ));
        self.tick();
    }

    fn would_move(&self, from: &Path, to: &Path) {
        self.print(
            format!("[DRY RUN] Would move: {} → {}", from.display(), to.display())
                .yellow()
                .to_string(),
        );
        self.tick();
    }

    fn skipped(&self, path: &Path, reason: &str) {
        self.print(format!("{} Skipped {} ({})", "⚠".yellow(), path.display(), reason));
        self.tick();
    }

    fn failed(&self, path: &Path, error: &str) {
        self.print(format!("{} {}: {}", "✗".red(), path.display(), error));
        self.tick();
    }

    fn pruned(&self, dir: &Path) {
        self.print(format!(
            "{} Deleted empty folder: {}",
            "✓".green(),
            dir.display()
        ));
    }

    fn would_prune(&self, dir: &Path) {
        self.print(
            format!("[DRY RUN] Would delete empty folder: {}", dir.display())
                .yellow()
                .to_string(),
        );
    }

    fn note(&self, message: &str) {
        self.print(message.cyan().to_string());
    }
}

/// A single recorded reporter event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Moved(PathBuf, PathBuf),
    WouldMove(PathBuf, PathBuf),
    Skipped(PathBuf, String),
    Failed(PathBuf, String),
    Pruned(PathBuf),
    WouldPrune(PathBuf),
    Note(String),
}

/// Reporter that records every event in memory, for tests and audits.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all recorded events in order.
    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn push(&self, event: ReportEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Reporter for RecordingReporter {
    fn moved(&self, from: &Path, to: &Path) {
        self.push(ReportEvent::Moved(from.to_path_buf(), to.to_path_buf()));
    }

    fn would_move(&self, from: &Path, to: &Path) {
        self.push(ReportEvent::WouldMove(from.to_path_buf(), to.to_path_buf()));
    }

    fn skipped(&self, path: &Path, reason: &str) {
        self.push(ReportEvent::Skipped(path.to_path_buf(), reason.to_string()));
    }

    fn failed(&self, path: &Path, error: &str) {
        self.push(ReportEvent::Failed(path.to_path_buf(), error.to_string()));
    }

    fn pruned(&self, dir: &Path) {
        self.push(ReportEvent::Pruned(dir.to_path_buf()));
    }

    fn would_prune(&self, dir: &Path) {
        self.push(ReportEvent::WouldPrune(dir.to_path_buf()));
    }

    fn note(&self, message: &str) {
        self.push(ReportEvent::Note(message.to_string()));
    }
}
