//! Write-stability detection for freshly created files.
//!
//! Watch mode must not move a file that is still being written (a large
//! download, a streaming save). The detector polls the file size until two
//! consecutive readings agree or a timeout elapses.
//!
//! Known limitation: a writer that pauses for longer than one poll interval
//! produces a false "stable" verdict. This is a polling heuristic, not a
//! write-complete protocol; the bound on the error is the poll interval.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Polls a file's size until it stops changing.
#[derive(Debug, Clone, Copy)]
pub struct StabilityDetector {
    /// Total time to wait for the size to settle.
    pub timeout: Duration,
    /// Delay between size readings.
    pub poll_interval: Duration,
}

impl StabilityDetector {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Waits until `path` has the same size across two consecutive polls.
    ///
    /// Returns `true` once two observed readings agree, `false` when the
    /// timeout elapses first or `cancel` is raised. A file that cannot be
    /// read (not yet visible, mid-rename) is treated as "not yet
    /// observable" and polling continues rather than failing immediately.
    pub fn wait_for(&self, path: &Path, cancel: &AtomicBool) -> bool {
        let start = Instant::now();
        let mut last_size: Option<u64> = None;

        while start.elapsed() < self.timeout {
            if cancel.load(Ordering::SeqCst) {
                return false;
            }
            if let Ok(metadata) = fs::metadata(path) {
                let current = metadata.len();
                if last_size == Some(current) {
                    return true;
                }
                last_size = Some(current);
            }
            std::thread::sleep(self.poll_interval);
        }

        false
    }
}

impl Default for StabilityDetector {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
        }
    }
}
