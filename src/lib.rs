//! chronotidy - sort files into dated category buckets
//!
//! This library classifies files by content and extension, relocates them
//! into a `CATEGORY/YYYY/MM` hierarchy, prunes directories left
//! effectively empty, and can watch a root for newly created files and
//! organize them as they appear.

pub mod classify;
pub mod cli;
pub mod config;
pub mod destination;
pub mod organizer;
pub mod prune;
pub mod report;
pub mod stability;
pub mod watch;

pub use classify::{Category, Classification, classify};
pub use config::{ConfigError, ProtectedConfig, ProtectedSet};
pub use destination::{MoveError, move_file, resolve};
pub use organizer::{
    FileOutcome, OrganizeError, OrganizeOptions, OrganizeSummary, SkipReason, organize,
    organize_file,
};
pub use prune::prune;
pub use report::{ConsoleReporter, RecordingReporter, ReportEvent, Reporter};
pub use stability::StabilityDetector;
pub use watch::{WatchError, WatchOptions, watch};
