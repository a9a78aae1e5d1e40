//! Command-line interface for chronotidy.
//!
//! Argument parsing and the glue between the CLI surface and the library:
//! loads the protected-set configuration, builds the console reporter and
//! dispatches either a batch organize pass or a watch session.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crate::config::ProtectedConfig;
use crate::organizer::{self, OrganizeOptions, OrganizeSummary};
use crate::report::{ConsoleReporter, Reporter};
use crate::stability::StabilityDetector;
use crate::watch::{self, WatchOptions};

/// Sort files into CATEGORY/YYYY/MM directories by content type.
#[derive(Debug, Parser)]
#[command(name = "chronotidy", version)]
pub struct Cli {
    /// Directory to organize (or to watch, with --watch)
    pub path: PathBuf,

    /// Organize every file in the tree, not only direct children
    #[arg(short, long)]
    pub recursive: bool,

    /// Report what would happen without moving or deleting anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Delete effectively empty directories afterwards
    #[arg(short, long)]
    pub prune: bool,

    /// Keep running and organize files as they are created
    #[arg(short, long, conflicts_with = "dry_run")]
    pub watch: bool,

    /// Protected-set configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Append diagnostic log lines to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Seconds to wait for a new file's size to settle (watch mode)
    #[arg(long, default_value_t = 30, value_name = "SECS")]
    pub stability_timeout: u64,

    /// Milliseconds between size readings (watch mode)
    #[arg(long, default_value_t = 500, value_name = "MILLIS")]
    pub poll_interval: u64,
}

/// Runs the parsed command to completion.
///
/// `cancel` is raised by the Ctrl-C handler; batch mode finishes on its
/// own, watch mode runs until the flag is set.
pub fn run(cli: &Cli, cancel: Arc<AtomicBool>) -> Result<(), String> {
    let config = ProtectedConfig::load(cli.config.as_deref())
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    let protected = config
        .compile()
        .map_err(|e| format!("Error compiling protected set: {}", e))?;

    if cli.watch {
        let reporter: Arc<dyn Reporter> = Arc::new(ConsoleReporter::new());
        let options = WatchOptions {
            prune_after: cli.prune,
            stability: StabilityDetector::new(
                Duration::from_secs(cli.stability_timeout),
                Duration::from_millis(cli.poll_interval),
            ),
        };
        watch::watch(&cli.path, &options, Arc::new(protected), reporter, cancel)
            .map_err(|e| e.to_string())
    } else {
        let reporter = ConsoleReporter::new();
        let options = OrganizeOptions {
            recursive: cli.recursive,
            dry_run: cli.dry_run,
            prune_after: cli.prune,
        };
        if cli.dry_run {
            reporter.note(&format!(
                "DRY RUN: analyzing contents of {}",
                cli.path.display()
            ));
        } else {
            reporter.note(&format!("Organizing contents of {}", cli.path.display()));
        }

        let summary = organizer::organize(&cli.path, &options, &protected, &reporter)
            .map_err(|e| e.to_string())?;
        print_summary(&reporter, &summary, cli.dry_run);
        Ok(())
    }
}

fn print_summary(reporter: &dyn Reporter, summary: &OrganizeSummary, dry_run: bool) {
    let verb = if dry_run { "would be moved" } else { "moved" };
    reporter.note(&format!(
        "\n{} {}, {} skipped, {} failed, {} empty folder(s) {}",
        summary.moved,
        verb,
        summary.skipped,
        summary.failed,
        summary.pruned,
        if dry_run { "would be deleted" } else { "deleted" },
    ));

    // Sort category names for consistent output.
    let mut categories: Vec<_> = summary.per_category.iter().collect();
    categories.sort_by_key(|&(name, _)| name);
    for (category, count) in categories {
        reporter.note(&format!(
            "  {}: {} {}",
            category,
            count,
            if *count == 1 { "file" } else { "files" }
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from(["chronotidy", "/tmp/inbox", "-r", "-n", "-p"]);
        assert_eq!(cli.path, PathBuf::from("/tmp/inbox"));
        assert!(cli.recursive);
        assert!(cli.dry_run);
        assert!(cli.prune);
        assert!(!cli.watch);
    }

    #[test]
    fn test_watch_conflicts_with_dry_run() {
        let result = Cli::try_parse_from(["chronotidy", "/tmp/inbox", "--watch", "--dry-run"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_stability_defaults() {
        let cli = Cli::parse_from(["chronotidy", "/tmp/inbox", "--watch"]);
        assert_eq!(cli.stability_timeout, 30);
        assert_eq!(cli.poll_interval, 500);
    }

    #[test]
    fn test_invalid_root_is_a_fatal_error() {
        let cli = Cli::parse_from(["chronotidy", "/nonexistent/root"]);
        let result = run(&cli, Arc::new(AtomicBool::new(false)));
        assert!(result.is_err());
    }
}
