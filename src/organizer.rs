//! Batch organization: walk a tree, classify every eligible file and move
//! it into its `CATEGORY/YYYY/MM` bucket.
//!
//! The per-file pipeline ([`organize_file`]) is shared with the watch loop,
//! so skip rules and error handling cannot drift between the two modes.

use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::classify::{self, Category};
use crate::config::ProtectedSet;
use crate::destination;
use crate::prune;
use crate::report::Reporter;

/// Errors that abort an organizing pass before any file is touched.
#[derive(Debug)]
pub enum OrganizeError {
    /// The root is missing or not a directory.
    InvalidRoot { path: PathBuf },
    /// The root could not be listed.
    ReadDirFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRoot { path } => {
                write!(f, "'{}' is not a valid directory", path.display())
            }
            Self::ReadDirFailed { path, source } => {
                write!(f, "Error reading directory {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for OrganizeError {}

/// Caller-selected knobs for a batch pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrganizeOptions {
    /// Walk the whole tree instead of only the root's direct children.
    pub recursive: bool,
    /// Report what would happen without touching the filesystem.
    pub dry_run: bool,
    /// Delete effectively empty directories after the pass.
    pub prune_after: bool,
}

/// Counts describing what a pass did (or would do, in dry-run).
#[derive(Debug, Default)]
pub struct OrganizeSummary {
    pub moved: usize,
    pub skipped: usize,
    pub failed: usize,
    pub pruned: usize,
    /// Files per destination bucket, for the end-of-run table.
    pub per_category: HashMap<String, usize>,
}

/// Why a file was left where it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The file disappeared between enumeration and processing; benign.
    Vanished,
    /// Name begins with the hidden-file marker.
    Hidden,
    /// Name matches the protected set.
    ProtectedName,
    /// MIME type is in the protected/sensitive set.
    ProtectedType(String),
    /// The classifier marked it as a temp/autosave file.
    Temp,
    /// Source and computed destination are the same path.
    AlreadyInPlace,
}

impl SkipReason {
    pub fn as_str(&self) -> &str {
        match self {
            SkipReason::Vanished => "file vanished",
            SkipReason::Hidden => "hidden file",
            SkipReason::ProtectedName => "protected file",
            SkipReason::ProtectedType(_) => "sensitive file type",
            SkipReason::Temp => "temp/autosave file",
            SkipReason::AlreadyInPlace => "already in place",
        }
    }
}

/// Outcome of pushing one file through the pipeline.
#[derive(Debug)]
pub enum FileOutcome {
    Moved {
        destination: PathBuf,
        category: Category,
    },
    WouldMove {
        destination: PathBuf,
        category: Category,
    },
    Skipped(SkipReason),
    Failed(String),
}

/// Organizes the files under `root`.
///
/// Enumerates candidates up front (either direct children or the full tree)
/// so the walk never races the moves it causes, then pushes each file
/// through classify → resolve → move. Per-file errors are reported and do
/// not stop the batch; only an invalid root aborts. With `prune_after`,
/// effectively empty directories are deleted afterwards under the same
/// dry-run flag.
pub fn organize(
    root: &Path,
    options: &OrganizeOptions,
    protected: &ProtectedSet,
    reporter: &dyn Reporter,
) -> Result<OrganizeSummary, OrganizeError> {
    if !root.is_dir() {
        return Err(OrganizeError::InvalidRoot {
            path: root.to_path_buf(),
        });
    }

    tracing::info!(
        root = %root.display(),
        recursive = options.recursive,
        dry_run = options.dry_run,
        "organizing files"
    );

    let candidates = collect_candidates(root, options.recursive)?;

    let mut summary = OrganizeSummary::default();
    reporter.begin(candidates.len() as u64);
    for path in &candidates {
        match organize_file(root, path, options.dry_run, protected, reporter) {
            FileOutcome::Moved { category, .. } | FileOutcome::WouldMove { category, .. } => {
                summary.moved += 1;
                *summary
                    .per_category
                    .entry(category.dir_name().to_string())
                    .or_insert(0) += 1;
            }
            FileOutcome::Skipped(_) => summary.skipped += 1,
            FileOutcome::Failed(_) => summary.failed += 1,
        }
    }
    reporter.finish();

    if options.prune_after {
        summary.pruned = prune::prune(root, options.dry_run, reporter).len();
    }

    tracing::info!(
        moved = summary.moved,
        skipped = summary.skipped,
        failed = summary.failed,
        pruned = summary.pruned,
        "organizing pass finished"
    );

    Ok(summary)
}

fn collect_candidates(root: &Path, recursive: bool) -> Result<Vec<PathBuf>, OrganizeError> {
    if recursive {
        let mut files = Vec::new();
        for entry in WalkDir::new(root).min_depth(1) {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "error while walking tree");
                }
            }
        }
        Ok(files)
    } else {
        let entries = fs::read_dir(root).map_err(|e| OrganizeError::ReadDirFailed {
            path: root.to_path_buf(),
            source: e,
        })?;
        Ok(entries
            .flatten()
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| entry.path())
            .collect())
    }
}

/// Pushes a single file through the shared classify → resolve → move path.
///
/// Reads the file's metadata fresh; nothing is cached between calls since
/// size and mtime can change at any moment. Every skip and failure is
/// handed to the reporter so a run can be audited afterwards.
pub fn organize_file(
    root: &Path,
    path: &Path,
    dry_run: bool,
    protected: &ProtectedSet,
    reporter: &dyn Reporter,
) -> FileOutcome {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            // A second event for the same path, or a file deleted mid-pass.
            tracing::info!(path = %path.display(), "file vanished before processing");
            return FileOutcome::Skipped(SkipReason::Vanished);
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "could not read metadata");
            reporter.failed(path, &e.to_string());
            return FileOutcome::Failed(e.to_string());
        }
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();

    if name.starts_with('.') {
        return skip(path, SkipReason::Hidden, reporter);
    }

    if protected.is_protected_name(path) {
        return skip(path, SkipReason::ProtectedName, reporter);
    }

    let classification = classify::classify(path);
    if classification.category == Category::Skip {
        return skip(path, SkipReason::Temp, reporter);
    }

    if let Some(mime) = &classification.mime_type
        && protected.is_protected_mime(mime)
    {
        return skip(path, SkipReason::ProtectedType(mime.clone()), reporter);
    }

    let mtime: DateTime<Local> = match metadata.modified() {
        Ok(mtime) => mtime.into(),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "could not read mtime");
            reporter.failed(path, &e.to_string());
            return FileOutcome::Failed(e.to_string());
        }
    };

    let dest_dir = destination::resolve(root, &classification.category, mtime);
    let destination = dest_dir.join(name.as_ref());

    if destination == path {
        return skip(path, SkipReason::AlreadyInPlace, reporter);
    }

    if dry_run {
        reporter.would_move(path, &destination);
        return FileOutcome::WouldMove {
            destination,
            category: classification.category,
        };
    }

    match destination::move_file(path, &dest_dir) {
        Ok(destination) => {
            tracing::info!(
                from = %path.display(),
                to = %destination.display(),
                "moved file"
            );
            reporter.moved(path, &destination);
            FileOutcome::Moved {
                destination,
                category: classification.category,
            }
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "move failed");
            reporter.failed(path, &e.to_string());
            FileOutcome::Failed(e.to_string())
        }
    }
}

fn skip(path: &Path, reason: SkipReason, reporter: &dyn Reporter) -> FileOutcome {
    tracing::info!(path = %path.display(), reason = reason.as_str(), "skipped file");
    reporter.skipped(path, reason.as_str());
    FileOutcome::Skipped(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::RecordingReporter;
    use tempfile::TempDir;

    fn organize_one(root: &Path, path: &Path) -> FileOutcome {
        let protected = ProtectedSet::defaults();
        let reporter = RecordingReporter::new();
        organize_file(root, path, false, &protected, &reporter)
    }

    #[test]
    fn test_invalid_root_is_fatal() {
        let protected = ProtectedSet::defaults();
        let reporter = RecordingReporter::new();
        let result = organize(
            Path::new("/nonexistent/root"),
            &OrganizeOptions::default(),
            &protected,
            &reporter,
        );
        assert!(matches!(result, Err(OrganizeError::InvalidRoot { .. })));
    }

    #[test]
    fn test_hidden_file_is_skipped() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join(".hidden");
        fs::write(&path, "data").expect("Failed to write file");

        let outcome = organize_one(temp_dir.path(), &path);
        assert!(matches!(outcome, FileOutcome::Skipped(SkipReason::Hidden)));
        assert!(path.exists());
    }

    #[test]
    fn test_protected_file_is_skipped() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("secrets.txt");
        fs::write(&path, "hunter2").expect("Failed to write file");

        let outcome = organize_one(temp_dir.path(), &path);
        assert!(matches!(
            outcome,
            FileOutcome::Skipped(SkipReason::ProtectedName)
        ));
        assert!(path.exists());
    }

    #[test]
    fn test_autosave_temp_is_skipped() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("~$draft.docx");
        fs::write(&path, "lock").expect("Failed to write file");

        let outcome = organize_one(temp_dir.path(), &path);
        assert!(matches!(outcome, FileOutcome::Skipped(SkipReason::Temp)));
    }

    #[test]
    fn test_vanished_file_is_benign() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("gone.txt");

        let outcome = organize_one(temp_dir.path(), &path);
        assert!(matches!(
            outcome,
            FileOutcome::Skipped(SkipReason::Vanished)
        ));
    }

    #[test]
    fn test_text_file_moves_into_dated_bucket() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("notes.txt");
        fs::write(&path, "some notes").expect("Failed to write file");

        let (destination, category) = match organize_one(temp_dir.path(), &path) {
            FileOutcome::Moved {
                destination,
                category,
            } => (destination, category),
            other => panic!("expected a move, got {:?}", other),
        };
        assert_eq!(category, Category::Text);
        assert!(!path.exists());
        assert!(destination.exists());

        let now = Local::now();
        let expected = temp_dir
            .path()
            .join("TEXT")
            .join(now.format("%Y").to_string())
            .join(now.format("%m").to_string())
            .join("notes.txt");
        assert_eq!(destination, expected);
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("notes.txt");
        fs::write(&path, "some notes").expect("Failed to write file");

        let FileOutcome::Moved { destination, .. } = organize_one(temp_dir.path(), &path) else {
            panic!("first pass should move");
        };

        // The moved file resolves to its own location on the second pass.
        let outcome = organize_one(temp_dir.path(), &destination);
        assert!(matches!(
            outcome,
            FileOutcome::Skipped(SkipReason::AlreadyInPlace)
        ));
        assert!(destination.exists());
    }

    #[test]
    fn test_dry_run_reports_without_moving() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("notes.txt");
        fs::write(&path, "some notes").expect("Failed to write file");

        let protected = ProtectedSet::defaults();
        let reporter = RecordingReporter::new();
        let outcome = organize_file(temp_dir.path(), &path, true, &protected, &reporter);

        assert!(matches!(outcome, FileOutcome::WouldMove { .. }));
        assert!(path.exists());
        assert_eq!(temp_dir.path().read_dir().unwrap().count(), 1);
    }

    #[test]
    fn test_destination_collision_is_a_per_file_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("notes.txt");
        fs::write(&path, "new").expect("Failed to write file");

        // Occupy the destination with a different file of the same name.
        let now = Local::now();
        let dest_dir = temp_dir
            .path()
            .join("TEXT")
            .join(now.format("%Y").to_string())
            .join(now.format("%m").to_string());
        fs::create_dir_all(&dest_dir).expect("Failed to create dest dir");
        fs::write(dest_dir.join("notes.txt"), "old").expect("Failed to write existing file");

        let outcome = organize_one(temp_dir.path(), &path);
        assert!(matches!(outcome, FileOutcome::Failed(_)));
        assert!(path.exists());
        assert_eq!(
            fs::read_to_string(dest_dir.join("notes.txt")).unwrap(),
            "old"
        );
    }

    #[test]
    fn test_non_recursive_ignores_subdirectories() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("top.txt"), "top").expect("Failed to write file");
        fs::create_dir(temp_dir.path().join("sub")).expect("Failed to create subdir");
        fs::write(temp_dir.path().join("sub").join("nested.txt"), "nested")
            .expect("Failed to write file");

        let protected = ProtectedSet::defaults();
        let reporter = RecordingReporter::new();
        let summary = organize(
            temp_dir.path(),
            &OrganizeOptions::default(),
            &protected,
            &reporter,
        )
        .expect("Organize failed");

        assert_eq!(summary.moved, 1);
        assert!(temp_dir.path().join("sub").join("nested.txt").exists());
    }

    #[test]
    fn test_recursive_picks_up_nested_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir(temp_dir.path().join("sub")).expect("Failed to create subdir");
        fs::write(temp_dir.path().join("sub").join("nested.txt"), "nested")
            .expect("Failed to write file");

        let protected = ProtectedSet::defaults();
        let reporter = RecordingReporter::new();
        let options = OrganizeOptions {
            recursive: true,
            ..Default::default()
        };
        let summary =
            organize(temp_dir.path(), &options, &protected, &reporter).expect("Organize failed");

        assert_eq!(summary.moved, 1);
        assert!(!temp_dir.path().join("sub").join("nested.txt").exists());
    }
}
