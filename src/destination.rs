//! Destination resolution and physical file relocation.
//!
//! The resolver is a pure function from (root, category, mtime) to a
//! destination directory; the mover creates that directory on demand and
//! relocates the file without ever overwriting an existing destination.

use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

use crate::classify::Category;

/// Errors that can occur while moving a file into place.
#[derive(Debug)]
pub enum MoveError {
    /// Failed to create the destination directory chain.
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A different file already exists at the destination path.
    DestinationExists { path: PathBuf },
    /// The source path has no filename component.
    MissingFileName { path: PathBuf },
    /// The rename itself failed (permission, cross-device, vanished source).
    RenameFailed {
        source_path: PathBuf,
        destination: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for MoveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::DestinationExists { path } => {
                write!(
                    f,
                    "Refusing to overwrite existing file at {}",
                    path.display()
                )
            }
            Self::MissingFileName { path } => {
                write!(f, "Path has no filename component: {}", path.display())
            }
            Self::RenameFailed {
                source_path,
                destination,
                source,
            } => {
                write!(
                    f,
                    "Failed to move {} to {}: {}",
                    source_path.display(),
                    destination.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for MoveError {}

/// Computes the destination directory for a file.
///
/// Pure function: `root/<category>/<YYYY>/<MM>`. Stable for a given
/// (root, category, mtime) triple, which is what makes a second organizing
/// pass a no-op for files already in place.
///
/// # Examples
///
/// ```
/// use chrono::{Local, TimeZone};
/// use chronotidy::classify::Category;
/// use chronotidy::destination::resolve;
/// use std::path::Path;
///
/// let mtime = Local.with_ymd_and_hms(2023, 7, 15, 10, 0, 0).unwrap();
/// let dest = resolve(Path::new("/sorted"), &Category::Image, mtime);
/// assert_eq!(dest, Path::new("/sorted/IMAGE/2023/07"));
/// ```
pub fn resolve(root: &Path, category: &Category, mtime: DateTime<Local>) -> PathBuf {
    root.join(category.dir_name())
        .join(mtime.format("%Y").to_string())
        .join(mtime.format("%m").to_string())
}

/// Moves a file into `dest_dir`, creating the directory chain on demand.
///
/// Returns the full destination path on success. The move is a single
/// `rename`, so on failure the source file is left untouched. An existing
/// file at the destination is reported as an error rather than silently
/// replaced; callers treat this, like every other `MoveError`, as a
/// per-file failure and keep going.
pub fn move_file(source: &Path, dest_dir: &Path) -> Result<PathBuf, MoveError> {
    let file_name = source
        .file_name()
        .ok_or_else(|| MoveError::MissingFileName {
            path: source.to_path_buf(),
        })?;

    fs::create_dir_all(dest_dir).map_err(|e| MoveError::DirectoryCreationFailed {
        path: dest_dir.to_path_buf(),
        source: e,
    })?;

    let destination = dest_dir.join(file_name);
    if destination.exists() {
        return Err(MoveError::DestinationExists { path: destination });
    }

    fs::rename(source, &destination).map_err(|e| MoveError::RenameFailed {
        source_path: source.to_path_buf(),
        destination: destination.clone(),
        source: e,
    })?;

    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_is_root_category_year_month() {
        let mtime = Local.with_ymd_and_hms(2023, 7, 15, 10, 0, 0).unwrap();
        let dest = resolve(Path::new("/data"), &Category::Image, mtime);
        assert_eq!(dest, PathBuf::from("/data/IMAGE/2023/07"));
    }

    #[test]
    fn test_resolve_zero_pads_month() {
        let mtime = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let dest = resolve(Path::new("/data"), &Category::Text, mtime);
        assert_eq!(dest, PathBuf::from("/data/TEXT/2024/01"));
    }

    #[test]
    fn test_resolve_derived_category() {
        let mtime = Local.with_ymd_and_hms(2022, 12, 31, 23, 59, 59).unwrap();
        let category = Category::from_mime("application/gzip");
        let dest = resolve(Path::new("/data"), &category, mtime);
        assert_eq!(dest, PathBuf::from("/data/APPLICATION_GZIP/2022/12"));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let mtime = Local.with_ymd_and_hms(2023, 7, 15, 10, 0, 0).unwrap();
        let a = resolve(Path::new("/data"), &Category::Pdf, mtime);
        let b = resolve(Path::new("/data"), &Category::Pdf, mtime);
        assert_eq!(a, b);
    }

    #[test]
    fn test_move_file_creates_directory_chain() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("file.txt");
        fs::write(&source, "content").expect("Failed to write test file");

        let dest_dir = temp_dir.path().join("TEXT").join("2023").join("07");
        let moved = move_file(&source, &dest_dir).expect("Failed to move file");

        assert!(!source.exists());
        assert_eq!(moved, dest_dir.join("file.txt"));
        assert!(moved.exists());
    }

    #[test]
    fn test_move_file_refuses_to_overwrite() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("file.txt");
        fs::write(&source, "new").expect("Failed to write test file");

        let dest_dir = temp_dir.path().join("TEXT");
        fs::create_dir(&dest_dir).expect("Failed to create dest dir");
        fs::write(dest_dir.join("file.txt"), "old").expect("Failed to write existing file");

        let result = move_file(&source, &dest_dir);
        assert!(matches!(result, Err(MoveError::DestinationExists { .. })));

        // Source untouched, destination content preserved.
        assert!(source.exists());
        let kept = fs::read_to_string(dest_dir.join("file.txt")).unwrap();
        assert_eq!(kept, "old");
    }

    #[test]
    fn test_move_file_vanished_source_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("gone.txt");
        let dest_dir = temp_dir.path().join("TEXT");

        let result = move_file(&source, &dest_dir);
        assert!(matches!(result, Err(MoveError::RenameFailed { .. })));
    }
}
