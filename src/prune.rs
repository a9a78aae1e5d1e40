//! Recursive empty-directory pruning.
//!
//! A directory is "effectively empty" when it contains no files and every
//! child directory is itself effectively empty. Evaluation is post-order:
//! children are decided before their parents, so a chain of directories that
//! only contain each other collapses in a single pass.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::report::Reporter;

/// Deletes every effectively empty directory under (and including) `root`.
///
/// Returns the directories that were deleted, or would be deleted in
/// dry-run mode, deepest first. A directory that fails to delete (raced
/// creation, permission denied) is logged and left in place without
/// stopping the rest of the walk; its ancestors then count as non-empty.
///
/// The traversal uses an index-backed directory list instead of recursion,
/// so pathological nesting depth cannot overflow the stack: directories are
/// collected top-down, then visited in reverse order, which puts every
/// child before its parent.
pub fn prune(root: &Path, dry_run: bool, reporter: &dyn Reporter) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = vec![root.to_path_buf()];
    let mut next = 0;
    while next < dirs.len() {
        let dir = dirs[next].clone();
        next += 1;
        match fs::read_dir(&dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.is_dir() {
                        dirs.push(path);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "could not list directory");
            }
        }
    }

    // In dry-run mode nothing is actually removed, so "already deleted this
    // pass" is tracked explicitly; the same set also keeps a failed delete
    // from making its parent look empty.
    let mut removed: HashSet<PathBuf> = HashSet::new();
    let mut actions: Vec<PathBuf> = Vec::new();

    for dir in dirs.iter().rev() {
        if !effectively_empty(dir, &removed) {
            continue;
        }
        if dry_run {
            reporter.would_prune(dir);
            removed.insert(dir.clone());
            actions.push(dir.clone());
            continue;
        }
        match fs::remove_dir(dir) {
            Ok(()) => {
                tracing::info!(dir = %dir.display(), "deleted empty folder");
                reporter.pruned(dir);
                removed.insert(dir.clone());
                actions.push(dir.clone());
            }
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "could not delete folder");
                reporter.failed(dir, &format!("Could not delete folder: {}", e));
            }
        }
    }

    actions
}

/// True when the directory holds no files and every child directory was
/// already deleted (or marked for deletion) during this pass.
fn effectively_empty(dir: &Path, removed: &HashSet<PathBuf>) -> bool {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        // Unreadable counts as non-empty; deleting blind would be worse.
        Err(_) => return false,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() || !removed.contains(&path) {
            return false;
        }
    }
    true
}
