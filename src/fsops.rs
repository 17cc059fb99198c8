//! Directory listing and file deletion helpers
//!
//! Deterministic, single-threaded filesystem utilities invoked by the
//! session command handlers. Nothing here coordinates concurrent access;
//! two sessions mutating the same path can interleave.

use std::io;
use std::path::Path;

/// Outcome of deleting a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// A directory (and everything under it) was removed
    Directory,
    /// A plain file and its sibling `<stem>.log` were removed
    FileAndLog,
    /// A plain file was removed but no sibling log existed (or it failed)
    FileOnly,
}

/// List entry names in `path`, excluding `.` and `..`
pub fn list_directory(path: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

/// Check whether `path` exists and is a readable entry
pub fn file_exists(path: &Path) -> bool {
    path.exists()
}

/// Recursively delete a file or directory
///
/// Deleting a plain file also removes the sibling `<stem>.log` the server
/// maintains for it; a missing log downgrades the outcome, it is not an
/// error.
pub fn delete_path(path: &Path) -> io::Result<DeleteOutcome> {
    let meta = std::fs::metadata(path)?;
    if meta.is_dir() {
        std::fs::remove_dir_all(path)?;
        return Ok(DeleteOutcome::Directory);
    }

    std::fs::remove_file(path)?;
    let log_path = path.with_extension("log");
    if log_path != path && std::fs::remove_file(&log_path).is_ok() {
        Ok(DeleteOutcome::FileAndLog)
    } else {
        Ok(DeleteOutcome::FileOnly)
    }
}
