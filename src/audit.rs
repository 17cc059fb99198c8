//! Append-only activity and change logs
//!
//! Three kinds of persisted records:
//! - `server.log`: free-text activity lines, one per server event
//! - `changes.log`: structured change records as JSON lines
//! - `<stem>.log`: lazy per-file logs sitting next to each managed data file
//!
//! Appends are small and synchronous; a mutex per log file serializes
//! concurrent sessions. Log failures are reported through tracing and never
//! abort the operation that produced them.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The kind of change recorded in `changes.log`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// A new file was produced by an upload/conversion
    Uploaded,
    /// An existing file was edited and saved
    Edited,
    /// A file or directory was deleted
    Deleted,
}

/// One structured change record
///
/// Append-only; never mutated or removed except as a side effect of
/// deleting the associated file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// File the change applies to
    pub filename: String,
    /// What happened
    pub kind: ChangeKind,
    /// When it happened
    pub timestamp: DateTime<Utc>,
    /// Free-text detail
    pub detail: String,
}

impl ChangeRecord {
    /// Build a record stamped with the current time
    pub fn now(filename: impl Into<String>, kind: ChangeKind, detail: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            kind,
            timestamp: Utc::now(),
            detail: detail.into(),
        }
    }
}

/// Handle to the server-wide append-only logs
#[derive(Debug)]
pub struct Audit {
    activity_path: PathBuf,
    changes_path: PathBuf,
    activity_lock: Mutex<()>,
    changes_lock: Mutex<()>,
}

impl Audit {
    /// Create an audit handle writing under `base_dir`
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        let base = base_dir.as_ref();
        Self {
            activity_path: base.join("server.log"),
            changes_path: base.join("changes.log"),
            activity_lock: Mutex::new(()),
            changes_lock: Mutex::new(()),
        }
    }

    /// Append one timestamped line to `server.log`
    pub fn activity(&self, message: &str) {
        let _guard = self.activity_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = append_line(
            &self.activity_path,
            &format!("[{}] {}", Utc::now().to_rfc3339(), message),
        ) {
            warn!("Failed to write activity log: {}", e);
        }
    }

    /// Append one JSON-line change record to `changes.log`
    pub fn record_change(&self, record: &ChangeRecord) {
        let json = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize change record: {}", e);
                return;
            }
        };
        let _guard = self.changes_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = append_line(&self.changes_path, &json) {
            warn!("Failed to write change log: {}", e);
        }
    }

    /// Path of the activity log (used by tests)
    pub fn activity_path(&self) -> &Path {
        &self.activity_path
    }

    /// Path of the change log (used by tests)
    pub fn changes_path(&self) -> &Path {
        &self.changes_path
    }
}

/// Append a timestamped line to the per-file log next to `file_path`
///
/// The log file shares the data file's stem with a `.log` extension and is
/// created lazily on the first operation against the file.
pub fn append_file_log(file_path: &Path, message: &str) {
    let log_path = file_path.with_extension("log");
    if let Err(e) = append_line(
        &log_path,
        &format!("[{}] {}", Utc::now().to_rfc3339(), message),
    ) {
        warn!("Failed to write {}: {}", log_path.display(), e);
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_appends() {
        let dir = tempfile::tempdir().unwrap();
        let audit = Audit::new(dir.path());

        audit.activity("Admin user authenticated");
        audit.activity("User simple has been blocked.");

        let contents = std::fs::read_to_string(audit.activity_path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("Admin user authenticated"));
        assert!(lines[1].ends_with("User simple has been blocked."));
    }

    #[test]
    fn test_change_records_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let audit = Audit::new(dir.path());

        audit.record_change(&ChangeRecord::now(
            "catalog.json",
            ChangeKind::Uploaded,
            "converted from catalog.xml",
        ));

        let contents = std::fs::read_to_string(audit.changes_path()).unwrap();
        let record: ChangeRecord = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(record.filename, "catalog.json");
        assert_eq!(record.kind, ChangeKind::Uploaded);
        assert_eq!(record.detail, "converted from catalog.xml");
    }

    #[test]
    fn test_per_file_log_created_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("catalog.json");
        let log = dir.path().join("catalog.log");
        assert!(!log.exists());

        append_file_log(&data, "Metadata extracted from file 'catalog.json'");

        let contents = std::fs::read_to_string(&log).unwrap();
        assert!(contents.contains("Metadata extracted"));
    }
}
