//! Per-connection session state machine
//!
//! Flow: handshake → authentication → role resolution → command loop →
//! teardown. The session owns its socket exclusively; all shared state is
//! reached through the `ServerState` registries. Reads go through a helper
//! that also observes the eviction channel, so an administrator blocking
//! this session's user terminates the command loop even mid-read.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::admin::ADMIN_BUSY_NOTICE;
use crate::audit::{append_file_log, ChangeKind, ChangeRecord};
use crate::editor::{EditOutcome, LineEditor, EDITOR_USAGE};
use crate::error::AppError;
use crate::fsops::{self, DeleteOutcome};
use crate::server::ServerState;
use crate::types::{Role, SessionId};
use crate::{convert, jsonpath};

/// Outbound protocol lines longer than this are cut and visibly marked
const MAX_NOTICE_LEN: usize = 1024;

/// Marker appended to a truncated protocol line
const TRUNCATION_MARKER: &str = "... (message truncated)";

const USERNAME_PROMPT: &str = "Username: ";
const PASSWORD_PROMPT: &str = "Password: ";
const OPTION_PROMPT: &str = "Option: ";

const BLOCKED_NOTICE: &str = "You are blocked from the server.";
const AUTH_FAILED_NOTICE: &str = "Authentication failed. Please try again.";
const UNKNOWN_COMMAND: &str = "Unknown command";

const ADMIN_GREETING: &str = "Hello Admin! You have full access. Type 'list' to list all files and directories, 'view <filename>' to view a file, 'edit <filename>' to edit a file, 'delete <path>' to delete a file or directory, 'block <username>' to block a user, 'unblock <username>' to unblock a user, 'users' to list connected users, 'cd <dirname>' to change directory, or 'exit' to disconnect.";
const SIMPLE_GREETING: &str = "Hello Simple User! You can upload a new metadata file or extract metadata. Type 'upload' to upload a new metadata file, 'extract' to extract metadata. Type 'search' to view things based on json path or 'exit' to disconnect.";
const REMOTE_GREETING: &str = "Hello Remote User! You have remote access. Type 'exit' to disconnect.";
const UNKNOWN_ROLE_GREETING: &str = "Hello! Your role is not recognized.";

/// What a guarded read produced
enum ReadEvent {
    Line(String),
    Eof,
    Evicted(Option<String>),
}

/// The session's connection: buffered reader, writer, eviction channel
struct Conn {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    evict_rx: mpsc::Receiver<String>,
    evicted: bool,
}

impl Conn {
    fn new(stream: TcpStream, evict_rx: mpsc::Receiver<String>) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            evict_rx,
            evicted: false,
        }
    }

    /// Write a protocol line without a trailing newline (prompt style)
    async fn send(&mut self, text: &str) -> Result<(), AppError> {
        let clamped = clamp_notice(text);
        self.writer.write_all(clamped.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Write a protocol line followed by a newline
    async fn send_line(&mut self, text: &str) -> Result<(), AppError> {
        let clamped = clamp_notice(text);
        self.writer.write_all(clamped.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Write raw bytes (file content), exempt from the notice cap
    async fn send_bytes(&mut self, bytes: &[u8]) -> Result<(), AppError> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Read one line, observing the eviction channel
    ///
    /// Returns `Ok(None)` on orderly EOF. Eviction delivers the notice,
    /// shuts the write side down, and surfaces as `AppError::Evicted` so
    /// every loop up the stack unwinds through `?`.
    async fn read_line(&mut self) -> Result<Option<String>, AppError> {
        if self.evicted {
            return Err(AppError::Evicted);
        }

        let mut buf = String::new();
        let event = tokio::select! {
            result = self.reader.read_line(&mut buf) => {
                if result? == 0 {
                    ReadEvent::Eof
                } else {
                    while buf.ends_with('\n') || buf.ends_with('\r') {
                        buf.pop();
                    }
                    ReadEvent::Line(buf)
                }
            }
            notice = self.evict_rx.recv() => ReadEvent::Evicted(notice),
        };

        match event {
            ReadEvent::Line(line) => Ok(Some(line)),
            ReadEvent::Eof => Ok(None),
            ReadEvent::Evicted(notice) => {
                self.evicted = true;
                if let Some(notice) = notice {
                    let _ = self.send_line(&notice).await;
                }
                let _ = self.writer.shutdown().await;
                Err(AppError::Evicted)
            }
        }
    }
}

/// Cap a protocol line, marking the cut visibly instead of silently
fn clamp_notice(text: &str) -> std::borrow::Cow<'_, str> {
    if text.len() <= MAX_NOTICE_LEN {
        return std::borrow::Cow::Borrowed(text);
    }
    let mut end = MAX_NOTICE_LEN - TRUNCATION_MARKER.len();
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    std::borrow::Cow::Owned(format!("{}{}", &text[..end], TRUNCATION_MARKER))
}

/// One client session, owned by the worker executing it
pub struct Session {
    id: SessionId,
    conn: Conn,
    state: Arc<ServerState>,
    username: Option<String>,
    cwd: PathBuf,
}

impl Session {
    /// Build a session over an accepted connection
    pub fn new(
        id: SessionId,
        stream: TcpStream,
        evict_rx: mpsc::Receiver<String>,
        state: Arc<ServerState>,
    ) -> Self {
        let cwd = state.base_dir.clone();
        Self {
            id,
            conn: Conn::new(stream, evict_rx),
            state,
            username: None,
            cwd,
        }
    }

    /// Run the session to completion
    ///
    /// Errors terminate the session; teardown (counter, registry) is the
    /// caller's responsibility and runs exactly once regardless of the exit
    /// path taken here.
    pub async fn run(&mut self) -> Result<(), AppError> {
        // Handshake: username
        self.conn.send(USERNAME_PROMPT).await?;
        let Some(username) = self.conn.read_line().await? else {
            return Ok(());
        };

        if self.state.blocklist.is_blocked(&username) {
            self.conn.send_line(BLOCKED_NOTICE).await?;
            debug!("Session {}: blocked user '{}' turned away", self.id, username);
            return Ok(());
        }

        // Authentication: password
        self.conn.send(PASSWORD_PROMPT).await?;
        let Some(password) = self.conn.read_line().await? else {
            return Ok(());
        };

        let Some(role) = self.state.authenticator.authenticate(&username, &password) else {
            self.conn.send_line(AUTH_FAILED_NOTICE).await?;
            debug!("Session {}: authentication failed for '{}'", self.id, username);
            return Ok(());
        };

        self.state.registry.set_username(self.id, &username);
        self.username = Some(username.clone());
        info!("Session {}: '{}' authenticated as {}", self.id, username, role);

        match role {
            Role::Admin => self.run_admin().await,
            Role::Simple => self.run_simple().await,
            Role::Remote => {
                self.conn.send_line(REMOTE_GREETING).await?;
                self.state.audit.activity("Remote user authenticated");
                Ok(())
            }
            Role::Unknown => {
                self.conn.send_line(UNKNOWN_ROLE_GREETING).await?;
                self.state.audit.activity("Unknown role authenticated");
                Ok(())
            }
        }
    }

    /// Admin branch: acquire the slot, then run the admin command loop
    async fn run_admin(&mut self) -> Result<(), AppError> {
        let state = Arc::clone(&self.state);
        let Some(_guard) = state.admin_slot.try_acquire() else {
            self.conn.send_line(ADMIN_BUSY_NOTICE).await?;
            return Ok(());
        };
        // The guard releases the slot on every exit path from the loop,
        // abnormal read failures included.

        self.conn.send_line(ADMIN_GREETING).await?;
        self.state.audit.activity("Admin user authenticated");

        loop {
            self.conn.send(OPTION_PROMPT).await?;
            let Some(line) = self.conn.read_line().await? else {
                break;
            };

            if line == "list" {
                self.cmd_list().await?;
            } else if let Some(filename) = line.strip_prefix("view ") {
                self.cmd_view(filename).await?;
            } else if let Some(filename) = line.strip_prefix("edit ") {
                self.cmd_edit(filename).await?;
            } else if let Some(path) = line.strip_prefix("delete ") {
                self.cmd_delete(path).await?;
            } else if let Some(username) = line.strip_prefix("block ") {
                self.cmd_block(username).await?;
            } else if let Some(username) = line.strip_prefix("unblock ") {
                self.cmd_unblock(username).await?;
            } else if line == "users" {
                self.cmd_users().await?;
            } else if let Some(dirname) = line.strip_prefix("cd ") {
                self.cmd_cd(dirname).await?;
            } else if line == "exit" {
                break;
            } else {
                self.conn.send_line(UNKNOWN_COMMAND).await?;
            }

            // Blank separator after every command's output
            self.conn.send_line("").await?;
        }

        Ok(())
    }

    /// Simple-user branch: upload / extract / search
    async fn run_simple(&mut self) -> Result<(), AppError> {
        self.conn.send_line(SIMPLE_GREETING).await?;
        self.state.audit.activity("Simple user authenticated");

        loop {
            self.conn.send(OPTION_PROMPT).await?;
            let Some(line) = self.conn.read_line().await? else {
                break;
            };

            if line == "upload" {
                if !self.cmd_upload().await? {
                    break;
                }
            } else if line == "extract" {
                if !self.cmd_extract().await? {
                    break;
                }
            } else if line == "search" {
                if !self.cmd_search().await? {
                    break;
                }
            } else if line == "exit" {
                break;
            } else {
                self.conn.send_line(UNKNOWN_COMMAND).await?;
            }

            self.conn.send_line("").await?;
        }

        Ok(())
    }

    /// Resolve a client-supplied path against the session's working directory
    fn resolve(&self, input: &str) -> PathBuf {
        let path = Path::new(input);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    async fn cmd_list(&mut self) -> Result<(), AppError> {
        match fsops::list_directory(&self.cwd) {
            Ok(names) => {
                for name in names {
                    self.conn.send_line(&name).await?;
                }
            }
            Err(e) => {
                warn!("list failed in {}: {}", self.cwd.display(), e);
                self.conn.send_line("Failed to open directory.").await?;
            }
        }
        Ok(())
    }

    async fn cmd_view(&mut self, filename: &str) -> Result<(), AppError> {
        let path = self.resolve(filename);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                self.conn.send_bytes(&bytes).await?;
                append_file_log(
                    &path,
                    &format!("Metadata extracted from file '{}'", filename),
                );
            }
            Err(e) => {
                warn!("view failed for {}: {}", path.display(), e);
                self.conn.send_line("Failed to open file.").await?;
            }
        }
        Ok(())
    }

    async fn cmd_edit(&mut self, filename: &str) -> Result<(), AppError> {
        let path = self.resolve(filename);
        if !fsops::file_exists(&path) {
            self.conn
                .send_line("File does not exist. Cannot edit.")
                .await?;
            return Ok(());
        }

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("edit open failed for {}: {}", path.display(), e);
                self.conn.send_line("Failed to open file.").await?;
                return Ok(());
            }
        };

        self.conn.send_line("Current content:").await?;
        self.conn.send_bytes(content.as_bytes()).await?;
        self.conn.send_line("").await?;
        self.conn.send_line(EDITOR_USAGE).await?;

        let mut editor = LineEditor::new(&content);
        loop {
            let Some(line) = self.conn.read_line().await? else {
                break;
            };
            match editor.apply(&line) {
                EditOutcome::Applied => {}
                EditOutcome::Unknown => {
                    self.conn
                        .send_line("Unknown command. Use 'add', 'delete', 'replace', or 'save'.")
                        .await?;
                }
                EditOutcome::Save => {
                    match tokio::fs::write(&path, editor.content()).await {
                        Ok(()) => {
                            self.conn.send_line("File saved and updated.").await?;
                            append_file_log(&path, &format!("File '{}' edited and saved", filename));
                            self.state.audit.record_change(&ChangeRecord::now(
                                filename,
                                ChangeKind::Edited,
                                format!("{} lines after edit", editor.line_count()),
                            ));
                        }
                        Err(e) => {
                            warn!("edit save failed for {}: {}", path.display(), e);
                            self.conn.send_line("Failed to save file.").await?;
                        }
                    }
                    break;
                }
            }
        }
        Ok(())
    }

    async fn cmd_delete(&mut self, input: &str) -> Result<(), AppError> {
        let path = self.resolve(input);
        match fsops::delete_path(&path) {
            Ok(DeleteOutcome::Directory) => {
                self.conn.send_line("Directory deleted.").await?;
                self.state.audit.activity("Directory deleted.");
                self.state.audit.record_change(&ChangeRecord::now(
                    input,
                    ChangeKind::Deleted,
                    "directory removed recursively",
                ));
            }
            Ok(DeleteOutcome::FileAndLog) => {
                self.conn
                    .send_line("File and corresponding log file deleted.")
                    .await?;
                self.state
                    .audit
                    .activity("File and corresponding log file deleted.");
                self.state.audit.record_change(&ChangeRecord::now(
                    input,
                    ChangeKind::Deleted,
                    "file and sibling log removed",
                ));
            }
            Ok(DeleteOutcome::FileOnly) => {
                self.conn
                    .send_line("File deleted, but failed to delete corresponding log file.")
                    .await?;
                self.state
                    .audit
                    .activity("File deleted, but failed to delete corresponding log file.");
                self.state.audit.record_change(&ChangeRecord::now(
                    input,
                    ChangeKind::Deleted,
                    "file removed, no sibling log",
                ));
            }
            Err(e) => {
                self.conn
                    .send_line(&format!("Failed to delete {}: {}", path.display(), e))
                    .await?;
            }
        }
        Ok(())
    }

    async fn cmd_block(&mut self, username: &str) -> Result<(), AppError> {
        if self.state.blocklist.insert(username) {
            self.state
                .audit
                .activity(&format!("User {} has been blocked.", username));
        }
        // Evict regardless: a re-blocked user may have connected before
        // the earlier block landed. The admin name never blocks, and never
        // evicts either.
        if username != crate::block::ADMIN_USERNAME {
            let evicted = self.state.registry.evict(username);
            if evicted > 0 {
                info!("Blocked user '{}': {} session(s) evicted", username, evicted);
            }
        }
        self.conn.send_line("User blocked.").await?;
        Ok(())
    }

    async fn cmd_unblock(&mut self, username: &str) -> Result<(), AppError> {
        if self.state.blocklist.remove(username) {
            self.state
                .audit
                .activity(&format!("User {} has been unblocked.", username));
        }
        self.conn.send_line("User unblocked.").await?;
        Ok(())
    }

    async fn cmd_users(&mut self) -> Result<(), AppError> {
        for (username, id) in self.state.registry.list() {
            self.conn
                .send_line(&format!("User: {}, Session: {}", username, id))
                .await?;
        }
        Ok(())
    }

    async fn cmd_cd(&mut self, dirname: &str) -> Result<(), AppError> {
        let path = self.resolve(dirname);
        match fsops::list_directory(&path) {
            Ok(names) => {
                self.cwd = path;
                for name in names {
                    self.conn.send_line(&name).await?;
                }
            }
            Err(e) => {
                warn!("cd failed for {}: {}", path.display(), e);
                self.conn
                    .send_line(&format!("Failed to open directory: {}", dirname))
                    .await?;
            }
        }
        Ok(())
    }

    /// `upload`: convert a server-side XML file to JSON
    ///
    /// Returns `false` when the client hung up mid-dialog.
    async fn cmd_upload(&mut self) -> Result<bool, AppError> {
        self.conn.send_line("Enter the path to the XML file:").await?;
        let Some(xml_input) = self.conn.read_line().await? else {
            return Ok(false);
        };

        self.conn
            .send_line("Enter the name of the output JSON file (without extension):")
            .await?;
        let Some(json_name) = self.conn.read_line().await? else {
            return Ok(false);
        };

        let xml_path = self.resolve(&xml_input);
        let json_filename = format!("{}.json", json_name);
        let json_path = self.resolve(&json_filename);

        // Invalid XML is logged, never reported past the generic notice
        match convert::xml_to_json(&xml_path, &json_path) {
            Ok(()) => {
                self.state.audit.record_change(&ChangeRecord::now(
                    &json_filename,
                    ChangeKind::Uploaded,
                    format!("converted from '{}'", xml_input),
                ));
                self.state.audit.activity("Metadata uploaded and file created.");
            }
            Err(e) => warn!("Conversion of {} failed: {}", xml_path.display(), e),
        }

        append_file_log(
            &xml_path,
            &format!(
                "Uploaded XML file '{}' and created JSON file '{}'",
                xml_input, json_filename
            ),
        );
        append_file_log(
            &json_path,
            &format!(
                "Created JSON file '{}' from XML '{}'",
                json_filename, xml_input
            ),
        );

        self.conn
            .send_line("XML file converted to JSON and saved.")
            .await?;
        Ok(true)
    }

    /// `extract`: display a converted JSON document
    async fn cmd_extract(&mut self) -> Result<bool, AppError> {
        self.conn
            .send_line("Enter the name of the file (without extension):")
            .await?;
        let Some(name) = self.conn.read_line().await? else {
            return Ok(false);
        };

        let json_filename = format!("{}.json", name);
        let path = self.resolve(&json_filename);

        self.conn
            .send_line("Metadata extracted and saved as JSON. Displaying content:")
            .await?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                self.conn.send_bytes(&bytes).await?;
                append_file_log(
                    &path,
                    &format!("Metadata extracted from file '{}'", json_filename),
                );
            }
            Err(e) => {
                warn!("extract failed for {}: {}", path.display(), e);
                self.conn.send_line("Failed to open file.").await?;
            }
        }
        Ok(true)
    }

    /// `search`: resolve a dotted/bracketed path inside a JSON document
    async fn cmd_search(&mut self) -> Result<bool, AppError> {
        self.conn
            .send_line("Enter the name of the JSON file (without extension):")
            .await?;
        let Some(name) = self.conn.read_line().await? else {
            return Ok(false);
        };

        self.conn.send_line("Enter the full search path:").await?;
        let Some(expr) = self.conn.read_line().await? else {
            return Ok(false);
        };

        let json_filename = format!("{}.json", name);
        let path = self.resolve(&json_filename);

        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) => {
                warn!("search open failed for {}: {}", path.display(), e);
                self.conn.send_line("Failed to open file.").await?;
                return Ok(true);
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                warn!("search parse failed for {}: {}", path.display(), e);
                self.conn.send_line("Error parsing JSON").await?;
                return Ok(true);
            }
        };

        match jsonpath::search(&value, &expr) {
            Some(found) => {
                let rendered = serde_json::to_string_pretty(found)?;
                self.conn.send_line(&rendered).await?;
            }
            None => {
                self.conn.send_line("Path not found").await?;
            }
        }

        append_file_log(
            &path,
            &format!("Searched in '{}' for '{}'", json_filename, expr),
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_notice_passes_short_text() {
        assert_eq!(clamp_notice("hello"), "hello");
    }

    #[test]
    fn test_clamp_notice_marks_truncation() {
        let long = "x".repeat(MAX_NOTICE_LEN + 50);
        let clamped = clamp_notice(&long);
        assert_eq!(clamped.len(), MAX_NOTICE_LEN);
        assert!(clamped.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_clamp_notice_respects_char_boundaries() {
        let long = "é".repeat(MAX_NOTICE_LEN);
        let clamped = clamp_notice(&long);
        assert!(clamped.ends_with(TRUNCATION_MARKER));
        assert!(clamped.len() <= MAX_NOTICE_LEN);
    }
}
