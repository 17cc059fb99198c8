//! Interactive line-buffer file editor
//!
//! The edit sub-protocol operates on an in-memory copy of the file; nothing
//! touches disk until `save`. Line numbers are 1-based; out-of-range numbers
//! are silently ignored, matching the historical behavior. The session layer
//! drives the I/O, this module only interprets commands.

/// Usage line sent to the client when entering the editor
pub const EDITOR_USAGE: &str =
    "Enter 'add <text>', 'delete <line number>', 'replace <line number> <new text>', or 'save' to save changes.";

/// Result of applying one editor command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// Buffer mutated (or a no-op on an out-of-range line), keep editing
    Applied,
    /// `save` was issued; commit the buffer and leave the editor
    Save,
    /// Input didn't match any editor command
    Unknown,
}

/// In-memory line buffer for one editing session
#[derive(Debug, Clone)]
pub struct LineEditor {
    lines: Vec<String>,
}

impl LineEditor {
    /// Create an editor over the file's current content
    pub fn new(content: &str) -> Self {
        Self {
            lines: content.lines().map(str::to_string).collect(),
        }
    }

    /// Apply one command line to the buffer
    pub fn apply(&mut self, input: &str) -> EditOutcome {
        if let Some(text) = input.strip_prefix("add ") {
            self.lines.push(text.to_string());
            EditOutcome::Applied
        } else if let Some(arg) = input.strip_prefix("delete ") {
            if let Some(index) = parse_line_number(arg) {
                if index < self.lines.len() {
                    self.lines.remove(index);
                }
            }
            EditOutcome::Applied
        } else if let Some(arg) = input.strip_prefix("replace ") {
            let mut parts = arg.splitn(2, ' ');
            let number = parts.next().unwrap_or("");
            let text = parts.next().unwrap_or("");
            if let Some(index) = parse_line_number(number) {
                if index < self.lines.len() {
                    self.lines[index] = text.to_string();
                }
            }
            EditOutcome::Applied
        } else if input == "save" {
            EditOutcome::Save
        } else {
            EditOutcome::Unknown
        }
    }

    /// Render the buffer as file content
    ///
    /// A trailing newline is emitted when the buffer is non-empty.
    pub fn content(&self) -> String {
        if self.lines.is_empty() {
            String::new()
        } else {
            let mut out = self.lines.join("\n");
            out.push('\n');
            out
        }
    }

    /// Number of lines currently in the buffer
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// Parse a 1-based line number into a 0-based index
fn parse_line_number(arg: &str) -> Option<usize> {
    let n: usize = arg.trim().parse().ok()?;
    n.checked_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_appends() {
        let mut editor = LineEditor::new("one\ntwo\n");
        assert_eq!(editor.apply("add three"), EditOutcome::Applied);
        assert_eq!(editor.content(), "one\ntwo\nthree\n");
    }

    #[test]
    fn test_delete_is_one_based() {
        let mut editor = LineEditor::new("one\ntwo\nthree\n");
        editor.apply("delete 2");
        assert_eq!(editor.content(), "one\nthree\n");
    }

    #[test]
    fn test_delete_out_of_range_is_ignored() {
        let mut editor = LineEditor::new("one\n");
        assert_eq!(editor.apply("delete 0"), EditOutcome::Applied);
        assert_eq!(editor.apply("delete 9"), EditOutcome::Applied);
        assert_eq!(editor.apply("delete x"), EditOutcome::Applied);
        assert_eq!(editor.content(), "one\n");
    }

    #[test]
    fn test_replace_line() {
        let mut editor = LineEditor::new("one\ntwo\n");
        editor.apply("replace 1 uno dos");
        assert_eq!(editor.content(), "uno dos\ntwo\n");
    }

    #[test]
    fn test_save_and_unknown() {
        let mut editor = LineEditor::new("");
        assert_eq!(editor.apply("save"), EditOutcome::Save);
        assert_eq!(editor.apply("quit"), EditOutcome::Unknown);
        assert_eq!(editor.apply("added"), EditOutcome::Unknown);
    }

    #[test]
    fn test_empty_file() {
        let mut editor = LineEditor::new("");
        assert_eq!(editor.line_count(), 0);
        assert_eq!(editor.content(), "");
        editor.apply("add first");
        assert_eq!(editor.content(), "first\n");
    }
}
