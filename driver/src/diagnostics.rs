//! Append-only diagnostic log for one or more compilation calls.
//!
//! Holds sanitized compiler output and the driver's own warnings, in the
//! order they were produced, plus a structured record of every attempt.
//! Nothing is ever removed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::capability::SOURCE_PATH_LABEL;
use crate::flags::{CompileFlags, HResult};

/// Remove every occurrence of the synthetic source path from compiler output.
///
/// Messages read `C:\fakepath(12,3): error X3000: ...`; stripping the label
/// leaves `(12,3): error X3000: ...`.
pub fn sanitize(message: &str) -> String {
    message.replace(SOURCE_PATH_LABEL, "")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Text produced by the compiler itself.
    Compiler,
    /// A configuration failed.
    Warning,
    /// Names the configuration tried next.
    Retry,
    /// Free-form text appended by a caller.
    Note,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: EntryKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Compiled { bytes: usize },
    Failed { code: HResult },
    OutOfMemory,
}

/// One invocation of the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub index: usize,
    pub label: String,
    pub flags: CompileFlags,
    pub outcome: AttemptOutcome,
    pub had_diagnostics: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticLog {
    entries: Vec<LogEntry>,
    attempts: Vec<AttemptRecord>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append compiler output after stripping the synthetic source path.
    pub fn append_sanitized(&mut self, message: &str) {
        self.push(EntryKind::Compiler, sanitize(message));
    }

    /// Append caller text verbatim.
    pub fn append(&mut self, text: impl Into<String>) {
        self.push(EntryKind::Note, text.into());
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.push(EntryKind::Warning, text.into());
    }

    pub fn retry_note(&mut self, text: impl Into<String>) {
        self.push(EntryKind::Retry, text.into());
    }

    pub fn record_attempt(&mut self, record: AttemptRecord) {
        self.attempts.push(record);
    }

    fn push(&mut self, kind: EntryKind, text: String) {
        self.entries.push(LogEntry { kind, text });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.attempts
    }

    /// No entries and no attempt records.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.attempts.is_empty()
    }

    /// Number of text entries; attempt records are counted by `attempts()`.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn count(&self, kind: EntryKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    pub fn entries_of(&self, kind: EntryKind) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|e| e.text.contains(needle))
    }

    /// Plain-text rendering, one line per entry. A retry note continues the
    /// warning line it follows.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut iter = self.entries.iter().peekable();
        while let Some(entry) = iter.next() {
            out.push_str(entry.text.trim_end_matches('\n'));
            let continues = entry.kind == EntryKind::Warning
                && iter.peek().is_some_and(|next| next.kind == EntryKind::Retry);
            out.push(if continues { ' ' } else { '\n' });
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for DiagnosticLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
