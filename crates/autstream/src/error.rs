use std::{io, path::PathBuf, process::ExitStatus, time::Duration};

use thiserror::Error;

use crate::format::OutputFormat;

/// A diagnostic raised by an [`AutomatonParser`](crate::AutomatonParser).
///
/// `provenance` is the label the parser was opened with (a path, the
/// command text, or `<string>`); it only serves diagnostics.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{provenance}:{line_number}: {message}")]
pub struct SyntaxError {
    pub provenance: String,
    /// 1-based line in the source; 0 when the error is reported at end of input
    /// before any line was read.
    pub line_number: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(
        provenance: impl Into<String>,
        line_number: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provenance: provenance.into(),
            line_number,
            message: message.into(),
        }
    }
}

/// Errors that end an ingestion call.
///
/// Every variant is fatal: once an [`Automata`](crate::Automata) sequence yields one of
/// these it yields nothing else.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    #[error("failed to open automaton file `{path}`: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("command `{command}` could not be spawned: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to wait for command `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("command `{command}` exceeded timeout of {timeout:?}")]
    CommandTimeout { command: String, timeout: Duration },
    #[error("command `{command}` exited with {status}")]
    CommandFailed { command: String, status: ExitStatus },
    #[error("command `{command}` stdout unavailable")]
    StdoutUnavailable { command: String },
    #[error("failed reading {provenance}: {source}")]
    Io {
        provenance: String,
        #[source]
        source: io::Error,
    },
    #[error("{provenance}:{line_number}: invalid UTF-8")]
    InvalidUtf8 {
        provenance: String,
        line_number: usize,
    },
    #[error(
        "{provenance}:{line_number}: line too long (observed_bytes={observed_bytes}, max_line_bytes={max_line_bytes})"
    )]
    LineTooLong {
        provenance: String,
        line_number: usize,
        observed_bytes: usize,
        max_line_bytes: usize,
    },
    #[error("failed to read automaton from {origin}")]
    NoAutomaton { origin: String },
}

impl IngestError {
    /// Exit status of a failed command, if this error carries one.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        match self {
            IngestError::CommandFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, IngestError::CommandTimeout { .. })
    }
}

/// The configuration slots that accept at most one value.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Slot {
    Type,
    Preference,
    Optimization,
}

impl Slot {
    pub const fn as_str(self) -> &'static str {
        match self {
            Slot::Type => "type",
            Slot::Preference => "preference",
            Slot::Optimization => "optimization level",
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures of [`PostprocessConfig::parse`](crate::PostprocessConfig::parse).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectiveError {
    #[error("unknown option '{0}'")]
    Unknown(String),
    #[error("ambiguous option '{directive}' is prefix of {candidates:?}")]
    Ambiguous {
        directive: String,
        candidates: Vec<String>,
    },
    #[error("{slot} cannot be both {first} and {second}")]
    Conflicting {
        slot: Slot,
        first: &'static str,
        second: &'static str,
    },
}

/// Failures of [`AutomatonText`](crate::AutomatonText) serialization.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("unknown string format: {0}")]
    UnknownFormat(String),
    #[error("{format} output does not support {reason}")]
    Unsupported {
        format: OutputFormat,
        reason: String,
    },
    #[error("failed to write automaton to `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FormatError {
    pub fn unsupported(format: OutputFormat, reason: impl Into<String>) -> Self {
        FormatError::Unsupported {
            format,
            reason: reason.into(),
        }
    }
}
