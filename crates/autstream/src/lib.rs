#![forbid(unsafe_code)]
//! Streaming ingestion of automata from inline text, files and shell commands.
//!
//! The crate is parser-agnostic: a format crate implements
//! [`AutomatonParser`] and this crate takes care of:
//! - Classifying source strings (`"cmd |"`, inline text, file paths).
//! - Running commands in their own process group, with an optional deadline,
//!   and reconciling their exit status with what the parser consumed.
//! - A lazy, fused [`Automata`] sequence (sync, plus an async variant behind
//!   the `tokio` feature) whose drop tears down any open source.
//! - Post-processing directive parsing ([`PostprocessConfig`]).

mod config;
mod dictionary;
mod directives;
mod error;
mod format;
mod ingest;
mod parser;
pub mod process;
mod reader;
mod source;

pub use config::{IngestConfig, IngestLimits, IngestSettings, ParseOptions};
pub use dictionary::ApDictionary;
pub use directives::{
    AutomatonType, Directive, DirectiveRegistry, OptimizationLevel, OutputFlags,
    PostprocessConfig, Preference, PREF_ANY, PREF_COMPLETE, PREF_DETERMINISTIC, PREF_SBACC,
    PREF_SMALL, PREF_UNAMBIGUOUS,
};
pub use error::{DirectiveError, FormatError, IngestError, Slot, SyntaxError};
pub use format::{AutomatonText, OutputFormat};
pub use ingest::{ingest, Automata, AutomatonReader};
pub use parser::AutomatonParser;
pub use source::{Source, SourceKind, INLINE_LABEL, PIPE_MARKER};

#[cfg(feature = "tokio")]
pub use ingest::{ingest_async, AsyncAutomata, AsyncAutomatonReader};
