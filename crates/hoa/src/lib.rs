#![forbid(unsafe_code)]
//! HOA automata for the `autstream` ingestion engine.
//!
//! ```no_run
//! use autstream::{AutomatonText, IngestConfig, OutputFormat};
//!
//! for aut in hoa::automata(["ltl2tgba -H 'GFa' |", "model.hoa"], IngestConfig::default()) {
//!     let aut = aut?;
//!     println!("{}", aut.to_text(OutputFormat::Dot)?);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod automaton;
mod error;
mod label;
mod parser;
mod print;

pub use automaton::{Automaton, Edge, State};
pub use error::HoaError;
pub use label::{Label, LabelStyle};
pub use parser::HoaParser;

use autstream::{Automata, IngestConfig, IngestError};

/// Lazily reads every automaton from `sources`, in order.
pub fn automata<I, S>(sources: I, config: IngestConfig) -> Automata<HoaParser>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    autstream::ingest(sources, config)
}

/// Reads the first automaton of `source`.
///
/// Anything after the first automaton is not read; a command still running
/// at that point is killed.
pub fn automaton(
    source: impl Into<String>,
    config: IngestConfig,
) -> Result<Automaton, IngestError> {
    let source = source.into();
    let mut automata = automata([source.as_str()], config);
    match automata.next() {
        Some(result) => result,
        None => Err(IngestError::NoAutomaton { origin: source }),
    }
}

#[cfg(feature = "tokio")]
pub fn automata_async<I, S>(
    sources: I,
    config: IngestConfig,
) -> autstream::AsyncAutomata<HoaParser>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    autstream::ingest_async(sources, config)
}
