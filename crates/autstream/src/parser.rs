use crate::{config::ParseOptions, dictionary::ApDictionary, error::SyntaxError};

/// A streaming automaton parser fed one line at a time.
///
/// The ingestion engine opens one parser per source and drops it before the
/// source's process and channel are released.
pub trait AutomatonParser: Sized {
    type Automaton;

    /// Opens a parser for one source. `provenance` only labels diagnostics.
    fn open(provenance: &str, options: &ParseOptions) -> Self;

    /// Consumes one line (without its terminator).
    ///
    /// Returns `Ok(Some(_))` when the line completes an automaton.
    fn parse_line(
        &mut self,
        line: &str,
        line_number: usize,
        dict: &ApDictionary,
    ) -> Result<Option<Self::Automaton>, SyntaxError>;

    /// Signals end of input. Formats terminated by end of file may complete a
    /// final automaton here; a partially read automaton is a syntax error.
    fn finish(&mut self, dict: &ApDictionary) -> Result<Option<Self::Automaton>, SyntaxError>;
}
