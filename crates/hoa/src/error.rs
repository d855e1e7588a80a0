use autstream::SyntaxError;
use thiserror::Error;

/// What went wrong on one HOA line. The parser attaches provenance and line
/// number when converting into a [`SyntaxError`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HoaError {
    #[error("expected `HOA:` header, found `{0}`")]
    MissingHoaHeader(String),
    #[error("unsupported HOA version `{0}`")]
    UnsupportedVersion(String),
    #[error("`{header}` appears twice")]
    DuplicateHeader { header: &'static str },
    #[error("expected {expected}, found `{found}`")]
    Unexpected {
        expected: &'static str,
        found: String,
    },
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("`AP:` announces {declared} propositions but lists {listed}")]
    ApCountMismatch { declared: usize, listed: usize },
    #[error("atomic proposition {index} is undefined ({count} declared)")]
    UndefinedAp { index: usize, count: usize },
    #[error("state {state} is out of range (`States: {count}`)")]
    StateOutOfRange { state: usize, count: usize },
    #[error("{what} {value} exceeds the supported maximum of {max}")]
    TooLarge {
        what: &'static str,
        value: usize,
        max: usize,
    },
    #[error("label nests deeper than {max} levels")]
    LabelTooDeep { max: usize },
    #[error("acceptance set {set} is out of range ({count} declared)")]
    AccSetOutOfRange { set: usize, count: usize },
    #[error("state {0} is defined twice")]
    DuplicateState(usize),
    #[error("edge appears before any `State:`")]
    EdgeOutsideState,
    #[error("{0} are not supported")]
    Unsupported(&'static str),
    #[error("automaton aborted with --ABORT--")]
    Aborted,
    #[error("automaton not terminated by --END--")]
    Unterminated,
}

impl HoaError {
    pub fn at(self, provenance: &str, line_number: usize) -> SyntaxError {
        SyntaxError::new(provenance, line_number, self.to_string())
    }

    pub(crate) fn unexpected(expected: &'static str, found: &str) -> Self {
        let found = if found.is_empty() { "end of line" } else { found };
        HoaError::Unexpected {
            expected,
            found: found.to_string(),
        }
    }
}
