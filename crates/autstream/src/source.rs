use std::path::Path;

/// Trailing marker that turns a source string into a shell command.
pub const PIPE_MARKER: char = '|';

/// Provenance label used for inline sources.
pub const INLINE_LABEL: &str = "<string>";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum SourceKind {
    /// The string itself is the automaton text.
    Literal,
    /// A shell command whose stdout is the automaton text.
    Command,
    /// A path to a file holding the automaton text.
    File,
}

/// One classified source string.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Source {
    kind: SourceKind,
    original: String,
}

impl Source {
    /// Classifies `source`. Total: every string has a kind.
    ///
    /// A trailing [`PIPE_MARKER`] wins over embedded newlines, so a multi-line
    /// shell script ending in `|` is still a command.
    pub fn classify(source: impl Into<String>) -> Self {
        let original = source.into();
        let kind = if original.ends_with(PIPE_MARKER) {
            SourceKind::Command
        } else if original.contains('\n') {
            SourceKind::Literal
        } else {
            SourceKind::File
        };
        Self { kind, original }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// The normalized source: the command without its marker, the inline
    /// text, or the path.
    pub fn text(&self) -> &str {
        match self.kind {
            SourceKind::Command => self
                .original
                .strip_suffix(PIPE_MARKER)
                .unwrap_or(&self.original),
            SourceKind::Literal | SourceKind::File => &self.original,
        }
    }

    /// The string as the caller supplied it.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Label handed to the parser for diagnostics.
    pub fn provenance(&self) -> &str {
        match self.kind {
            SourceKind::Literal => INLINE_LABEL,
            SourceKind::Command | SourceKind::File => &self.original,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        (self.kind == SourceKind::File).then(|| Path::new(&self.original))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_pipe_is_a_command_even_with_newlines() {
        let src = Source::classify("printf 'HOA: v1\\n'\necho done|");
        assert_eq!(src.kind(), SourceKind::Command);
        assert_eq!(src.text(), "printf 'HOA: v1\\n'\necho done");
        assert_eq!(src.provenance(), "printf 'HOA: v1\\n'\necho done|");
    }

    #[test]
    fn newline_without_pipe_is_literal() {
        let src = Source::classify("HOA: v1\n--BODY--\n--END--");
        assert_eq!(src.kind(), SourceKind::Literal);
        assert_eq!(src.text(), "HOA: v1\n--BODY--\n--END--");
        assert_eq!(src.provenance(), INLINE_LABEL);
        assert!(src.path().is_none());
    }

    #[test]
    fn everything_else_is_a_file() {
        for raw in ["aut.hoa", "", "a|b", "dir/with space.hoa"] {
            let src = Source::classify(raw);
            assert_eq!(src.kind(), SourceKind::File, "{raw:?}");
            assert_eq!(src.path(), Some(Path::new(raw)));
        }
    }

    #[test]
    fn lone_marker_is_an_empty_command() {
        let src = Source::classify("|");
        assert_eq!(src.kind(), SourceKind::Command);
        assert_eq!(src.text(), "");
    }

    #[test]
    fn classification_is_deterministic() {
        for raw in ["x|", "x\ny", "x", "x\n|", "\n"] {
            assert_eq!(Source::classify(raw), Source::classify(raw));
        }
    }
}
