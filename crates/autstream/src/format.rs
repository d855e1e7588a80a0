use std::{fmt, fs::OpenOptions, io::Write, path::Path, str::FromStr};

use crate::error::FormatError;

/// Text serializations an automaton can be rendered to.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub enum OutputFormat {
    /// Hanoi Omega-Automata format, the native textual form.
    #[default]
    Hoa,
    /// Graphviz `digraph` description.
    Dot,
    /// Spin never claim.
    Spin,
    /// LBTT interchange format.
    Lbtt,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Hoa,
        OutputFormat::Dot,
        OutputFormat::Spin,
        OutputFormat::Lbtt,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Hoa => "hoa",
            OutputFormat::Dot => "dot",
            OutputFormat::Spin => "spin",
            OutputFormat::Lbtt => "lbtt",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        OutputFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == lowered)
            .ok_or_else(|| FormatError::UnknownFormat(lowered))
    }
}

/// Serialization surface of the automata produced by a parser.
pub trait AutomatonText {
    fn to_text(&self, format: OutputFormat) -> Result<String, FormatError>;

    /// Like [`AutomatonText::to_text`], with the format given by name (case-insensitive).
    fn to_text_named(&self, format: &str) -> Result<String, FormatError> {
        self.to_text(format.parse()?)
    }

    /// Writes the automaton to `path`, truncating unless `append` is set.
    ///
    /// A trailing newline is added when the rendered text lacks one, so that
    /// appended automata stay separated.
    fn save(&self, path: &Path, format: OutputFormat, append: bool) -> Result<(), FormatError> {
        let text = self.to_text(format)?;
        let io_err = |source| FormatError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)
            .map_err(io_err)?;
        file.write_all(text.as_bytes()).map_err(io_err)?;
        if !text.ends_with('\n') {
            file.write_all(b"\n").map_err(io_err)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    impl AutomatonText for Fixed {
        fn to_text(&self, format: OutputFormat) -> Result<String, FormatError> {
            Ok(format!("{format}:{}", self.0))
        }
    }

    #[test]
    fn format_names_are_case_insensitive() {
        assert_eq!("HOA".parse::<OutputFormat>().unwrap(), OutputFormat::Hoa);
        assert_eq!("Spin".parse::<OutputFormat>().unwrap(), OutputFormat::Spin);
        assert_eq!("lbtt".parse::<OutputFormat>().unwrap(), OutputFormat::Lbtt);
        match "svg".parse::<OutputFormat>() {
            Err(FormatError::UnknownFormat(name)) => assert_eq!(name, "svg"),
            other => panic!("expected UnknownFormat, got {other:?}"),
        }
    }

    #[test]
    fn save_appends_with_newline_separator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        Fixed("a").save(&path, OutputFormat::Dot, false).unwrap();
        Fixed("b").save(&path, OutputFormat::Hoa, true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "dot:a\nhoa:b\n");

        Fixed("c").save(&path, OutputFormat::Lbtt, false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "lbtt:c\n");
    }

    #[test]
    fn named_format_rejects_unknown_names() {
        assert!(matches!(
            Fixed("x").to_text_named("png"),
            Err(FormatError::UnknownFormat(_))
        ));
        assert_eq!(Fixed("x").to_text_named("DOT").unwrap(), "dot:x");
    }
}
