use std::collections::HashSet;

use autstream::{ApDictionary, AutomatonParser, ParseOptions, SyntaxError};
use tracing::debug;

use crate::automaton::{Automaton, Edge, State};
use crate::error::HoaError;
use crate::label::Label;

/// Upper bound on state ids and on `States:`, so an id cannot force a huge
/// state table.
pub(crate) const MAX_STATES: usize = 1 << 24;

/// Line-fed reader for a subset of HOA v1.
///
/// Supported: explicit edge labels, one destination per edge, integer state
/// ids, acceptance kept as text. Each header item, `State:` line and edge
/// must sit on its own line.
pub struct HoaParser {
    provenance: String,
    ignore_abort: bool,
    phase: Phase,
    last_line: usize,
}

enum Phase {
    Idle,
    Header(Builder),
    Body(Builder),
}

#[derive(Default)]
struct Builder {
    automaton: Automaton,
    declared_states: Option<usize>,
    seen: HashSet<&'static str>,
    defined: HashSet<usize>,
    current: Option<usize>,
}

impl AutomatonParser for HoaParser {
    type Automaton = Automaton;

    fn open(provenance: &str, options: &ParseOptions) -> Self {
        Self {
            provenance: provenance.to_string(),
            ignore_abort: options.ignore_abort,
            phase: Phase::Idle,
            last_line: 0,
        }
    }

    fn parse_line(
        &mut self,
        line: &str,
        line_number: usize,
        dict: &ApDictionary,
    ) -> Result<Option<Automaton>, SyntaxError> {
        self.last_line = line_number;
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        self.step(line, dict)
            .map_err(|err| err.at(&self.provenance, line_number))
    }

    fn finish(&mut self, _dict: &ApDictionary) -> Result<Option<Automaton>, SyntaxError> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => Ok(None),
            Phase::Header(_) | Phase::Body(_) => {
                Err(HoaError::Unterminated.at(&self.provenance, self.last_line))
            }
        }
    }
}

impl HoaParser {
    fn step(&mut self, line: &str, dict: &ApDictionary) -> Result<Option<Automaton>, HoaError> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => {
                let version = match split_header(line) {
                    Some(("HOA", version)) => version,
                    _ => return Err(HoaError::MissingHoaHeader(line.to_string())),
                };
                if !version.starts_with("v1") {
                    return Err(HoaError::UnsupportedVersion(version.to_string()));
                }
                self.phase = Phase::Header(Builder::default());
                Ok(None)
            }
            Phase::Header(mut builder) => match line {
                "--ABORT--" => self.abort(),
                "--BODY--" => {
                    if !builder.seen.contains("Acceptance") {
                        return Err(HoaError::unexpected("`Acceptance:` header", line));
                    }
                    self.phase = Phase::Body(builder);
                    Ok(None)
                }
                _ => {
                    builder.header(line, dict)?;
                    self.phase = Phase::Header(builder);
                    Ok(None)
                }
            },
            Phase::Body(mut builder) => match line {
                "--ABORT--" => self.abort(),
                "--END--" => builder.finish().map(Some),
                _ => {
                    match line.strip_prefix("State:") {
                        Some(rest) => builder.state(rest.trim_start())?,
                        None => builder.edge(line)?,
                    }
                    self.phase = Phase::Body(builder);
                    Ok(None)
                }
            },
        }
    }

    fn abort(&self) -> Result<Option<Automaton>, HoaError> {
        if self.ignore_abort {
            debug!(
                provenance = %self.provenance,
                line = self.last_line,
                "skipping aborted automaton"
            );
            Ok(None)
        } else {
            Err(HoaError::Aborted)
        }
    }
}

impl Builder {
    fn once(&mut self, header: &'static str) -> Result<(), HoaError> {
        if self.seen.insert(header) {
            Ok(())
        } else {
            Err(HoaError::DuplicateHeader { header })
        }
    }

    fn header(&mut self, line: &str, dict: &ApDictionary) -> Result<(), HoaError> {
        let Some((key, value)) = split_header(line) else {
            return Err(HoaError::unexpected("header item", line));
        };
        match key {
            "HOA" => return Err(HoaError::DuplicateHeader { header: "HOA" }),
            "name" => {
                let (name, rest) = take_quoted(value)?;
                expect_end(rest)?;
                self.once("name")?;
                self.automaton.name = Some(name);
            }
            "States" => {
                let (count, rest) = take_number(value)?;
                expect_end(rest)?;
                bounded("state count", count, MAX_STATES + 1)?;
                self.once("States")?;
                self.declared_states = Some(count);
            }
            "Start" => {
                let (state, rest) = take_number(value)?;
                if rest.starts_with('&') {
                    return Err(HoaError::Unsupported("conjunctions of initial states"));
                }
                expect_end(rest)?;
                bounded("state", state, MAX_STATES)?;
                self.automaton.start.push(state);
            }
            "AP" => {
                let (declared, mut rest) = take_number(value)?;
                let mut names = Vec::new();
                while !rest.is_empty() {
                    let (name, tail) = take_quoted(rest)?;
                    names.push(name);
                    rest = tail;
                }
                if names.len() != declared {
                    return Err(HoaError::ApCountMismatch {
                        declared,
                        listed: names.len(),
                    });
                }
                self.once("AP")?;
                self.automaton.ap_vars = names.iter().map(|name| dict.register(name)).collect();
                self.automaton.aps = names;
            }
            "acc-name" => {
                self.once("acc-name")?;
                self.automaton.acc_name = Some(value.to_string());
            }
            "Acceptance" => {
                let (sets, rest) = take_number(value)?;
                if rest.is_empty() {
                    return Err(HoaError::unexpected("acceptance condition", rest));
                }
                self.once("Acceptance")?;
                self.automaton.acceptance_sets = sets;
                self.automaton.acceptance = rest.to_string();
            }
            "properties" => self
                .automaton
                .properties
                .extend(value.split_whitespace().map(str::to_string)),
            other => self
                .automaton
                .extra_headers
                .push((other.to_string(), value.to_string())),
        }
        Ok(())
    }

    fn check_state(&self, state: usize) -> Result<(), HoaError> {
        bounded("state", state, MAX_STATES)?;
        match self.declared_states {
            Some(count) if state >= count => Err(HoaError::StateOutOfRange { state, count }),
            _ => Ok(()),
        }
    }

    fn check_marks(&self, marks: &[usize]) -> Result<(), HoaError> {
        let count = self.automaton.acceptance_sets;
        match marks.iter().find(|set| **set >= count) {
            Some(set) => Err(HoaError::AccSetOutOfRange { set: *set, count }),
            None => Ok(()),
        }
    }

    fn ensure_state(&mut self, state: usize) -> &mut State {
        let states = &mut self.automaton.states;
        if states.len() <= state {
            states.resize_with(state + 1, State::default);
        }
        &mut states[state]
    }

    fn state(&mut self, rest: &str) -> Result<(), HoaError> {
        if rest.starts_with('[') {
            return Err(HoaError::Unsupported("state labels"));
        }
        let (id, mut rest) = take_number(rest)?;
        self.check_state(id)?;
        let mut name = None;
        if rest.starts_with('"') {
            let (text, tail) = take_quoted(rest)?;
            name = Some(text);
            rest = tail;
        }
        let (marks, rest) = take_marks(rest)?;
        expect_end(rest)?;
        self.check_marks(&marks)?;
        if !self.defined.insert(id) {
            return Err(HoaError::DuplicateState(id));
        }

        let state = self.ensure_state(id);
        state.name = name;
        state.marks = marks;
        self.current = Some(id);
        Ok(())
    }

    fn edge(&mut self, line: &str) -> Result<(), HoaError> {
        let Some(src) = self.current else {
            return Err(HoaError::EdgeOutsideState);
        };
        let Some(rest) = line.strip_prefix('[') else {
            return Err(HoaError::Unsupported("implicit edge labels"));
        };
        let Some((label, rest)) = rest.split_once(']') else {
            return Err(HoaError::unexpected("`]`", rest));
        };
        let label = Label::parse(label, self.automaton.aps.len())?;
        let (dst, rest) = take_number(rest.trim_start())?;
        if rest.starts_with('&') {
            return Err(HoaError::Unsupported("universal edges"));
        }
        self.check_state(dst)?;
        let (marks, rest) = take_marks(rest)?;
        expect_end(rest)?;
        self.check_marks(&marks)?;

        self.ensure_state(dst);
        self.ensure_state(src).edges.push(Edge { label, dst, marks });
        Ok(())
    }

    fn finish(self) -> Result<Automaton, HoaError> {
        let mut aut = self.automaton;
        let mut count = self.declared_states.unwrap_or(aut.states.len());
        if self.declared_states.is_none() {
            if let Some(max) = aut.start.iter().max() {
                count = count.max(max.saturating_add(1));
            }
        }
        if let Some(state) = aut.start.iter().find(|s| **s >= count) {
            return Err(HoaError::StateOutOfRange {
                state: *state,
                count,
            });
        }
        aut.states.resize_with(count, State::default);
        Ok(aut)
    }
}

/// Splits `name: value` when `name` is a header identifier.
fn split_header(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let is_ident = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    is_ident.then(|| (key, value.trim()))
}

/// Rejects `value >= limit`.
fn bounded(what: &'static str, value: usize, limit: usize) -> Result<(), HoaError> {
    if value < limit {
        Ok(())
    } else {
        Err(HoaError::TooLarge {
            what,
            value,
            max: limit - 1,
        })
    }
}

fn take_number(text: &str) -> Result<(usize, &str), HoaError> {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let number = text[..end]
        .parse()
        .map_err(|_| HoaError::unexpected("integer", text))?;
    Ok((number, text[end..].trim_start()))
}

fn take_quoted(text: &str) -> Result<(String, &str), HoaError> {
    let Some(body) = text.strip_prefix('"') else {
        return Err(HoaError::unexpected("string", text));
    };
    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((pos, ch)) = chars.next() {
        match ch {
            '"' => return Ok((out, body[pos + 1..].trim_start())),
            '\\' => match chars.next() {
                Some((_, escaped)) => out.push(escaped),
                None => break,
            },
            c => out.push(c),
        }
    }
    Err(HoaError::UnterminatedString)
}

fn take_marks(text: &str) -> Result<(Vec<usize>, &str), HoaError> {
    let Some(body) = text.strip_prefix('{') else {
        return Ok((Vec::new(), text));
    };
    let Some((sets, rest)) = body.split_once('}') else {
        return Err(HoaError::unexpected("`}`", body));
    };
    let marks = sets
        .split_whitespace()
        .map(|set| {
            set.parse()
                .map_err(|_| HoaError::unexpected("acceptance set", set))
        })
        .collect::<Result<Vec<usize>, _>>()?;
    Ok((marks, rest.trim_start()))
}

fn expect_end(rest: &str) -> Result<(), HoaError> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(HoaError::unexpected("end of line", rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_STATES: &str = "\
HOA: v1
name: \"GFa\"
States: 2
Start: 0
AP: 1 \"a\"
acc-name: Buchi
Acceptance: 1 Inf(0)
properties: trans-labels explicit-labels
tool: \"test\"
--BODY--
State: 0
[0] 1
[!0] 0
State: 1 \"seen\" {0}
[t] 0
--END--";

    fn feed(
        parser: &mut HoaParser,
        text: &str,
        dict: &ApDictionary,
    ) -> Vec<Result<Option<Automaton>, SyntaxError>> {
        text.lines()
            .enumerate()
            .map(|(n, line)| parser.parse_line(line, n + 1, dict))
            .collect()
    }

    fn parse_one(text: &str, options: ParseOptions) -> Result<Option<Automaton>, SyntaxError> {
        let dict = ApDictionary::new();
        let mut parser = HoaParser::open("test", &options);
        let mut last = None;
        for (n, line) in text.lines().enumerate() {
            if let Some(aut) = parser.parse_line(line, n + 1, &dict)? {
                last = Some(aut);
            }
        }
        if let Some(aut) = parser.finish(&dict)? {
            last = Some(aut);
        }
        Ok(last)
    }

    #[test]
    fn reads_headers_and_body() {
        let aut = parse_one(TWO_STATES, ParseOptions::default()).unwrap().unwrap();
        assert_eq!(aut.name.as_deref(), Some("GFa"));
        assert_eq!(aut.num_states(), 2);
        assert_eq!(aut.num_edges(), 3);
        assert_eq!(aut.start, vec![0]);
        assert_eq!(aut.aps, vec!["a"]);
        assert_eq!(aut.acceptance, "Inf(0)");
        assert_eq!(aut.properties, vec!["trans-labels", "explicit-labels"]);
        assert_eq!(
            aut.extra_headers,
            vec![("tool".to_string(), "\"test\"".to_string())]
        );
        assert_eq!(aut.states[1].name.as_deref(), Some("seen"));
        assert_eq!(aut.states[1].marks, vec![0]);
        assert!(aut.is_state_based());
        assert!(aut.is_accepting_state(1));
        assert!(!aut.is_accepting_state(0));
    }

    #[test]
    fn automaton_is_emitted_on_its_end_line() {
        let dict = ApDictionary::new();
        let mut parser = HoaParser::open("test", &ParseOptions::default());
        let results = feed(&mut parser, TWO_STATES, &dict);
        let emitted: Vec<usize> = results
            .iter()
            .enumerate()
            .filter(|(_, r)| matches!(r, Ok(Some(_))))
            .map(|(n, _)| n + 1)
            .collect();
        assert_eq!(emitted, vec![TWO_STATES.lines().count()]);
        assert_eq!(dict.lookup("a"), Some(0));
    }

    #[test]
    fn missing_hoa_header_is_reported_with_location() {
        let err = parse_one("States: 1\n", ParseOptions::default()).unwrap_err();
        assert_eq!(err.provenance, "test");
        assert_eq!(err.line_number, 1);
        assert!(err.message.contains("HOA:"));
    }

    #[test]
    fn undefined_proposition_is_a_syntax_error() {
        let text = TWO_STATES.replace("[t] 0", "[1] 0");
        let err = parse_one(&text, ParseOptions::default()).unwrap_err();
        assert_eq!(err.line_number, 15);
        assert!(err.message.contains("proposition 1"));
    }

    #[test]
    fn state_beyond_declared_count_is_rejected() {
        let text = TWO_STATES.replace("[0] 1", "[0] 2");
        let err = parse_one(&text, ParseOptions::default()).unwrap_err();
        assert_eq!(err.line_number, 12);
        assert!(err.message.contains("out of range"));
    }

    #[test]
    fn eof_inside_an_automaton_is_unterminated() {
        let text = TWO_STATES.replace("--END--", "");
        let err = parse_one(&text, ParseOptions::default()).unwrap_err();
        assert!(err.message.contains("--END--"));
    }

    #[test]
    fn abort_is_skipped_or_reported() {
        let text = format!("HOA: v1\nStates: 1\n--ABORT--\n{TWO_STATES}\n");
        let skipped = parse_one(&text, ParseOptions::default()).unwrap().unwrap();
        assert_eq!(skipped.name.as_deref(), Some("GFa"));

        let strict = ParseOptions {
            ignore_abort: false,
            ..ParseOptions::default()
        };
        let err = parse_one(&text, strict).unwrap_err();
        assert_eq!(err.line_number, 3);
        assert!(err.message.contains("ABORT"));
    }

    #[test]
    fn duplicate_headers_and_states_are_rejected() {
        let text = TWO_STATES.replace("States: 2", "States: 2\nStates: 2");
        assert!(parse_one(&text, ParseOptions::default()).is_err());
        let text = TWO_STATES.replace("State: 1 \"seen\"", "State: 0 \"seen\"");
        assert!(parse_one(&text, ParseOptions::default()).is_err());
    }

    #[test]
    fn ap_count_must_match_names() {
        let text = TWO_STATES.replace("AP: 1 \"a\"", "AP: 2 \"a\"");
        let err = parse_one(&text, ParseOptions::default()).unwrap_err();
        assert!(err.message.contains("announces 2"));
    }

    #[test]
    fn quoted_strings_handle_escapes() {
        assert_eq!(
            take_quoted(r#""a \"b\" \\ c" rest"#).unwrap(),
            ("a \"b\" \\ c".to_string(), "rest")
        );
        assert_eq!(take_quoted("\"open"), Err(HoaError::UnterminatedString));
    }

    #[test]
    fn states_header_is_optional() {
        let text = "HOA: v1\nStart: 0\nAP: 0\nAcceptance: 0 t\n--BODY--\nState: 0\n[t] 1\nState: 1\n[t] 1\n--END--\n";
        let aut = parse_one(text, ParseOptions::default()).unwrap().unwrap();
        assert_eq!(aut.num_states(), 2);
        assert!(aut.is_generalized_buchi());
    }

    #[test]
    fn oversized_state_ids_are_rejected_without_a_states_header() {
        let body = "HOA: v1\nAP: 0\nAcceptance: 0 t\n--BODY--\n";
        for line in [
            "State: 18446744073709551615".to_string(),
            format!("State: {MAX_STATES}"),
            "State: 0\n[t] 18446744073709551615".to_string(),
        ] {
            let text = format!("{body}{line}\n--END--\n");
            let err = parse_one(&text, ParseOptions::default()).unwrap_err();
            assert!(err.message.contains("supported maximum"), "{}", err.message);
        }

        let text = format!("{body}State: 999\n--END--\n");
        let aut = parse_one(&text, ParseOptions::default()).unwrap().unwrap();
        assert_eq!(aut.num_states(), 1000);
    }

    #[test]
    fn oversized_headers_are_rejected() {
        for header in [
            "States: 18446744073709551615",
            "Start: 18446744073709551615",
        ] {
            let text = format!("HOA: v1\n{header}\n");
            let err = parse_one(&text, ParseOptions::default()).unwrap_err();
            assert_eq!(err.line_number, 2);
            assert!(err.message.contains("supported maximum"), "{}", err.message);
        }

        let text = "HOA: v1\nAP: 18446744073709551615 \"a\"\n";
        let err = parse_one(text, ParseOptions::default()).unwrap_err();
        assert!(err.message.contains("lists 1"));
    }
}
