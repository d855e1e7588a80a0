pub(crate) mod dot;
pub(crate) mod hoa;
pub(crate) mod lbtt;
pub(crate) mod spin;

/// Double-quoted string with `\` and `"` escaped.
pub(crate) fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        if matches!(ch, '"' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

/// `{0 1}` style mark set, or an empty string without marks.
pub(crate) fn marks(marks: &[usize]) -> String {
    if marks.is_empty() {
        return String::new();
    }
    let sets: Vec<String> = marks.iter().map(ToString::to_string).collect();
    format!("{{{}}}", sets.join(" "))
}

#[cfg(test)]
mod tests {
    use autstream::{
        ApDictionary, AutomatonParser, AutomatonText, FormatError, OutputFormat, ParseOptions,
    };

    use crate::{Automaton, HoaParser};

    fn parse(text: &str) -> Automaton {
        let dict = ApDictionary::new();
        let mut parser = HoaParser::open("test", &ParseOptions::default());
        for (n, line) in text.lines().enumerate() {
            if let Some(aut) = parser.parse_line(line, n + 1, &dict).unwrap() {
                return aut;
            }
        }
        panic!("no automaton in test input");
    }

    const BUCHI: &str = "\
HOA: v1
name: \"a U b\"
States: 2
Start: 0
AP: 2 \"a\" \"b\"
Acceptance: 1 Inf(0)
--BODY--
State: 0
[0&!1] 0
[1] 1
State: 1 {0}
[t] 1
--END--";

    const TGBA: &str = "\
HOA: v1
States: 1
Start: 0
AP: 2 \"p0\" \"go\"
Acceptance: 2 Inf(0)&Inf(1)
--BODY--
State: 0
[0] 0 {0}
[!0 & 1] 0 {1}
--END--";

    #[test]
    fn hoa_output_reparses_to_the_same_automaton() {
        let aut = parse(BUCHI);
        let text = aut.to_text(OutputFormat::Hoa).unwrap();
        assert!(text.starts_with("HOA: v1\nname: \"a U b\"\n"));
        assert!(text.contains("State: 1 {0}\n[t] 1\n--END--"));
        let mut again = parse(&text);
        again.ap_vars.clone_from(&aut.ap_vars);
        assert_eq!(again, aut);
    }

    #[test]
    fn dot_uses_names_and_double_circles() {
        let text = parse(BUCHI).to_text(OutputFormat::Dot).unwrap();
        assert!(text.starts_with("digraph \"a U b\" {"));
        assert!(text.contains("  I0 -> 0"));
        assert!(text.contains("  1 [label=\"1\", shape=\"doublecircle\"]"));
        assert!(text.contains("  0 -> 0 [label=\"a & !b\"]"));
        assert!(text.ends_with('}'));
    }

    #[test]
    fn spin_never_claim_for_state_based_buchi() {
        let text = parse(BUCHI).to_text(OutputFormat::Spin).unwrap();
        let expected = "\
never { /* a U b */
T0_init:
  if
  :: (a && !b) -> goto T0_init
  :: (b) -> goto accept_S1
  fi;
accept_S1:
  if
  :: (1) -> goto accept_S1
  fi;
}";
        assert_eq!(text, expected);
    }

    #[test]
    fn spin_rejects_generalized_acceptance() {
        let err = parse(TGBA).to_text(OutputFormat::Spin).unwrap_err();
        assert!(matches!(
            err,
            FormatError::Unsupported {
                format: OutputFormat::Spin,
                ..
            }
        ));
    }

    #[test]
    fn lbtt_state_based() {
        let text = parse(BUCHI).to_text(OutputFormat::Lbtt).unwrap();
        let expected = "\
2 1
0 1 -1
0 & \"a\" ! \"b\"
1 \"b\"
-1
1 0 0 -1
1 t
-1";
        assert_eq!(text, expected);
    }

    #[test]
    fn lbtt_transition_based() {
        let text = parse(TGBA).to_text_named("LBTT").unwrap();
        let expected = "\
1 2t
0 1
0 0 -1 p0
0 1 -1 & ! p0 \"go\"
-1";
        assert_eq!(text, expected);
    }

    #[test]
    fn lbtt_requires_a_single_initial_state() {
        let text = BUCHI.replace("Start: 0", "Start: 0\nStart: 1");
        let err = parse(&text).to_text(OutputFormat::Lbtt).unwrap_err();
        assert!(err.to_string().contains("initial states"));
    }

    #[test]
    fn marks_and_quotes() {
        assert_eq!(super::marks(&[]), "");
        assert_eq!(super::marks(&[0, 2]), "{0 2}");
        assert_eq!(super::quote("a\"b"), "\"a\\\"b\"");
    }
}
