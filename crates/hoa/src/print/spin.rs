use autstream::{FormatError, OutputFormat};

use crate::automaton::Automaton;
use crate::label::LabelStyle;

fn unsupported(reason: &str) -> FormatError {
    FormatError::unsupported(OutputFormat::Spin, reason)
}

/// Never claim for a state-based Büchi automaton with one initial state.
pub(crate) fn render(aut: &Automaton) -> Result<String, FormatError> {
    if aut.acceptance_sets > 1 || !aut.is_generalized_buchi() {
        return Err(unsupported("acceptance other than Büchi"));
    }
    if !aut.is_state_based() {
        return Err(unsupported("transition-based acceptance"));
    }
    let Some(init) = aut.initial_state() else {
        return Err(unsupported("zero or several initial states"));
    };

    let state_label = |id: usize| {
        let prefix = if aut.is_accepting_state(id) {
            "accept"
        } else {
            "T0"
        };
        if id == init {
            format!("{prefix}_init")
        } else {
            format!("{prefix}_S{id}")
        }
    };

    let mut lines = vec![match &aut.name {
        Some(name) => format!("never {{ /* {name} */"),
        None => "never {".to_string(),
    }];
    let order = std::iter::once(init).chain((0..aut.num_states()).filter(|id| *id != init));
    for id in order {
        lines.push(format!("{}:", state_label(id)));
        let edges = &aut.states[id].edges;
        if edges.is_empty() {
            lines.push("  false;".to_string());
            continue;
        }
        lines.push("  if".to_string());
        for edge in edges {
            let mut guard = edge.label.render(LabelStyle::Spin, &aut.aps);
            if !guard.starts_with('(') {
                guard = format!("({guard})");
            }
            lines.push(format!("  :: {guard} -> goto {}", state_label(edge.dst)));
        }
        lines.push("  fi;".to_string());
    }
    lines.push("}".to_string());
    Ok(lines.join("\n"))
}
