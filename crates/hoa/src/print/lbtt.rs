use autstream::{FormatError, OutputFormat};

use crate::automaton::Automaton;
use crate::label::LabelStyle;

fn unsupported(reason: &str) -> FormatError {
    FormatError::unsupported(OutputFormat::Lbtt, reason)
}

fn push_sets(line: &mut String, sets: &[usize]) {
    for set in sets {
        line.push(' ');
        line.push_str(&set.to_string());
    }
    line.push_str(" -1");
}

/// LBTT text for a generalized Büchi automaton.
///
/// Automata without edge marks use the state-based dialect (`N M`), others
/// the transition-based one (`N Mt`) with state marks pushed onto edges.
pub(crate) fn render(aut: &Automaton) -> Result<String, FormatError> {
    if !aut.is_generalized_buchi() {
        return Err(unsupported("acceptance other than generalized Büchi"));
    }
    let Some(init) = aut.initial_state() else {
        return Err(unsupported("zero or several initial states"));
    };

    let state_based = aut.is_state_based();
    let suffix = if state_based { "" } else { "t" };
    let mut lines = vec![format!(
        "{} {}{suffix}",
        aut.num_states(),
        aut.acceptance_sets
    )];
    for (id, state) in aut.states.iter().enumerate() {
        let mut line = format!("{id} {}", u8::from(id == init));
        if state_based {
            push_sets(&mut line, &state.marks);
        }
        lines.push(line);
        for edge in &state.edges {
            let guard = edge.label.render(LabelStyle::Lbtt, &aut.aps);
            if state_based {
                lines.push(format!("{} {guard}", edge.dst));
            } else {
                let mut line = edge.dst.to_string();
                push_sets(&mut line, &aut.edge_marks(state, edge));
                line.push(' ');
                line.push_str(&guard);
                lines.push(line);
            }
        }
        lines.push("-1".to_string());
    }
    Ok(lines.join("\n"))
}
