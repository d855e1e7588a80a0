use super::{marks, quote};
use crate::automaton::Automaton;
use crate::label::LabelStyle;

pub(crate) fn render(aut: &Automaton) -> String {
    let mut lines = vec![
        format!("digraph {} {{", quote(aut.name.as_deref().unwrap_or(""))),
        "  rankdir=LR".to_string(),
        "  node [shape=\"circle\"]".to_string(),
    ];
    for (n, start) in aut.start.iter().enumerate() {
        lines.push(format!("  I{n} [label=\"\", style=invis, width=0]"));
        lines.push(format!("  I{n} -> {start}"));
    }
    for (id, state) in aut.states.iter().enumerate() {
        let label = state.name.clone().unwrap_or_else(|| id.to_string());
        let mut attrs = format!("label={}", quote(&label));
        if aut.is_accepting_state(id) {
            attrs.push_str(", shape=\"doublecircle\"");
        }
        lines.push(format!("  {id} [{attrs}]"));
    }
    for (id, state) in aut.states.iter().enumerate() {
        for edge in &state.edges {
            let mut label = edge.label.render(LabelStyle::Dot, &aut.aps);
            if !edge.marks.is_empty() {
                label.push('\n');
                label.push_str(&marks(&edge.marks));
            }
            lines.push(format!(
                "  {id} -> {} [label={}]",
                edge.dst,
                quote(&label).replace('\n', "\\n")
            ));
        }
    }
    lines.push("}".to_string());
    lines.join("\n")
}
