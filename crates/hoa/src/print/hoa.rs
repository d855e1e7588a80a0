use super::{marks, quote};
use crate::automaton::Automaton;
use crate::label::LabelStyle;

pub(crate) fn render(aut: &Automaton) -> String {
    let mut lines = vec!["HOA: v1".to_string()];
    if let Some(name) = &aut.name {
        lines.push(format!("name: {}", quote(name)));
    }
    lines.push(format!("States: {}", aut.num_states()));
    for start in &aut.start {
        lines.push(format!("Start: {start}"));
    }
    let mut ap = format!("AP: {}", aut.aps.len());
    for name in &aut.aps {
        ap.push(' ');
        ap.push_str(&quote(name));
    }
    lines.push(ap);
    if let Some(acc_name) = &aut.acc_name {
        lines.push(format!("acc-name: {acc_name}"));
    }
    lines.push(format!("Acceptance: {} {}", aut.acceptance_sets, aut.acceptance));
    if !aut.properties.is_empty() {
        lines.push(format!("properties: {}", aut.properties.join(" ")));
    }
    for (header, value) in &aut.extra_headers {
        lines.push(format!("{header}: {value}"));
    }

    lines.push("--BODY--".to_string());
    for (id, state) in aut.states.iter().enumerate() {
        let mut line = format!("State: {id}");
        if let Some(name) = &state.name {
            line.push(' ');
            line.push_str(&quote(name));
        }
        if !state.marks.is_empty() {
            line.push(' ');
            line.push_str(&marks(&state.marks));
        }
        lines.push(line);
        for edge in &state.edges {
            let mut line = format!(
                "[{}] {}",
                edge.label.render(LabelStyle::Hoa, &aut.aps),
                edge.dst
            );
            if !edge.marks.is_empty() {
                line.push(' ');
                line.push_str(&marks(&edge.marks));
            }
            lines.push(line);
        }
    }
    lines.push("--END--".to_string());
    lines.join("\n")
}
