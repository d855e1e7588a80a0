use autstream::{AutomatonText, FormatError, OutputFormat};

use crate::label::Label;
use crate::print;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub label: Label,
    pub dst: usize,
    pub marks: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct State {
    pub name: Option<String>,
    pub marks: Vec<usize>,
    pub edges: Vec<Edge>,
}

/// An explicit automaton as read from one HOA record.
///
/// Acceptance is kept as text; only the shapes needed by the printers are
/// recognized.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Automaton {
    pub name: Option<String>,
    pub aps: Vec<String>,
    /// Dictionary variables of `aps`, position for position.
    pub ap_vars: Vec<usize>,
    pub start: Vec<usize>,
    pub acc_name: Option<String>,
    pub acceptance_sets: usize,
    pub acceptance: String,
    pub properties: Vec<String>,
    /// Header items this reader does not interpret, as `(name, value)`.
    pub extra_headers: Vec<(String, String)>,
    pub states: Vec<State>,
}

impl Automaton {
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_edges(&self) -> usize {
        self.states.iter().map(|s| s.edges.len()).sum()
    }

    /// The single initial state, if there is exactly one.
    pub fn initial_state(&self) -> Option<usize> {
        match self.start.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// True when no edge carries acceptance marks.
    pub fn is_state_based(&self) -> bool {
        self.states
            .iter()
            .all(|s| s.edges.iter().all(|e| e.marks.is_empty()))
    }

    /// True for `t` with no sets, or `Inf(0)&Inf(1)&...` over every set.
    pub fn is_generalized_buchi(&self) -> bool {
        let condition: String = self
            .acceptance
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if self.acceptance_sets == 0 {
            return condition == "t";
        }
        let expected: Vec<String> = (0..self.acceptance_sets)
            .map(|set| format!("Inf({set})"))
            .collect();
        condition == expected.join("&")
    }

    /// Whether `state` belongs to every acceptance set by its own marks.
    pub fn is_accepting_state(&self, state: usize) -> bool {
        let Some(state) = self.states.get(state) else {
            return false;
        };
        if self.acceptance_sets == 0 {
            return self.is_generalized_buchi();
        }
        (0..self.acceptance_sets).all(|set| state.marks.contains(&set))
    }

    /// Marks carried by an edge, including those of its source state.
    pub(crate) fn edge_marks(&self, state: &State, edge: &Edge) -> Vec<usize> {
        let mut marks: Vec<usize> = state.marks.iter().chain(&edge.marks).copied().collect();
        marks.sort_unstable();
        marks.dedup();
        marks
    }
}

impl AutomatonText for Automaton {
    fn to_text(&self, format: OutputFormat) -> Result<String, FormatError> {
        match format {
            OutputFormat::Hoa => Ok(print::hoa::render(self)),
            OutputFormat::Dot => Ok(print::dot::render(self)),
            OutputFormat::Spin => print::spin::render(self),
            OutputFormat::Lbtt => print::lbtt::render(self),
        }
    }
}
