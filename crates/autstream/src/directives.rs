//! Free-form keyword directives for the post-processing stage.
//!
//! Directives are matched case-insensitively against an explicit
//! [`DirectiveRegistry`]; any unique prefix of a registered keyword is accepted
//! as an abbreviation (`"det"` for `"deterministic"`).

use std::fmt;

use crate::error::{DirectiveError, Slot};

/// Kind of automaton the post-processor should produce.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum AutomatonType {
    Generic,
    Tgba,
    Ba,
    Monitor,
}

impl AutomatonType {
    pub const fn as_str(self) -> &'static str {
        match self {
            AutomatonType::Generic => "generic",
            AutomatonType::Tgba => "tgba",
            AutomatonType::Ba => "ba",
            AutomatonType::Monitor => "monitor",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub enum Preference {
    #[default]
    Small,
    Deterministic,
    Any,
}

impl Preference {
    pub const fn as_str(self) -> &'static str {
        match self {
            Preference::Small => "small",
            Preference::Deterministic => "deterministic",
            Preference::Any => "any",
        }
    }

    const fn bits(self) -> u32 {
        match self {
            Preference::Any => PREF_ANY,
            Preference::Small => PREF_SMALL,
            Preference::Deterministic => PREF_DETERMINISTIC,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub enum OptimizationLevel {
    Low,
    Medium,
    #[default]
    High,
}

impl OptimizationLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            OptimizationLevel::Low => "low",
            OptimizationLevel::Medium => "medium",
            OptimizationLevel::High => "high",
        }
    }
}

pub const PREF_ANY: u32 = 0;
pub const PREF_SMALL: u32 = 1;
pub const PREF_DETERMINISTIC: u32 = 2;
pub const PREF_COMPLETE: u32 = 4;
pub const PREF_SBACC: u32 = 8;
pub const PREF_UNAMBIGUOUS: u32 = 16;

/// Orthogonal output requirements; any combination may be requested.
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct OutputFlags(u8);

impl OutputFlags {
    pub const NONE: OutputFlags = OutputFlags(0);
    pub const COMPLETE: OutputFlags = OutputFlags(1);
    pub const UNAMBIGUOUS: OutputFlags = OutputFlags(1 << 1);
    pub const STATE_BASED_ACCEPTANCE: OutputFlags = OutputFlags(1 << 2);

    const NAMED: [(OutputFlags, &'static str); 3] = [
        (OutputFlags::COMPLETE, "complete"),
        (OutputFlags::UNAMBIGUOUS, "unambiguous"),
        (OutputFlags::STATE_BASED_ACCEPTANCE, "statebasedacceptance"),
    ];

    pub const fn contains(self, other: OutputFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: OutputFlags) -> OutputFlags {
        OutputFlags(self.0 | other.0)
    }

    pub fn insert(&mut self, other: OutputFlags) {
        self.0 |= other.0;
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    const fn bits(self) -> u32 {
        let mut bits = 0;
        if self.contains(OutputFlags::COMPLETE) {
            bits |= PREF_COMPLETE;
        }
        if self.contains(OutputFlags::UNAMBIGUOUS) {
            bits |= PREF_UNAMBIGUOUS;
        }
        if self.contains(OutputFlags::STATE_BASED_ACCEPTANCE) {
            bits |= PREF_SBACC;
        }
        bits
    }
}

impl fmt::Debug for OutputFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = OutputFlags::NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name);
        f.debug_set().entries(names).finish()
    }
}

/// What a registered keyword does when it is selected.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Directive {
    Type(AutomatonType),
    Preference(Preference),
    Optimization(OptimizationLevel),
    Flag(OutputFlags),
}

/// Ordered keyword table. Registration order fixes the order of the
/// candidates reported by [`DirectiveError::Ambiguous`].
#[derive(Debug, Clone, Default)]
pub struct DirectiveRegistry {
    entries: Vec<(String, Directive)>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The keywords understood by `translate`/`postprocess` style callers.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for ty in [
            AutomatonType::Tgba,
            AutomatonType::Ba,
            AutomatonType::Monitor,
            AutomatonType::Generic,
        ] {
            registry.register(ty.as_str(), Directive::Type(ty));
        }
        for pref in [Preference::Small, Preference::Deterministic, Preference::Any] {
            registry.register(pref.as_str(), Directive::Preference(pref));
        }
        for level in [
            OptimizationLevel::High,
            OptimizationLevel::Medium,
            OptimizationLevel::Low,
        ] {
            registry.register(level.as_str(), Directive::Optimization(level));
        }
        registry
            .register("complete", Directive::Flag(OutputFlags::COMPLETE))
            .register("unambiguous", Directive::Flag(OutputFlags::UNAMBIGUOUS))
            .register(
                "statebasedacceptance",
                Directive::Flag(OutputFlags::STATE_BASED_ACCEPTANCE),
            )
            .register("sbacc", Directive::Flag(OutputFlags::STATE_BASED_ACCEPTANCE));
        registry
    }

    /// Adds `keyword` (stored lowercase). An existing entry with the same
    /// keyword is replaced in place.
    pub fn register(&mut self, keyword: impl Into<String>, directive: Directive) -> &mut Self {
        let keyword = keyword.into().to_lowercase();
        match self.entries.iter_mut().find(|(k, _)| *k == keyword) {
            Some(entry) => entry.1 = directive,
            None => self.entries.push((keyword, directive)),
        }
        self
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Resolves one directive to its registered keyword, by exact match first
    /// and unique prefix second.
    pub fn resolve(&self, directive: &str) -> Result<(&str, Directive), DirectiveError> {
        let lowered = directive.to_lowercase();
        if let Some((keyword, d)) = self.entries.iter().find(|(k, _)| *k == lowered) {
            return Ok((keyword.as_str(), *d));
        }

        let mut matches = self.entries.iter().filter(|(k, _)| k.starts_with(&lowered));
        match (matches.next(), matches.next()) {
            (Some((keyword, d)), None) => Ok((keyword.as_str(), *d)),
            (None, _) => Err(DirectiveError::Unknown(lowered)),
            (Some(_), Some(_)) => Err(DirectiveError::Ambiguous {
                candidates: self
                    .entries
                    .iter()
                    .filter(|(k, _)| k.starts_with(&lowered))
                    .map(|(k, _)| k.clone())
                    .collect(),
                directive: lowered,
            }),
        }
    }

    /// Parses `directives` into a configuration, filling unset slots with
    /// `default_type`, [`Preference::Small`] and [`OptimizationLevel::High`].
    pub fn parse<I, S>(
        &self,
        default_type: AutomatonType,
        directives: I,
    ) -> Result<PostprocessConfig, DirectiveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pending = PendingConfig::default();
        for directive in directives {
            let (_, resolved) = self.resolve(directive.as_ref())?;
            pending.apply(resolved)?;
        }
        Ok(pending.finish(default_type))
    }
}

#[derive(Debug, Default)]
struct PendingConfig {
    automaton_type: Option<AutomatonType>,
    preference: Option<Preference>,
    optimization: Option<OptimizationLevel>,
    flags: OutputFlags,
}

impl PendingConfig {
    fn apply(&mut self, directive: Directive) -> Result<(), DirectiveError> {
        match directive {
            Directive::Type(ty) => {
                assign_once(&mut self.automaton_type, ty, Slot::Type, AutomatonType::as_str)
            }
            Directive::Preference(pref) => {
                assign_once(&mut self.preference, pref, Slot::Preference, Preference::as_str)
            }
            Directive::Optimization(level) => assign_once(
                &mut self.optimization,
                level,
                Slot::Optimization,
                OptimizationLevel::as_str,
            ),
            Directive::Flag(flag) => {
                self.flags.insert(flag);
                Ok(())
            }
        }
    }

    fn finish(self, default_type: AutomatonType) -> PostprocessConfig {
        PostprocessConfig {
            automaton_type: self.automaton_type.unwrap_or(default_type),
            preference: self.preference.unwrap_or_default(),
            optimization: self.optimization.unwrap_or_default(),
            flags: self.flags,
        }
    }
}

fn assign_once<T: Copy + Eq>(
    slot: &mut Option<T>,
    value: T,
    which: Slot,
    name: fn(T) -> &'static str,
) -> Result<(), DirectiveError> {
    match *slot {
        Some(current) if current != value => Err(DirectiveError::Conflicting {
            slot: which,
            first: name(current),
            second: name(value),
        }),
        _ => {
            *slot = Some(value);
            Ok(())
        }
    }
}

/// Structured result of parsing post-processing directives.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct PostprocessConfig {
    pub automaton_type: AutomatonType,
    pub preference: Preference,
    pub optimization: OptimizationLevel,
    pub flags: OutputFlags,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            automaton_type: AutomatonType::Generic,
            preference: Preference::default(),
            optimization: OptimizationLevel::default(),
            flags: OutputFlags::NONE,
        }
    }
}

impl PostprocessConfig {
    /// Directives for post-processing an existing automaton; the type defaults
    /// to [`AutomatonType::Generic`].
    pub fn parse<I, S>(directives: I) -> Result<Self, DirectiveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::parse_with_default(AutomatonType::Generic, directives)
    }

    /// Directives for translating a formula; the type defaults to
    /// [`AutomatonType::Tgba`].
    pub fn for_translation<I, S>(directives: I) -> Result<Self, DirectiveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::parse_with_default(AutomatonType::Tgba, directives)
    }

    pub fn parse_with_default<I, S>(
        default_type: AutomatonType,
        directives: I,
    ) -> Result<Self, DirectiveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        DirectiveRegistry::standard().parse(default_type, directives)
    }

    /// Preference combined with the output flags, as one `PREF_*` bit mask.
    pub const fn preference_bits(&self) -> u32 {
        self.preference.bits() | self.flags.bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_defaults() {
        let config = PostprocessConfig::parse(Vec::<&str>::new()).unwrap();
        assert_eq!(config, PostprocessConfig::default());
        assert_eq!(config.preference_bits(), PREF_SMALL);

        let translation = PostprocessConfig::for_translation(Vec::<&str>::new()).unwrap();
        assert_eq!(translation.automaton_type, AutomatonType::Tgba);
    }

    #[test]
    fn matching_is_case_insensitive_and_accepts_prefixes() {
        let config = PostprocessConfig::parse(["BA", "det", "Med", "SBAcc", "comp"]).unwrap();
        assert_eq!(config.automaton_type, AutomatonType::Ba);
        assert_eq!(config.preference, Preference::Deterministic);
        assert_eq!(config.optimization, OptimizationLevel::Medium);
        assert!(config.flags.contains(OutputFlags::STATE_BASED_ACCEPTANCE));
        assert!(config.flags.contains(OutputFlags::COMPLETE));
        assert!(!config.flags.contains(OutputFlags::UNAMBIGUOUS));
        assert_eq!(
            config.preference_bits(),
            PREF_DETERMINISTIC | PREF_COMPLETE | PREF_SBACC
        );
    }

    #[test]
    fn exact_match_wins_over_longer_keywords() {
        let config = PostprocessConfig::parse(["ba"]).unwrap();
        assert_eq!(config.automaton_type, AutomatonType::Ba);

        let mut registry = DirectiveRegistry::standard();
        registry.register("smallest", Directive::Optimization(OptimizationLevel::Low));
        let config = registry.parse(AutomatonType::Generic, ["small"]).unwrap();
        assert_eq!(config.preference, Preference::Small);
    }

    #[test]
    fn repeated_identical_values_are_accepted_in_any_order() {
        let a = PostprocessConfig::parse(["tgba", "small", "low", "tgba", "unambiguous"]).unwrap();
        let b = PostprocessConfig::parse(["unambiguous", "low", "TGBA", "small", "small"]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.automaton_type, AutomatonType::Tgba);
        assert_eq!(a.optimization, OptimizationLevel::Low);
    }

    #[test]
    fn different_values_for_one_slot_conflict() {
        let err = PostprocessConfig::parse(["small", "deterministic"]).unwrap_err();
        assert_eq!(
            err,
            DirectiveError::Conflicting {
                slot: Slot::Preference,
                first: "small",
                second: "deterministic",
            }
        );
        assert_eq!(
            err.to_string(),
            "preference cannot be both small and deterministic"
        );

        assert!(matches!(
            PostprocessConfig::parse(["ba", "monitor"]),
            Err(DirectiveError::Conflicting {
                slot: Slot::Type,
                ..
            })
        ));
        assert!(matches!(
            PostprocessConfig::parse(["high", "lo"]),
            Err(DirectiveError::Conflicting {
                slot: Slot::Optimization,
                ..
            })
        ));
    }

    #[test]
    fn unknown_directive_names_the_input() {
        let err = PostprocessConfig::parse(["small", "tiny"]).unwrap_err();
        assert_eq!(err, DirectiveError::Unknown("tiny".to_string()));
        assert_eq!(err.to_string(), "unknown option 'tiny'");
    }

    #[test]
    fn shared_prefix_is_ambiguous_and_lists_candidates() {
        let mut registry = DirectiveRegistry::standard();
        registry.register("comprehensive", Directive::Optimization(OptimizationLevel::High));

        let err = registry.parse(AutomatonType::Generic, ["comp"]).unwrap_err();
        assert_eq!(
            err,
            DirectiveError::Ambiguous {
                directive: "comp".to_string(),
                candidates: vec!["complete".to_string(), "comprehensive".to_string()],
            }
        );

        // Long enough to disambiguate.
        let config = registry.parse(AutomatonType::Generic, ["compl"]).unwrap();
        assert!(config.flags.contains(OutputFlags::COMPLETE));
    }

    #[test]
    fn standard_registry_has_ambiguous_single_letters() {
        let err = PostprocessConfig::parse(["s"]).unwrap_err();
        match err {
            DirectiveError::Ambiguous { candidates, .. } => {
                assert_eq!(candidates, vec!["small", "statebasedacceptance", "sbacc"]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn re_registering_replaces_entry() {
        let mut registry = DirectiveRegistry::new();
        registry
            .register("fast", Directive::Optimization(OptimizationLevel::Low))
            .register("FAST", Directive::Optimization(OptimizationLevel::Medium));
        assert_eq!(registry.keywords().collect::<Vec<_>>(), vec!["fast"]);
        let config = registry.parse(AutomatonType::Ba, ["fast"]).unwrap();
        assert_eq!(config.optimization, OptimizationLevel::Medium);
        assert_eq!(config.automaton_type, AutomatonType::Ba);
    }

    #[test]
    fn flags_debug_lists_names() {
        let flags = OutputFlags::COMPLETE.union(OutputFlags::UNAMBIGUOUS);
        assert_eq!(format!("{flags:?}"), "{\"complete\", \"unambiguous\"}");
        assert!(OutputFlags::NONE.is_empty());
    }
}
