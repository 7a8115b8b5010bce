//! Declarative filter engine for privacy-preserving export
//!
//! The engine takes a flat list of [`Rule`] descriptors at construction
//! and partitions them once into person-value rules, inclusion rules, and
//! exclusion rules. [`FilterEngine::filter`] narrows a Source → Table →
//! Column hierarchy structurally; [`persons::select_persons`] classifies
//! individual persons by row content and persists the verdicts to the
//! [`ledger::PersonLedger`].

pub mod ledger;
pub mod matching;
pub mod persons;
pub mod structural;

pub use ledger::{PersonLedger, PersonStatus, VerdictEntry};
pub use matching::Rule;

use crate::schema::Source;
use structural::{apply_exclusion, apply_inclusion};

/// Rule engine holding the classified rule set.
///
/// Classification happens once here; `filter` and person selection are
/// pure with respect to the stored rules.
#[derive(Debug, Clone, Default)]
pub struct FilterEngine {
    inclusive: bool,
    person_rules: Vec<Rule>,
    inclusions: Vec<Rule>,
    exclusions: Vec<Rule>,
}

impl FilterEngine {
    /// Build an engine from flat rule descriptors.
    ///
    /// A descriptor with `value` set is a person-value rule regardless of
    /// its other fields. Otherwise it is an inclusion rule iff its
    /// `reverse` flag differs from `inclusive` (non-inclusive mode: plain
    /// rules exclude, reversed rules include; inclusive mode flips this to
    /// an allow-list default). Descriptors constraining none of
    /// source/table/column are skipped silently.
    pub fn new(rules: Vec<Rule>, inclusive: bool) -> Self {
        let mut engine = Self {
            inclusive,
            ..Self::default()
        };
        for rule in rules {
            if !rule.targets_hierarchy() {
                tracing::debug!(?rule, "skipping rule without source/table/column");
                continue;
            }
            if rule.value.is_some() {
                engine.person_rules.push(rule);
            } else if rule.reverse != engine.inclusive {
                engine.inclusions.push(rule);
            } else {
                engine.exclusions.push(rule);
            }
        }
        engine
    }

    /// Whether any person-value rules were supplied
    pub fn has_person_rules(&self) -> bool {
        !self.person_rules.is_empty()
    }

    /// The classified person-value rules, in supplied order
    pub fn person_rules(&self) -> &[Rule] {
        &self.person_rules
    }

    /// The classified inclusion rules, in supplied order
    pub fn inclusions(&self) -> &[Rule] {
        &self.inclusions
    }

    /// The classified exclusion rules, in supplied order
    pub fn exclusions(&self) -> &[Rule] {
        &self.exclusions
    }

    /// Narrow a hierarchy through the ordered inclusion rules, then the
    /// ordered exclusion rules.
    ///
    /// Each rule operates on the previous rule's output: inclusions
    /// cascade (intersect), and exclusions chip away at the cascaded
    /// result. The input is never mutated.
    pub fn filter(&self, sources: &[Source]) -> Vec<Source> {
        let mut out = sources.to_vec();
        for rule in &self.inclusions {
            out = apply_inclusion(rule, &out);
        }
        for rule in &self.exclusions {
            out = apply_exclusion(rule, &out);
        }
        out
    }
}
