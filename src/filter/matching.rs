//! Rule descriptors and match predicates
//!
//! A rule descriptor targets any subset of the hierarchy's levels
//! independently: unset fields always match (vacuous truth).

use crate::schema::{Column, Source, Table};
use serde::{Deserialize, Serialize};

/// A caller-supplied matching rule, before classification.
///
/// Supplied from configuration or the CLI; the engine validates nothing
/// beyond the matching and classification semantics below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Source id to match exactly; unset matches every source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Table match string; unset matches every table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// Match `table` against the table id instead of as a name substring
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub table_by_id: bool,

    /// Column key substring; unset matches every column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    /// Row value to match; presence makes this a person-value rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Flips classification (structural rules) or match direction
    /// (person-value rules)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reverse: bool,
}

impl Rule {
    /// Whether the rule constrains at least one hierarchy level.
    ///
    /// Descriptors constraining none are skipped during classification.
    pub fn targets_hierarchy(&self) -> bool {
        self.source.is_some() || self.table.is_some() || self.column.is_some()
    }
}

/// True if the rule's source constraint is unset or equals the source id
pub fn matches_source(rule: &Rule, source: &Source) -> bool {
    match &rule.source {
        None => true,
        Some(m) => m == &source.id,
    }
}

/// True if the rule's table constraint is unset, equals the table id (with
/// `table_by_id`), or is a substring of the table name (without)
pub fn matches_table(rule: &Rule, table: &Table) -> bool {
    match &rule.table {
        None => true,
        Some(m) if rule.table_by_id => m == &table.id.to_string(),
        Some(m) => table.name.contains(m.as_str()),
    }
}

/// True if the rule's column constraint is unset or is a substring of the
/// column key
pub fn matches_column(rule: &Rule, column: &Column) -> bool {
    match &rule.column {
        None => true,
        Some(m) => column.key.contains(m.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> Rule {
        Rule::default()
    }

    #[test]
    fn unset_fields_match_everything() {
        let r = rule();
        assert!(matches_source(&r, &Source::new("moodle", "Moodle", vec![])));
        assert!(matches_table(&r, &Table::new(7, "grades", vec![])));
        assert!(matches_column(&r, &Column::new("email")));
    }

    #[test]
    fn source_matches_by_exact_id() {
        let r = Rule {
            source: Some("moodle".to_string()),
            ..rule()
        };
        assert!(matches_source(&r, &Source::new("moodle", "Moodle", vec![])));
        assert!(!matches_source(&r, &Source::new("moodle2", "Moodle 2", vec![])));
    }

    #[test]
    fn table_matches_by_name_substring() {
        let r = Rule {
            table: Some("grade".to_string()),
            ..rule()
        };
        assert!(matches_table(&r, &Table::new(1, "grade_items", vec![])));
        assert!(!matches_table(&r, &Table::new(1, "users", vec![])));
    }

    #[test]
    fn table_by_id_matches_exact_id_string() {
        let r = Rule {
            table: Some("12".to_string()),
            table_by_id: true,
            ..rule()
        };
        assert!(matches_table(&r, &Table::new(12, "anything", vec![])));
        // Exact string form only, never a substring of the id
        assert!(!matches_table(&r, &Table::new(123, "anything", vec![])));
        // And never against the name
        assert!(!matches_table(&r, &Table::new(4, "12", vec![])));
    }

    #[test]
    fn column_matches_by_key_substring() {
        let r = Rule {
            column: Some("mail".to_string()),
            ..rule()
        };
        assert!(matches_column(&r, &Column::new("email")));
        assert!(!matches_column(&r, &Column::new("phone")));
    }

    #[test]
    fn targets_hierarchy_requires_a_structural_field() {
        assert!(!rule().targets_hierarchy());
        assert!(!Rule {
            value: Some("x".to_string()),
            ..rule()
        }
        .targets_hierarchy());
        assert!(Rule {
            column: Some("x".to_string()),
            ..rule()
        }
        .targets_hierarchy());
    }
}
