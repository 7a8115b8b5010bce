//! Structural filtering of the Source → Table → Column hierarchy
//!
//! Inclusion keeps matching elements; exclusion removes them. Both build
//! fresh hierarchy values and leave the input untouched. Rules are applied
//! as ordered folds: each rule consumes the previous rule's output, so
//! reordering can change the result.

use super::matching::{matches_column, matches_source, matches_table, Rule};
use crate::schema::Source;

/// Narrow the hierarchy to the elements matching `rule`.
///
/// Keeps only matching sources; within them only matching tables; within
/// those only matching columns. A table with a column constraint and zero
/// matching columns is dropped; a source with zero kept tables is dropped.
/// Removed columns land in the table's `columns_rm`.
pub fn apply_inclusion(rule: &Rule, sources: &[Source]) -> Vec<Source> {
    let mut kept_sources = Vec::new();
    for source in sources {
        if !matches_source(rule, source) {
            continue;
        }
        let mut kept_tables = Vec::new();
        for table in &source.tables {
            if !matches_table(rule, table) {
                continue;
            }
            let (selected, removed): (Vec<_>, Vec<_>) = table
                .columns
                .iter()
                .cloned()
                .partition(|c| matches_column(rule, c));
            if rule.column.is_none() || !selected.is_empty() {
                kept_tables.push(table.with_columns(selected, removed));
            }
        }
        if !kept_tables.is_empty() {
            kept_sources.push(source.with_tables(kept_tables));
        }
    }
    kept_sources
}

/// Remove the elements matching `rule`, keeping the rest.
///
/// Non-matching sources pass through unchanged. Within a matching source,
/// non-matching tables pass through unchanged; matching tables lose their
/// matching columns and are dropped when no column remains. A source with
/// zero remaining tables is dropped whole, even when the rule constrained
/// only the source level.
pub fn apply_exclusion(rule: &Rule, sources: &[Source]) -> Vec<Source> {
    let mut kept_sources = Vec::new();
    for source in sources {
        if !matches_source(rule, source) {
            kept_sources.push(source.clone());
            continue;
        }
        let mut kept_tables = Vec::new();
        for table in &source.tables {
            if !matches_table(rule, table) {
                kept_tables.push(table.clone());
                continue;
            }
            let (removed, selected): (Vec<_>, Vec<_>) = table
                .columns
                .iter()
                .cloned()
                .partition(|c| matches_column(rule, c));
            if !selected.is_empty() {
                kept_tables.push(table.with_columns(selected, removed));
            }
        }
        if !kept_tables.is_empty() {
            kept_sources.push(source.with_tables(kept_tables));
        }
    }
    kept_sources
}
