//! Person classification by row content
//!
//! Each person-value rule is scoped through the structural inclusion
//! logic, rows are fetched for every table in scope, and a per-person
//! verdict is AND-merged across all rules and rows. The full verdict map
//! is persisted to the ledger; only the included ids are returned.

use super::ledger::{PersonLedger, VerdictEntry};
use super::structural::apply_inclusion;
use super::FilterEngine;
use crate::error::Result;
use crate::schema::{Column, Source};
use crate::source::{ApiRegistry, Row};
use std::collections::HashMap;

/// Verdict map preserving first-seen person order
#[derive(Debug, Default)]
struct VerdictMap {
    index: HashMap<String, usize>,
    entries: Vec<VerdictEntry>,
}

impl VerdictMap {
    /// AND-merge one `(person, matched)` observation.
    ///
    /// A person enters the map on first observation; absence stays
    /// absence, never a default verdict.
    fn merge(&mut self, person: String, matched: bool) {
        match self.index.get(&person) {
            Some(&i) => {
                let entry = &mut self.entries[i];
                entry.included = entry.included && matched;
            }
            None => {
                self.index.insert(person.clone(), self.entries.len());
                self.entries.push(VerdictEntry {
                    person,
                    included: matched,
                });
            }
        }
    }
}

/// True iff every selected column compares to `value` in the wanted
/// direction.
///
/// `want_match = true` demands equality in every column, `false` demands
/// inequality in every column. A column missing from the row counts as
/// not equal.
fn row_has_columns_value(row: &Row, columns: &[Column], value: &str, want_match: bool) -> bool {
    columns.iter().all(|column| {
        let eq = row
            .values
            .get(&column.key)
            .map_or(false, |v| value_eq(v, value));
        eq == want_match
    })
}

/// Compare a row value against a rule value.
///
/// Strings compare directly; other scalars through their canonical JSON
/// rendering, so a rule value "5" matches the number 5.
fn value_eq(actual: &serde_json::Value, expected: &str) -> bool {
    match actual {
        serde_json::Value::String(s) => s == expected,
        other => other.to_string() == expected,
    }
}

impl FilterEngine {
    /// Classify persons under the engine's person-value rules.
    ///
    /// Rows are fetched sequentially, one table at a time, through the
    /// source APIs; fetch failures and unknown source ids propagate
    /// unmodified. The resulting verdict map overwrites the ledger in
    /// first-seen order, and the ids with a `true` verdict are returned.
    pub async fn select_persons(
        &self,
        sources: &[Source],
        apis: &ApiRegistry,
        include_personal: bool,
        ledger: &PersonLedger,
    ) -> Result<Vec<String>> {
        let mut verdicts = VerdictMap::default();

        for rule in self.person_rules() {
            let Some(value) = rule.value.as_deref() else {
                continue;
            };
            let want_match = !rule.reverse;
            // Scope resolution only: a person-value rule never narrows the
            // export hierarchy itself.
            let scoped = apply_inclusion(rule, sources);

            for source in &scoped {
                let api = apis.resolve(&source.id)?;
                for table in &source.tables {
                    let (rows, _) = api.fetch_rows(table, include_personal).await?;
                    for row in rows {
                        let matched =
                            row_has_columns_value(&row, &table.columns, value, want_match);
                        verdicts.merge(row.person, matched);
                    }
                }
            }
        }

        tracing::info!(
            persons = verdicts.entries.len(),
            included = verdicts.entries.iter().filter(|e| e.included).count(),
            "person selection complete"
        );
        ledger.persist(&verdicts.entries).await?;
        Ok(verdicts
            .entries
            .into_iter()
            .filter(|e| e.included)
            .map(|e| e.person)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::filter::Rule;
    use crate::schema::Table;
    use crate::source::{FetchMetadata, SourceApi};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// In-memory source API serving canned rows per table id
    struct CannedApi {
        source: String,
        rows: HashMap<u64, Vec<Row>>,
        fail: bool,
    }

    impl CannedApi {
        fn new(source: &str) -> Self {
            Self {
                source: source.to_string(),
                rows: HashMap::new(),
                fail: false,
            }
        }

        fn with_rows(mut self, table_id: u64, rows: Vec<Row>) -> Self {
            self.rows.insert(table_id, rows);
            self
        }
    }

    fn row(person: &str, values: serde_json::Value) -> Row {
        let serde_json::Value::Object(values) = values else {
            panic!("row values must be an object");
        };
        Row {
            person: person.to_string(),
            values,
        }
    }

    #[async_trait]
    impl SourceApi for CannedApi {
        async fn discover_tables(&self) -> Result<Vec<Table>> {
            Ok(vec![])
        }

        async fn fetch_rows(
            &self,
            table: &Table,
            _include_personal: bool,
        ) -> Result<(Vec<Row>, FetchMetadata)> {
            if self.fail {
                return Err(Error::Source("fetch failed".to_string()));
            }
            let rows = self.rows.get(&table.id).cloned().unwrap_or_default();
            let metadata = FetchMetadata {
                source: self.source.clone(),
                table: table.name.clone(),
                row_count: rows.len(),
                fetched_at: chrono::Utc::now(),
            };
            Ok((rows, metadata))
        }
    }

    fn hierarchy() -> Vec<Source> {
        vec![Source::new(
            "moodle",
            "Moodle",
            vec![
                Table::new(1, "enrolments", vec![Column::new("course")]),
                Table::new(2, "roles", vec![Column::new("role")]),
            ],
        )]
    }

    fn person_rule(table: &str, value: &str, reverse: bool) -> Rule {
        Rule {
            table: Some(table.to_string()),
            value: Some(value.to_string()),
            reverse,
            ..Rule::default()
        }
    }

    fn ledger() -> (tempfile::TempDir, PersonLedger) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = PersonLedger::new(dir.path());
        (dir, ledger)
    }

    #[tokio::test]
    async fn verdicts_and_across_rules_and_rows() {
        let api = CannedApi::new("moodle")
            .with_rows(
                1,
                vec![
                    row("alice", json!({"course": "math"})),
                    row("bob", json!({"course": "art"})),
                ],
            )
            .with_rows(
                2,
                vec![
                    row("alice", json!({"role": "student"})),
                    row("bob", json!({"role": "student"})),
                ],
            );
        let mut apis = ApiRegistry::new();
        apis.register("moodle", Arc::new(api));

        let engine = FilterEngine::new(
            vec![
                person_rule("enrolments", "math", false),
                person_rule("roles", "student", false),
            ],
            false,
        );
        let (_dir, ledger) = ledger();

        let included = engine
            .select_persons(&hierarchy(), &apis, true, &ledger)
            .await
            .unwrap();
        // bob matched the roles rule but not the enrolments rule: AND wins.
        assert_eq!(included, vec!["alice".to_string()]);

        let entries = ledger.load().await.unwrap().unwrap();
        assert_eq!(
            entries,
            vec![
                VerdictEntry {
                    person: "alice".to_string(),
                    included: true
                },
                VerdictEntry {
                    person: "bob".to_string(),
                    included: false
                },
            ]
        );
    }

    #[tokio::test]
    async fn unseen_person_never_enters_the_ledger() {
        let api = CannedApi::new("moodle")
            .with_rows(1, vec![row("alice", json!({"course": "math"}))])
            .with_rows(2, vec![]);
        let mut apis = ApiRegistry::new();
        apis.register("moodle", Arc::new(api));

        let engine =
            FilterEngine::new(vec![person_rule("enrolments", "math", false)], false);
        let (_dir, ledger) = ledger();

        engine
            .select_persons(&hierarchy(), &apis, true, &ledger)
            .await
            .unwrap();
        let entries = ledger.load().await.unwrap().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].person, "alice");
    }

    #[tokio::test]
    async fn reverse_flips_match_direction() {
        let api = CannedApi::new("moodle").with_rows(
            1,
            vec![
                row("alice", json!({"course": "math"})),
                row("bob", json!({"course": "art"})),
            ],
        );
        let mut apis = ApiRegistry::new();
        apis.register("moodle", Arc::new(api));

        let engine =
            FilterEngine::new(vec![person_rule("enrolments", "math", true)], false);
        let (_dir, ledger) = ledger();

        let included = engine
            .select_persons(&hierarchy(), &apis, true, &ledger)
            .await
            .unwrap();
        assert_eq!(included, vec!["bob".to_string()]);
    }

    #[tokio::test]
    async fn all_selected_columns_must_agree() {
        let api = CannedApi::new("moodle").with_rows(
            1,
            vec![
                row("alice", json!({"course": "math", "status": "math"})),
                row("bob", json!({"course": "math", "status": "done"})),
            ],
        );
        let mut apis = ApiRegistry::new();
        apis.register("moodle", Arc::new(api));

        let sources = vec![Source::new(
            "moodle",
            "Moodle",
            vec![Table::new(
                1,
                "enrolments",
                vec![Column::new("course"), Column::new("status")],
            )],
        )];
        let engine =
            FilterEngine::new(vec![person_rule("enrolments", "math", false)], false);
        let (_dir, ledger) = ledger();

        let included = engine
            .select_persons(&sources, &apis, true, &ledger)
            .await
            .unwrap();
        assert_eq!(included, vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn rule_value_matches_numeric_rendering() {
        let api = CannedApi::new("moodle")
            .with_rows(1, vec![row("alice", json!({"course": 5}))]);
        let mut apis = ApiRegistry::new();
        apis.register("moodle", Arc::new(api));

        let engine = FilterEngine::new(vec![person_rule("enrolments", "5", false)], false);
        let (_dir, ledger) = ledger();

        let included = engine
            .select_persons(&hierarchy(), &apis, true, &ledger)
            .await
            .unwrap();
        assert_eq!(included, vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn fetch_failure_propagates() {
        let mut api = CannedApi::new("moodle");
        api.fail = true;
        let mut apis = ApiRegistry::new();
        apis.register("moodle", Arc::new(api));

        let engine =
            FilterEngine::new(vec![person_rule("enrolments", "math", false)], false);
        let (_dir, ledger) = ledger();

        let err = engine
            .select_persons(&hierarchy(), &apis, true, &ledger)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Source(_)));
        // No partial ledger on failure.
        assert!(ledger.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unregistered_source_in_scope_errors() {
        let apis = ApiRegistry::new();
        let engine =
            FilterEngine::new(vec![person_rule("enrolments", "math", false)], false);
        let (_dir, ledger) = ledger();

        let err = engine
            .select_persons(&hierarchy(), &apis, true, &ledger)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Source(_)));
    }
}
