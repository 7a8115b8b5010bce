//! Anonymized export and filtered fetch
//!
//! Consumes the narrowed hierarchy, the source APIs, and the person
//! ledger. Output layout:
//! ```text
//! <out dir>/
//! ├── <source_id>/
//! │   ├── <table_id>.json            surviving rows
//! │   ├── <table_id>.removed.json    keys of dropped columns (if any)
//! │   └── ...
//! └── ...
//! ```

use crate::error::Result;
use crate::filter::{FilterEngine, PersonLedger};
use crate::schema::Source;
use crate::source::{ApiRegistry, Row};
use std::collections::HashSet;
use std::path::Path;

/// Export behavior knobs
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    /// Fetch personal identifiers instead of pseudonyms
    pub include_personal: bool,
    /// Write a `.removed.json` sidecar per table with dropped columns
    pub write_removed_sidecar: bool,
}

/// Per-table export outcome, for CLI reporting
#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// Source id
    pub source: String,
    /// Table name
    pub table: String,
    /// Rows surviving person filtering
    pub rows_written: usize,
    /// Keys of columns dropped by structural filtering
    pub columns_dropped: Vec<String>,
}

/// Narrow the hierarchy, classify persons when person rules exist, and
/// write the surviving rows per table.
///
/// Person selection runs with the same `include_personal` setting as the
/// row fetch so the ledger ids and the exported row ids align. Fetch
/// failures propagate; nothing is retried or skipped.
pub async fn export_filtered(
    engine: &FilterEngine,
    sources: &[Source],
    apis: &ApiRegistry,
    ledger: &PersonLedger,
    options: ExportOptions,
    out_dir: &Path,
) -> Result<Vec<ExportSummary>> {
    let narrowed = engine.filter(sources);

    let included: Option<HashSet<String>> = if engine.has_person_rules() {
        let ids = engine
            .select_persons(sources, apis, options.include_personal, ledger)
            .await?;
        Some(ids.into_iter().collect())
    } else {
        None
    };

    let mut summaries = Vec::new();
    for source in &narrowed {
        let api = apis.resolve(&source.id)?;
        let source_dir = out_dir.join(&source.id);
        tokio::fs::create_dir_all(&source_dir).await?;

        for table in &source.tables {
            let (rows, _) = api.fetch_rows(table, options.include_personal).await?;
            let kept: HashSet<&str> = table.columns.iter().map(|c| c.key.as_str()).collect();

            let out_rows: Vec<Row> = rows
                .into_iter()
                .filter(|row| match &included {
                    Some(ids) => ids.contains(&row.person),
                    None => true,
                })
                .map(|row| Row {
                    person: row.person,
                    values: row
                        .values
                        .into_iter()
                        .filter(|(key, _)| kept.contains(key.as_str()))
                        .collect(),
                })
                .collect();

            let table_path = source_dir.join(format!("{}.json", table.id));
            tokio::fs::write(&table_path, serde_json::to_string_pretty(&out_rows)?).await?;

            let columns_dropped: Vec<String> =
                table.columns_rm.iter().map(|c| c.key.clone()).collect();
            if options.write_removed_sidecar && !columns_dropped.is_empty() {
                let sidecar = source_dir.join(format!("{}.removed.json", table.id));
                tokio::fs::write(&sidecar, serde_json::to_string_pretty(&columns_dropped)?)
                    .await?;
            }

            tracing::info!(
                source = %source.id,
                table = %table.name,
                rows = out_rows.len(),
                dropped = columns_dropped.len(),
                "table exported"
            );
            summaries.push(ExportSummary {
                source: source.id.clone(),
                table: table.name.clone(),
                rows_written: out_rows.len(),
                columns_dropped,
            });
        }
    }
    Ok(summaries)
}
