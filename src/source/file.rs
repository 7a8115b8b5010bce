//! Local file-backed source API
//!
//! Directory layout:
//! ```text
//! <source dir>/
//! ├── tables.json        table and column layout
//! ├── <table_id>.json    rows for one table, objects with a "person" field
//! └── ...
//! ```

use super::{pseudonymize, FetchMetadata, Row, SourceApi};
use crate::error::{Error, Result};
use crate::schema::Table;
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;

/// Source API backed by JSON files in a local directory
pub struct FileSourceApi {
    source_id: String,
    dir: PathBuf,
}

impl FileSourceApi {
    /// Create an API over the given source directory
    pub fn new(source_id: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            source_id: source_id.into(),
            dir: dir.into(),
        }
    }

    async fn read_json_file(&self, file_name: &str) -> Result<String> {
        let path = self.dir.join(file_name);
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Source(format!(
                    "source '{}' has no '{}' at {}",
                    self.source_id,
                    file_name,
                    self.dir.display()
                ))
            } else {
                Error::Io(e)
            }
        })
    }
}

#[async_trait]
impl SourceApi for FileSourceApi {
    async fn discover_tables(&self) -> Result<Vec<Table>> {
        let data = self.read_json_file("tables.json").await?;
        let tables: Vec<Table> = serde_json::from_str(&data)?;
        Ok(tables)
    }

    async fn fetch_rows(
        &self,
        table: &Table,
        include_personal: bool,
    ) -> Result<(Vec<Row>, FetchMetadata)> {
        let data = self.read_json_file(&format!("{}.json", table.id)).await?;
        let mut rows: Vec<Row> = serde_json::from_str(&data)?;

        if !include_personal {
            for row in &mut rows {
                row.person = pseudonymize(&row.person);
            }
        }

        let metadata = FetchMetadata {
            source: self.source_id.clone(),
            table: table.name.clone(),
            row_count: rows.len(),
            fetched_at: Utc::now(),
        };
        tracing::debug!(
            source = %metadata.source,
            table = %metadata.table,
            rows = metadata.row_count,
            include_personal,
            "fetched rows"
        );
        Ok((rows, metadata))
    }
}
