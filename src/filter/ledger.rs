//! Durable person verdict ledger
//!
//! A single JSON file under the workspace directory holds the ordered
//! verdict list. Every person-selection run overwrites it in full; the
//! read-back queries never mutate it. A missing file is the "no data"
//! sentinel, distinct from an error.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Well-known ledger file name inside the workspace directory
pub const PERSON_SELECT_FILE: &str = "person-select.json";

/// One persisted person verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictEntry {
    /// Person identifier (pseudonymized unless personal data was fetched)
    pub person: String,
    /// Final verdict after AND-aggregation
    pub included: bool,
}

/// Summary counts over the persisted ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonStatus {
    /// All persisted entries
    pub total: usize,
    /// Entries with a `true` verdict
    pub included: usize,
    /// `round(100 * included / total)`
    pub percent: u32,
}

/// Person verdict storage under a workspace directory
#[derive(Debug, Clone)]
pub struct PersonLedger {
    path: PathBuf,
}

impl PersonLedger {
    /// Ledger stored at `<dir>/person-select.json`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(PERSON_SELECT_FILE),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the ledger with the full verdict list, order preserved
    pub async fn persist(&self, entries: &[VerdictEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(&self.path, json).await?;
        tracing::debug!(path = %self.path.display(), entries = entries.len(), "ledger persisted");
        Ok(())
    }

    /// Read the persisted verdict list; `None` when no ledger exists
    pub async fn load(&self) -> Result<Option<Vec<VerdictEntry>>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => Ok(Some(serde_json::from_str(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Summary counts; `None` when no verdicts have been persisted
    pub async fn status(&self) -> Result<Option<PersonStatus>> {
        let Some(entries) = self.load().await? else {
            return Ok(None);
        };
        if entries.is_empty() {
            return Ok(None);
        }
        let total = entries.len();
        let included = entries.iter().filter(|e| e.included).count();
        Ok(Some(PersonStatus {
            total,
            included,
            percent: (100.0 * included as f64 / total as f64).round() as u32,
        }))
    }

    /// Ids of included persons in ledger order; `None` when no verdicts
    /// have been persisted
    pub async fn included_persons(&self) -> Result<Option<Vec<String>>> {
        let Some(entries) = self.load().await? else {
            return Ok(None);
        };
        if entries.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            entries
                .into_iter()
                .filter(|e| e.included)
                .map(|e| e.person)
                .collect(),
        ))
    }
}
