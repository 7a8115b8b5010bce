//! Source API: row-fetch and discovery capability per data source
//!
//! The hierarchy stays pure data; APIs are resolved through the
//! [`ApiRegistry`] by source id. The shipped implementation is the local
//! file-backed [`FileSourceApi`]; anything that can discover tables and
//! fetch rows can stand behind the trait.

mod file;

pub use file::FileSourceApi;

use crate::error::{Error, Result};
use crate::schema::Table;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

/// A single fetched row: one person plus the column values.
///
/// The reserved `person` field is the grouping key for person
/// classification; every row carries exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Person identifier (pseudonymized upstream unless personal data was
    /// requested)
    pub person: String,
    /// Column key → value
    #[serde(flatten)]
    pub values: serde_json::Map<String, serde_json::Value>,
}

/// Metadata returned alongside fetched rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchMetadata {
    /// Source the rows came from
    pub source: String,
    /// Table name
    pub table: String,
    /// Number of rows fetched
    pub row_count: usize,
    /// Fetch timestamp
    pub fetched_at: DateTime<Utc>,
}

/// Row-fetch and discovery capability for one data source.
///
/// Implementations pseudonymize person identifiers before rows leave the
/// API layer unless `include_personal` is set. Fetch failures propagate to
/// the caller; the filter engine never retries or substitutes rows.
#[async_trait]
pub trait SourceApi: Send + Sync {
    /// Discover the tables and columns this source offers
    async fn discover_tables(&self) -> Result<Vec<Table>>;

    /// Fetch all rows of one table
    async fn fetch_rows(
        &self,
        table: &Table,
        include_personal: bool,
    ) -> Result<(Vec<Row>, FetchMetadata)>;
}

/// Source id → API handle resolution
#[derive(Default, Clone)]
pub struct ApiRegistry {
    apis: HashMap<String, Arc<dyn SourceApi>>,
}

impl ApiRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an API for a source id, replacing any previous handle
    pub fn register(&mut self, source_id: impl Into<String>, api: Arc<dyn SourceApi>) {
        self.apis.insert(source_id.into(), api);
    }

    /// Resolve the API for a source id.
    ///
    /// An unknown id is a collaborator contract violation and errors.
    pub fn resolve(&self, source_id: &str) -> Result<Arc<dyn SourceApi>> {
        self.apis
            .get(source_id)
            .cloned()
            .ok_or_else(|| Error::Source(format!("no API registered for source '{}'", source_id)))
    }
}

/// Derive the pseudonym for a person identifier.
///
/// Deterministic: SHA-256 of the id, truncated to 16 hex characters and
/// tagged so pseudonyms are recognizable in exported data.
pub fn pseudonymize(person: &str) -> String {
    let digest = Sha256::digest(person.as_bytes());
    let hex: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();
    format!("pseudo-{}", hex)
}
