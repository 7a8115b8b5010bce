//! DataVeil - Privacy-preserving tabular data extraction and export
//!
//! DataVeil narrows a Source → Table → Column hierarchy through a
//! declarative rule set, classifies individual persons by row content,
//! and exports pseudonymized row sets.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        DataVeil CLI                        │
//! │   status · source · list · privacy · exclude · fetch ·     │
//! │                        anonymize                           │
//! └───────────────┬────────────────────────────┬───────────────┘
//!                 │                            │
//! ┌───────────────▼───────────────┐  ┌─────────▼───────────────┐
//! │         Filter Engine         │  │       Source APIs       │
//! │  - rule classification        │  │  - table discovery      │
//! │  - structural narrowing       │  │  - row fetch            │
//! │  - person classification      │  │  - upstream pseudonyms  │
//! └───────────────┬───────────────┘  └─────────┬───────────────┘
//!                 │                            │
//! ┌───────────────▼────────────────────────────▼───────────────┐
//! │                     Workspace (.dataveil)                  │
//! │     config.toml · person-select.json · fetch/ · export/    │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`filter`]: rule classification, structural filtering, person
//!   classification, and the person ledger
//! - [`schema`]: the Source → Table → Column model
//! - [`source`]: the row-fetch API seam and the file-backed source
//! - [`export`]: anonymized export and filtered fetch
//! - [`config`]: workspace configuration and source registry

pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod schema;
pub mod source;

pub use config::DataVeilConfig;
pub use error::{Error, Result};
pub use filter::{FilterEngine, PersonLedger, PersonStatus, Rule, VerdictEntry};
pub use schema::{Column, Source, Table};
pub use source::{ApiRegistry, FileSourceApi, Row, SourceApi};
