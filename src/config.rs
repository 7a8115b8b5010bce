//! DataVeil configuration management
//!
//! Configuration lives in a `.dataveil/` workspace directory resolved
//! from the working directory: `config.toml` holds the privacy settings,
//! the registered sources, and the stored rule descriptors. A missing
//! workspace is a sentinel, not an error; commands that need one branch
//! on it.

use crate::error::{Error, Result};
use crate::filter::{FilterEngine, Rule};
use crate::schema::Source;
use crate::source::{ApiRegistry, FileSourceApi, SourceApi};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Workspace directory name, resolved from the working directory
pub const WORKSPACE_DIR: &str = ".dataveil";

/// Configuration file name inside the workspace
pub const CONFIG_FILE: &str = "config.toml";

/// Main DataVeil configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataVeilConfig {
    /// Privacy configuration
    #[serde(default)]
    pub privacy: PrivacyConfig,

    /// Filter engine configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Registered sources
    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    /// Stored rule descriptors
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// Privacy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyConfig {
    /// Fetch personal identifiers instead of pseudonyms
    pub include_personal: bool,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        // Pseudonymous by default
        Self {
            include_personal: false,
        }
    }
}

/// Filter engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Allow-list mode: plain rules include, reversed rules exclude
    #[serde(default)]
    pub inclusive: bool,
}

/// A registered data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Opaque unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Local directory the file-backed API reads from
    pub path: PathBuf,
}

impl DataVeilConfig {
    /// Workspace directory under the given base directory
    pub fn workspace_dir(base: &Path) -> PathBuf {
        base.join(WORKSPACE_DIR)
    }

    /// Load the configuration; `None` when no workspace exists
    pub fn load(base: &Path) -> Result<Option<Self>> {
        let path = Self::workspace_dir(base).join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid {}: {}", path.display(), e)))?;
        Ok(Some(config))
    }

    /// Write the configuration, creating the workspace as needed
    pub fn save(&self, base: &Path) -> Result<()> {
        let dir = Self::workspace_dir(base);
        std::fs::create_dir_all(&dir)?;
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("cannot serialize configuration: {}", e)))?;
        std::fs::write(dir.join(CONFIG_FILE), content)?;
        Ok(())
    }

    /// Look up a registered source by id
    pub fn find_source(&self, id: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Build the filter engine from the stored rules and mode
    pub fn build_engine(&self) -> FilterEngine {
        FilterEngine::new(self.rules.clone(), self.engine.inclusive)
    }

    /// Build the API registry for the registered sources
    pub fn api_registry(&self) -> ApiRegistry {
        let mut registry = ApiRegistry::new();
        for source in &self.sources {
            let api: Arc<dyn SourceApi> = Arc::new(FileSourceApi::new(&source.id, &source.path));
            registry.register(&source.id, api);
        }
        registry
    }

    /// Discover the full hierarchy across all registered sources
    pub async fn discover_sources(&self, registry: &ApiRegistry) -> Result<Vec<Source>> {
        let mut sources = Vec::new();
        for config in &self.sources {
            let api = registry.resolve(&config.id)?;
            let tables = api.discover_tables().await?;
            sources.push(Source::new(&config.id, &config.name, tables));
        }
        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_workspace_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DataVeilConfig::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DataVeilConfig::default();
        config.sources.push(SourceConfig {
            id: "moodle".to_string(),
            name: "Moodle".to_string(),
            path: PathBuf::from("/data/moodle"),
        });
        config.rules.push(Rule {
            table: Some("logs".to_string()),
            ..Rule::default()
        });
        config.privacy.include_personal = true;
        config.save(dir.path()).unwrap();

        let loaded = DataVeilConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.sources, config.sources);
        assert_eq!(loaded.rules, config.rules);
        assert!(loaded.privacy.include_personal);
        assert!(!loaded.engine.inclusive);
    }

    #[test]
    fn defaults_are_pseudonymous_and_non_inclusive() {
        let config: DataVeilConfig = toml::from_str("").unwrap();
        assert!(!config.privacy.include_personal);
        assert!(!config.engine.inclusive);
        assert!(config.sources.is_empty());
        assert!(config.rules.is_empty());
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let ws = DataVeilConfig::workspace_dir(dir.path());
        std::fs::create_dir_all(&ws).unwrap();
        std::fs::write(ws.join(CONFIG_FILE), "privacy = 3").unwrap();
        let err = DataVeilConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
