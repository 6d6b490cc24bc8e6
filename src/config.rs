//! Client configuration persisted as TOML.
//!
//! ```toml
//! [aggregator]
//! api_template = "https://search.utwente.nl/searsia/search?q={q?}&r={r?}"
//! resource_timeout_ms = 12000
//!
//! [store]
//! persist = true
//! namespace_prefix = "searsia"
//! ```

use std::path::{Path, PathBuf};

use searsia_search::AggregatorConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Top-level client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Federated search settings.
    pub aggregator: AggregatorConfig,
    /// Resource cache persistence.
    pub store: StoreConfig,
}

/// Where and whether resource metadata is persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Persist cached resources to disk. When false the cache lives in
    /// memory for the duration of one command.
    pub persist: bool,
    /// Store file. Defaults to `resources.json` in the cache directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Key prefix for every entry in the store.
    pub namespace_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            persist: true,
            path: None,
            namespace_prefix: searsia_search::cache::DEFAULT_PREFIX.to_owned(),
        }
    }
}

impl StoreConfig {
    /// Resolved store file path.
    #[must_use]
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_store_path)
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ClientError::Config(format!("failed to parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ClientError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject configurations the aggregator cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.aggregator.validate()?;
        if self.store.namespace_prefix.trim().is_empty() {
            return Err(ClientError::Config(
                "store.namespace_prefix must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Default config file location: `<config dir>/searsia/config.toml`.
#[must_use]
pub fn default_config_path() -> PathBuf {
    crate::paths::config_dir().join("config.toml")
}

/// Default store file location: `<cache dir>/searsia/resources.json`.
#[must_use]
pub fn default_store_path() -> PathBuf {
    crate::paths::cache_dir().join("resources.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_persist_under_searsia_prefix() {
        let config = ClientConfig::default();
        assert!(config.store.persist);
        assert_eq!(config.store.namespace_prefix, "searsia");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            [aggregator]
            resource_timeout_ms = 3000

            [store]
            persist = false
            "#,
        )
        .expect("parse");
        assert_eq!(config.aggregator.resource_timeout_ms, 3000);
        assert_eq!(config.aggregator.max_query_len, 150);
        assert!(!config.store.persist);
        assert_eq!(config.store.namespace_prefix, "searsia");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");
        let mut config = ClientConfig::default();
        config.aggregator.result_type = Some("images".into());
        config.store.path = Some(dir.path().join("store.json"));

        config.save_to_file(&path).expect("save");
        let loaded = ClientConfig::from_file(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ClientConfig::load_or_default(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[aggregator\nbroken").expect("write");
        let err = ClientConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)), "{err:?}");
    }

    #[test]
    fn invalid_aggregator_settings_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[aggregator]\napi_template = \"\"\n").expect("write");
        let err = ClientConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("endpoint"), "{err}");
    }

    #[test]
    fn empty_prefix_rejected() {
        let mut config = ClientConfig::default();
        config.store.namespace_prefix = " ".into();
        assert!(config.validate().is_err());
    }
}
