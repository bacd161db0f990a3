//! Configuration for the search host.

use profile_search::SearchConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// Top-level host configuration, stored as TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// JSON file with the `users` and `profiles` records to serve. Falls
    /// back to [`crate::app_dirs::fixtures_file`] when unset.
    pub fixtures_path: Option<PathBuf>,
    /// `tracing` filter directive used when `RUST_LOG` is not set.
    pub log_filter: String,
    /// Federated search engine settings.
    pub search: SearchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fixtures_path: None,
            log_filter: "info".to_owned(),
            search: SearchConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// holds an invalid search configuration.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| AppError::Config(e.to_string()))?;
        config
            .search
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path, see [`crate::app_dirs::config_file`].
    pub fn default_config_path() -> PathBuf {
        crate::app_dirs::config_file()
    }

    /// The fixture file to load: `fixtures_path` or the default location.
    pub fn resolved_fixtures_path(&self) -> PathBuf {
        self.fixtures_path
            .clone()
            .unwrap_or_else(crate::app_dirs::fixtures_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use profile_search::InvalidCursorPolicy;

    #[test]
    fn defaults_are_sensible() {
        let config = AppConfig::default();
        assert_eq!(config.log_filter, "info");
        assert!(config.fixtures_path.is_none());
        assert!(config.search.validate().is_ok());
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.search.page_size_cap = 25;
        config.search.invalid_cursor = InvalidCursorPolicy::Restart;
        config.fixtures_path = Some(PathBuf::from("/srv/profiles.json"));
        config.log_filter = "profile_search=debug".into();

        config.save_to_file(&path).expect("save");
        let loaded = AppConfig::from_file(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[search]\ncache_ttl_seconds = 30\n").expect("write");

        let loaded = AppConfig::from_file(&path).expect("load");
        assert_eq!(loaded.search.cache_ttl_seconds, 30);
        assert_eq!(loaded.search.page_size_cap, 50);
        assert_eq!(loaded.log_filter, "info");
    }

    #[test]
    fn invalid_search_section_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[search]\npage_size_cap = 0\n").expect("write");

        let err = AppConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("page_size_cap"));
    }

    #[test]
    fn from_file_nonexistent_returns_io_error() {
        let result = AppConfig::from_file(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").expect("write");
        assert!(matches!(AppConfig::from_file(&path), Err(AppError::Config(_))));
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let _env = crate::app_dirs::CONFIG_ENV_LOCK
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        assert!(AppConfig::default_config_path().ends_with("config.toml"));
    }

    #[test]
    fn explicit_fixtures_path_wins() {
        let config = AppConfig {
            fixtures_path: Some(PathBuf::from("/data/p.json")),
            ..Default::default()
        };
        assert_eq!(config.resolved_fixtures_path(), PathBuf::from("/data/p.json"));
        assert!(AppConfig::default()
            .resolved_fixtures_path()
            .ends_with("profiles.json"));
    }
}
