//! Startup: load configuration and profile fixtures, then build the engine.
//!
//! Call [`initialize_engine`] once at startup. The returned engine owns the
//! page cache and circuit breaker for the life of the process.

use profile_search::{FederatedSearchEngine, InMemoryStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::Result;
use crate::fixtures::FixtureSet;

/// Load `path`, or the default config file when `None`.
///
/// An explicit path must exist. A missing default file means built-in
/// defaults.
///
/// # Errors
///
/// Returns an error if the chosen file exists but cannot be loaded, or an
/// explicit path does not exist.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::from_file(path),
        None => {
            let default_path = AppConfig::default_config_path();
            if default_path.exists() {
                AppConfig::from_file(&default_path)
            } else {
                Ok(AppConfig::default())
            }
        }
    }
}

/// Build the search engine over the configured fixtures.
///
/// An explicitly configured fixture file must load. When none is
/// configured and the default file is absent, the engine starts over
/// empty collections.
///
/// # Errors
///
/// Returns an error if fixtures fail to load or the search configuration
/// is invalid.
pub fn initialize_engine(config: &AppConfig) -> Result<FederatedSearchEngine<InMemoryStore>> {
    let path = config.resolved_fixtures_path();
    let fixtures = if config.fixtures_path.is_none() && !path.exists() {
        warn!(path = %path.display(), "no profile fixtures found; serving empty collections");
        FixtureSet::default()
    } else {
        FixtureSet::from_file(&path)?
    };

    info!(
        users = fixtures.users.len(),
        profiles = fixtures.profiles.len(),
        "profile fixtures loaded"
    );

    let store = fixtures.into_store(&config.search.collections);
    let engine = FederatedSearchEngine::new(Arc::new(store), config.search.clone())?;
    Ok(engine)
}
