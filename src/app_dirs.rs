//! Centralized application directory paths for the search host.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! # Directory Layout
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Config | `~/Library/Application Support/matrimony/` | `~/.config/matrimony/` |
//! | Data | `~/Library/Application Support/matrimony/` | `~/.local/share/matrimony/` |
//!
//! # Environment Overrides
//!
//! - `MATRIMONY_CONFIG_DIR` overrides [`config_dir`]
//! - `MATRIMONY_DATA_DIR` overrides [`data_dir`]

use std::path::PathBuf;

const APP_DIR_NAME: &str = "matrimony";

/// Application config directory.
///
/// Resolves to `dirs::config_dir()/matrimony/` by default. Override with
/// the `MATRIMONY_CONFIG_DIR` environment variable.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("MATRIMONY_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("/tmp/matrimony-config"))
}

/// Application data directory, home of the default profile fixtures.
///
/// Resolves to `dirs::data_dir()/matrimony/` by default. Override with
/// the `MATRIMONY_DATA_DIR` environment variable.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("MATRIMONY_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("/tmp/matrimony-data"))
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default profile fixture path (`data_dir()/profiles.json`).
#[must_use]
pub fn fixtures_file() -> PathBuf {
    data_dir().join("profiles.json")
}

/// Held by every test that reads or writes `MATRIMONY_CONFIG_DIR`.
#[cfg(test)]
pub(crate) static CONFIG_ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::PoisonError;

    #[test]
    fn config_file_ends_with_config_toml() {
        let _env = CONFIG_ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let path = config_file();
        assert!(path.ends_with("config.toml"));
        assert!(path.starts_with(config_dir()));
    }

    #[test]
    fn fixtures_file_is_under_data_dir() {
        let path = fixtures_file();
        assert!(path.ends_with("profiles.json"));
        assert!(path.starts_with(data_dir()));
    }

    #[test]
    fn config_dir_override_via_env() {
        let _env = CONFIG_ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let key = "MATRIMONY_CONFIG_DIR";
        let original = std::env::var_os(key);
        // SAFETY: test-only; every test reading this variable holds CONFIG_ENV_LOCK.
        unsafe { std::env::set_var(key, "/custom/config") };
        assert_eq!(config_dir(), PathBuf::from("/custom/config"));
        assert_eq!(config_file(), PathBuf::from("/custom/config/config.toml"));
        match original {
            // SAFETY: restoring the value captured above.
            Some(val) => unsafe { std::env::set_var(key, val) },
            // SAFETY: restoring the absent state captured above.
            None => unsafe { std::env::remove_var(key) },
        }
    }

    #[test]
    fn default_dirs_mention_app_name_without_override() {
        if std::env::var_os("MATRIMONY_DATA_DIR").is_none() {
            assert!(data_dir().to_string_lossy().contains(APP_DIR_NAME));
        }
    }
}
