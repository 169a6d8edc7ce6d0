//! Configuration for paperspan.
//!
//! The configuration is a JSONC file (JSON with comments) describing the
//! displays, the wallpaper profiles and the named perspectives. It is loaded
//! once per process; `--config` replaces the search path.

pub mod schema;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub use types::{
    ConfigError, GeneralConfig, PaperspanConfig, ProfileConfig, config_paths,
    load_config as load_config_default, load_config_from_path,
};

use crate::cache;
use crate::constants::APP_NAME;
use crate::display::store::GEOMETRY_FILE_NAME;

/// Global configuration instance, loaded once at startup.
static CONFIG: OnceLock<PaperspanConfig> = OnceLock::new();

/// Path to the currently loaded configuration file.
static CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Custom config path override (set via CLI --config flag).
static CUSTOM_CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Sets a custom configuration file path to use instead of the default search paths.
///
/// This must be called before `init()` or `get_config()` to take effect.
/// Returns `false` if a path was already set.
pub fn set_custom_config_path(path: PathBuf) -> bool { CUSTOM_CONFIG_PATH.set(path).is_ok() }

/// Loads the configuration from disk.
///
/// A missing file yields the defaults; a broken one is logged and also
/// yields the defaults.
fn load_or_default() -> PaperspanConfig {
    let result = match CUSTOM_CONFIG_PATH.get() {
        Some(path) => load_config_from_path(path),
        None => load_config_default(),
    };

    match result {
        Ok((config, path)) => {
            tracing::debug!(path = %path.display(), "configuration loaded");
            let _ = CONFIG_PATH.set(path);
            config
        }
        Err(ConfigError::NotFound) => {
            tracing::debug!("no configuration file found, using defaults");
            PaperspanConfig::default()
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to load configuration, using defaults");
            PaperspanConfig::default()
        }
    }
}

/// Initializes and returns the global configuration instance.
///
/// This function is idempotent - calling it multiple times will return
/// the same configuration instance.
pub fn init() -> &'static PaperspanConfig { CONFIG.get_or_init(load_or_default) }

/// Returns the global configuration instance, initializing it if necessary.
pub fn get_config() -> &'static PaperspanConfig { CONFIG.get_or_init(load_or_default) }

/// Returns the path to the loaded configuration file, if any.
pub fn get_config_path() -> Option<&'static PathBuf> { CONFIG_PATH.get() }

/// Directory that relative paths in the configuration are resolved against:
/// the loaded file's directory, or the current directory without one.
#[must_use]
pub fn base_dir() -> PathBuf {
    get_config_path()
        .and_then(|path| path.parent())
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default()
}

/// Location of the persisted per-display-set geometry.
#[must_use]
pub fn geometry_store_path() -> PathBuf {
    dirs::config_dir()
        .map_or_else(cache::get_cache_dir, |dir| dir.join(APP_NAME))
        .join(GEOMETRY_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_store_path_file_name() {
        let path = geometry_store_path();
        assert!(path.ends_with(GEOMETRY_FILE_NAME));
        assert!(path.parent().unwrap().ends_with(APP_NAME));
    }

    #[test]
    fn test_config_error_message() {
        let msg = ConfigError::NotFound.to_string();
        assert!(msg.contains("No configuration file found"));
    }
}
