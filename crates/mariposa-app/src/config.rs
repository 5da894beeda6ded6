//! Engine config file lookup.

use mariposa_core::EngineConfig;
use std::path::{Path, PathBuf};

/// `<config dir>/mariposa/canvas.json`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mariposa").join("canvas.json"))
}

/// Load the engine config from `explicit`, or from the default location when
/// no path is given. Missing or unreadable files fall back to defaults.
pub fn load_config(explicit: Option<&Path>) -> EngineConfig {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                log::debug!("No config file, using defaults");
                return EngineConfig::default();
            }
        },
    };

    match EngineConfig::load(&path) {
        Ok(config) => {
            log::info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            log::warn!("Failed to load config from {}: {}", path.display(), e);
            EngineConfig::default()
        }
    }
}
