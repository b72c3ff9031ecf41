//! Centralized path management for the coverart CLI
//!
//! This module provides utilities for consistently locating the data,
//! cache, cover and configuration directories.

use std::path::PathBuf;

/// The name of the application directory used across all platforms
const APP_DATA_DIR: &str = "coverart";

/// The name of the generic disk cache subdirectory
const CACHE_SUBDIR: &str = "cache";

/// The name of the permanent cover subdirectory
const COVERS_SUBDIR: &str = "covers";

/// Returns the base data directory for the application
///
/// On Unix-like systems this is `~/.local/share/coverart`; on Windows,
/// `%APPDATA%/coverart`. Falls back to `.coverart` in the current directory
/// when no standard location exists.
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DATA_DIR))
        .unwrap_or_else(|| PathBuf::from(".coverart"))
}

/// Returns the default generic disk cache directory
pub fn get_cache_dir() -> PathBuf {
    get_data_dir().join(CACHE_SUBDIR)
}

/// Returns the default permanent cover directory
///
/// Covers are kept apart from the cache so clearing the cache never touches
/// them.
pub fn get_covers_dir() -> PathBuf {
    get_data_dir().join(COVERS_SUBDIR)
}

/// Returns the configuration directory
///
/// `XDG_CONFIG_HOME` wins on every non-Windows platform, including macOS.
pub fn get_config_dir() -> PathBuf {
    #[cfg(not(target_os = "windows"))]
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return PathBuf::from(xdg_config).join(APP_DATA_DIR);
    }

    dirs::config_dir()
        .map(|d| d.join(APP_DATA_DIR))
        .unwrap_or_else(|| PathBuf::from(".coverart"))
}

/// Returns the path to the configuration file
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_and_covers_are_siblings() {
        let cache_dir = get_cache_dir();
        let covers_dir = get_covers_dir();

        assert_eq!(cache_dir.parent(), covers_dir.parent());
        assert_ne!(cache_dir, covers_dir);
        assert!(cache_dir.starts_with(get_data_dir()));
    }

    #[test]
    fn test_all_paths_use_app_name() {
        let paths = [
            ("data", get_data_dir()),
            ("cache", get_cache_dir()),
            ("config", get_config_dir()),
        ];

        for (name, path) in paths.iter() {
            assert!(
                path.to_string_lossy().contains("coverart"),
                "{} path should contain 'coverart': {}",
                name,
                path.display()
            );
        }
    }

    #[test]
    fn test_config_file_name() {
        assert_eq!(
            get_config_path().file_name().and_then(|n| n.to_str()),
            Some("config.toml")
        );
    }
}
