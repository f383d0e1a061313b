//! Daemon and client settings
//!
//! Stored as JSON in /etc/quadromon/config.json. Every field has a default,
//! so a missing file or a partial file is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::{daemon, limits, paths};
use crate::error::{QuadroError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Unix socket of the daemon; platform default when unset
    pub socket_path: Option<PathBuf>,
    /// tracing filter directive, e.g. `info` or `qm_core=debug`
    pub log_level: String,
    /// hidraw hotplug scan period
    pub rescan_interval_ms: u64,
    /// Raw reports buffered per device between reader and decoder
    pub report_queue_depth: usize,
    pub sysfs_root: PathBuf,
    pub dev_root: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            socket_path: None,
            log_level: daemon::DEFAULT_LOG_LEVEL.to_string(),
            rescan_interval_ms: daemon::DEFAULT_RESCAN_INTERVAL_MS,
            report_queue_depth: daemon::DEFAULT_REPORT_QUEUE_DEPTH,
            sysfs_root: PathBuf::from(paths::SYSFS_ROOT),
            dev_root: PathBuf::from(paths::DEV_ROOT),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.rescan_interval_ms == 0 {
            return Err(QuadroError::invalid_config(
                "rescan_interval_ms",
                "must be greater than zero",
            ));
        }
        if self.report_queue_depth == 0 {
            return Err(QuadroError::invalid_config(
                "report_queue_depth",
                "must be greater than zero",
            ));
        }
        if self.log_level.trim().is_empty() {
            return Err(QuadroError::invalid_config("log_level", "must not be empty"));
        }
        if let Some(path) = &self.socket_path {
            if !path.is_absolute() {
                return Err(QuadroError::invalid_config(
                    "socket_path",
                    "must be an absolute path",
                ));
            }
        }
        Ok(())
    }

    /// Configured socket path or the platform default
    pub fn socket_path(&self) -> PathBuf {
        self.socket_path
            .clone()
            .unwrap_or_else(paths::default_socket_path)
    }
}

/// Per-user settings file, used by the client when present
pub fn user_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("quadromon").join(paths::CONFIG_FILE))
}

/// Settings file to load when none is given on the command line
pub fn default_settings_path() -> PathBuf {
    user_settings_path()
        .filter(|path| path.exists())
        .unwrap_or_else(paths::config_file)
}

/// Load settings from `path`. A missing file yields defaults.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No settings file at {:?}, using defaults", path);
            return Ok(Settings::default());
        }
        Err(e) => {
            return Err(QuadroError::FileRead {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    if metadata.len() > limits::MAX_CONFIG_SIZE {
        return Err(QuadroError::ConfigTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size: limits::MAX_CONFIG_SIZE,
        });
    }

    let content = fs::read_to_string(path).map_err(|e| QuadroError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let settings: Settings = serde_json::from_str(&content).map_err(|e| {
        QuadroError::config(format!("Failed to parse {}: {}", path.display(), e))
    })?;
    settings.validate()?;

    debug!("Loaded settings from {:?}", path);
    Ok(settings)
}

/// Load settings from the default location
pub fn load_settings() -> Result<Settings> {
    load_settings_from(&default_settings_path())
}

/// Resolve the daemon socket: explicit argument, then `QUADROMON_SOCKET`,
/// then settings.
pub fn resolve_socket_path(explicit: Option<&Path>, settings: &Settings) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match std::env::var_os(paths::SOCKET_ENV) {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => settings.socket_path(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.rescan_interval_ms, 5000);
        assert_eq!(settings.report_queue_depth, 8);
        assert_eq!(settings.sysfs_root, PathBuf::from("/sys"));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = load_settings_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "rescan_interval_ms": 250, "log_level": "debug" }"#).unwrap();

        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings.rescan_interval_ms, 250);
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.report_queue_depth, 8);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_settings_from(&path), Err(QuadroError::Config(_))));
    }

    #[test]
    fn test_zero_queue_depth_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "report_queue_depth": 0 }"#).unwrap();
        assert!(matches!(
            load_settings_from(&path),
            Err(QuadroError::InvalidConfig { field, .. }) if field == "report_queue_depth"
        ));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, vec![b' '; limits::MAX_CONFIG_SIZE as usize + 1]).unwrap();
        assert!(matches!(
            load_settings_from(&path),
            Err(QuadroError::ConfigTooLarge { .. })
        ));
    }

    #[test]
    fn test_relative_socket_path_rejected() {
        let settings = Settings {
            socket_path: Some(PathBuf::from("quadromon.sock")),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_resolve_socket_path_precedence() {
        let settings = Settings {
            socket_path: Some(PathBuf::from("/tmp/from-settings.sock")),
            ..Settings::default()
        };

        std::env::remove_var(paths::SOCKET_ENV);
        assert_eq!(
            resolve_socket_path(None, &settings),
            PathBuf::from("/tmp/from-settings.sock")
        );

        std::env::set_var(paths::SOCKET_ENV, "/tmp/from-env.sock");
        assert_eq!(
            resolve_socket_path(None, &settings),
            PathBuf::from("/tmp/from-env.sock")
        );
        assert_eq!(
            resolve_socket_path(Some(Path::new("/tmp/explicit.sock")), &settings),
            PathBuf::from("/tmp/explicit.sock")
        );
        std::env::remove_var(paths::SOCKET_ENV);
    }
}
