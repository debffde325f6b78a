//! INI-backed configuration file.
//!
//! Lives at `~/.config/vodcache/config.ini` (per the platform's config dir).
//! Callers typically do `ConfigFile::load().unwrap_or_default()`: a missing
//! or unreadable file means defaults, an existing file overrides per key.
//!
//! ```ini
//! [store]
//! directory = /home/user/.local/share/vodcache
//!
//! [server]
//! bind = 127.0.0.1:8080
//!
//! [download]
//! timeout_secs = 30
//!
//! [log]
//! level = info
//! file = /tmp/vodcache.log
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

const DEFAULT_BIND: ([u8; 4], u16) = ([127, 0, 0, 1], 8080);
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] ini::Error),

    #[error("failed to write config: {0}")]
    Write(#[from] std::io::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("no config directory available on this platform")]
    NoConfigDir,
}

/// Loaded configuration with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Root directory of the chunk store.
    pub store_directory: PathBuf,

    /// Address the range server binds to.
    pub server_bind: SocketAddr,

    /// Connect timeout for origin downloads, in seconds.
    pub download_timeout_secs: u64,

    /// Log level filter (`error`..`trace`).
    pub log_level: String,

    /// Optional log file; stderr only when unset.
    pub log_file: Option<PathBuf>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            store_directory: default_store_directory(),
            server_bind: SocketAddr::from(DEFAULT_BIND),
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_file: None,
        }
    }
}

impl ConfigFile {
    /// Load from the default path. Fails if the file exists but is invalid;
    /// a missing file is also an error so callers can `unwrap_or_default()`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&default_config_path()?)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path)?;
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("store")) {
            if let Some(dir) = section.get("directory") {
                config.store_directory = PathBuf::from(dir);
            }
        }
        if let Some(section) = ini.section(Some("server")) {
            if let Some(bind) = section.get("bind") {
                config.server_bind =
                    bind.parse()
                        .map_err(|_| ConfigError::InvalidValue {
                            key: "server.bind".to_string(),
                            value: bind.to_string(),
                        })?;
            }
        }
        if let Some(section) = ini.section(Some("download")) {
            if let Some(timeout) = section.get("timeout_secs") {
                config.download_timeout_secs =
                    timeout
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue {
                            key: "download.timeout_secs".to_string(),
                            value: timeout.to_string(),
                        })?;
            }
        }
        if let Some(section) = ini.section(Some("log")) {
            if let Some(level) = section.get("level") {
                config.log_level = level.to_string();
            }
            if let Some(file) = section.get("file") {
                config.log_file = Some(PathBuf::from(file));
            }
        }

        Ok(config)
    }

    /// Write to the default path, creating parent directories as needed.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = default_config_path()?;
        self.save_to(&path)
    }

    /// Write to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut ini = Ini::new();
        ini.with_section(Some("store"))
            .set("directory", self.store_directory.display().to_string());
        ini.with_section(Some("server"))
            .set("bind", self.server_bind.to_string());
        ini.with_section(Some("download"))
            .set("timeout_secs", self.download_timeout_secs.to_string());
        let mut log = ini.with_section(Some("log"));
        let log = log.set("level", self.log_level.clone());
        if let Some(ref file) = self.log_file {
            log.set("file", file.display().to_string());
        }

        ini.write_to_file(path)?;
        Ok(())
    }
}

/// Default config file location: `<config_dir>/vodcache/config.ini`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("vodcache").join("config.ini"))
        .ok_or(ConfigError::NoConfigDir)
}

/// Default store location: `<data_dir>/vodcache`, falling back to a relative
/// directory on platforms without a data dir.
pub fn default_store_directory() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("vodcache"))
        .unwrap_or_else(|| PathBuf::from("vodcache-store"))
}

/// Render a byte count human-readable (`3.50 MB`, `1.20 GB`).
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let bytes = bytes as f64;
    if bytes >= GB {
        format!("{:.2} GB", bytes / GB)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes / KB)
    } else {
        format!("{bytes} B")
    }
}
