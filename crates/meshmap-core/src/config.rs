//! Configuration system for meshmap.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $MESHMAP_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/meshmap/config.toml
//!   3. ~/.config/meshmap/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collect-services value used until the server says otherwise.
pub const DEFAULT_COLLECT_SERVICES: bool = false;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshmapConfig {
    pub session: SessionConfig,
    pub daemon: DaemonConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Collect-services flag before the server first sets it.
    pub collect_services_default: bool,
    /// Rewrite incoming changed-peer lists into patches before applying.
    pub patchify: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Address for the HTTP status endpoint. Empty = disabled.
    pub status_addr: String,
    /// Log filter used when RUST_LOG is not set.
    pub log_filter: String,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            collect_services_default: DEFAULT_COLLECT_SERVICES,
            patchify: true,
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            status_addr: String::new(),
            log_filter: "info".to_string(),
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("meshmap")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl MeshmapConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path())
    }

    /// Load from an explicit path, falling back to defaults if it is missing.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            MeshmapConfig::default()
        };
        config.apply_env_overrides(|k| std::env::var(k).ok());
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("MESHMAP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&MeshmapConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply MESHMAP_* overrides. `lookup` is `std::env::var` outside tests.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let flag = |v: String| v == "true" || v == "1";
        if let Some(v) = lookup("MESHMAP_SESSION__PATCHIFY") {
            self.session.patchify = flag(v);
        }
        if let Some(v) = lookup("MESHMAP_SESSION__COLLECT_SERVICES_DEFAULT") {
            self.session.collect_services_default = flag(v);
        }
        if let Some(v) = lookup("MESHMAP_DAEMON__STATUS_ADDR") {
            self.daemon.status_addr = v;
        }
        if let Some(v) = lookup("MESHMAP_DAEMON__LOG_FILTER") {
            self.daemon.log_filter = v;
        }
    }
}
