//! Relay Configuration
//!
//! Configuration can be loaded from:
//! - Default values
//! - Config file (~/.config/activity-relay/relay.toml)
//! - An explicit `--config` path
//!
//! Command-line arguments override whatever the file provides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

/// Overall deadline for one extract-and-dispatch run
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 10;

/// Event writers for `sync` when the caller does not pass one
pub const DEFAULT_CONCURRENCY: usize = 1000;

/// Relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Sink database type tag (`pg`); ignored for HTTP targets
    pub db_type: Option<String>,

    /// Path to the ActivityWatch SQLite database
    pub source_path: Option<PathBuf>,

    /// Connection string or `http(s)://` base URL of the sink
    pub target: Option<String>,

    /// Look-back window for `sync`, in seconds
    pub interval_secs: Option<u64>,

    /// Maximum simultaneous in-flight event writes
    pub concurrency: usize,

    /// Deadline for the whole run
    pub timeout_secs: u64,

    /// PostgreSQL pool size
    pub pool_size: usize,

    /// Per-request timeout for the HTTP sink
    pub http_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            db_type: None,
            source_path: None,
            target: None,
            interval_secs: None,
            concurrency: DEFAULT_CONCURRENCY,
            timeout_secs: DEFAULT_RUN_TIMEOUT_SECS,
            pool_size: 16,
            http_timeout_secs: 5,
        }
    }
}

/// Knobs the controller needs for a single run
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Deadline covering connect, migrate, extract and dispatch
    pub timeout: Duration,
    pub pool_size: usize,
    pub http_timeout: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        RelayConfig::default().run_settings()
    }
}

impl RelayConfig {
    /// Default config file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("activity-relay/relay.toml"))
            .unwrap_or_else(|| PathBuf::from("relay.toml"))
    }

    /// Load configuration from the default file, falling back to defaults
    pub fn load() -> Self {
        let config_path = Self::default_path();

        if config_path.exists() {
            match Self::from_file(&config_path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("Ignoring {}: {}", config_path.display(), e),
            }
        }

        Self::default()
    }

    /// Load configuration from an explicit file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| RelayError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| RelayError::Config(e.to_string()))?;

        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Settings handed to the controller
    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            timeout: Duration::from_secs(self.timeout_secs),
            pool_size: self.pool_size.max(1),
            http_timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }
}
