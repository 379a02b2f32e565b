//! # Sync Configuration
//!
//! Configuration loading for the reconciliation engine and bulk sync.
//!
//! ## Configuration Sources (Priority Order)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SHIPDESK_DEVICE_ID, SHIPDESK_DB_PATH, SHIPDESK_REMOTE_URL, ...     │
//! │                          │                                              │
//! │                          ▼                                              │
//! │  2. Config File (shipdesk.toml)                                        │
//! │     Located in the platform config dir                                 │
//! │                          │                                              │
//! │                          ▼                                              │
//! │  3. Defaults (lowest priority)                                         │
//! │     Local-only, 5 s remote timeout, sweep on open                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Config File Format
//! ```toml
//! [device]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//! name = "Front desk"
//!
//! [local]
//! database_path = "/var/lib/shipdesk/shipdesk.db"
//! sweep_on_open = true
//!
//! [remote]
//! database_url = "postgres://shipdesk@db.example.com/shipdesk"
//! user = "clerk-01"
//! op_timeout_secs = 5
//!
//! [sync]
//! batch_size = 100
//! pull_on_login = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

const CONFIG_FILE: &str = "shipdesk.toml";
const DATABASE_FILE: &str = "shipdesk.db";

// =============================================================================
// Device
// =============================================================================

/// Identity of this installation, used for logging and remote sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique device identifier (UUID v4). Generated on first run.
    #[serde(default = "generate_device_id")]
    pub id: String,

    /// Human-readable device name.
    #[serde(default = "default_device_name")]
    pub name: String,
}

fn generate_device_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_device_name() -> String {
    "Shipdesk".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            id: generate_device_id(),
            name: default_device_name(),
        }
    }
}

// =============================================================================
// Local Store
// =============================================================================

/// Settings for the embedded SQLite store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSettings {
    /// Database file. Defaults to the platform data dir.
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Delete orphaned boxes and products when the store opens.
    #[serde(default = "default_true")]
    pub sweep_on_open: bool,
}

fn default_true() -> bool {
    true
}

impl Default for LocalSettings {
    fn default() -> Self {
        LocalSettings {
            database_path: None,
            sweep_on_open: true,
        }
    }
}

// =============================================================================
// Remote Store
// =============================================================================

/// Settings for the Postgres mirror.
///
/// With no `database_url` the engine runs local-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// `postgres://` connection URL.
    #[serde(default)]
    pub database_url: Option<String>,

    /// User id signed in to the remote session.
    #[serde(default)]
    pub user: Option<String>,

    /// Bound on each remote operation (seconds).
    #[serde(default = "default_op_timeout")]
    pub op_timeout_secs: u64,

    /// Connection timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Total time bulk sync keeps retrying a transient failure (seconds).
    #[serde(default = "default_retry_budget")]
    pub retry_budget_secs: u64,

    /// First retry delay (milliseconds).
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
}

fn default_op_timeout() -> u64 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_retry_budget() -> u64 {
    60
}
fn default_initial_backoff() -> u64 {
    500
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            database_url: None,
            user: None,
            op_timeout_secs: default_op_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            retry_budget_secs: default_retry_budget(),
            initial_backoff_ms: default_initial_backoff(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Bulk sync behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Records copied between progress reports.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pull the remote collections right after sign-in.
    #[serde(default = "default_true")]
    pub pull_on_login: bool,
}

fn default_batch_size() -> usize {
    100
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            batch_size: default_batch_size(),
            pull_on_login: true,
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub local: LocalSettings,

    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub sync: SyncSettings,
}

impl SyncConfig {
    /// Creates a new config with defaults and a generated device ID.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (shipdesk.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.device.id.trim().is_empty() {
            return Err(SyncError::InvalidConfig("device.id must not be empty".into()));
        }

        if let Some(ref raw) = self.remote.database_url {
            let parsed = url::Url::parse(raw)?;
            if !matches!(parsed.scheme(), "postgres" | "postgresql") {
                return Err(SyncError::InvalidUrl(format!(
                    "Remote URL must start with postgres:// or postgresql://, got: {}",
                    parsed.scheme()
                )));
            }
        }

        if self.remote.op_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "remote.op_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.sync.batch_size == 0 {
            return Err(SyncError::InvalidConfig(
                "sync.batch_size must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("SHIPDESK_DEVICE_ID") {
            debug!(device_id = %id, "Overriding device ID from environment");
            self.device.id = id;
        }

        if let Ok(name) = std::env::var("SHIPDESK_DEVICE_NAME") {
            self.device.name = name;
        }

        if let Ok(path) = std::env::var("SHIPDESK_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.local.database_path = Some(PathBuf::from(path));
        }

        if let Ok(sweep) = std::env::var("SHIPDESK_SWEEP_ON_OPEN") {
            match sweep.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.local.sweep_on_open = true,
                "0" | "false" | "no" => self.local.sweep_on_open = false,
                _ => warn!(value = %sweep, "Unknown SHIPDESK_SWEEP_ON_OPEN value"),
            }
        }

        if let Ok(url) = std::env::var("SHIPDESK_REMOTE_URL") {
            // Don't log the URL, it may carry a password
            debug!("Overriding remote URL from environment");
            self.remote.database_url = Some(url);
        }

        if let Ok(user) = std::env::var("SHIPDESK_REMOTE_USER") {
            self.remote.user = Some(user);
        }

        if let Ok(secs) = std::env::var("SHIPDESK_REMOTE_TIMEOUT_SECS") {
            if let Ok(s) = secs.parse::<u64>() {
                debug!(secs = s, "Overriding remote timeout from environment");
                self.remote.op_timeout_secs = s;
            }
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "shipdesk", "shipdesk")
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// The local database file: configured path, else the platform data dir,
    /// else the working directory.
    pub fn database_path(&self) -> PathBuf {
        self.local
            .database_path
            .clone()
            .or_else(|| Self::project_dirs().map(|dirs| dirs.data_dir().join(DATABASE_FILE)))
            .unwrap_or_else(|| PathBuf::from(DATABASE_FILE))
    }

    pub fn device_id(&self) -> &str {
        &self.device.id
    }

    pub fn remote_url(&self) -> Option<&str> {
        self.remote.database_url.as_deref()
    }

    /// Returns true if a remote mirror is configured.
    pub fn has_remote(&self) -> bool {
        self.remote.database_url.is_some()
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.op_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.connect_timeout_secs)
    }

    pub fn retry_budget(&self) -> Duration {
        Duration::from_secs(self.remote.retry_budget_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.remote.initial_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert!(!config.device.id.is_empty());
        assert!(!config.has_remote());
        assert!(config.local.sweep_on_open);
        assert_eq!(config.op_timeout(), Duration::from_secs(5));
        assert_eq!(config.sync.batch_size, 100);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyncConfig::default();
        assert!(config.validate().is_ok());

        config.device.id = "  ".to_string();
        assert!(config.validate().is_err());

        config.device.id = "desk-1".to_string();
        config.remote.database_url = Some("mysql://db/shipdesk".to_string());
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        config.remote.database_url = Some("not a url".to_string());
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        config.remote.database_url = Some("postgres://user@localhost/shipdesk".to_string());
        assert!(config.validate().is_ok());

        config.remote.op_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SyncConfig = toml::from_str(
            r#"
            [remote]
            database_url = "postgres://localhost/shipdesk"

            [local]
            sweep_on_open = false
            "#,
        )
        .unwrap();

        assert!(config.has_remote());
        assert!(!config.local.sweep_on_open);
        assert_eq!(config.remote.op_timeout_secs, 5);
        assert!(config.sync.pull_on_login);
        assert!(!config.device.id.is_empty());
    }

    #[test]
    fn test_explicit_database_path_wins() {
        let mut config = SyncConfig::default();
        config.local.database_path = Some(PathBuf::from("/tmp/desk.db"));
        assert_eq!(config.database_path(), PathBuf::from("/tmp/desk.db"));
    }

    #[test]
    fn test_toml_serialization() {
        let config = SyncConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[device]"));
        assert!(toml_str.contains("[remote]"));
        assert!(toml_str.contains("[sync]"));
    }
}
