use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use todu_fit_offline::{BackoffPolicy, ClientErrorPolicy, QueueConfig};

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Where the queue keeps its records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON file per record in the data directory
    File,
    /// A single SQLite database in the data directory
    Sqlite,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::File => write!(f, "file"),
            StorageBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "sqlite" => Ok(StorageBackend::Sqlite),
            _ => Err(format!(
                "Invalid storage backend '{}'. Valid options: file, sqlite",
                s
            )),
        }
    }
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    3_000
}

fn default_probe_interval_ms() -> u64 {
    15_000
}

/// Sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL of the REST API (e.g., "http://localhost:8080")
    pub server_url: Option<String>,
    /// Path probed to decide whether the server is reachable
    #[serde(default = "default_health_path")]
    pub health_path: String,
    /// Run the queue after write commands (default: false)
    #[serde(default)]
    pub auto_sync: bool,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// How often `fit sync watch` re-probes the server
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            health_path: default_health_path(),
            auto_sync: false,
            probe_timeout_ms: default_probe_timeout_ms(),
            probe_interval_ms: default_probe_interval_ms(),
        }
    }
}

impl SyncConfig {
    /// Returns true if a server URL is set
    pub fn is_configured(&self) -> bool {
        self.server_url.is_some()
    }

    /// Full URL of the health endpoint, if a server is configured
    pub fn health_url(&self) -> Option<String> {
        self.server_url.as_ref().map(|base| {
            format!(
                "{}/{}",
                base.trim_end_matches('/'),
                self.health_path.trim_start_matches('/')
            )
        })
    }
}

/// Queue tuning, in milliseconds and plain integers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub jitter: bool,
    pub action_timeout_ms: u64,
    pub default_priority: i32,
    pub max_retries: u32,
    /// What to do with 4xx responses: retry or quarantine
    pub client_errors: ClientErrorPolicy,
}

impl Default for QueueSettings {
    fn default() -> Self {
        let defaults = QueueConfig::default();
        Self {
            backoff_base_ms: defaults.backoff.base.as_millis() as u64,
            backoff_max_ms: defaults.backoff.max_delay.as_millis() as u64,
            jitter: defaults.backoff.jitter,
            action_timeout_ms: defaults.action_timeout.as_millis() as u64,
            default_priority: defaults.default_priority,
            max_retries: defaults.default_max_retries,
            client_errors: defaults.client_errors,
        }
    }
}

impl QueueSettings {
    pub fn to_queue_config(&self) -> QueueConfig {
        let mut backoff = BackoffPolicy::new(
            Duration::from_millis(self.backoff_base_ms),
            Duration::from_millis(self.backoff_max_ms),
        );
        if !self.jitter {
            backoff = backoff.without_jitter();
        }

        QueueConfig::default()
            .with_backoff(backoff)
            .with_action_timeout(Duration::from_millis(self.action_timeout_ms))
            .with_default_priority(self.default_priority)
            .with_default_max_retries(self.max_retries)
            .with_client_errors(self.client_errors)
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory holding the queue records
    pub data_dir: ConfigValue<PathBuf>,
    /// Storage backend for the queue
    pub storage: ConfigValue<StorageBackend>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Sync configuration
    pub sync: SyncConfig,
    /// Queue tuning
    pub queue: QueueSettings,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    storage: Option<StorageBackend>,
    sync: Option<SyncConfig>,
    queue: Option<QueueSettings>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut data_dir = ConfigValue::new(Self::default_data_dir(), ConfigSource::Default);
        let mut storage = ConfigValue::new(StorageBackend::File, ConfigSource::Default);
        let mut config_file = None;
        let mut sync = SyncConfig::default();
        let mut queue = QueueSettings::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(dir) = file_config.data_dir {
                // Resolve relative paths against config file's directory
                let resolved = if dir.is_relative() {
                    path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
                } else {
                    dir
                };
                data_dir = ConfigValue::new(resolved, ConfigSource::File);
            }
            if let Some(backend) = file_config.storage {
                storage = ConfigValue::new(backend, ConfigSource::File);
            }
            if let Some(sync_config) = file_config.sync {
                sync = sync_config;
            }
            if let Some(queue_settings) = file_config.queue {
                queue = queue_settings;
            }
        }

        // Apply environment variable overrides
        if let Ok(dir) = std::env::var("FIT_DATA_DIR") {
            data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(backend) = std::env::var("FIT_STORAGE") {
            let parsed = backend
                .parse()
                .map_err(|e| ConfigError::InvalidValue("FIT_STORAGE".to_string(), e))?;
            storage = ConfigValue::new(parsed, ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("FIT_SYNC_URL") {
            sync.server_url = Some(url);
        }

        Ok(Self {
            data_dir,
            storage,
            config_file,
            sync,
            queue,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/fit/
    /// - macOS: ~/Library/Application Support/fit/
    /// - Windows: %APPDATA%/fit/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fit")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/fit/
    /// - macOS: ~/Library/Application Support/fit/
    /// - Windows: %APPDATA%/fit/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fit")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(String, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(name, e) => write!(f, "Invalid {}: {}", name, e),
        }
    }
}

impl std::error::Error for ConfigError {}
