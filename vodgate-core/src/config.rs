use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub remote: RemoteConfig,
    pub cache: CacheConfig,
    pub origin: OriginConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// SSH access to the media origin servers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub login: String,
    pub identity_file: Option<String>,
    pub connect_timeout_secs: u64,
    pub exec_timeout_secs: u64,
    pub transfer_timeout_secs: u64,
    /// Root directory on the origin under which per-owner folders live.
    pub video_root: String,
    /// Directory for SSH control sockets (connection reuse).
    pub control_dir: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            login: "media".to_string(),
            identity_file: None,
            connect_timeout_secs: 10,
            exec_timeout_secs: 30,
            transfer_timeout_secs: 600,
            video_root: "/srv/media".to_string(),
            control_dir: "/tmp/vodgate-ssh".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: String,
    pub max_size_bytes: u64,
    /// Entry age below which a cache hit needs no remote I/O.
    pub freshness_secs: u64,
    /// Entry age at which the sweep evicts. Must exceed `freshness_secs`.
    pub max_age_secs: u64,
    pub sweep_interval_secs: u64,
    /// Files modified within this window are never swept (in-flight writes).
    pub sweep_grace_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: "./cache".to_string(),
            max_size_bytes: 10 * 1024 * 1024 * 1024,
            freshness_secs: 3600,
            max_age_secs: 86400,
            sweep_interval_secs: 3600,
            sweep_grace_secs: 300,
        }
    }
}

/// HTTP endpoints of the origin media server for direct proxying.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    pub scheme: String,
    pub host: String,
    pub streaming_port: u16,
    pub content_port: u16,
    pub username: String,
    pub password: String,
    pub streaming_timeout_secs: u64,
    pub content_timeout_secs: u64,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: "origin.local".to_string(),
            streaming_port: 8088,
            content_port: 8090,
            username: "vodgate".to_string(),
            password: String::new(),
            streaming_timeout_secs: 10,
            content_timeout_secs: 120,
        }
    }
}

impl Config {
    /// Load configuration from a file with environment variable overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigBuilder::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("VODGATE").separator("__"))
            .build()?;
        builder.try_deserialize()
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        let builder = ConfigBuilder::builder()
            .add_source(Environment::with_prefix("VODGATE").separator("__"))
            .build()?;
        builder.try_deserialize()
    }

    /// Validate configuration, returning all problems at once.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.cache.dir.trim().is_empty() {
            errors.push("cache.dir must not be empty".to_string());
        }
        if self.cache.max_size_bytes == 0 {
            errors.push("cache.max_size_bytes must be greater than 0".to_string());
        }
        if self.cache.freshness_secs >= self.cache.max_age_secs {
            errors.push(format!(
                "cache.freshness_secs ({}) must be below cache.max_age_secs ({})",
                self.cache.freshness_secs, self.cache.max_age_secs
            ));
        }
        if self.remote.exec_timeout_secs == 0 || self.remote.transfer_timeout_secs == 0 {
            errors.push("remote timeouts must be greater than 0".to_string());
        }
        if self.origin.streaming_timeout_secs == 0 || self.origin.content_timeout_secs == 0 {
            errors.push("origin timeouts must be greater than 0".to_string());
        }
        if !matches!(self.origin.scheme.as_str(), "http" | "https") {
            errors.push(format!("origin.scheme must be http or https, got {}", self.origin.scheme));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.http_port)
    }
}

impl CacheConfig {
    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    pub fn sweep_grace(&self) -> Duration {
        Duration::from_secs(self.sweep_grace_secs)
    }
}
