//! Configuration loading and typed config structures for Skywire.
//!
//! The canonical configuration lives in `skywire-config.yaml` at the project
//! root. Every section defaults, so an empty file is a valid configuration.
//! Deployment-specific values can be overridden from the environment.

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use skywire_codec::Precision;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override held a value that does not parse.
    #[error("invalid value {value:?} for {key}")]
    Override {
        /// The environment variable name.
        key: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A setting parsed but is outside its allowed range.
    #[error("invalid setting {key}: {reason}")]
    Invalid {
        /// Dotted path of the setting.
        key: &'static str,
        /// What the value must satisfy.
        reason: &'static str,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level relay configuration.
///
/// Mirrors the structure of `skywire-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SkywireConfig {
    /// Upstream feed endpoints and polling.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Delta encoding behavior.
    #[serde(default)]
    pub encoding: EncodingConfig,

    /// Broker and fan-out server settings.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SkywireConfig {
    /// Load configuration from a YAML file, then apply environment overrides.
    ///
    /// Recognised variables are `FEED_URL`, `TRANSCEIVERS_URL`, `REDIS_URL`,
    /// `NATS_URL`, `BROKER`, and `FANOUT_PORT`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML,
    /// [`ConfigError::Invalid`] if a setting is out of range, or
    /// [`ConfigError::Override`] if an override does not parse.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise start from defaults. The
    /// environment is applied either way.
    ///
    /// # Errors
    ///
    /// Same as [`SkywireConfig::from_file`].
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a setting is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that parse but cannot drive the relay.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending setting.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "feed.poll_interval_secs",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    /// Override values from `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Override`] for a `BROKER` or `FANOUT_PORT`
    /// value that does not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("FEED_URL") {
            self.feed.data_url = val;
        }
        if let Some(val) = lookup("TRANSCEIVERS_URL") {
            self.feed.transceivers_url = val;
        }
        if let Some(val) = lookup("REDIS_URL") {
            self.infrastructure.redis_url = val;
        }
        if let Some(val) = lookup("NATS_URL") {
            self.infrastructure.nats_url = val;
        }
        if let Some(val) = lookup("BROKER") {
            self.infrastructure.broker = val.parse::<BrokerKind>().ok().ok_or_else(|| {
                ConfigError::Override {
                    key: "BROKER",
                    value: val,
                }
            })?;
        }
        if let Some(val) = lookup("FANOUT_PORT") {
            self.infrastructure.fanout_port = val.parse::<u16>().ok().ok_or_else(|| {
                ConfigError::Override {
                    key: "FANOUT_PORT",
                    value: val,
                }
            })?;
        }
        Ok(())
    }
}

/// Upstream feed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedConfig {
    /// URL of the main world feed document.
    #[serde(default = "default_data_url")]
    pub data_url: String,

    /// URL of the transceiver document.
    #[serde(default = "default_transceivers_url")]
    pub transceivers_url: String,

    /// Seconds between polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// A pilot whose last report lags the feed by more than this many
    /// seconds is treated as closing.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: i64,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            data_url: default_data_url(),
            transceivers_url: default_transceivers_url(),
            poll_interval_secs: default_poll_interval_secs(),
            stale_after_secs: default_stale_after_secs(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Delta encoding configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EncodingConfig {
    /// Which fields participate in change detection.
    #[serde(default)]
    pub precision: Precision,

    /// Skip re-sending steady entities that have not changed.
    #[serde(default = "default_true")]
    pub suppress_unchanged: bool,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            precision: Precision::default(),
            suppress_unchanged: true,
        }
    }
}

/// Which broker carries frames from ingestion to fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerKind {
    /// Redis or Dragonfly pub/sub.
    #[default]
    Redis,
    /// NATS core subjects.
    Nats,
}

impl FromStr for BrokerKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" | "dragonfly" => Ok(Self::Redis),
            "nats" => Ok(Self::Nats),
            _ => Err(()),
        }
    }
}

/// Broker and fan-out server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// Broker backend.
    #[serde(default)]
    pub broker: BrokerKind,

    /// Redis (or Dragonfly) URL.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// NATS messaging URL.
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Fan-out server port.
    #[serde(default = "default_fanout_port")]
    pub fanout_port: u16,

    /// Frames buffered per socket before the socket is dropped.
    #[serde(default = "default_socket_buffer")]
    pub socket_buffer: usize,
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            broker: BrokerKind::default(),
            redis_url: default_redis_url(),
            nats_url: default_nats_url(),
            fanout_port: default_fanout_port(),
            socket_buffer: default_socket_buffer(),
        }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_data_url() -> String {
    "https://data.vatsim.net/v3/vatsim-data.json".to_owned()
}

fn default_transceivers_url() -> String {
    "https://data.vatsim.net/v3/transceivers-data.json".to_owned()
}

const fn default_poll_interval_secs() -> u64 {
    15
}

const fn default_stale_after_secs() -> i64 {
    60
}

const fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_owned()
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_owned()
}

const fn default_fanout_port() -> u16 {
    8080
}

const fn default_socket_buffer() -> usize {
    32
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}
