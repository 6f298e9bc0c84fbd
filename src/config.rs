use eyre::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::EmitterError;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_KEY: &str = "bucker";
pub const DEFAULT_VERSION: u32 = 1;
pub const DEFAULT_REDIS_PORT: u16 = 6379;
pub const DEFAULT_UDP_PORT: u16 = 9999;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5000;

/// CLI configuration: emitter options plus process-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    pub emitter: EmitterConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// Emitter construction options
///
/// Every field has a default, so an empty document yields an emitter with
/// no transports that still shapes envelopes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// Endpoint name, used as module/source when nothing more specific is given
    pub name: String,
    /// Broker and datagram destination host
    pub host: String,
    /// Explicit source label, wins over the module name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Written as `source_host` when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_host: Option<String>,
    /// Protocol version tag written as `@version`
    pub version: u32,
    /// Fields merged into every envelope
    #[serde(alias = "defaultPacket")]
    pub default_packet: IndexMap<String, serde_json::Value>,
    /// Routing key: broker channel/list name and envelope `type`
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis: Option<BrokerConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udp: Option<DatagramConfig>,
    /// Append-only NDJSON output file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            host: DEFAULT_HOST.to_string(),
            source: None,
            source_host: None,
            version: DEFAULT_VERSION,
            default_packet: IndexMap::new(),
            key: DEFAULT_KEY.to_string(),
            redis: None,
            udp: None,
            file: None,
        }
    }
}

impl EmitterConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_redis(mut self, redis: BrokerConfig) -> Self {
        self.redis = Some(redis);
        self
    }

    pub fn with_udp(mut self, udp: DatagramConfig) -> Self {
        self.udp = Some(udp);
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Reject values that would produce envelopes without a usable `type`
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.key.trim().is_empty() {
            return Err(EmitterError::Config("key must not be empty".to_string()));
        }
        if self.host.trim().is_empty() && (self.redis.is_some() || self.udp.is_some()) {
            return Err(EmitterError::Config(
                "host must not be empty when a network transport is enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Names of the enabled transports, in send order
    pub fn transport_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.redis.is_some() {
            names.push("redis");
        }
        if self.udp.is_some() {
            names.push("udp");
        }
        if self.file.is_some() {
            names.push("file");
        }
        names
    }
}

/// Redis command used to hand envelopes to the broker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerMode {
    /// `PUBLISH <key> <json>`
    #[default]
    Channel,
    /// `RPUSH <key> <json>`
    List,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "RawBrokerConfig")]
pub struct BrokerConfig {
    pub port: u16,
    pub mode: BrokerMode,
    /// Upper bound on the delay between reconnect attempts
    pub retry_max_delay_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_REDIS_PORT,
            mode: BrokerMode::Channel,
            retry_max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
        }
    }
}

impl BrokerConfig {
    pub fn list() -> Self {
        Self {
            mode: BrokerMode::List,
            ..Self::default()
        }
    }
}

/// Accepts both `mode: list` and the older `channel: false` spelling
#[derive(Deserialize)]
#[serde(default)]
struct RawBrokerConfig {
    port: u16,
    mode: Option<BrokerMode>,
    channel: Option<bool>,
    retry_max_delay_ms: u64,
}

impl Default for RawBrokerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_REDIS_PORT,
            mode: None,
            channel: None,
            retry_max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
        }
    }
}

impl From<RawBrokerConfig> for BrokerConfig {
    fn from(raw: RawBrokerConfig) -> Self {
        let mode = match (raw.mode, raw.channel) {
            (Some(mode), _) => mode,
            (None, Some(false)) => BrokerMode::List,
            (None, _) => BrokerMode::Channel,
        };
        Self {
            port: raw.port,
            mode,
            retry_max_delay_ms: raw.retry_max_delay_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatagramConfig {
    pub port: u16,
}

impl Default for DatagramConfig {
    fn default() -> Self {
        Self { port: DEFAULT_UDP_PORT }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        if let Ok(env_path) = std::env::var("BUCKER_LOGSTASH_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from BUCKER_LOGSTASH_CONFIG: {}", e);
                    }
                }
            }
        }

        if let Ok(dir) = std::env::var("BUCKER_LOGSTASH_DIR") {
            let path = PathBuf::from(dir).join("logstash.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from BUCKER_LOGSTASH_DIR: {}", e);
                    }
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("bucker-logstash").join("logstash.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        // Try ./logstash.yaml (for development)
        let local_config = PathBuf::from("logstash.yaml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load local config: {}", e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Expand a path that may contain ~ or env vars
pub fn expand_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_emitter_config() {
        let config = EmitterConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.key, "bucker");
        assert_eq!(config.version, 1);
        assert!(config.default_packet.is_empty());
        assert!(config.transport_names().is_empty());
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
name: api
host: logs.internal
source: billing
source_host: web-01
version: 2
default_packet:
  env: prod
  region: eu-west-1
key: svc
redis:
  port: 6380
  mode: list
udp:
  port: 5000
file: /tmp/events.log
"#;
        let config: EmitterConfig = serde_yaml::from_str(yaml).expect("Failed to parse");
        assert_eq!(config.name, "api");
        assert_eq!(config.source.as_deref(), Some("billing"));
        assert_eq!(config.version, 2);
        let keys: Vec<&str> = config.default_packet.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["env", "region"]);
        let redis = config.redis.as_ref().expect("redis section");
        assert_eq!(redis.port, 6380);
        assert_eq!(redis.mode, BrokerMode::List);
        assert_eq!(redis.retry_max_delay_ms, 5000);
        assert_eq!(config.udp, Some(DatagramConfig { port: 5000 }));
        assert_eq!(config.transport_names(), vec!["redis", "udp", "file"]);
    }

    #[test]
    fn test_section_defaults() {
        let config: EmitterConfig = serde_yaml::from_str("redis: {}\nudp: {}\n").expect("Failed to parse");
        assert_eq!(config.redis, Some(BrokerConfig::default()));
        assert_eq!(config.udp.map(|u| u.port), Some(9999));
    }

    #[test]
    fn test_legacy_channel_flag() {
        let config: EmitterConfig = serde_yaml::from_str("redis:\n  channel: false\n").expect("Failed to parse");
        assert_eq!(config.redis.map(|r| r.mode), Some(BrokerMode::List));

        let config: EmitterConfig = serde_yaml::from_str("redis:\n  channel: true\n").expect("Failed to parse");
        assert_eq!(config.redis.map(|r| r.mode), Some(BrokerMode::Channel));
    }

    #[test]
    fn test_default_packet_camel_case_alias() {
        let config: EmitterConfig =
            serde_json::from_str(r#"{"defaultPacket": {"team": "core"}}"#).expect("Failed to parse");
        assert_eq!(config.default_packet.get("team"), Some(&serde_json::json!("core")));
    }

    #[test]
    fn test_validate_rejects_empty_key() {
        let config = EmitterConfig {
            key: "  ".to_string(),
            ..EmitterConfig::default()
        };
        assert!(matches!(config.validate(), Err(EmitterError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_host_with_network_transport() {
        let config = EmitterConfig {
            host: String::new(),
            ..EmitterConfig::default()
        }
        .with_udp(DatagramConfig::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = Config::default();
        config.emitter = config.emitter.with_name("worker").with_redis(BrokerConfig::list());
        let yaml_str = serde_yaml::to_string(&config).expect("Failed to serialize");
        let parsed: Config = serde_yaml::from_str(&yaml_str).expect("Failed to deserialize");
        assert_eq!(parsed.emitter, config.emitter);
        assert_eq!(parsed.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("logstash.yaml");
        fs::write(&path, "log_level: debug\nemitter:\n  name: cron\n").expect("write");
        let config = Config::load(Some(&path)).expect("load");
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.emitter.name, "cron");
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let path = PathBuf::from("/nonexistent/bucker/logstash.yaml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_expand_path_no_expansion() {
        let path = PathBuf::from("/var/log/app.log");
        assert_eq!(expand_path(&path), PathBuf::from("/var/log/app.log"));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        // SAFETY: Test runs single-threaded, env var is test-specific
        unsafe {
            std::env::set_var("BUCKER_TEST_LOG_DIR", "/custom/logs");
        }
        let expanded = expand_path(&PathBuf::from("$BUCKER_TEST_LOG_DIR/app.log"));
        assert_eq!(expanded, PathBuf::from("/custom/logs/app.log"));
        unsafe {
            std::env::remove_var("BUCKER_TEST_LOG_DIR");
        }
    }
}
