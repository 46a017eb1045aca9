//! Gateway configuration: CLI/env > `config.toml` > built-in defaults
//! (§9), plus hot-reload of the fields that are safe to change at
//! runtime (origin allow-list, idle-cleanup timeout).
//!
//! Grounded on `config::DaemonConfig`/`ConfigWatcher` in the teacher. One
//! deliberate divergence: the teacher treats every field as optional with
//! a built-in fallback; this crate's `GatewayConfigBuilder::build` treats
//! a missing *required* field as a construction-time error, since an API
//! gateway silently listening on an unreviewed default port is a worse
//! failure mode than refusing to start.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify_debouncer_full::notify::RecursiveMode;
use notify_debouncer_full::{new_debouncer, DebounceEventResult};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8765;
pub const DEFAULT_WEBSOCKET_PATH: &str = "/ws";
pub const DEFAULT_MAX_CONNECTIONS: usize = 500;
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PING_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_PONG_WAIT_SECS: u64 = 60;
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;
pub const DEFAULT_READ_BUFFER_SIZE: usize = 16 * 1024;
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 16 * 1024;
pub const DEFAULT_CLIENT_CLEANUP_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required config field: {0}")]
    Missing(&'static str),
    #[error("failed to read config.toml at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config.toml: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub websocket_path: Option<String>,
    pub max_connections: Option<usize>,
    pub read_timeout_secs: Option<u64>,
    pub write_timeout_secs: Option<u64>,
    pub ping_interval_secs: Option<u64>,
    pub pong_wait_secs: Option<u64>,
    pub max_message_size: Option<usize>,
    pub read_buffer_size: Option<usize>,
    pub write_buffer_size: Option<usize>,
    pub cors_origins: Option<Vec<String>>,
    pub client_cleanup_timeout_secs: Option<u64>,
    pub shutdown_timeout_secs: Option<u64>,
}

impl TomlConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub websocket_path: String,
    pub max_connections: usize,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub ping_interval: Duration,
    pub pong_wait: Duration,
    pub max_message_size: usize,
    pub read_buffer_size: usize,
    pub write_buffer_size: usize,
    pub cors_origins: Vec<String>,
    pub client_cleanup_timeout: Duration,
    pub shutdown_timeout: Duration,
}

#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    websocket_path: Option<String>,
    max_connections: Option<usize>,
    read_timeout_secs: Option<u64>,
    write_timeout_secs: Option<u64>,
    ping_interval_secs: Option<u64>,
    pong_wait_secs: Option<u64>,
    max_message_size: Option<usize>,
    read_buffer_size: Option<usize>,
    write_buffer_size: Option<usize>,
    cors_origins: Option<Vec<String>>,
    client_cleanup_timeout_secs: Option<u64>,
    shutdown_timeout_secs: Option<u64>,
}

impl GatewayConfigBuilder {
    pub fn host(mut self, v: impl Into<String>) -> Self {
        self.host = Some(v.into());
        self
    }
    pub fn port(mut self, v: u16) -> Self {
        self.port = Some(v);
        self
    }
    pub fn websocket_path(mut self, v: impl Into<String>) -> Self {
        self.websocket_path = Some(v.into());
        self
    }
    pub fn max_connections(mut self, v: usize) -> Self {
        self.max_connections = Some(v);
        self
    }
    pub fn read_timeout_secs(mut self, v: u64) -> Self {
        self.read_timeout_secs = Some(v);
        self
    }
    pub fn write_timeout_secs(mut self, v: u64) -> Self {
        self.write_timeout_secs = Some(v);
        self
    }
    pub fn ping_interval_secs(mut self, v: u64) -> Self {
        self.ping_interval_secs = Some(v);
        self
    }
    pub fn pong_wait_secs(mut self, v: u64) -> Self {
        self.pong_wait_secs = Some(v);
        self
    }
    pub fn max_message_size(mut self, v: usize) -> Self {
        self.max_message_size = Some(v);
        self
    }
    pub fn read_buffer_size(mut self, v: usize) -> Self {
        self.read_buffer_size = Some(v);
        self
    }
    pub fn write_buffer_size(mut self, v: usize) -> Self {
        self.write_buffer_size = Some(v);
        self
    }
    pub fn cors_origins(mut self, v: Vec<String>) -> Self {
        self.cors_origins = Some(v);
        self
    }
    pub fn client_cleanup_timeout_secs(mut self, v: u64) -> Self {
        self.client_cleanup_timeout_secs = Some(v);
        self
    }
    pub fn shutdown_timeout_secs(mut self, v: u64) -> Self {
        self.shutdown_timeout_secs = Some(v);
        self
    }

    pub fn build(self) -> Result<GatewayConfig, ConfigError> {
        Ok(GatewayConfig {
            host: self.host.ok_or(ConfigError::Missing("host"))?,
            port: self.port.ok_or(ConfigError::Missing("port"))?,
            websocket_path: self
                .websocket_path
                .ok_or(ConfigError::Missing("websocket_path"))?,
            max_connections: self
                .max_connections
                .ok_or(ConfigError::Missing("max_connections"))?,
            read_timeout: Duration::from_secs(
                self.read_timeout_secs
                    .ok_or(ConfigError::Missing("read_timeout_secs"))?,
            ),
            write_timeout: Duration::from_secs(
                self.write_timeout_secs
                    .ok_or(ConfigError::Missing("write_timeout_secs"))?,
            ),
            ping_interval: Duration::from_secs(
                self.ping_interval_secs
                    .ok_or(ConfigError::Missing("ping_interval_secs"))?,
            ),
            pong_wait: Duration::from_secs(
                self.pong_wait_secs
                    .ok_or(ConfigError::Missing("pong_wait_secs"))?,
            ),
            max_message_size: self
                .max_message_size
                .ok_or(ConfigError::Missing("max_message_size"))?,
            read_buffer_size: self
                .read_buffer_size
                .ok_or(ConfigError::Missing("read_buffer_size"))?,
            write_buffer_size: self
                .write_buffer_size
                .ok_or(ConfigError::Missing("write_buffer_size"))?,
            cors_origins: self.cors_origins.unwrap_or_default(),
            client_cleanup_timeout: Duration::from_secs(
                self.client_cleanup_timeout_secs
                    .ok_or(ConfigError::Missing("client_cleanup_timeout_secs"))?,
            ),
            shutdown_timeout: Duration::from_secs(
                self.shutdown_timeout_secs
                    .ok_or(ConfigError::Missing("shutdown_timeout_secs"))?,
            ),
        })
    }
}

/// CLI overrides accepted by `main.rs`'s `clap` parser.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_connections: Option<usize>,
    pub cors_origins: Option<Vec<String>>,
}

impl GatewayConfig {
    /// Merge CLI overrides over a parsed `config.toml` over built-in
    /// defaults, then validate by building.
    pub fn from_sources(cli: CliOverrides, toml_path: &Path) -> Result<Self, ConfigError> {
        let toml = TomlConfig::load(toml_path)?;
        GatewayConfigBuilder::default()
            .host(cli.host.or(toml.host).unwrap_or_else(|| DEFAULT_HOST.to_string()))
            .port(cli.port.or(toml.port).unwrap_or(DEFAULT_PORT))
            .websocket_path(toml.websocket_path.unwrap_or_else(|| DEFAULT_WEBSOCKET_PATH.to_string()))
            .max_connections(
                cli.max_connections
                    .or(toml.max_connections)
                    .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            )
            .read_timeout_secs(toml.read_timeout_secs.unwrap_or(DEFAULT_READ_TIMEOUT_SECS))
            .write_timeout_secs(toml.write_timeout_secs.unwrap_or(DEFAULT_WRITE_TIMEOUT_SECS))
            .ping_interval_secs(toml.ping_interval_secs.unwrap_or(DEFAULT_PING_INTERVAL_SECS))
            .pong_wait_secs(toml.pong_wait_secs.unwrap_or(DEFAULT_PONG_WAIT_SECS))
            .max_message_size(toml.max_message_size.unwrap_or(DEFAULT_MAX_MESSAGE_SIZE))
            .read_buffer_size(toml.read_buffer_size.unwrap_or(DEFAULT_READ_BUFFER_SIZE))
            .write_buffer_size(toml.write_buffer_size.unwrap_or(DEFAULT_WRITE_BUFFER_SIZE))
            .cors_origins(cli.cors_origins.or(toml.cors_origins).unwrap_or_default())
            .client_cleanup_timeout_secs(
                toml.client_cleanup_timeout_secs
                    .unwrap_or(DEFAULT_CLIENT_CLEANUP_TIMEOUT_SECS),
            )
            .shutdown_timeout_secs(
                toml.shutdown_timeout_secs
                    .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            )
            .build()
    }
}

/// Fields safe to change without a restart, broadcast to live readers via
/// a `tokio::sync::watch` channel. Grounded on `config::HotConfig`.
#[derive(Debug, Clone)]
pub struct HotConfig {
    pub cors_origins: Vec<String>,
    pub client_cleanup_timeout: Duration,
}

impl From<&GatewayConfig> for HotConfig {
    fn from(cfg: &GatewayConfig) -> Self {
        Self {
            cors_origins: cfg.cors_origins.clone(),
            client_cleanup_timeout: cfg.client_cleanup_timeout,
        }
    }
}

/// Watches `config.toml` for changes and republishes `HotConfig` to every
/// subscriber. Grounded on `config::ConfigWatcher`. If the underlying
/// filesystem watcher can't be started (sandboxed environments, some
/// container filesystems), hot-reload is simply disabled and the gateway
/// keeps running on its startup configuration — this must never block
/// gateway startup.
pub struct ConfigWatcher {
    _debouncer: Option<
        notify_debouncer_full::Debouncer<
            notify_debouncer_full::notify::RecommendedWatcher,
            notify_debouncer_full::RecommendedCache,
        >,
    >,
    pub rx: watch::Receiver<HotConfig>,
}

impl ConfigWatcher {
    pub fn start(toml_path: PathBuf, initial: HotConfig) -> Arc<Self> {
        let (tx, rx) = watch::channel(initial);
        let watch_path = toml_path.clone();

        let debouncer = new_debouncer(
            Duration::from_secs(2),
            None,
            move |result: DebounceEventResult| match result {
                Ok(_events) => match TomlConfig::load(&watch_path) {
                    Ok(toml) => {
                        let updated = HotConfig {
                            cors_origins: toml.cors_origins.unwrap_or_default(),
                            client_cleanup_timeout: Duration::from_secs(
                                toml.client_cleanup_timeout_secs
                                    .unwrap_or(DEFAULT_CLIENT_CLEANUP_TIMEOUT_SECS),
                            ),
                        };
                        info!("config.toml changed, reloading hot-reloadable fields");
                        let _ = tx.send(updated);
                    }
                    Err(err) => warn!(%err, "failed to reload config.toml after change"),
                },
                Err(errors) => {
                    for err in errors {
                        warn!(%err, "config file watcher error");
                    }
                }
            },
        );

        let debouncer = match debouncer {
            Ok(mut debouncer) => {
                if let Some(parent) = toml_path.parent() {
                    if let Err(err) = debouncer.watch(parent, RecursiveMode::NonRecursive) {
                        warn!(%err, "failed to watch config directory, hot-reload disabled");
                        None
                    } else {
                        Some(debouncer)
                    }
                } else {
                    Some(debouncer)
                }
            }
            Err(err) => {
                warn!(%err, "failed to start config file watcher, hot-reload disabled");
                None
            }
        };

        Arc::new(Self {
            _debouncer: debouncer,
            rx,
        })
    }
}

pub fn default_toml_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_every_field() {
        let err = GatewayConfigBuilder::default().build().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn from_sources_applies_defaults_when_toml_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = GatewayConfig::from_sources(
            CliOverrides::default(),
            &default_toml_path(dir.path()),
        )
        .unwrap();
        assert_eq!(cfg.host, DEFAULT_HOST);
        assert_eq!(cfg.port, DEFAULT_PORT);
    }

    #[test]
    fn cli_overrides_beat_toml_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = default_toml_path(dir.path());
        std::fs::write(&toml_path, "port = 9000\n").unwrap();
        let cfg = GatewayConfig::from_sources(
            CliOverrides {
                port: Some(1234),
                ..Default::default()
            },
            &toml_path,
        )
        .unwrap();
        assert_eq!(cfg.port, 1234);
    }
}
