use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// Environment variable naming an optional YAML configuration file.
pub const CONFIG_ENV: &str = "WICKET_CONFIG";

/// Environment variable overriding `listen_addr`.
pub const LISTEN_ENV: &str = "LISTEN";

/// Server configuration.
///
/// ```yaml
/// listen_addr: "0.0.0.0:8080"
/// limits:
///   max_header_size: 8192
///   max_body_size: 1048576
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    pub limits: Limits,
}

/// Per-connection resource limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum size of a request head (request line plus header block).
    pub max_header_size: usize,
    /// Maximum size of a decoded request body.
    pub max_body_size: u64,
    /// How many bytes of pipelined requests may be buffered while the
    /// application is still answering the current one.
    pub pipeline_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            limits: Limits::default(),
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_header_size: 80 * 1024,
            max_body_size: 8 * 1024 * 1024,
            pipeline_buffer: 64 * 1024,
        }
    }
}

impl Config {
    /// Loads the configuration from the environment.
    ///
    /// Reads the YAML file named by `WICKET_CONFIG` when set, then applies
    /// the `LISTEN` override.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var(LISTEN_ENV) {
            cfg.listen_addr = listen_addr;
        }

        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        let cfg = serde_yaml::from_str(raw).context("failed to parse YAML config")?;
        Ok(cfg)
    }

    /// Parses `listen_addr` into a socket address.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listen_addr
            .parse()
            .with_context(|| format!("invalid listen address {:?}", self.listen_addr))
    }
}
