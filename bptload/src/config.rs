//! TOML configuration
//!
//! Every field is optional; missing fields take the built-in defaults.
//!
//! ```toml
//! [server]
//! host = "localhost"
//! port = 6667
//! read_timeout_secs = 30   # 0 = wait forever
//!
//! [pacing]
//! after_create_ms = 1000
//! after_batch_ms = 1000
//! after_delete_ms = 500
//! after_search_ms = 500
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use bptload_client::{Pacing, DEFAULT_HOST, DEFAULT_PORT};
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub pacing: PacingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub read_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            read_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PacingConfig {
    pub after_create_ms: u64,
    pub after_batch_ms: u64,
    pub after_delete_ms: u64,
    pub after_search_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        let pacing = Pacing::default();
        PacingConfig {
            after_create_ms: pacing.after_create.as_millis() as u64,
            after_batch_ms: pacing.after_batch.as_millis() as u64,
            after_delete_ms: pacing.after_delete.as_millis() as u64,
            after_search_ms: pacing.after_search.as_millis() as u64,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// `None` when the timeout is disabled
    pub fn read_timeout(&self) -> Option<Duration> {
        match self.server.read_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            after_create: Duration::from_millis(self.pacing.after_create_ms),
            after_batch: Duration::from_millis(self.pacing.after_batch_ms),
            after_delete: Duration::from_millis(self.pacing.after_delete_ms),
            after_search: Duration::from_millis(self.pacing.after_search_ms),
        }
    }
}
