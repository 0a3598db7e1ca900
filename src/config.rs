// src/config.rs
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    Memory,
    Scylla,
}

/// Runtime settings; every flag can also come from the environment.
#[derive(Debug, Clone, Parser)]
#[command(version, about = "Simulated crypto market dashboard server", long_about = None)]
pub struct Config {
    /// Address the HTTP server listens on.
    #[arg(long, env = "CRYPTODASH_BIND", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// Where instruments and accounts are kept.
    #[arg(long, value_enum, env = "CRYPTODASH_STORE", default_value_t = StoreBackend::Memory)]
    pub store: StoreBackend,

    #[arg(long, env = "CRYPTODASH_SCYLLA_NODE", default_value = "127.0.0.1:9042")]
    pub scylla_node: String,

    #[arg(long, env = "CRYPTODASH_KEYSPACE", default_value = "crypto_dash")]
    pub keyspace: String,

    /// Key used to sign session tokens.
    #[arg(
        long,
        env = "CRYPTODASH_SESSION_SECRET",
        default_value = "crypto-dash-dev-secret",
        hide_env_values = true
    )]
    pub session_secret: String,

    #[arg(long, env = "CRYPTODASH_SESSION_TTL_SECS", default_value_t = 86_400)]
    pub session_ttl_secs: u64,

    /// Delay between market snapshots.
    #[arg(long, env = "CRYPTODASH_TICK_INTERVAL_MS", default_value_t = 2_000)]
    pub tick_interval_ms: u64,

    /// Snapshots a slow stream subscriber may fall behind before skipping.
    #[arg(long, env = "CRYPTODASH_FEED_CAPACITY", default_value_t = 16)]
    pub feed_capacity: usize,

    /// Directory holding index.html and other static assets.
    #[arg(long, env = "CRYPTODASH_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    #[arg(long, env = "CRYPTODASH_LOG", default_value = "info")]
    pub log_level: LevelFilter,

    /// Do not create the demo account on startup.
    #[arg(long, env = "CRYPTODASH_NO_DEMO_ACCOUNT")]
    pub no_demo_account: bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("tick interval must be greater than zero")]
    ZeroTickInterval,
    #[error("feed capacity must be greater than zero")]
    ZeroFeedCapacity,
    #[error("session secret must not be empty")]
    EmptySessionSecret,
    #[error("invalid keyspace name: {0:?}")]
    InvalidKeyspace(String),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.feed_capacity == 0 {
            return Err(ConfigError::ZeroFeedCapacity);
        }
        if self.session_secret.is_empty() {
            return Err(ConfigError::EmptySessionSecret);
        }
        if !is_cql_identifier(&self.keyspace) {
            return Err(ConfigError::InvalidKeyspace(self.keyspace.clone()));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

// The keyspace is spliced into CQL text, so only plain identifiers pass.
fn is_cql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
