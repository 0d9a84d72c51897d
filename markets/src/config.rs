//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The file path
//! defaults to `config.yaml` but can be specified via `-f` or the `MARKETS_CONFIG` environment
//! variable.
//!
//! ## Loading Priority
//!
//! Later sources override earlier ones:
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `MARKETS_` override YAML values
//! 3. **DATABASE_URL** - Special case: switches the store to PostgreSQL at that URL
//!
//! Nested values use double underscores, e.g. `MARKETS_CORS__MAX_AGE=600` sets `cors.max_age`.
//!
//! ## Example
//!
//! ```yaml
//! host: 0.0.0.0
//! port: 3100
//! store:
//!   type: memory
//!   seed_file: markets.json
//! cors:
//!   allowed_origins: ["https://app.example.com"]
//!   allow_credentials: true
//! enable_metrics: true
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "MARKETS_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Set from the `DATABASE_URL` environment variable; replaces `store` when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// Where markets are read from
    pub store: StoreConfig,
    /// Cross-origin settings for browser clients
    pub cors: CorsConfig,
    /// Enable Prometheus metrics endpoint at `/internal/metrics`
    pub enable_metrics: bool,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3100,
            database_url: None,
            store: StoreConfig::default(),
            cors: CorsConfig::default(),
            enable_metrics: false,
            enable_otel_export: false,
        }
    }
}

/// Market storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// In-process store, optionally seeded from a JSON array of markets
    Memory {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seed_file: Option<PathBuf>,
    },
    /// External PostgreSQL database; migrations run on startup
    Postgres {
        /// Connection string
        url: String,
        #[serde(default)]
        pool: PoolSettings,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory { seed_file: None }
    }
}

impl StoreConfig {
    pub fn pool_settings(&self) -> Option<&PoolSettings> {
        match self {
            StoreConfig::Memory { .. } => None,
            StoreConfig::Postgres { pool, .. } => Some(pool),
        }
    }
}

/// Connection pool settings for the PostgreSQL store.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections to maintain
    pub min_connections: u32,
    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,
    /// Time before idle connections are closed (seconds, 0 = never)
    pub idle_timeout_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600, // 10 minutes
        }
    }
}

impl PoolSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Origins allowed to call the API
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            allow_credentials: false,
            max_age: Some(3600), // Cache preflight for 1 hour
        }
    }
}

/// An allowed CORS origin.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard", serialize_with = "serialize_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn serialize_wildcard<S>(serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str("*")
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Config {
    /// Load configuration from the file named in `args`, then the environment.
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        // DATABASE_URL wins over whatever store the file configured, keeping any pool settings
        if let Some(url) = config.database_url.take() {
            let pool = config.store.pool_settings().cloned().unwrap_or_default();
            config.store = StoreConfig::Postgres { url, pool };
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            // MARKETS_CONFIG names the file itself and is not a config key
            .merge(Env::prefixed("MARKETS_").ignore(&["config"]).split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]))
    }

    /// Reject settings that would only fail later, at startup or on the first request.
    pub fn validate(&self) -> Result<(), Error> {
        if let StoreConfig::Postgres { url, pool } = &self.store {
            if url.trim().is_empty() {
                return Err(Error::Internal {
                    operation: "validate config: store.url must not be empty for the postgres store".to_string(),
                });
            }
            if pool.max_connections == 0 {
                return Err(Error::Internal {
                    operation: "validate config: store.pool.max_connections must be at least 1".to_string(),
                });
            }
            if pool.min_connections > pool.max_connections {
                return Err(Error::Internal {
                    operation: format!(
                        "validate config: store.pool.min_connections ({}) cannot be greater than max_connections ({})",
                        pool.min_connections, pool.max_connections
                    ),
                });
            }
        }

        if self.cors.allow_credentials && self.cors.allowed_origins.contains(&CorsOrigin::Wildcard) {
            return Err(Error::Internal {
                operation: "validate config: cors.allow_credentials cannot be combined with a '*' origin".to_string(),
            });
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
