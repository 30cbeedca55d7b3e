//! Runtime configuration
//!
//! Everything is tuned through `FACTORY_*` environment variables with
//! sensible defaults; there is no config file format. The order delay is the
//! duration used both by `throttle` chaos and by the item-count-violation
//! path.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default throttle/bounds delay, long enough to trip typical client
/// timeouts.
pub const DEFAULT_ORDER_DELAY_MS: u64 = 32_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Service configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct FactoryConfig {
    /// Listen address.
    pub addr: SocketAddr,
    /// SQLite connection URL.
    pub database_url: String,
    /// External base URL used when building chaos report URLs.
    pub base_url: String,
    /// Delay applied by `throttle` chaos and by out-of-bounds orders.
    pub order_delay: Duration,
    /// PEM-encoded Ed25519 private key (PKCS#8).
    pub private_key_path: PathBuf,
    /// PEM-encoded Ed25519 public key (SPKI).
    pub public_key_path: PathBuf,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: "sqlite://factory.db?mode=rwc".to_owned(),
            base_url: "http://localhost:3000".to_owned(),
            order_delay: Duration::from_millis(DEFAULT_ORDER_DELAY_MS),
            private_key_path: PathBuf::from("keys/jwt.key"),
            public_key_path: PathBuf::from("keys/jwt.key.pub"),
        }
    }
}

impl FactoryConfig {
    /// Build the configuration from `FACTORY_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = env_var("FACTORY_ADDR") {
            config.addr = addr.parse().map_err(|_| ConfigError::Invalid {
                var: "FACTORY_ADDR",
                value: addr,
            })?;
        }
        if let Some(url) = env_var("FACTORY_DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(base) = env_var("FACTORY_BASE_URL") {
            config.base_url = base.trim_end_matches('/').to_owned();
        }
        if let Some(ms) = env_var("FACTORY_ORDER_DELAY_MS") {
            let parsed: u64 = ms.parse().map_err(|_| ConfigError::Invalid {
                var: "FACTORY_ORDER_DELAY_MS",
                value: ms,
            })?;
            config.order_delay = Duration::from_millis(parsed);
        }
        if let Some(path) = env_var("FACTORY_KEY_PATH") {
            config.private_key_path = PathBuf::from(path);
        }
        if let Some(path) = env_var("FACTORY_PUBLIC_KEY_PATH") {
            config.public_key_path = PathBuf::from(path);
        }

        Ok(config)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
