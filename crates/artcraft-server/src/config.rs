//! Server configuration from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Default listen address.
pub const DEFAULT_ADDR: &str = "0.0.0.0:3030";
/// Default capacity of each room's broadcast channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid ARTCRAFT_ADDR {value:?}: {source}")]
    Addr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("Invalid ARTCRAFT_CHANNEL_CAPACITY {0:?}: expected a positive integer")]
    ChannelCapacity(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `ARTCRAFT_ADDR`
    pub addr: SocketAddr,
    /// `ARTCRAFT_DATA_DIR`; snapshots are kept in memory when unset.
    pub data_dir: Option<PathBuf>,
    /// `ARTCRAFT_CHANNEL_CAPACITY`
    pub channel_capacity: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let addr_value = get("ARTCRAFT_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr_value.parse().map_err(|source| ConfigError::Addr {
            value: addr_value.clone(),
            source,
        })?;

        let data_dir = get("ARTCRAFT_DATA_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        let channel_capacity = match get("ARTCRAFT_CHANNEL_CAPACITY") {
            None => DEFAULT_CHANNEL_CAPACITY,
            Some(value) => match value.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => capacity,
                _ => return Err(ConfigError::ChannelCapacity(value)),
            },
        };

        Ok(Self {
            addr,
            data_dir,
            channel_capacity,
        })
    }
}
