//! Manager and medium configuration.
//!
//! Configuration is plain data with serde support so it can be loaded from a
//! JSON document:
//!
//! ```json
//! {
//!     "mediums": {
//!         "default": { "kind": "direct" },
//!         "broadcast": { "kind": "broadcast", "bind": "127.0.0.1:5500", "target": "127.0.0.1:5500" }
//!     },
//!     "loggers": {
//!         "main": ["broadcast"]
//!     }
//! }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::Path;
use std::time::Duration;

/// Port the broadcast transport uses unless configured otherwise.
pub const DEFAULT_PORT: u16 = 5500;

/// Name of the in-process medium in the default configuration.
pub const DEFAULT_MEDIUM: &str = "default";

/// Name of the broadcast medium in the default configuration.
pub const BROADCAST_MEDIUM: &str = "broadcast";

/// Broadcast medium settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Local address the transport socket binds.
    pub bind: SocketAddr,

    /// Address every message is sent to.
    pub target: SocketAddr,

    /// Upper bound on one readiness wait in the delivery loop, in milliseconds.
    /// Default: 100
    pub poll_interval_ms: u64,

    /// Largest datagram sent or accepted.
    /// Default: 65507 (IPv4 UDP payload limit)
    pub max_datagram: usize,
}

impl BroadcastConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_PORT));
        Self {
            bind: addr,
            target: addr,
            poll_interval_ms: 100,
            max_datagram: 65_507,
        }
    }
}

/// Which medium to build under a name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediumConfig {
    /// Synchronous in-process delivery.
    Direct,
    /// Delivery over a pub/sub transport with a background thread.
    Broadcast(BroadcastConfig),
}

/// Configuration consumed by [`Manager::new`](crate::Manager::new).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Mediums to construct, by name.
    pub mediums: HashMap<String, MediumConfig>,

    /// Mediums each named logger is equipped with when first created.
    pub loggers: HashMap<String, Vec<String>>,
}

impl ManagerConfig {
    /// Parse a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read and parse a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Equip `logger` with `medium` on creation.
    pub fn bind_logger(mut self, logger: impl Into<String>, medium: impl Into<String>) -> Self {
        self.loggers.entry(logger.into()).or_default().push(medium.into());
        self
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        let mut mediums = HashMap::new();
        mediums.insert(DEFAULT_MEDIUM.to_string(), MediumConfig::Direct);
        mediums.insert(
            BROADCAST_MEDIUM.to_string(),
            MediumConfig::Broadcast(BroadcastConfig::default()),
        );
        Self {
            mediums,
            loggers: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ManagerConfig::default();
        assert_eq!(config.mediums.get(DEFAULT_MEDIUM), Some(&MediumConfig::Direct));
        match config.mediums.get(BROADCAST_MEDIUM) {
            Some(MediumConfig::Broadcast(broadcast)) => {
                assert_eq!(broadcast.bind.port(), DEFAULT_PORT);
                assert_eq!(broadcast.poll_interval(), Duration::from_millis(100));
            }
            other => panic!("Expected broadcast medium, got {:?}", other),
        }
        assert!(config.loggers.is_empty());
    }

    #[test]
    fn test_parse_json() {
        let config = ManagerConfig::from_json_str(
            r#"{
                "mediums": {
                    "local": { "kind": "direct" },
                    "net": { "kind": "broadcast", "bind": "127.0.0.1:6000", "poll_interval_ms": 20 }
                },
                "loggers": { "main": ["local", "net"] }
            }"#,
        )
        .unwrap();

        assert_eq!(config.mediums.len(), 2);
        match &config.mediums["net"] {
            MediumConfig::Broadcast(net) => {
                assert_eq!(net.bind.port(), 6000);
                assert_eq!(net.target.port(), DEFAULT_PORT);
                assert_eq!(net.poll_interval_ms, 20);
            }
            other => panic!("Expected broadcast medium, got {:?}", other),
        }
        assert_eq!(config.loggers["main"], vec!["local".to_string(), "net".to_string()]);
    }

    #[test]
    fn test_parse_error() {
        let result = ManagerConfig::from_json_str(r#"{ "mediums": { "x": { "kind": "carrier-pigeon" } } }"#);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logging.json");
        std::fs::write(&path, r#"{ "loggers": { "main": ["default"] } }"#).unwrap();

        let config = ManagerConfig::load(&path).unwrap();
        assert_eq!(config.loggers["main"], vec!["default".to_string()]);
        // Unspecified sections fall back to defaults.
        assert!(config.mediums.contains_key(DEFAULT_MEDIUM));
    }

    #[test]
    fn test_bind_logger() {
        let config = ManagerConfig::default()
            .bind_logger("main", DEFAULT_MEDIUM)
            .bind_logger("main", BROADCAST_MEDIUM);
        assert_eq!(config.loggers["main"].len(), 2);
    }
}
