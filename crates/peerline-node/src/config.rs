//! Node configuration

use crate::error::{NodeError, NodeResult};
use peerline_network::{
    parse_multiaddr, Multiaddr, MultiaddrExt, ProtocolId, TcpHostConfig, DEFAULT_MAX_MESSAGE_LEN,
};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Node configuration
///
/// Every field has a default, so an empty TOML file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    /// Protocol identifier for message streams
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Deadline for `connect`, in seconds
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Deadline for `send`, in seconds
    #[serde(default = "default_timeout_secs")]
    pub send_timeout_secs: u64,
    /// Handshake timeout inside the host, in seconds
    #[serde(default = "default_timeout_secs")]
    pub handshake_timeout_secs: u64,
    /// Largest inbound message accepted, in bytes
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Upper bound for every timeout setting (one day)
pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;

fn default_protocol() -> String {
    "/p2p/1.0.0".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_message_len() -> usize {
    DEFAULT_MAX_MESSAGE_LEN
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            connect_timeout_secs: default_timeout_secs(),
            send_timeout_secs: default_timeout_secs(),
            handshake_timeout_secs: default_timeout_secs(),
            max_message_len: default_max_message_len(),
            log_level: default_log_level(),
        }
    }
}

impl NodeConfig {
    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> NodeResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> NodeResult<Self> {
        tracing::info!("Loading config from {:?}", path);
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Check field values
    pub fn validate(&self) -> NodeResult<()> {
        self.protocol_id()?;
        if self.connect_timeout_secs == 0 || self.send_timeout_secs == 0 {
            return Err(NodeError::Config("timeouts must be at least 1 second".into()));
        }
        if self.handshake_timeout_secs == 0 {
            return Err(NodeError::Config(
                "handshake timeout must be at least 1 second".into(),
            ));
        }
        for (name, secs) in [
            ("connect_timeout_secs", self.connect_timeout_secs),
            ("send_timeout_secs", self.send_timeout_secs),
            ("handshake_timeout_secs", self.handshake_timeout_secs),
        ] {
            if secs > MAX_TIMEOUT_SECS {
                return Err(NodeError::Config(format!(
                    "{} = {} exceeds the maximum of {} seconds",
                    name, secs, MAX_TIMEOUT_SECS
                )));
            }
        }
        if self.max_message_len == 0 {
            return Err(NodeError::Config("max_message_len must be positive".into()));
        }
        Ok(())
    }

    /// Parsed protocol identifier
    pub fn protocol_id(&self) -> NodeResult<ProtocolId> {
        ProtocolId::new(self.protocol.as_str()).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Deadline for `connect`
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Deadline for `send`
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    /// Settings for the TCP host
    pub fn host_config(&self) -> TcpHostConfig {
        TcpHostConfig {
            dial_timeout: self.connect_timeout(),
            handshake_timeout: Duration::from_secs(self.handshake_timeout_secs),
        }
    }
}

/// Parse the listen argument
///
/// Accepts a bare port (bound on all IPv4 interfaces), an `ip:port` socket
/// address, or a multiaddr.
pub fn parse_listen_addr(input: &str) -> NodeResult<Multiaddr> {
    let input = input.trim();
    if let Ok(port) = input.parse::<u16>() {
        return Ok(Multiaddr::from_socket_addr(SocketAddr::from((
            Ipv4Addr::UNSPECIFIED,
            port,
        ))));
    }
    if let Ok(addr) = input.parse::<SocketAddr>() {
        return Ok(Multiaddr::from_socket_addr(addr));
    }
    if input.starts_with('/') {
        return parse_multiaddr(input).map_err(|e| NodeError::InvalidAddress(e.to_string()));
    }
    Err(NodeError::InvalidAddress(format!(
        "{:?}: expected a port, ip:port or multiaddr",
        input
    )))
}
