//! CLI argument parsing for peerline

use crate::config::NodeConfig;
use crate::error::NodeResult;
use clap::Parser;
use std::path::PathBuf;

/// Interactive peer-to-peer messaging node
#[derive(Parser, Debug, Clone)]
#[command(name = "peerline")]
#[command(about = "Interactive peer-to-peer messaging node")]
#[command(version)]
pub struct Cli {
    /// Listen address: a port (e.g. 4001), ip:port, or multiaddr
    pub listen: String,

    /// TOML config file (optional, defaults apply otherwise)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long)]
    pub log_level: Option<String>,

    /// Deadline for the connect command, in seconds (at most one day)
    #[arg(long)]
    pub connect_timeout: Option<u64>,

    /// Deadline for the send command, in seconds (at most one day)
    #[arg(long)]
    pub send_timeout: Option<u64>,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Load the config file, if any, and apply flag overrides
    pub fn node_config(&self) -> NodeResult<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::load(path)?,
            None => NodeConfig::default(),
        };

        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(secs) = self.connect_timeout {
            config.connect_timeout_secs = secs;
        }
        if let Some(secs) = self.send_timeout {
            config.send_timeout_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NodeError;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["peerline", "4001"]);
        assert_eq!(cli.listen, "4001");
        assert!(cli.config.is_none());
        assert!(cli.log_level.is_none());

        let config = cli.node_config().unwrap();
        assert_eq!(config, NodeConfig::default());
    }

    #[test]
    fn test_cli_requires_listen() {
        assert!(Cli::try_parse_from(["peerline"]).is_err());
    }

    #[test]
    fn test_cli_custom_values() {
        let cli = Cli::parse_from([
            "peerline",
            "/ip4/127.0.0.1/tcp/4001",
            "--log-level", "debug",
            "--connect-timeout", "3",
            "--send-timeout", "7",
        ]);
        assert_eq!(cli.listen, "/ip4/127.0.0.1/tcp/4001");

        let config = cli.node_config().unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.connect_timeout(), Duration::from_secs(3));
        assert_eq!(config.send_timeout(), Duration::from_secs(7));
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"send_timeout_secs = 2\nconnect_timeout_secs = 4\n")
            .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::parse_from(["peerline", "4001", "--config", &path, "--send-timeout", "9"]);
        let config = cli.node_config().unwrap();
        assert_eq!(config.send_timeout_secs, 9);
        assert_eq!(config.connect_timeout_secs, 4);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let cli = Cli::parse_from(["peerline", "4001", "--connect-timeout", "0"]);
        assert!(matches!(cli.node_config(), Err(NodeError::Config(_))));
    }

    #[test]
    fn test_huge_send_timeout_rejected() {
        let cli = Cli::parse_from([
            "peerline",
            "4001",
            "--send-timeout",
            "18446744073709551615",
        ]);
        assert_eq!(cli.send_timeout, Some(u64::MAX));
        assert!(matches!(cli.node_config(), Err(NodeError::Config(_))));
    }
}
