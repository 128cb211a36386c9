//! # peerline-node
//!
//! The interactive peerline node.
//!
//! This crate provides:
//! - Stream handling: newline-framed inbound messages to a [`MessageObserver`]
//! - [`PeerConnector`]: `connect <peer-addr>`
//! - [`MessageSender`]: `send <peer-id> <message>`
//! - [`CommandLoop`]: the operator console
//! - [`Node`]: lifecycle and identity, generic over any [`Host`](peerline_network::Host)
//!
//! ## Usage
//!
//! ```ignore
//! use peerline_node::{CommandLoop, ConsoleObserver, Node, NodeConfig};
//! use std::sync::Arc;
//!
//! let node = Arc::new(Node::with_tcp_host(NodeConfig::default())?);
//! let addr = node.start(&"/ip4/0.0.0.0/tcp/4001".parse()?, Arc::new(ConsoleObserver)).await?;
//! println!("Node is listening on: {}", addr);
//!
//! let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//! CommandLoop::new(node).run(stdin, tokio::io::stdout()).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
mod command;
mod config;
mod connector;
mod error;
mod handler;
mod node;
mod repl;
mod sender;

pub use command::{Command, ParseError, CONNECT_USAGE, SEND_USAGE};
pub use config::{parse_listen_addr, NodeConfig, MAX_TIMEOUT_SECS};
pub use connector::PeerConnector;
pub use error::{NodeError, NodeResult};
pub use handler::{handle_stream, message_handler, ChannelObserver, ConsoleObserver, MessageObserver};
pub use node::Node;
pub use repl::{CommandLoop, LoopState, PROMPT};
pub use sender::MessageSender;
