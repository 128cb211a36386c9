//! # peerline-network
//!
//! Transport layer for peerline nodes.
//!
//! This crate provides:
//! - TCP views of libp2p multiaddrs (`/ip4/.../tcp/.../p2p/...`)
//! - A permanent per-peer address book
//! - The [`Host`] capability trait the node core is written against
//! - [`TcpHost`], an authenticated TCP implementation of [`Host`]
//! - Newline-delimited message framing ([`LineCodec`])
//!
//! ## Architecture
//!
//! ```text
//! +-------------------+
//! |    Node core      |  <- generic over Host
//! +-------------------+
//!          |
//! +-------------------+
//! |      TcpHost      |  <- dial / listen / new_stream
//! +-------------------+
//!     |          |
//! +--------+ +-----------+
//! |Address | | Handshake |  <- signed nonce exchange
//! |  Book  | +-----------+
//! +--------+
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use peerline_network::{parse_multiaddr, AddrInfo, Host, ProtocolId, TcpHost};
//!
//! let host = TcpHost::generate()?;
//! let bound = host.listen(&"/ip4/127.0.0.1/tcp/0".parse()?).await?;
//!
//! let target = parse_multiaddr("/ip4/127.0.0.1/tcp/4001/p2p/<peer id>")?;
//! let info = AddrInfo::from_p2p_addr(&target)?;
//! host.add_addresses(info.id, &info.addrs);
//! host.dial(info.id).await?;
//! let stream = host.new_stream(info.id, &ProtocolId::new("/p2p/1.0.0")?).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod addr;
mod address_book;
mod codec;
mod error;
pub mod handshake;
mod host;
mod protocol;
mod tcp;

pub use addr::{parse_multiaddr, resolve, Multiaddr, MultiaddrExt, Protocol};
pub use address_book::{AddrInfo, AddressBook};
pub use codec::{LineCodec, DEFAULT_MAX_MESSAGE_LEN};
pub use error::{NetworkError, NetworkResult};
pub use host::{stream_handler, Host, StreamHandler};
pub use peerline_crypto::PeerId;
pub use protocol::ProtocolId;
pub use tcp::{ConnectionInfo, Direction, TcpHost, TcpHostConfig};
