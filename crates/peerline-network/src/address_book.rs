//! Peer address records

use crate::error::{NetworkError, NetworkResult};
use crate::addr::{Multiaddr, MultiaddrExt, Protocol};
use parking_lot::RwLock;
use peerline_crypto::PeerId;
use std::collections::HashMap;

/// Peer identity plus the transport addresses it is reachable on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddrInfo {
    /// Peer ID
    pub id: PeerId,
    /// Transport addresses, without `/p2p/` suffix
    pub addrs: Vec<Multiaddr>,
}

impl AddrInfo {
    /// Create new addr info
    pub fn new(id: PeerId, addrs: Vec<Multiaddr>) -> Self {
        Self { id, addrs }
    }

    /// Split an address ending in `/p2p/<id>` into identity and transport address
    ///
    /// A bare `/p2p/<id>` yields an empty address list.
    pub fn from_p2p_addr(addr: &Multiaddr) -> NetworkResult<Self> {
        let mut transport = addr.clone();
        match transport.pop() {
            Some(Protocol::P2p(id)) => {
                let addrs = if transport.is_empty() {
                    Vec::new()
                } else {
                    vec![transport]
                };
                Ok(Self { id, addrs })
            }
            _ => Err(NetworkError::MissingPeerId(addr.to_string())),
        }
    }
}

/// Address book
///
/// Entries are kept for the lifetime of the process; there is no expiry.
/// Each peer's addresses are an insertion-ordered set.
#[derive(Debug, Default)]
pub struct AddressBook {
    entries: RwLock<HashMap<PeerId, Vec<Multiaddr>>>,
}

impl AddressBook {
    /// Create an empty address book
    pub fn new() -> Self {
        Self::default()
    }

    /// Record addresses for a peer, returning how many were new
    ///
    /// Re-adding a known `(peer, addr)` pair is a no-op.
    pub fn add_addresses(&self, peer: PeerId, addrs: &[Multiaddr]) -> usize {
        let mut entries = self.entries.write();
        let mut added = 0;
        for addr in addrs {
            let addr = addr.without_peer_id();
            if addr.is_empty() {
                continue;
            }
            let known = entries.entry(peer).or_default();
            if known.contains(&addr) {
                continue;
            }
            known.push(addr);
            added += 1;
        }
        added
    }

    /// Known addresses for a peer
    pub fn addresses(&self, peer: &PeerId) -> Vec<Multiaddr> {
        self.entries.read().get(peer).cloned().unwrap_or_default()
    }
}
