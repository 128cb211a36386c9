//! Peer connector: `connect <peer-addr>`

use crate::error::{NodeError, NodeResult};
use peerline_network::{parse_multiaddr, AddrInfo, Host};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Resolves `/.../p2p/<id>` addresses, records them and dials the peer
pub struct PeerConnector<H: Host> {
    host: Arc<H>,
}

impl<H: Host> PeerConnector<H> {
    /// Create a connector over `host`
    pub fn new(host: Arc<H>) -> Self {
        Self { host }
    }

    /// Connect to the peer named by `addr` within `timeout`
    ///
    /// The addresses are recorded permanently even if the dial fails.
    /// Connecting to an already connected peer succeeds without dialing.
    pub async fn connect(&self, addr: &str, timeout: Duration) -> NodeResult<AddrInfo> {
        let multiaddr =
            parse_multiaddr(addr).map_err(|e| NodeError::InvalidAddress(e.to_string()))?;
        let info = AddrInfo::from_p2p_addr(&multiaddr)
            .map_err(|e| NodeError::AddressResolution(e.to_string()))?;

        let added = self.host.add_addresses(info.id, &info.addrs);
        debug!("Recorded {} new address(es) for {}", added, info.id);

        match tokio::time::timeout(timeout, self.host.dial(info.id)).await {
            Ok(Ok(())) => {
                info!("Connected to peer {}", info.id);
                Ok(info)
            }
            Ok(Err(e)) => Err(NodeError::Connection(e.to_string())),
            Err(_) => Err(NodeError::Connection(format!(
                "timed out after {:?} dialing {}",
                timeout, info.id
            ))),
        }
    }
}
