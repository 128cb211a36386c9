//! Peer identifiers
//!
//! A node's `PeerId` is the libp2p identity of its secp256k1 public key:
//! the identity multihash of the protobuf-encoded key, shown in base58
//! (`16Uiu2...`). Parsing, display and serde come from `libp2p-identity`.

use crate::CryptoError;
use libp2p_identity::secp256k1;

pub use libp2p_identity::{ParseError as PeerIdError, PeerId};

/// Derive the peer ID of a compressed (33 byte) secp256k1 public key
pub(crate) fn peer_id_from_public_key(compressed: &[u8]) -> Result<PeerId, CryptoError> {
    let key = secp256k1::PublicKey::try_from_bytes(compressed)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    Ok(libp2p_identity::PublicKey::from(key).to_peer_id())
}
