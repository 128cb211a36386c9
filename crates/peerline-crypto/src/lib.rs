//! # peerline-crypto
//!
//! Node identity for peerline.
//!
//! - Keccak-256 hashing for signed challenges
//! - secp256k1 keypairs and ECDSA signatures
//! - libp2p `PeerId` derivation from public keys

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod hash;
mod keys;
mod peer_id;

pub use error::CryptoError;
pub use hash::keccak256;
pub use keys::{Keypair, PublicKey, Signature};
pub use peer_id::{PeerId, PeerIdError};
