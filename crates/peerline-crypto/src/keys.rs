//! secp256k1 keypairs and ECDSA signatures

use crate::peer_id::peer_id_from_public_key;
use crate::{CryptoError, PeerId};
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature as K256Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;

/// Compressed SEC1 public key length
const PUBLIC_KEY_LEN: usize = 33;

/// Signature length (r || s)
const SIGNATURE_LEN: usize = 64;

/// Node keypair
pub struct Keypair {
    secret: SigningKey,
    public: PublicKey,
}

impl Keypair {
    /// Generate a new random keypair
    pub fn generate() -> Result<Self, CryptoError> {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    /// Restore a keypair from 32 secret key bytes
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let secret = SigningKey::from_slice(bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Self::from_signing_key(secret)
    }

    fn from_signing_key(secret: SigningKey) -> Result<Self, CryptoError> {
        let public = PublicKey::from_verifying_key(VerifyingKey::from(&secret))?;
        Ok(Self { secret, public })
    }

    /// Get the public key
    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    /// Get the peer ID derived from the public key
    pub fn peer_id(&self) -> PeerId {
        self.public.peer_id
    }

    /// Sign a 32-byte digest
    pub fn sign(&self, digest: &[u8; 32]) -> Result<Signature, CryptoError> {
        let signature: K256Signature = self
            .secret
            .sign_prehash(digest)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
        let mut bytes = [0u8; SIGNATURE_LEN];
        bytes.copy_from_slice(&signature.to_bytes());
        Ok(Signature(bytes))
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("peer_id", &self.public.peer_id)
            .finish_non_exhaustive()
    }
}

/// Public key (compressed secp256k1 point)
///
/// Carries the derived `PeerId`, so identity lookups never re-encode the key.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    key: VerifyingKey,
    peer_id: PeerId,
}

impl PublicKey {
    fn from_verifying_key(key: VerifyingKey) -> Result<Self, CryptoError> {
        let peer_id = peer_id_from_public_key(key.to_encoded_point(true).as_bytes())?;
        Ok(Self { key, peer_id })
    }

    /// Parse from SEC1 bytes (compressed or uncompressed)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Self::from_verifying_key(key)
    }

    /// Parse from hex string
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Compressed SEC1 encoding (33 bytes)
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        let point = self.key.to_encoded_point(true);
        let mut bytes = [0u8; PUBLIC_KEY_LEN];
        bytes.copy_from_slice(point.as_bytes());
        bytes
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// The libp2p peer ID of this key
    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// Verify a signature over a 32-byte digest
    pub fn verify(&self, digest: &[u8; 32], signature: &Signature) -> bool {
        match K256Signature::from_slice(&signature.0) {
            Ok(sig) => self.key.verify_prehash(digest, &sig).is_ok(),
            Err(_) => false,
        }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

/// ECDSA signature (64 bytes, r || s)
#[derive(Clone, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    /// Create from slice
    pub fn from_slice(slice: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; SIGNATURE_LEN] = slice.try_into().map_err(|_| {
            CryptoError::InvalidSignature(format!(
                "expected {} bytes, got {}",
                SIGNATURE_LEN,
                slice.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Parse from hex string
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))
            .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Get as bytes
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}..)", hex::encode(&self.0[..8]))
    }
}
