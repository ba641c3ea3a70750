//! Cryptographic primitives for AevumChain

use crate::error::ChainError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE, SECRET_KEY_SIZE},
    ecdsa::Signature,
    All, Message, Secp256k1, SecretKey,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// SHA-256 of `data`, rendered as 64 lowercase hex characters.
pub fn digest(data: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(data.as_ref()))
}

/// Opaque public key. The ledger only compares, encodes and verifies with it,
/// so the bytes are whatever the signing backend produces.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKey(#[serde(with = "serde_bytes")] Vec<u8>);

impl PublicKey {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        PublicKey(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Stable text form used inside digests and signed payloads.
    pub fn encode(&self) -> String {
        BASE64.encode(&self.0)
    }

    /// Abbreviated hex form for logs.
    pub fn short(&self) -> String {
        let hex = hex::encode(&self.0);
        if hex.len() > 16 {
            format!("{}..{}", &hex[..8], &hex[hex.len() - 8..])
        } else {
            hex
        }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.short())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Anything that can sign on behalf of a public key.
pub trait Signer {
    fn public_key(&self) -> PublicKey;
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, ChainError>;
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: secp256k1::PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Result<Self, ChainError> {
        let secret_key = SecretKey::new(&mut OsRng);
        Ok(Self::from_secret_key(secret_key))
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = secp256k1::PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Creates a KeyPair from raw secret key bytes.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                ChainError::Crypto(format!(
                    "Secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                ChainError::Crypto(format!("Invalid secret key bytes: {}", e))
            }
        })?;

        Ok(Self::from_secret_key(secret_key))
    }

    /// Compressed public key bytes.
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public_key.serialize()
    }
}

impl Signer for KeyPair {
    fn public_key(&self) -> PublicKey {
        PublicKey::from_bytes(self.public_key_bytes().to_vec())
    }

    /// Hashes the message with SHA-256 and returns the compact ECDSA signature.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, ChainError> {
        let digest = Sha256::digest(message);
        let message = Message::from_digest_slice(&digest)
            .map_err(|e| ChainError::Crypto(format!("Failed to create message: {}", e)))?;

        let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, &self.secret_key);
        Ok(signature.serialize_compact().to_vec())
    }
}

/// Checks `signature` over `message` against `public_key`.
///
/// Absent, malformed or foreign signatures are reported as `false`; this never
/// panics on untrusted input.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: Option<&[u8]>) -> bool {
    let Some(signature_bytes) = signature else {
        return false;
    };
    if public_key.as_bytes().len() != PUBLIC_KEY_SIZE
        || signature_bytes.len() != COMPACT_SIGNATURE_SIZE
    {
        return false;
    }

    let Ok(key) = secp256k1::PublicKey::from_slice(public_key.as_bytes()) else {
        return false;
    };
    let Ok(signature) = Signature::from_compact(signature_bytes) else {
        return false;
    };
    let digest = Sha256::digest(message);
    let Ok(message) = Message::from_digest_slice(&digest) else {
        return false;
    };

    SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature, &key)
        .is_ok()
}
