// --- Cryptographic Primitives ---
//
// Curve25519 (Ed25519 variant) keys and signatures, the hash functions used
// project-wide, and the base58/base64 helpers for external representations.

use blake2::Blake2b;
use ed25519_dalek as ed25519;
use ed25519_dalek::Verifier;
use serde::{Deserialize, Serialize};
use sha2::digest::consts::U32;
use sha2::{Digest, Sha256};
use sha3::Keccak256;
use std::fmt;

use crate::error::CodecError;

pub const PUBLIC_KEY_LENGTH: usize = 32;
pub const SIGNATURE_LENGTH: usize = 64;
pub const DIGEST_LENGTH: usize = 32;

pub type DigestBytes = [u8; DIGEST_LENGTH];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey(pub ed25519::VerifyingKey);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8; PUBLIC_KEY_LENGTH]) -> Result<Self, CodecError> {
        ed25519::VerifyingKey::from_bytes(bytes)
            .map(PublicKey)
            .map_err(|_| CodecError::InvalidPublicKey)
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.0.to_bytes()
    }

    /// Checks an Ed25519 signature over `message` against this key.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.0.verify(message, &signature.0).is_ok()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base58_encode(&self.to_bytes()))
    }
}

// Signatures can be compared but not hashed, which is why `Hash` is not derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(pub ed25519::Signature);

impl Signature {
    pub fn from_bytes(bytes: &[u8; SIGNATURE_LENGTH]) -> Self {
        Signature(ed25519::Signature::from_bytes(bytes))
    }

    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        self.0.to_bytes()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base58_encode(&self.to_bytes()))
    }
}

// --- Hashes ---

type Blake2b256 = Blake2b<U32>;

pub fn sha256(data: &[u8]) -> DigestBytes {
    Sha256::digest(data).into()
}

pub fn keccak256(data: &[u8]) -> DigestBytes {
    Keccak256::digest(data).into()
}

pub fn blake2b256(data: &[u8]) -> DigestBytes {
    Blake2b256::digest(data).into()
}

// --- External string representations ---

pub fn base58_encode(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

/// Decodes base58, refusing inputs longer than `max_len` characters before
/// any decoding work happens.
pub fn base58_decode(input: &str, max_len: usize) -> Result<Vec<u8>, CodecError> {
    if input.len() > max_len {
        return Err(CodecError::TooLong { len: input.len(), max: max_len });
    }
    bs58::decode(input).into_vec().map_err(|_| CodecError::Base58)
}

pub fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub fn base64_decode(input: &str, max_len: usize) -> Result<Vec<u8>, CodecError> {
    use base64::Engine;
    if input.len() > max_len {
        return Err(CodecError::TooLong { len: input.len(), max: max_len });
    }
    base64::engine::general_purpose::STANDARD
        .decode(input)
        .map_err(|_| CodecError::Base64)
}
