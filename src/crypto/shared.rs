//! Player / Game-Master Shared Keys
//!
//! secp256k1 ECDH between a player and the game master, fed through the
//! per-turn derivation so each turn gets its own key:
//!
//! 1. shared point = private scalar * other party's public point
//! 2. secret = keccak256(SEC1 compressed shared point, 33 bytes)
//! 3. key = derive_key(secret, ctx, "default")
//!
//! Either side computes the same key from its own private key and the
//! other side's public key.

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{FieldBytes, PublicKey, SecretKey};
use thiserror::Error;

use super::kdf::{derive_key, DerivedKey, KeyContext, Scope};
use crate::core::abi::keccak256;
use crate::core::address::Address;

/// Private key length in bytes.
pub const PRIVATE_KEY_LEN: usize = 32;
/// SEC1 compressed public key length.
pub const COMPRESSED_PUBLIC_KEY_LEN: usize = 33;
/// SEC1 uncompressed public key length.
pub const UNCOMPRESSED_PUBLIC_KEY_LEN: usize = 65;

/// Key material errors. All of them are malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Private key is not 32 bytes.
    #[error("private key must be 32 bytes, got {0}")]
    InvalidPrivateKeyLength(usize),
    /// Private key is zero or not below the curve order.
    #[error("private key is not a valid secp256k1 scalar")]
    InvalidPrivateKey,
    /// Public key is neither 33 nor 65 bytes.
    #[error("public key must be 33 or 65 bytes, got {0}")]
    InvalidPublicKeyLength(usize),
    /// Public key bytes do not encode a curve point.
    #[error("public key is not a valid secp256k1 point")]
    InvalidPublicKey,
    /// Hex decoding failed.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// Parse a 32-byte private key. Other lengths are rejected, never padded.
pub fn parse_private_key(bytes: &[u8]) -> Result<SecretKey, KeyError> {
    if bytes.len() != PRIVATE_KEY_LEN {
        return Err(KeyError::InvalidPrivateKeyLength(bytes.len()));
    }
    SecretKey::from_bytes(FieldBytes::from_slice(bytes)).map_err(|_| KeyError::InvalidPrivateKey)
}

/// Parse a SEC1 public key (compressed or uncompressed).
pub fn parse_public_key(bytes: &[u8]) -> Result<PublicKey, KeyError> {
    // Only the standard SEC1 tags; k256 also accepts the 0x05 compact form.
    let tag_ok = match bytes.len() {
        COMPRESSED_PUBLIC_KEY_LEN => matches!(bytes[0], 0x02 | 0x03),
        UNCOMPRESSED_PUBLIC_KEY_LEN => bytes[0] == 0x04,
        other => return Err(KeyError::InvalidPublicKeyLength(other)),
    };
    if !tag_ok {
        return Err(KeyError::InvalidPublicKey);
    }
    PublicKey::from_sec1_bytes(bytes).map_err(|_| KeyError::InvalidPublicKey)
}

/// Decode `0x`-prefixed or bare hex key material.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, KeyError> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(stripped).map_err(|e| KeyError::InvalidHex(e.to_string()))
}

/// Compressed public key for a private key.
pub fn public_key_from_private(private_key: &[u8]) -> Result<[u8; COMPRESSED_PUBLIC_KEY_LEN], KeyError> {
    let secret = parse_private_key(private_key)?;
    let encoded = secret.public_key().to_encoded_point(true);
    let mut out = [0u8; COMPRESSED_PUBLIC_KEY_LEN];
    out.copy_from_slice(encoded.as_bytes());
    Ok(out)
}

/// Account address of a public key: last 20 bytes of keccak256 over the
/// uncompressed point without its 0x04 prefix.
pub fn address_from_public_key(public_key: &[u8]) -> Result<Address, KeyError> {
    let public = parse_public_key(public_key)?;
    let uncompressed = public.to_encoded_point(false);
    let hash = keccak256(&uncompressed.as_bytes()[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[12..]);
    Ok(Address::new(addr))
}

/// ECDH shared point, SEC1 compressed.
pub fn shared_point(private_key: &[u8], public_key: &[u8]) -> Result<[u8; COMPRESSED_PUBLIC_KEY_LEN], KeyError> {
    let secret = parse_private_key(private_key)?;
    let public = parse_public_key(public_key)?;

    let point = (public.to_projective() * *secret.to_nonzero_scalar()).to_affine();
    let encoded = point.to_encoded_point(true);

    let mut out = [0u8; COMPRESSED_PUBLIC_KEY_LEN];
    out.copy_from_slice(encoded.as_bytes());
    Ok(out)
}

/// Derive the per-turn key shared by a player and the game master.
pub fn derive_shared_key(
    private_key: &[u8],
    public_key: &[u8],
    ctx: &KeyContext,
) -> Result<DerivedKey, KeyError> {
    let point = shared_point(private_key, public_key)?;
    let secret = keccak256(&point);
    Ok(derive_key(&secret, ctx, Scope::DEFAULT))
}

// =============================================================================
// TESTS
// =============================================================================
