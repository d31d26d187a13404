//! secp256k1 point compression
//!
//! The canonical persona key form is the 33-byte SEC1 compressed point,
//! encoded with standard (padded) base64.

use super::JsonWebKey;
use crate::error::{PersonaError, PersonaResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use secp256k1::PublicKey;

/// Compress a public key to its canonical text form.
pub fn compress_public_key(key: &PublicKey) -> String {
    STANDARD.encode(key.serialize())
}

/// Inverse of [`compress_public_key`].
pub fn decompress_public_key(compressed: &str) -> PersonaResult<PublicKey> {
    let bytes = STANDARD
        .decode(compressed)
        .map_err(|e| PersonaError::Key(format!("compressed point: {}", e)))?;
    if bytes.len() != 33 {
        return Err(PersonaError::Key(format!(
            "compressed point must be 33 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(PublicKey::from_slice(&bytes)?)
}

/// Compress the public part of an EC JWK.
pub fn compress_jwk(key: &JsonWebKey) -> PersonaResult<String> {
    Ok(compress_public_key(&key.to_public_key()?))
}

/// Expand a compressed point into a public-only JWK.
pub fn decompress_to_jwk(compressed: &str) -> PersonaResult<JsonWebKey> {
    Ok(JsonWebKey::from_public_key(&decompress_public_key(compressed)?))
}
