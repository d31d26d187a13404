//! EC key identifiers: `ec_key:secp256k1/<compressed point>`
//!
//! This is the persona identifier. The compressed point is the standard
//! base64 encoding of the 33-byte SEC1 compressed public key, so it may
//! contain `/`, which is stored as `|`.

use super::{canonical_text_impls, escape_separator, escaped_component, restore_separator, Canonical, Identifier, SEPARATOR};
use crate::error::PersonaResult;
use crate::keys::{compress_public_key, JsonWebKey};

/// The only curve personas are defined on
pub const SECP256K1_CURVE: &str = "secp256k1";

/// Identifies a point on the secp256k1 curve.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EcKeyIdentifier {
    /// Compressed point with `/` escaped
    encoded_compressed_key: String,
}

/// Personas are keyed by their public key.
pub type PersonaIdentifier = EcKeyIdentifier;

impl EcKeyIdentifier {
    /// Wrap an already compressed point (standard base64).
    ///
    /// The point must be non-empty and must not contain `|`.
    pub fn new(compressed_point: &str) -> PersonaResult<Self> {
        Ok(Self {
            encoded_compressed_key: escaped_component("compressed_point", compressed_point)?,
        })
    }

    /// Compress a public key and wrap it.
    pub fn from_public_key(key: &secp256k1::PublicKey) -> Self {
        // Base64 output is never empty and never contains `|`
        Self {
            encoded_compressed_key: escape_separator(&compress_public_key(key)),
        }
    }

    /// Compress the public part of a JWK and wrap it.
    pub fn from_jwk(key: &JsonWebKey) -> PersonaResult<Self> {
        Ok(Self::from_public_key(&key.to_public_key()?))
    }

    pub fn curve(&self) -> &'static str {
        SECP256K1_CURVE
    }

    /// The compressed point with `/` restored.
    pub fn compressed_point(&self) -> String {
        restore_separator(&self.encoded_compressed_key)
    }

    /// Decode the compressed point back into a public key.
    pub fn to_public_key(&self) -> PersonaResult<secp256k1::PublicKey> {
        crate::keys::decompress_public_key(&self.compressed_point())
    }

    pub fn to_text(&self) -> String {
        format!(
            "{}:{}/{}",
            Identifier::EC_KEY_KIND,
            SECP256K1_CURVE,
            self.encoded_compressed_key
        )
    }

    pub(crate) fn decode_payload(payload: &str) -> Option<Self> {
        let mut parts = payload.split(SEPARATOR);
        let curve = parts.next()?;
        let point = parts.next().filter(|s| !s.is_empty())?;
        if curve != SECP256K1_CURVE || parts.next().is_some() {
            return None;
        }
        Some(Self {
            encoded_compressed_key: point.to_string(),
        })
    }
}

impl Canonical for EcKeyIdentifier {
    fn to_text(&self) -> String {
        EcKeyIdentifier::to_text(self)
    }
}

canonical_text_impls!(EcKeyIdentifier, EcKey);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersonaError;
    use secp256k1::{PublicKey, SecretKey, SECP256K1};

    fn key(byte: u8) -> PublicKey {
        let secret = SecretKey::from_slice(&[byte; 32]).unwrap();
        PublicKey::from_secret_key(SECP256K1, &secret)
    }

    #[test]
    fn test_escapes_slash_in_point() {
        let id = EcKeyIdentifier::new("A/B+C/D=").unwrap();
        assert_eq!(id.to_text(), "ec_key:secp256k1/A|B+C|D=");
        assert_eq!(id.compressed_point(), "A/B+C/D=");

        let parsed: EcKeyIdentifier = id.to_text().parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(parsed.compressed_point(), "A/B+C/D=");
    }

    #[test]
    fn test_from_public_key_roundtrip() {
        let public = key(7);
        let id = EcKeyIdentifier::from_public_key(&public);
        assert_eq!(id.curve(), "secp256k1");
        assert_eq!(id.to_public_key().unwrap(), public);
    }

    #[test]
    fn test_from_jwk_matches_from_public_key() {
        let public = key(9);
        let jwk = JsonWebKey::from_public_key(&public);
        assert_eq!(
            EcKeyIdentifier::from_jwk(&jwk).unwrap(),
            EcKeyIdentifier::from_public_key(&public)
        );
    }

    #[test]
    fn test_new_rejects_empty_and_escape_char() {
        assert!(matches!(
            EcKeyIdentifier::new(""),
            Err(PersonaError::EmptyIdentifierComponent { field: "compressed_point" })
        ));
        assert!(matches!(
            EcKeyIdentifier::new("A|B"),
            Err(PersonaError::InvalidIdentifierComponent { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_other_curves() {
        assert!(EcKeyIdentifier::decode_payload("p256/AAAA").is_none());
        assert!(EcKeyIdentifier::decode_payload("secp256k1/").is_none());
        assert!(EcKeyIdentifier::decode_payload("secp256k1/a/b").is_none());
    }
}
