//! JSON Web Key representation of stored key material
//!
//! Persona keys are `EC`/`K-256` keys (`x`, `y`, and for owned personas `d`,
//! all base64url without padding). Profile local keys are symmetric `oct`
//! keys carried in `k`.
//!
//! Fields are plain `Option`s with no skipping so that the postcard
//! encoding used by the store stays positional.

use crate::error::{PersonaError, PersonaResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use secp256k1::{PublicKey, SecretKey, SECP256K1};
use serde::{Deserialize, Serialize};

pub const EC_KEY_TYPE: &str = "EC";
pub const OCT_KEY_TYPE: &str = "oct";
pub const K256_CURVE: &str = "K-256";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    pub kty: String,
    #[serde(default)]
    pub crv: Option<String>,
    #[serde(default)]
    pub x: Option<String>,
    #[serde(default)]
    pub y: Option<String>,
    #[serde(default)]
    pub d: Option<String>,
    #[serde(default)]
    pub k: Option<String>,
    #[serde(default)]
    pub ext: Option<bool>,
    #[serde(default)]
    pub key_ops: Option<Vec<String>>,
}

impl JsonWebKey {
    /// Public-only EC key.
    pub fn from_public_key(key: &PublicKey) -> Self {
        let uncompressed = key.serialize_uncompressed();
        Self {
            kty: EC_KEY_TYPE.to_string(),
            crv: Some(K256_CURVE.to_string()),
            x: Some(URL_SAFE_NO_PAD.encode(&uncompressed[1..33])),
            y: Some(URL_SAFE_NO_PAD.encode(&uncompressed[33..65])),
            d: None,
            k: None,
            ext: Some(true),
            key_ops: Some(Vec::new()),
        }
    }

    /// EC key including the private scalar.
    pub fn from_secret_key(secret: &SecretKey) -> Self {
        let public = PublicKey::from_secret_key(SECP256K1, secret);
        let mut jwk = Self::from_public_key(&public);
        jwk.d = Some(URL_SAFE_NO_PAD.encode(secret.secret_bytes()));
        jwk.key_ops = Some(vec!["deriveKey".to_string(), "deriveBits".to_string()]);
        jwk
    }

    /// Symmetric key.
    pub fn from_symmetric(key: &[u8]) -> Self {
        Self {
            kty: OCT_KEY_TYPE.to_string(),
            crv: None,
            x: None,
            y: None,
            d: None,
            k: Some(URL_SAFE_NO_PAD.encode(key)),
            ext: Some(true),
            key_ops: Some(vec!["encrypt".to_string(), "decrypt".to_string()]),
        }
    }

    pub fn is_private(&self) -> bool {
        self.d.is_some()
    }

    /// Copy of this key without private material.
    pub fn public_only(&self) -> Self {
        let mut jwk = self.clone();
        jwk.d = None;
        jwk.key_ops = Some(Vec::new());
        jwk
    }

    /// Rebuild the curve point from `x` and `y`.
    pub fn to_public_key(&self) -> PersonaResult<PublicKey> {
        self.expect_ec()?;
        let x = decode_coordinate(self.x.as_deref(), "x")?;
        let y = decode_coordinate(self.y.as_deref(), "y")?;
        let mut uncompressed = [0u8; 65];
        uncompressed[0] = 0x04;
        uncompressed[1..33].copy_from_slice(&x);
        uncompressed[33..65].copy_from_slice(&y);
        Ok(PublicKey::from_slice(&uncompressed)?)
    }

    /// The private scalar from `d`.
    pub fn to_secret_key(&self) -> PersonaResult<SecretKey> {
        self.expect_ec()?;
        let d = decode_coordinate(self.d.as_deref(), "d")?;
        Ok(SecretKey::from_slice(&d)?)
    }

    /// Raw bytes of a symmetric key.
    pub fn symmetric_bytes(&self) -> PersonaResult<Vec<u8>> {
        if self.kty != OCT_KEY_TYPE {
            return Err(PersonaError::Key(format!(
                "expected an oct key, found {}",
                self.kty
            )));
        }
        let k = self
            .k
            .as_deref()
            .ok_or_else(|| PersonaError::Key("oct key has no k".to_string()))?;
        URL_SAFE_NO_PAD
            .decode(k)
            .map_err(|e| PersonaError::Key(e.to_string()))
    }

    fn expect_ec(&self) -> PersonaResult<()> {
        if self.kty != EC_KEY_TYPE {
            return Err(PersonaError::Key(format!(
                "expected an EC key, found {}",
                self.kty
            )));
        }
        match self.crv.as_deref() {
            Some(K256_CURVE) | Some("secp256k1") => Ok(()),
            other => Err(PersonaError::Key(format!("unsupported curve {:?}", other))),
        }
    }
}

fn decode_coordinate(value: Option<&str>, name: &str) -> PersonaResult<[u8; 32]> {
    let value = value.ok_or_else(|| PersonaError::Key(format!("EC key has no {}", name)))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| PersonaError::Key(format!("{}: {}", name, e)))?;
    bytes
        .try_into()
        .map_err(|_| PersonaError::Key(format!("{} must be 32 bytes", name)))
}

impl std::fmt::Debug for JsonWebKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonWebKey")
            .field("kty", &self.kty)
            .field("crv", &self.crv)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("d", &self.d.as_ref().map(|_| "<redacted>"))
            .field("k", &self.k.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(byte: u8) -> SecretKey {
        SecretKey::from_slice(&[byte; 32]).unwrap()
    }

    #[test]
    fn test_public_key_roundtrip() {
        let public = PublicKey::from_secret_key(SECP256K1, &secret(3));
        let jwk = JsonWebKey::from_public_key(&public);
        assert_eq!(jwk.kty, "EC");
        assert_eq!(jwk.crv.as_deref(), Some("K-256"));
        assert!(!jwk.is_private());
        assert_eq!(jwk.to_public_key().unwrap(), public);
    }

    #[test]
    fn test_secret_key_roundtrip() {
        let jwk = JsonWebKey::from_secret_key(&secret(5));
        assert!(jwk.is_private());
        assert_eq!(jwk.to_secret_key().unwrap(), secret(5));

        let public = jwk.public_only();
        assert!(!public.is_private());
        assert_eq!(public.to_public_key().unwrap(), jwk.to_public_key().unwrap());
    }

    #[test]
    fn test_symmetric_key() {
        let jwk = JsonWebKey::from_symmetric(&[1, 2, 3, 4]);
        assert_eq!(jwk.symmetric_bytes().unwrap(), vec![1, 2, 3, 4]);
        assert!(jwk.to_public_key().is_err());
    }

    #[test]
    fn test_debug_redacts_private_material() {
        let jwk = JsonWebKey::from_secret_key(&secret(5));
        let debug = format!("{:?}", jwk);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(jwk.d.as_deref().unwrap()));
    }

    #[test]
    fn test_bad_coordinates_rejected() {
        let mut jwk = JsonWebKey::from_public_key(&PublicKey::from_secret_key(SECP256K1, &secret(3)));
        jwk.x = Some("AAAA".to_string());
        assert!(jwk.to_public_key().is_err());
    }

    #[test]
    fn test_postcard_roundtrip() {
        let jwk = JsonWebKey::from_secret_key(&secret(8));
        let bytes = postcard::to_allocvec(&jwk).unwrap();
        let back: JsonWebKey = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(back, jwk);
    }
}
