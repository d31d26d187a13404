//! BIP32 hierarchical-deterministic private key derivation on secp256k1

use crate::error::{PersonaError, PersonaResult};
use hmac::{Hmac, Mac};
use secp256k1::{PublicKey, Scalar, SecretKey, SECP256K1};
use sha2::Sha512;
use std::fmt;
use std::str::FromStr;

type HmacSha512 = Hmac<Sha512>;

const MASTER_KEY_SALT: &[u8] = b"Bitcoin seed";

/// One step of a derivation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildNumber(u32);

impl ChildNumber {
    pub const HARDENED_OFFSET: u32 = 1 << 31;

    pub fn normal(index: u32) -> PersonaResult<Self> {
        if index >= Self::HARDENED_OFFSET {
            return Err(PersonaError::InvalidDerivationPath(format!(
                "index {} out of range",
                index
            )));
        }
        Ok(Self(index))
    }

    pub fn hardened(index: u32) -> PersonaResult<Self> {
        Ok(Self(Self::normal(index)?.0 | Self::HARDENED_OFFSET))
    }

    pub fn is_hardened(&self) -> bool {
        self.0 & Self::HARDENED_OFFSET != 0
    }

    pub fn index(&self) -> u32 {
        self.0 & !Self::HARDENED_OFFSET
    }
}

impl fmt::Display for ChildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_hardened() {
            write!(f, "{}'", self.index())
        } else {
            write!(f, "{}", self.index())
        }
    }
}

/// A path such as `m/44'/60'/0'/0/0`. `'` and `h` both mark hardened steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPath(Vec<ChildNumber>);

impl DerivationPath {
    pub fn children(&self) -> &[ChildNumber] {
        &self.0
    }
}

impl FromStr for DerivationPath {
    type Err = PersonaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        if parts.next() != Some("m") {
            return Err(PersonaError::InvalidDerivationPath(format!(
                "{:?} must start with m",
                s
            )));
        }
        let children = parts
            .map(|part| {
                let (digits, hardened) = match part.strip_suffix(&['\'', 'h'][..]) {
                    Some(digits) => (digits, true),
                    None => (part, false),
                };
                let index: u32 = digits.parse().map_err(|_| {
                    PersonaError::InvalidDerivationPath(format!("bad segment {:?} in {:?}", part, s))
                })?;
                if hardened {
                    ChildNumber::hardened(index)
                } else {
                    ChildNumber::normal(index)
                }
            })
            .collect::<PersonaResult<Vec<_>>>()?;
        Ok(Self(children))
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for child in &self.0 {
            write!(f, "/{}", child)?;
        }
        Ok(())
    }
}

/// A private key together with its chain code.
#[derive(Clone)]
pub struct ExtendedPrivateKey {
    secret_key: SecretKey,
    chain_code: [u8; 32],
    depth: u8,
}

impl ExtendedPrivateKey {
    /// Master key from a BIP39 seed.
    pub fn from_seed(seed: &[u8]) -> PersonaResult<Self> {
        let out = hmac_sha512(MASTER_KEY_SALT, &[seed])?;
        let (il, ir) = out.split_at(32);
        let secret_key = SecretKey::from_slice(il)?;
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(ir);
        Ok(Self {
            secret_key,
            chain_code,
            depth: 0,
        })
    }

    pub fn derive_child(&self, child: ChildNumber) -> PersonaResult<Self> {
        let index = child.0.to_be_bytes();
        let out = if child.is_hardened() {
            let secret = self.secret_key.secret_bytes();
            hmac_sha512(&self.chain_code, &[&[0u8], &secret, &index])?
        } else {
            let public = self.public_key().serialize();
            hmac_sha512(&self.chain_code, &[&public, &index])?
        };
        let (il, ir) = out.split_at(32);

        let mut tweak_bytes = [0u8; 32];
        tweak_bytes.copy_from_slice(il);
        let tweak = Scalar::from_be_bytes(tweak_bytes)
            .map_err(|_| PersonaError::Key(format!("invalid tweak at child {}", child)))?;
        let secret_key = self.secret_key.add_tweak(&tweak)?;

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(ir);
        Ok(Self {
            secret_key,
            chain_code,
            depth: self.depth.saturating_add(1),
        })
    }

    pub fn derive_path(&self, path: &DerivationPath) -> PersonaResult<Self> {
        path.children()
            .iter()
            .try_fold(self.clone(), |key, child| key.derive_child(*child))
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_secret_key(SECP256K1, &self.secret_key)
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }
}

impl fmt::Debug for ExtendedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedPrivateKey")
            .field("public_key", &hex::encode(self.public_key().serialize()))
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

fn hmac_sha512(key: &[u8], parts: &[&[u8]]) -> PersonaResult<[u8; 64]> {
    let mut mac =
        HmacSha512::new_from_slice(key).map_err(|e| PersonaError::Key(e.to_string()))?;
    for part in parts {
        mac.update(part);
    }
    let mut out = [0u8; 64];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}
