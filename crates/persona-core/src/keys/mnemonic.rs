//! Mnemonic-backed persona key generation and recovery
//!
//! ```text
//! phrase (BIP39, 12 English words)
//!   └─ seed      PBKDF2-HMAC-SHA512, 2048 rounds, salt "mnemonic" + password
//!       └─ master  BIP32
//!           └─ m/44'/60'/0'/0/0  → secp256k1 key pair
//! ```
//!
//! Recovery must reproduce the exact key pair for the same phrase and
//! password. Phrases that fail the word-list checksum are still recovered:
//! older phrases predate stricter validation, so a mismatch is logged and
//! flagged on the result instead of returned as an error.

use super::{ExtendedPrivateKey, DerivationPath, JsonWebKey};
use crate::error::{PersonaError, PersonaResult};
use crate::identifier::EcKeyIdentifier;
use bip39::{Language, Mnemonic};
use rand::RngCore;
use secp256k1::{PublicKey, SecretKey, SECP256K1};
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use unicode_normalization::UnicodeNormalization;

/// Private key at m/44'/coinType'/account'/change/addressIndex, coinType = ether
pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

const PBKDF2_ROUNDS: u32 = 2048;

/// 128 bits of entropy gives a 12-word phrase
const ENTROPY_BYTES: usize = 16;

/// How a mnemonic-backed persona was derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MnemonicParameter {
    pub path: String,
    pub with_password: bool,
}

/// Stored alongside a persona so the UI can offer mnemonic recovery.
///
/// `word` is the raw phrase and is secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnemonicRecord {
    pub parameter: MnemonicParameter,
    pub word: String,
}

impl std::fmt::Debug for MnemonicRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MnemonicRecord")
            .field("parameter", &self.parameter)
            .field("word", &"<redacted>")
            .finish()
    }
}

/// A secp256k1 key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct EcKeyPair {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl EcKeyPair {
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(SECP256K1, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// The persona identifier for this key pair.
    pub fn identifier(&self) -> EcKeyIdentifier {
        EcKeyIdentifier::from_public_key(&self.public_key)
    }

    pub fn public_jwk(&self) -> JsonWebKey {
        JsonWebKey::from_public_key(&self.public_key)
    }

    pub fn private_jwk(&self) -> JsonWebKey {
        JsonWebKey::from_secret_key(&self.secret_key)
    }
}

impl std::fmt::Debug for EcKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcKeyPair")
            .field("public_key", &hex::encode(self.public_key.serialize()))
            .finish_non_exhaustive()
    }
}

/// Result of generating or recovering a mnemonic-backed key pair.
#[derive(Clone)]
pub struct MnemonicGeneration {
    pub key_pair: EcKeyPair,
    pub password: String,
    pub mnemonic_record: MnemonicRecord,
    /// False when the phrase failed word-list checksum validation
    pub checksum_valid: bool,
}

impl MnemonicGeneration {
    /// Turn a soft checksum failure into a hard one.
    pub fn require_valid_checksum(self) -> PersonaResult<Self> {
        if self.checksum_valid {
            Ok(self)
        } else {
            Err(PersonaError::MnemonicChecksumMismatch)
        }
    }
}

impl std::fmt::Debug for MnemonicGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MnemonicGeneration")
            .field("key_pair", &self.key_pair)
            .field("mnemonic_record", &self.mnemonic_record)
            .field("checksum_valid", &self.checksum_valid)
            .finish_non_exhaustive()
    }
}

/// Generate a fresh phrase from the thread-local RNG and derive its key pair.
pub fn generate(password: &str) -> PersonaResult<MnemonicGeneration> {
    generate_with_rng(&mut rand::rng(), password)
}

/// Generate a phrase from `rng`'s entropy and derive its key pair.
pub fn generate_with_rng<R: RngCore + ?Sized>(
    rng: &mut R,
    password: &str,
) -> PersonaResult<MnemonicGeneration> {
    let mut entropy = [0u8; ENTROPY_BYTES];
    rng.fill_bytes(&mut entropy);
    let mnemonic =
        Mnemonic::from_entropy_in(Language::English, &entropy).map_err(|e| PersonaError::Key(e.to_string()))?;
    derive(mnemonic.to_string(), password, true)
}

/// Recover the key pair for an existing phrase.
///
/// Never fails on a checksum mismatch; see [`MnemonicGeneration::checksum_valid`].
pub fn recover(mnemonic_word: &str, password: &str) -> PersonaResult<MnemonicGeneration> {
    let checksum_valid = validate_mnemonic(mnemonic_word);
    if !checksum_valid {
        tracing::warn!("Mnemonic failed checksum validation, recovering anyway");
    }
    derive(mnemonic_word.to_string(), password, checksum_valid)
}

/// Check a phrase against the English word list and its checksum.
pub fn validate_mnemonic(mnemonic_word: &str) -> bool {
    Mnemonic::parse_in_normalized(Language::English, mnemonic_word).is_ok()
}

/// BIP39 seed for a phrase and password.
///
/// Works on any phrase, valid or not, NFKD-normalising both inputs.
pub fn mnemonic_to_seed(mnemonic_word: &str, password: &str) -> [u8; 64] {
    let phrase: String = mnemonic_word.nfkd().collect();
    let salt: String = format!("mnemonic{}", password).nfkd().collect();
    let mut seed = [0u8; 64];
    pbkdf2::pbkdf2_hmac::<Sha512>(phrase.as_bytes(), salt.as_bytes(), PBKDF2_ROUNDS, &mut seed);
    seed
}

fn derive(word: String, password: &str, checksum_valid: bool) -> PersonaResult<MnemonicGeneration> {
    let path: DerivationPath = DEFAULT_DERIVATION_PATH.parse()?;
    let seed = mnemonic_to_seed(&word, password);
    let master = ExtendedPrivateKey::from_seed(&seed)?;
    let derived = master.derive_path(&path)?;
    let key_pair = EcKeyPair::from_secret_key(*derived.secret_key());

    tracing::debug!(
        persona = %key_pair.identifier(),
        with_password = !password.is_empty(),
        "Derived persona key from mnemonic"
    );

    Ok(MnemonicGeneration {
        key_pair,
        password: password.to_string(),
        mnemonic_record: MnemonicRecord {
            parameter: MnemonicParameter {
                path: DEFAULT_DERIVATION_PATH.to_string(),
                with_password: !password.is_empty(),
            },
            word,
        },
        checksum_valid,
    })
}
