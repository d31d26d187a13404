//! Persona key material and deterministic derivation
//!
//! - **JWK**: the stored shape of persona and profile keys
//! - **Compression**: SEC1 compressed points, the canonical persona key form
//! - **HD derivation**: BIP32 private derivation along a fixed path
//! - **Mnemonic**: BIP39 phrase generation and recovery
//!
//! ## Example
//!
//! ```rust
//! use persona_core::keys::{generate, recover};
//!
//! let generated = generate("correct horse").unwrap();
//! let recovered = recover(&generated.mnemonic_record.word, "correct horse").unwrap();
//! assert_eq!(generated.key_pair.identifier(), recovered.key_pair.identifier());
//! ```

mod compression;
mod hd;
mod jwk;
mod mnemonic;

pub use compression::{compress_jwk, compress_public_key, decompress_public_key, decompress_to_jwk};
pub use hd::{ChildNumber, DerivationPath, ExtendedPrivateKey};
pub use jwk::{JsonWebKey, EC_KEY_TYPE, K256_CURVE, OCT_KEY_TYPE};
pub use mnemonic::{
    generate, generate_with_rng, mnemonic_to_seed, recover, validate_mnemonic, EcKeyPair,
    MnemonicGeneration, MnemonicParameter, MnemonicRecord, DEFAULT_DERIVATION_PATH,
};
