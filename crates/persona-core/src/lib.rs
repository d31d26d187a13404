//! Persona Core Library
//!
//! Identities for a local-first social client: keys the user controls
//! ("personas") and the accounts they are seen under ("profiles").
//!
//! ## Overview
//!
//! - **Identifiers**: every persona, profile, group and post has a typed
//!   identifier with a stable canonical text form (`person:twitter/alice`,
//!   `ec_key:secp256k1/<point>`), used as the storage key and wire format.
//! - **Keys**: personas are secp256k1 key pairs derived from a BIP39 phrase
//!   along `m/44'/60'/0'/0/0`, so a persona can be rebuilt from 12 words.
//! - **Storage**: personas and profiles live in redb; linking a profile to a
//!   persona updates both records in one transaction.
//! - **Migration**: one-time import of the older flat "people" records.
//!
//! ## Quick Start
//!
//! ```ignore
//! use persona_core::{LinkedProfileDetails, PersonaEngine, ProfileIdentifier};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = PersonaEngine::new("~/.persona/data").await?;
//!
//!     let (persona, mnemonic) = engine.create_persona_by_mnemonic(Some("Me"), "").await?;
//!     println!("Write this down: {}", mnemonic.word);
//!
//!     let alice: ProfileIdentifier = "person:twitter/alice".parse()?;
//!     engine.observe_profile(&alice, Some("Alice")).await?;
//!     engine.attach_profile(&alice, &persona, LinkedProfileDetails::pending()).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod identifier;
pub mod keys;
pub mod migrate;
pub mod storage;
pub mod types;

// Re-exports
pub use engine::PersonaEngine;
pub use error::{PersonaError, PersonaResult};
pub use identifier::{
    ordered_join, EcKeyIdentifier, GroupIdentifier, Identifier, IdentifierCodec, PersonaIdentifier,
    PostIdentifier, PostIvIdentifier, ProfileIdentifier,
};
pub use keys::{generate, recover, JsonWebKey, MnemonicGeneration, MnemonicRecord};
pub use migrate::{LegacyPersonRecord, LegacySnapshot, LocalKeySource, MigrationReport};
pub use storage::Storage;
pub use types::*;
