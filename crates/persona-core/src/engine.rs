//! PersonaEngine - the primary entry point for persona management
//!
//! PersonaEngine ties together:
//! - Mnemonic-based persona creation and recovery
//! - The redb-backed persona/profile store
//! - The one-time legacy people migration
//!
//! # Example
//!
//! ```ignore
//! use persona_core::PersonaEngine;
//!
//! let engine = PersonaEngine::new("~/.persona/data").await?;
//!
//! // Create a persona and write down the phrase
//! let (persona_id, mnemonic) = engine.create_persona_by_mnemonic(Some("Me"), "").await?;
//!
//! // Link an observed account to it
//! let profile_id: ProfileIdentifier = "person:twitter/alice".parse()?;
//! engine.observe_profile(&profile_id, None).await?;
//! engine.attach_profile(&profile_id, &persona_id, LinkedProfileDetails::pending()).await?;
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::PersonaResult;
use crate::identifier::{IdentifierCodec, PersonaIdentifier, ProfileIdentifier};
use crate::keys::{self, MnemonicRecord};
use crate::migrate::{self, LegacySnapshot, LocalKeySource, MigrationReport, LEGACY_PEOPLE_MIGRATION};
use crate::storage::Storage;
use crate::types::{LinkedProfileDetails, PersonaRecord, ProfileRecord};

/// File name of the database inside the data directory
pub const DATABASE_FILE: &str = "persona.redb";

/// Main entry point for persona management
pub struct PersonaEngine {
    /// Persistent storage for personas, profiles and migration flags
    storage: Storage,
    /// Identifier codec sharing the process-wide decode cache
    codec: IdentifierCodec,
    /// Data directory path
    data_dir: PathBuf,
}

impl PersonaEngine {
    /// Create a new PersonaEngine with the given data directory
    ///
    /// # Errors
    ///
    /// Returns `PersonaError::Io` if the directory cannot be created.
    /// Returns `PersonaError::Database` if storage initialization fails.
    pub async fn new(data_dir: impl AsRef<Path>) -> PersonaResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        info!(?data_dir, "Initializing PersonaEngine");

        std::fs::create_dir_all(&data_dir)?;
        let storage = Storage::new(data_dir.join(DATABASE_FILE))?;

        Ok(Self {
            storage,
            codec: IdentifierCodec::global().clone(),
            data_dir,
        })
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get a reference to the storage layer
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn codec(&self) -> &IdentifierCodec {
        &self.codec
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Personas
    // ═══════════════════════════════════════════════════════════════════════

    /// Generate a fresh mnemonic and store the persona it derives.
    ///
    /// Returns the persona identifier and the mnemonic record; the phrase is
    /// also kept on the stored persona.
    pub async fn create_persona_by_mnemonic(
        &self,
        nickname: Option<&str>,
        password: &str,
    ) -> PersonaResult<(PersonaIdentifier, MnemonicRecord)> {
        let generation = keys::generate(password)?;
        let record = PersonaRecord::from_mnemonic(&generation, nickname.map(str::to_string));
        self.storage.create_persona(&record)?;

        info!(persona = %record.identifier, "Created persona from new mnemonic");
        Ok((record.identifier, generation.mnemonic_record))
    }

    /// Recover a persona from a phrase.
    ///
    /// If the derived persona is already stored it is returned as stored,
    /// except that a public-only record (for example one created by the
    /// legacy migration) gains the recovered private key and mnemonic.
    /// A phrase with a bad checksum is still accepted; see
    /// [`keys::recover`].
    pub async fn restore_persona_by_mnemonic(
        &self,
        mnemonic_word: &str,
        password: &str,
        nickname: Option<&str>,
    ) -> PersonaResult<PersonaRecord> {
        let generation = keys::recover(mnemonic_word, password)?;
        let identifier = generation.key_pair.identifier();

        if let Some(existing) = self.storage.query_persona(&identifier)? {
            if existing.has_private_key() {
                debug!(persona = %identifier, "Persona already present, not restoring");
                return Ok(existing);
            }
            let (record, _) = self.storage.fill_private_key(
                &identifier,
                &generation.key_pair.private_jwk(),
                Some(&generation.mnemonic_record),
            )?;
            info!(persona = %identifier, "Restored private key onto existing persona");
            return Ok(record);
        }

        let record = PersonaRecord::from_mnemonic(&generation, nickname.map(str::to_string));
        self.storage.create_persona(&record)?;
        info!(
            persona = %identifier,
            checksum_valid = generation.checksum_valid,
            "Restored persona from mnemonic"
        );
        Ok(record)
    }

    pub async fn query_persona(&self, id: &PersonaIdentifier) -> PersonaResult<Option<PersonaRecord>> {
        self.storage.query_persona(id)
    }

    pub async fn list_personas(&self) -> PersonaResult<Vec<PersonaRecord>> {
        self.storage.list_personas()
    }

    /// Personas this device holds private keys for
    pub async fn my_personas(&self) -> PersonaResult<Vec<PersonaRecord>> {
        self.storage.query_my_personas()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Profiles
    // ═══════════════════════════════════════════════════════════════════════

    /// Record a profile the first time it is seen.
    ///
    /// Returns the stored record, which is the existing one when the profile
    /// was already known.
    pub async fn observe_profile(
        &self,
        id: &ProfileIdentifier,
        nickname: Option<&str>,
    ) -> PersonaResult<ProfileRecord> {
        let mut record = ProfileRecord::new(id.clone());
        record.nickname = nickname.map(str::to_string);
        if self.storage.create_profile(&record)? {
            debug!(profile = %id, "Observed new profile");
            return Ok(record);
        }
        Ok(self.storage.query_profile(id)?.unwrap_or(record))
    }

    pub async fn query_profile(&self, id: &ProfileIdentifier) -> PersonaResult<Option<ProfileRecord>> {
        self.storage.query_profile(id)
    }

    pub async fn list_profiles(&self) -> PersonaResult<Vec<ProfileRecord>> {
        self.storage.list_profiles()
    }

    pub async fn profiles_of_persona(&self, persona: &PersonaIdentifier) -> PersonaResult<Vec<ProfileRecord>> {
        self.storage.query_profiles_of_persona(persona)
    }

    /// Link a profile to a persona; see [`Storage::attach_profile`].
    pub async fn attach_profile(
        &self,
        profile: &ProfileIdentifier,
        persona: &PersonaIdentifier,
        details: LinkedProfileDetails,
    ) -> PersonaResult<()> {
        self.storage.attach_profile(profile, persona, &details)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Legacy migration
    // ═══════════════════════════════════════════════════════════════════════

    /// Run the legacy migration unconditionally.
    ///
    /// The migration is flagged as done only when no record failed, so a
    /// partial run is retried by the next [`Self::migrate_legacy_once`].
    pub async fn migrate_legacy(
        &self,
        snapshot: &LegacySnapshot,
        local_keys: &dyn LocalKeySource,
    ) -> PersonaResult<MigrationReport> {
        let report = migrate::migrate_legacy(&self.storage, snapshot, local_keys)?;
        if report.failures.is_empty() {
            self.storage.mark_migration_done(LEGACY_PEOPLE_MIGRATION)?;
        } else {
            warn!(
                failures = report.failures.len(),
                "Legacy migration incomplete, leaving it unflagged"
            );
        }
        Ok(report)
    }

    /// Run the legacy migration unless it already completed.
    ///
    /// Returns `None` when the migration was skipped.
    pub async fn migrate_legacy_once(
        &self,
        snapshot: &LegacySnapshot,
        local_keys: &dyn LocalKeySource,
    ) -> PersonaResult<Option<MigrationReport>> {
        if self.storage.is_migration_done(LEGACY_PEOPLE_MIGRATION)? {
            debug!("Legacy migration already done, skipping");
            return Ok(None);
        }
        self.migrate_legacy(snapshot, local_keys).await.map(Some)
    }
}
