//! Legacy "people" migration
//!
//! Older databases stored every known account as one flat person record that
//! optionally carried the account's key pair. This module splits those rows
//! into the persona/profile schema:
//!
//! 1. **Plan** (pure): group rows by the compressed public key into personas,
//!    build one profile per account, and remember which persona every
//!    account should be attached to.
//! 2. **Commit**: create absent personas and profiles, then attach every
//!    `(profile, persona)` pair through [`Storage::attach_profile`].
//!
//! Every write is create-if-absent and attach never regresses a decided
//! confirmation state, so running the migration twice is harmless.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::PersonaResult;
use crate::identifier::{PersonaIdentifier, ProfileIdentifier};
use crate::keys::JsonWebKey;
use crate::storage::Storage;
use crate::types::{LinkedProfileDetails, PersonaRecord, ProfileRecord};

/// Name under which a completed legacy migration is flagged.
pub const LEGACY_PEOPLE_MIGRATION: &str = "people_to_persona_v1";

/// One row of the legacy people table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyPersonRecord {
    pub identifier: ProfileIdentifier,
    #[serde(default)]
    pub public_key: Option<JsonWebKey>,
    #[serde(default)]
    pub private_key: Option<JsonWebKey>,
    #[serde(default)]
    pub nickname: Option<String>,
}

impl LegacyPersonRecord {
    pub fn new(identifier: ProfileIdentifier) -> Self {
        Self {
            identifier,
            public_key: None,
            private_key: None,
            nickname: None,
        }
    }
}

/// Everything the legacy database held
///
/// `owned` are the accounts of this device's user, `observed` everyone else.
/// `local_keys` carries the per-account symmetric keys when the snapshot was
/// exported together with them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegacySnapshot {
    #[serde(default)]
    pub owned: Vec<LegacyPersonRecord>,
    #[serde(default)]
    pub observed: Vec<LegacyPersonRecord>,
    #[serde(default)]
    pub local_keys: BTreeMap<ProfileIdentifier, JsonWebKey>,
}

impl LegacySnapshot {
    /// Observed rows first, then owned, the order in which rows are folded.
    fn rows(&self) -> impl Iterator<Item = &LegacyPersonRecord> {
        self.observed.iter().chain(self.owned.iter())
    }

    /// Look up a local key carried inside the snapshot.
    pub fn local_key(&self, profile: &ProfileIdentifier) -> Option<JsonWebKey> {
        self.local_keys.get(profile).cloned()
    }
}

/// Source of device-local symmetric keys for owned profiles
pub trait LocalKeySource {
    fn local_key(&self, profile: &ProfileIdentifier) -> Option<JsonWebKey>;
}

impl<F> LocalKeySource for F
where
    F: Fn(&ProfileIdentifier) -> Option<JsonWebKey>,
{
    fn local_key(&self, profile: &ProfileIdentifier) -> Option<JsonWebKey> {
        self(profile)
    }
}

/// A row or record the migration could not carry over
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationFailure {
    /// Canonical text of the profile or persona concerned
    pub subject: String,
    pub reason: String,
}

/// Rows that disagreed; the first value seen was kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MigrationConflict {
    /// Two rows sharing a public key carried different private keys
    PrivateKeyConflict {
        persona: PersonaIdentifier,
        kept_from: ProfileIdentifier,
        ignored_from: ProfileIdentifier,
    },
}

/// Outcome of one migration run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub personas_created: usize,
    pub profiles_created: usize,
    pub links_attached: usize,
    pub failures: Vec<MigrationFailure>,
    pub conflicts: Vec<MigrationConflict>,
}

impl MigrationReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.conflicts.is_empty()
    }

    fn fail(&mut self, subject: impl ToString, reason: impl ToString) {
        let failure = MigrationFailure {
            subject: subject.to_string(),
            reason: reason.to_string(),
        };
        tracing::warn!(subject = %failure.subject, reason = %failure.reason, "Legacy row not migrated");
        self.failures.push(failure);
    }
}

/// In-memory result of folding the legacy rows
#[derive(Debug, Default)]
pub struct MigrationPlan {
    pub personas: BTreeMap<PersonaIdentifier, PersonaRecord>,
    pub profiles: BTreeMap<ProfileIdentifier, ProfileRecord>,
    /// profile → persona it should be attached to
    pub attachments: BTreeMap<ProfileIdentifier, PersonaIdentifier>,
    /// persona → row whose private key was kept
    private_key_origin: BTreeMap<PersonaIdentifier, ProfileIdentifier>,
}

impl MigrationPlan {
    /// Fold a snapshot into personas, profiles and attachments.
    ///
    /// Problems with single rows are written to `report`; the fold itself
    /// never fails.
    pub fn build(
        snapshot: &LegacySnapshot,
        local_keys: &dyn LocalKeySource,
        report: &mut MigrationReport,
    ) -> Self {
        let mut plan = MigrationPlan::default();

        let row_personas: Vec<Option<PersonaIdentifier>> = snapshot
            .rows()
            .map(|row| {
                let public_key = row.public_key.as_ref()?;
                match PersonaIdentifier::from_jwk(public_key) {
                    Ok(persona_id) => {
                        plan.attachments.insert(row.identifier.clone(), persona_id.clone());
                        Some(persona_id)
                    }
                    Err(e) => {
                        report.fail(&row.identifier, e);
                        None
                    }
                }
            })
            .collect();

        let mut resolved_keys = BTreeMap::new();
        for row in &snapshot.owned {
            if let Some(key) = local_keys.local_key(&row.identifier) {
                resolved_keys.insert(row.identifier.clone(), key);
            }
        }

        for (row, persona_id) in snapshot.rows().zip(row_personas) {
            if let (Some(public_key), Some(persona_id)) = (&row.public_key, persona_id) {
                plan.fold_persona(persona_id, public_key, row, report);
            }
            plan.fold_profile(row, &resolved_keys);
        }

        tracing::debug!(
            personas = plan.personas.len(),
            profiles = plan.profiles.len(),
            attachments = plan.attachments.len(),
            "Planned legacy migration"
        );
        plan
    }

    fn fold_persona(
        &mut self,
        persona_id: PersonaIdentifier,
        public_key: &JsonWebKey,
        row: &LegacyPersonRecord,
        report: &mut MigrationReport,
    ) {
        match self.personas.get_mut(&persona_id) {
            Some(record) => {
                if let Some(incoming) = &row.private_key {
                    let kept_d = record.private_key.as_ref().map(|existing| existing.d.clone());
                    match kept_d {
                        None => {
                            record.private_key = Some(incoming.clone());
                            self.private_key_origin
                                .insert(persona_id.clone(), row.identifier.clone());
                        }
                        Some(kept_d) if kept_d != incoming.d => {
                            let kept_from = self
                                .private_key_origin
                                .get(&persona_id)
                                .cloned()
                                .unwrap_or_else(ProfileIdentifier::unknown);
                            tracing::warn!(
                                persona = %persona_id,
                                kept_from = %kept_from,
                                ignored_from = %row.identifier,
                                "Conflicting private keys for one persona, keeping the first"
                            );
                            report.conflicts.push(MigrationConflict::PrivateKeyConflict {
                                persona: persona_id.clone(),
                                kept_from,
                                ignored_from: row.identifier.clone(),
                            });
                        }
                        Some(_) => {}
                    }
                }
                record
                    .linked_profiles
                    .entry(row.identifier.clone())
                    .or_insert_with(LinkedProfileDetails::pending);
            }
            None => {
                let mut record = PersonaRecord::new(persona_id.clone(), public_key.public_only());
                record.created_at = 0;
                record.private_key = row.private_key.clone();
                if row.private_key.is_some() {
                    self.private_key_origin
                        .insert(persona_id.clone(), row.identifier.clone());
                }
                record
                    .linked_profiles
                    .insert(row.identifier.clone(), LinkedProfileDetails::pending());
                self.personas.insert(persona_id, record);
            }
        }
    }

    fn fold_profile(
        &mut self,
        row: &LegacyPersonRecord,
        local_keys: &BTreeMap<ProfileIdentifier, JsonWebKey>,
    ) {
        match self.profiles.get_mut(&row.identifier) {
            Some(record) => {
                if record.nickname.is_none() {
                    record.nickname = row.nickname.clone().filter(|n| !n.is_empty());
                }
            }
            None => {
                let mut record = ProfileRecord::new(row.identifier.clone());
                record.created_at = 0;
                record.nickname = row.nickname.clone().filter(|n| !n.is_empty());
                record.local_key = local_keys.get(&row.identifier).cloned();
                record.linked_persona = self.attachments.get(&row.identifier).cloned();
                self.profiles.insert(row.identifier.clone(), record);
            }
        }
    }
}

/// Migrate a legacy snapshot into `storage`.
///
/// Returns an error only if the store itself cannot be reached; failures of
/// individual records are collected in the report.
pub fn migrate_legacy(
    storage: &Storage,
    snapshot: &LegacySnapshot,
    local_keys: &dyn LocalKeySource,
) -> PersonaResult<MigrationReport> {
    let mut report = MigrationReport::default();
    let plan = MigrationPlan::build(snapshot, local_keys, &mut report);

    for (persona_id, record) in &plan.personas {
        match storage.create_persona(record) {
            Ok(true) => report.personas_created += 1,
            Ok(false) => {
                if let Some(private_key) = &record.private_key {
                    if let Err(e) = storage.fill_private_key(persona_id, private_key, None) {
                        report.fail(persona_id, e);
                    }
                }
            }
            Err(e) => report.fail(persona_id, e),
        }
    }

    for (profile_id, record) in &plan.profiles {
        match storage.create_profile(record) {
            Ok(true) => report.profiles_created += 1,
            Ok(false) => {}
            Err(e) => report.fail(profile_id, e),
        }
    }

    for (profile_id, persona_id) in &plan.attachments {
        let details = match storage.query_persona(persona_id) {
            Ok(Some(persona)) => persona
                .linked_profiles
                .get(profile_id)
                .cloned()
                .unwrap_or_else(LinkedProfileDetails::pending),
            Ok(None) => LinkedProfileDetails::pending(),
            Err(e) => {
                report.fail(profile_id, e);
                continue;
            }
        };
        match storage.attach_profile(profile_id, persona_id, &details) {
            Ok(()) => report.links_attached += 1,
            Err(e) => report.fail(profile_id, e),
        }
    }

    tracing::info!(
        personas_created = report.personas_created,
        profiles_created = report.profiles_created,
        links_attached = report.links_attached,
        failures = report.failures.len(),
        conflicts = report.conflicts.len(),
        "Legacy migration finished"
    );
    Ok(report)
}
