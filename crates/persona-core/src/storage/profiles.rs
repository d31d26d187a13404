//! Profile Storage - create-if-absent and queries for profile records
//!
//! Stores profile data in redb with the `person:` identifier text as the key.
//! The `linked_persona` back-reference is owned by `attach_profile`; plain
//! profile writes never set or change it.

use crate::error::{PersonaError, PersonaResult};
use crate::identifier::{PersonaIdentifier, ProfileIdentifier};
use crate::types::ProfileRecord;
use redb::{ReadableTable, TableDefinition};

use super::{encode_record, read_all_records, read_record, Storage};

/// Table for storing profiles (key: person identifier, value: serialized ProfileRecord)
pub(crate) const PROFILES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("profiles");

impl Storage {
    /// Insert a profile if no profile with the same identifier exists.
    ///
    /// Any `linked_persona` on the incoming record is dropped; links are
    /// established only through [`Storage::attach_profile`]. Returns `true`
    /// if the record was inserted.
    pub fn create_profile(&self, record: &ProfileRecord) -> PersonaResult<bool> {
        let db = self.db_handle();
        let db_guard = db.read();
        let write_txn = db_guard.begin_write()?;
        let key = record.identifier.to_text();
        let inserted = {
            let mut table = write_txn.open_table(PROFILES_TABLE)?;
            if table.get(key.as_str())?.is_some() {
                false
            } else {
                let mut unlinked = record.clone();
                unlinked.linked_persona = None;
                let serialized = encode_record(&unlinked)?;
                table.insert(key.as_str(), serialized.as_slice())?;
                true
            }
        };
        write_txn.commit()?;

        if inserted {
            tracing::debug!(profile = %key, "Created profile");
        }
        Ok(inserted)
    }

    /// Load a profile by identifier
    ///
    /// Returns `None` if no profile exists for the given identifier.
    pub fn query_profile(&self, id: &ProfileIdentifier) -> PersonaResult<Option<ProfileRecord>> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(PROFILES_TABLE)?;
        read_record(&table, &id.to_text())
    }

    /// List all profiles in the database
    pub fn list_profiles(&self) -> PersonaResult<Vec<ProfileRecord>> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(PROFILES_TABLE)?;
        read_all_records(&table)
    }

    /// Profiles whose back-reference points at `persona`
    pub fn query_profiles_of_persona(
        &self,
        persona: &PersonaIdentifier,
    ) -> PersonaResult<Vec<ProfileRecord>> {
        Ok(self
            .list_profiles()?
            .into_iter()
            .filter(|profile| profile.linked_persona.as_ref() == Some(persona))
            .collect())
    }

    /// Change a profile's nickname. Links are left untouched.
    pub fn rename_profile(&self, id: &ProfileIdentifier, nickname: Option<String>) -> PersonaResult<()> {
        let db = self.db_handle();
        let db_guard = db.read();
        let write_txn = db_guard.begin_write()?;
        {
            let mut table = write_txn.open_table(PROFILES_TABLE)?;
            let key = id.to_text();
            let mut profile: ProfileRecord = read_record(&table, &key)?
                .ok_or_else(|| PersonaError::ProfileNotFound(key.clone()))?;
            profile.nickname = nickname;
            profile.touch();
            let serialized = encode_record(&profile)?;
            table.insert(key.as_str(), serialized.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}
