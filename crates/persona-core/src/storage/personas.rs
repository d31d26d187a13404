//! Persona Storage - create-if-absent and queries for persona records
//!
//! Stores personas in redb with the `ec_key:` identifier text as the key.

use crate::error::{PersonaError, PersonaResult};
use crate::identifier::PersonaIdentifier;
use crate::keys::{JsonWebKey, MnemonicRecord};
use crate::types::PersonaRecord;
use redb::{ReadableTable, ReadableTableMetadata, TableDefinition};

use super::{decode_record, encode_record, read_all_records, read_record, Storage};

/// Table for storing personas (key: ec_key identifier, value: serialized PersonaRecord)
pub(crate) const PERSONAS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("personas");

impl Storage {
    /// Insert a persona if no persona with the same identifier exists.
    ///
    /// An existing record is left untouched. Returns `true` if the record
    /// was inserted.
    pub fn create_persona(&self, record: &PersonaRecord) -> PersonaResult<bool> {
        let db = self.db_handle();
        let db_guard = db.read();
        let write_txn = db_guard.begin_write()?;
        let key = record.identifier.to_text();
        let inserted = {
            let mut table = write_txn.open_table(PERSONAS_TABLE)?;
            if table.get(key.as_str())?.is_some() {
                false
            } else {
                let serialized = encode_record(record)?;
                table.insert(key.as_str(), serialized.as_slice())?;
                true
            }
        };
        write_txn.commit()?;

        if inserted {
            tracing::debug!(persona = %key, "Created persona");
        } else {
            tracing::debug!(persona = %key, "Persona already exists, not overwriting");
        }
        Ok(inserted)
    }

    /// Give a public-only persona its private key, and its mnemonic if it has
    /// none yet.
    ///
    /// A persona that already holds a private key is left untouched; links
    /// are never modified. Returns the stored record and whether it changed.
    pub fn fill_private_key(
        &self,
        id: &PersonaIdentifier,
        private_key: &JsonWebKey,
        mnemonic: Option<&MnemonicRecord>,
    ) -> PersonaResult<(PersonaRecord, bool)> {
        let db = self.db_handle();
        let db_guard = db.read();
        let write_txn = db_guard.begin_write()?;
        let key = id.to_text();
        let result = {
            let mut table = write_txn.open_table(PERSONAS_TABLE)?;
            let mut record: PersonaRecord = match table.get(key.as_str())? {
                Some(bytes) => decode_record(bytes.value())?,
                None => return Err(PersonaError::PersonaNotFound(key)),
            };
            if record.private_key.is_some() {
                (record, false)
            } else {
                record.private_key = Some(private_key.clone());
                if record.mnemonic.is_none() {
                    record.mnemonic = mnemonic.cloned();
                }
                record.touch();
                let serialized = encode_record(&record)?;
                table.insert(key.as_str(), serialized.as_slice())?;
                (record, true)
            }
        };
        write_txn.commit()?;

        if result.1 {
            tracing::debug!(persona = %key, "Filled missing private key");
        }
        Ok(result)
    }

    /// Load a persona by identifier
    ///
    /// Returns `None` if no persona exists with the given identifier.
    pub fn query_persona(&self, id: &PersonaIdentifier) -> PersonaResult<Option<PersonaRecord>> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(PERSONAS_TABLE)?;
        read_record(&table, &id.to_text())
    }

    /// List all personas in the database
    pub fn list_personas(&self) -> PersonaResult<Vec<PersonaRecord>> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(PERSONAS_TABLE)?;
        read_all_records(&table)
    }

    /// List personas owned on this device (those holding a private key)
    pub fn query_my_personas(&self) -> PersonaResult<Vec<PersonaRecord>> {
        Ok(self
            .list_personas()?
            .into_iter()
            .filter(PersonaRecord::has_private_key)
            .collect())
    }

    /// Count stored personas
    pub fn count_personas(&self) -> PersonaResult<u64> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(PERSONAS_TABLE)?;
        Ok(table.len()?)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::PersonaError;
    use crate::identifier::IdentifierCodec;
    use crate::storage::test_support::*;
    use crate::types::{LinkedProfileDetails, PersonaRecord};

    #[test]
    fn test_create_and_query_persona() {
        let (storage, _temp) = create_test_storage();
        let record = PersonaRecord::from_mnemonic(&test_generation(""), None);

        assert!(storage.create_persona(&record).unwrap());

        let loaded = storage.query_persona(&record.identifier).unwrap();
        assert_eq!(loaded, Some(record));
    }

    #[test]
    fn test_query_nonexistent_persona() {
        let (storage, _temp) = create_test_storage();
        let id = test_generation("").key_pair.identifier();
        assert!(storage.query_persona(&id).unwrap().is_none());
    }

    #[test]
    fn test_create_persona_does_not_overwrite() {
        let (storage, _temp) = create_test_storage();
        let original = PersonaRecord::from_mnemonic(&test_generation(""), Some("First".to_string()));
        assert!(storage.create_persona(&original).unwrap());

        let mut replacement = original.clone();
        replacement.nickname = Some("Second".to_string());
        replacement.private_key = None;
        assert!(!storage.create_persona(&replacement).unwrap());

        let loaded = storage.query_persona(&original.identifier).unwrap().unwrap();
        assert_eq!(loaded.nickname.as_deref(), Some("First"));
        assert!(loaded.has_private_key());
        assert_eq!(storage.count_personas().unwrap(), 1);
    }

    #[test]
    fn test_fill_private_key_on_public_only_persona() {
        let (storage, _temp) = create_test_storage();
        let generation = test_generation("");
        let owned = PersonaRecord::from_mnemonic(&generation, Some("Me".to_string()));
        let mut public_only = owned.clone();
        public_only.private_key = None;
        public_only.mnemonic = None;
        public_only
            .linked_profiles
            .insert(profile_id("alice"), LinkedProfileDetails::confirmed());
        storage.create_persona(&public_only).unwrap();

        let private_key = generation.key_pair.private_jwk();
        let (filled, changed) = storage
            .fill_private_key(&owned.identifier, &private_key, Some(&generation.mnemonic_record))
            .unwrap();
        assert!(changed);
        assert!(filled.has_private_key());
        assert!(filled.has_mnemonic());

        let loaded = storage.query_persona(&owned.identifier).unwrap().unwrap();
        assert_eq!(loaded.private_key, Some(private_key));
        assert_eq!(
            loaded.linked_profiles.get(&profile_id("alice")),
            Some(&LinkedProfileDetails::confirmed())
        );
        assert_eq!(storage.query_my_personas().unwrap().len(), 1);
    }

    #[test]
    fn test_fill_private_key_keeps_existing_key() {
        let (storage, _temp) = create_test_storage();
        let record = PersonaRecord::from_mnemonic(&test_generation(""), None);
        storage.create_persona(&record).unwrap();

        let other = test_generation("other").key_pair.private_jwk();
        let (loaded, changed) = storage.fill_private_key(&record.identifier, &other, None).unwrap();
        assert!(!changed);
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_fill_private_key_missing_persona() {
        let (storage, _temp) = create_test_storage();
        let generation = test_generation("");
        let result = storage.fill_private_key(
            &generation.key_pair.identifier(),
            &generation.key_pair.private_jwk(),
            None,
        );
        assert!(matches!(result, Err(PersonaError::PersonaNotFound(_))));
    }

    #[test]
    fn test_loading_persona_fills_global_decode_cache() {
        let (storage, _temp) = create_test_storage();
        let record = PersonaRecord::from_mnemonic(&test_generation("cache"), None);
        let key = record.identifier.to_text();
        storage.create_persona(&record).unwrap();

        let loaded = storage.query_persona(&record.identifier).unwrap().unwrap();
        assert_eq!(loaded.identifier, record.identifier);
        let cached = IdentifierCodec::global().cache().get(&key).unwrap();
        assert_eq!(cached.as_ec_key(), Some(&record.identifier));
    }

    #[test]
    fn test_query_my_personas() {
        let (storage, _temp) = create_test_storage();
        let owned = PersonaRecord::from_mnemonic(&test_generation("a"), None);
        let mut observed = PersonaRecord::from_mnemonic(&test_generation("b"), None);
        observed.private_key = None;
        observed.mnemonic = None;

        storage.create_persona(&owned).unwrap();
        storage.create_persona(&observed).unwrap();

        assert_eq!(storage.list_personas().unwrap().len(), 2);
        let mine = storage.query_my_personas().unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].identifier, owned.identifier);
    }

    #[test]
    fn test_persona_persists_across_instances() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.redb");
        let record = PersonaRecord::from_mnemonic(&test_generation(""), None);

        {
            let storage = crate::Storage::new(&db_path).unwrap();
            storage.create_persona(&record).unwrap();
        }
        {
            let storage = crate::Storage::new(&db_path).unwrap();
            let loaded = storage.query_persona(&record.identifier).unwrap();
            assert_eq!(loaded, Some(record));
        }
    }
}
