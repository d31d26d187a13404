//! One-time migration flags
//!
//! Each completed migration is recorded under its name with the completion
//! time (unix seconds, little-endian) as the value.

use crate::error::PersonaResult;
use redb::{ReadableTable, TableDefinition};

use super::Storage;

/// Flag table to track migration status
pub(crate) const MIGRATION_FLAGS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("migration_flags");

impl Storage {
    /// Check if the named migration has been completed
    pub fn is_migration_done(&self, name: &str) -> PersonaResult<bool> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;

        match read_txn.open_table(MIGRATION_FLAGS_TABLE) {
            Ok(table) => Ok(table.get(name)?.is_some()),
            Err(_) => Ok(false),
        }
    }

    /// When the named migration completed, if it has
    pub fn migration_completed_at(&self, name: &str) -> PersonaResult<Option<i64>> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(MIGRATION_FLAGS_TABLE)?;
        let completed_at = table.get(name)?.and_then(|value| {
            let bytes: [u8; 8] = value.value().try_into().ok()?;
            Some(i64::from_le_bytes(bytes))
        });
        Ok(completed_at)
    }

    /// Mark the named migration as complete
    pub fn mark_migration_done(&self, name: &str) -> PersonaResult<()> {
        let db = self.db_handle();
        let db_guard = db.read();
        let write_txn = db_guard.begin_write()?;
        {
            let mut table = write_txn.open_table(MIGRATION_FLAGS_TABLE)?;
            let timestamp = chrono::Utc::now().timestamp().to_le_bytes();
            table.insert(name, timestamp.as_slice())?;
        }
        write_txn.commit()?;
        tracing::debug!(migration = name, "Marked migration complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::test_support::*;

    #[test]
    fn test_migration_flag() {
        let (storage, _temp) = create_test_storage();

        assert!(!storage.is_migration_done("legacy_people_v1").unwrap());
        assert!(storage.migration_completed_at("legacy_people_v1").unwrap().is_none());

        storage.mark_migration_done("legacy_people_v1").unwrap();

        assert!(storage.is_migration_done("legacy_people_v1").unwrap());
        assert!(!storage.is_migration_done("other").unwrap());
        let completed_at = storage.migration_completed_at("legacy_people_v1").unwrap();
        assert!(completed_at.unwrap() > 0);
    }
}
