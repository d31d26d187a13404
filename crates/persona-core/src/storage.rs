//! Persistent storage using redb.
//!
//! This module provides ACID-compliant storage for:
//! - Personas (keyed by `ec_key:` identifier text)
//! - Profiles (keyed by `person:` identifier text)
//! - One-time migration flags
//!
//! Records are encoded with postcard. Every public operation runs in a
//! single redb transaction, so a write either commits whole or not at all.

use crate::error::{PersonaError, PersonaResult};
use parking_lot::RwLock;
use redb::{Database, ReadableTable};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

// Submodules
mod links;
mod migrations;
mod personas;
mod profiles;

use migrations::MIGRATION_FLAGS_TABLE;
use personas::PERSONAS_TABLE;
use profiles::PROFILES_TABLE;

/// Storage layer using redb for ACID-compliant persistence
#[derive(Clone)]
pub struct Storage {
    db: Arc<RwLock<Database>>,
}

impl Storage {
    /// Create a new storage instance at the given path.
    ///
    /// This will:
    /// - Create the database directory if it doesn't exist
    /// - Initialize the database file
    /// - Create all required tables
    pub fn new(path: impl AsRef<Path>) -> PersonaResult<Self> {
        let path = path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PERSONAS_TABLE)?;
            let _ = write_txn.open_table(PROFILES_TABLE)?;
            let _ = write_txn.open_table(MIGRATION_FLAGS_TABLE)?;
        }
        write_txn.commit()?;

        tracing::debug!(path = %path.display(), "Opened persona database");

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
        })
    }

    /// Get a reference to the shared database handle
    pub fn db_handle(&self) -> Arc<RwLock<Database>> {
        self.db.clone()
    }
}

/// Encode a record for storage.
pub(crate) fn encode_record<T: Serialize>(record: &T) -> PersonaResult<Vec<u8>> {
    postcard::to_allocvec(record).map_err(|e| PersonaError::Serialization(e.to_string()))
}

/// Decode a stored record.
pub(crate) fn decode_record<T: DeserializeOwned>(bytes: &[u8]) -> PersonaResult<T> {
    postcard::from_bytes(bytes).map_err(|e| PersonaError::Serialization(e.to_string()))
}

/// Point lookup of a record in any string-keyed table.
pub(crate) fn read_record<T, Tbl>(table: &Tbl, key: &str) -> PersonaResult<Option<T>>
where
    T: DeserializeOwned,
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(value) => Ok(Some(decode_record(value.value())?)),
        None => Ok(None),
    }
}

/// Decode every record in a string-keyed table.
pub(crate) fn read_all_records<T, Tbl>(table: &Tbl) -> PersonaResult<Vec<T>>
where
    T: DeserializeOwned,
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    let mut records = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        records.push(decode_record(value.value())?);
    }
    Ok(records)
}
