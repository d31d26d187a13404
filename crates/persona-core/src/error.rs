//! Error types for the persona core

use thiserror::Error;

/// Main error type for persona core operations
#[derive(Error, Debug)]
pub enum PersonaError {
    /// An identifier component contains a reserved separator character
    #[error("Invalid identifier component: {component:?} cannot contain '/' or '|'")]
    InvalidIdentifierComponent { component: String },

    /// A required identifier component is empty
    #[error("Empty identifier component: {field}")]
    EmptyIdentifierComponent { field: &'static str },

    /// A string could not be parsed as the requested identifier kind
    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),

    /// Asked for the owner of a group that is not owner-scoped
    #[error("Group has no owner: {0}")]
    RealGroupHasNoOwner(String),

    /// Persona was not found in storage
    #[error("Persona not found: {0}")]
    PersonaNotFound(String),

    /// Profile was not found in storage
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// Mnemonic phrase failed word-list checksum validation
    #[error("Mnemonic checksum mismatch")]
    MnemonicChecksumMismatch,

    /// Derivation path could not be parsed
    #[error("Invalid derivation path: {0}")]
    InvalidDerivationPath(String),

    /// Key material is malformed or a derivation step failed
    #[error("Key error: {0}")]
    Key(String),

    /// Database creation/opening error
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Table error
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    /// Storage operation error
    #[error("Storage operation error: {0}")]
    StorageOp(#[from] redb::StorageError),

    /// Commit error
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// Error during serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<secp256k1::Error> for PersonaError {
    fn from(err: secp256k1::Error) -> Self {
        PersonaError::Key(err.to_string())
    }
}

/// Result type alias using PersonaError
pub type PersonaResult<T> = Result<T, PersonaError>;
