//! Profile Record - an observed or owned account on a social network
//!
//! Profiles are created when an account is first seen and may point back to
//! the persona that controls them. The back-reference is only ever written
//! by `Storage::attach_profile`.

use serde::{Deserialize, Serialize};

use crate::identifier::{PersonaIdentifier, ProfileIdentifier};
use crate::keys::JsonWebKey;

/// An account on a network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// `(network, user_id)`; the unique key of the record
    pub identifier: ProfileIdentifier,

    /// Display name shown in UI
    pub nickname: Option<String>,

    /// Device-local symmetric key; never synced
    pub local_key: Option<JsonWebKey>,

    /// Persona controlling this profile, if known
    pub linked_persona: Option<PersonaIdentifier>,

    /// Unix timestamp when profile was created
    pub created_at: i64,

    /// Unix timestamp of last update
    pub updated_at: i64,
}

impl ProfileRecord {
    /// Create an unlinked profile record
    pub fn new(identifier: ProfileIdentifier) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            identifier,
            nickname: None,
            local_key: None,
            linked_persona: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    /// Update the profile's timestamp
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().timestamp();
    }
}
