//! Persona Record - a user-controlled key pair and its linked profiles

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::identifier::{PersonaIdentifier, ProfileIdentifier};
use crate::keys::{JsonWebKey, MnemonicGeneration, MnemonicRecord};

/// Whether the owner of a profile has confirmed it belongs to a persona
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionConfirmState {
    #[default]
    Pending,
    Confirmed,
    Denied,
}

impl ConnectionConfirmState {
    pub fn is_decided(&self) -> bool {
        !matches!(self, ConnectionConfirmState::Pending)
    }
}

impl std::fmt::Display for ConnectionConfirmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionConfirmState::Pending => "pending",
            ConnectionConfirmState::Confirmed => "confirmed",
            ConnectionConfirmState::Denied => "denied",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ConnectionConfirmState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ConnectionConfirmState::Pending),
            "confirmed" => Ok(ConnectionConfirmState::Confirmed),
            "denied" => Ok(ConnectionConfirmState::Denied),
            other => Err(format!("unknown confirm state: {}", other)),
        }
    }
}

/// Per-profile link details kept on the persona side
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedProfileDetails {
    pub connection_confirm_state: ConnectionConfirmState,
}

impl LinkedProfileDetails {
    pub fn pending() -> Self {
        Self {
            connection_confirm_state: ConnectionConfirmState::Pending,
        }
    }

    pub fn confirmed() -> Self {
        Self {
            connection_confirm_state: ConnectionConfirmState::Confirmed,
        }
    }

    pub fn with_state(connection_confirm_state: ConnectionConfirmState) -> Self {
        Self {
            connection_confirm_state,
        }
    }

    /// Merge `incoming` into these details.
    ///
    /// Last write wins, except that `Pending` never replaces a state that
    /// has already been decided.
    pub fn merge(&mut self, incoming: &LinkedProfileDetails) {
        let regresses = self.connection_confirm_state.is_decided()
            && incoming.connection_confirm_state == ConnectionConfirmState::Pending;
        if !regresses {
            self.connection_confirm_state = incoming.connection_confirm_state;
        }
    }
}

/// A persona: one identity backed by a secp256k1 key pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaRecord {
    /// Compressed public key; the unique key of the record
    pub identifier: PersonaIdentifier,

    /// Always present
    pub public_key: JsonWebKey,

    /// Present only when the persona is owned on this device
    pub private_key: Option<JsonWebKey>,

    /// Present when the persona can be recovered from a phrase
    pub mnemonic: Option<MnemonicRecord>,

    /// Local display name
    pub nickname: Option<String>,

    /// Unix timestamp when the persona was created
    pub created_at: i64,

    /// Unix timestamp of last update
    pub updated_at: i64,

    pub linked_profiles: BTreeMap<ProfileIdentifier, LinkedProfileDetails>,
}

impl PersonaRecord {
    /// Create a persona from its public key with no links.
    pub fn new(identifier: PersonaIdentifier, public_key: JsonWebKey) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            identifier,
            public_key,
            private_key: None,
            mnemonic: None,
            nickname: None,
            created_at: now,
            updated_at: now,
            linked_profiles: BTreeMap::new(),
        }
    }

    /// An owned persona from a freshly generated or recovered key pair.
    pub fn from_mnemonic(generation: &MnemonicGeneration, nickname: Option<String>) -> Self {
        let key_pair = &generation.key_pair;
        let mut record = Self::new(key_pair.identifier(), key_pair.public_jwk());
        record.private_key = Some(key_pair.private_jwk());
        record.mnemonic = Some(generation.mnemonic_record.clone());
        record.nickname = nickname;
        record
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    /// True when the persona can be labeled "recoverable via mnemonic".
    pub fn has_mnemonic(&self) -> bool {
        self.mnemonic.is_some()
    }

    /// Update the persona's timestamp
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().timestamp();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::recover;

    const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_merge_last_write_wins() {
        let mut details = LinkedProfileDetails::pending();
        details.merge(&LinkedProfileDetails::confirmed());
        assert_eq!(details.connection_confirm_state, ConnectionConfirmState::Confirmed);

        details.merge(&LinkedProfileDetails::with_state(ConnectionConfirmState::Denied));
        assert_eq!(details.connection_confirm_state, ConnectionConfirmState::Denied);
    }

    #[test]
    fn test_merge_pending_does_not_regress() {
        let mut details = LinkedProfileDetails::confirmed();
        details.merge(&LinkedProfileDetails::pending());
        assert_eq!(details.connection_confirm_state, ConnectionConfirmState::Confirmed);

        let mut denied = LinkedProfileDetails::with_state(ConnectionConfirmState::Denied);
        denied.merge(&LinkedProfileDetails::pending());
        assert_eq!(denied.connection_confirm_state, ConnectionConfirmState::Denied);
    }

    #[test]
    fn test_confirm_state_text() {
        for state in [
            ConnectionConfirmState::Pending,
            ConnectionConfirmState::Confirmed,
            ConnectionConfirmState::Denied,
        ] {
            assert_eq!(state.to_string().parse::<ConnectionConfirmState>().unwrap(), state);
        }
        assert!("maybe".parse::<ConnectionConfirmState>().is_err());
    }

    #[test]
    fn test_details_json_shape() {
        let json = serde_json::to_string(&LinkedProfileDetails::pending()).unwrap();
        assert_eq!(json, r#"{"connectionConfirmState":"pending"}"#);
    }

    #[test]
    fn test_from_mnemonic() {
        let generation = recover(PHRASE, "").unwrap();
        let record = PersonaRecord::from_mnemonic(&generation, Some("Main".to_string()));
        assert_eq!(record.identifier, generation.key_pair.identifier());
        assert!(record.has_private_key());
        assert!(record.has_mnemonic());
        assert!(record.linked_profiles.is_empty());
        assert_eq!(record.nickname.as_deref(), Some("Main"));
    }

    #[test]
    fn test_postcard_roundtrip() {
        let generation = recover(PHRASE, "pw").unwrap();
        let mut record = PersonaRecord::from_mnemonic(&generation, None);
        record.linked_profiles.insert(
            ProfileIdentifier::new("twitter", "alice").unwrap(),
            LinkedProfileDetails::confirmed(),
        );

        let bytes = postcard::to_allocvec(&record).unwrap();
        let back: PersonaRecord = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(back, record);
    }
}
