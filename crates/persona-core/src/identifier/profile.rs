//! Profile identifiers: `person:<network>/<userId>`

use super::{canonical_text_impls, component, Canonical, Identifier, SEPARATOR};
use crate::error::PersonaResult;

/// An account on a specific network, addressed by `(network, user_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProfileIdentifier {
    network: String,
    user_id: String,
}

impl ProfileIdentifier {
    /// Network of the sentinel "unknown" profile
    pub const UNKNOWN_NETWORK: &'static str = "localhost";
    /// User ID of the sentinel "unknown" profile
    pub const UNKNOWN_USER_ID: &'static str = "$unknown";

    /// Create a profile identifier. Both components must be non-empty and
    /// free of `/`.
    pub fn new(network: impl Into<String>, user_id: impl Into<String>) -> PersonaResult<Self> {
        let network = network.into();
        let user_id = user_id.into();
        component("network", &network)?;
        component("user_id", &user_id)?;
        Ok(Self { network, user_id })
    }

    /// The sentinel identifier used when the owning profile is not known.
    pub fn unknown() -> Self {
        Self {
            network: Self::UNKNOWN_NETWORK.to_string(),
            user_id: Self::UNKNOWN_USER_ID.to_string(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.network == Self::UNKNOWN_NETWORK && self.user_id == Self::UNKNOWN_USER_ID
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// `userId@network`, for display.
    pub fn friendly_text(&self) -> String {
        format!("{}@{}", self.user_id, self.network)
    }

    pub(crate) fn decode_payload(payload: &str) -> Option<Self> {
        let mut parts = payload.split(SEPARATOR);
        let network = parts.next().filter(|s| !s.is_empty())?;
        let user_id = parts.next().filter(|s| !s.is_empty())?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            network: network.to_string(),
            user_id: user_id.to_string(),
        })
    }
}

impl Canonical for ProfileIdentifier {
    fn to_text(&self) -> String {
        format!("{}:{}/{}", Identifier::PROFILE_KIND, self.network, self.user_id)
    }
}

impl ProfileIdentifier {
    pub fn to_text(&self) -> String {
        Canonical::to_text(self)
    }
}

canonical_text_impls!(ProfileIdentifier, Profile);
