//! Group identifiers: `group:<network>/<owner>/<groupId>`
//!
//! A group with no owner is a "real" group that exists on the network. A
//! group with an owner is a "virtual" group synthesized locally and scoped to
//! that owner's profile, such as a per-profile friends list. Real groups
//! encode an empty owner slot (`group:twitter//gid`).

use super::{canonical_text_impls, component, no_slash, Canonical, Identifier, ProfileIdentifier, SEPARATOR};
use crate::error::{PersonaError, PersonaResult};

/// Well-known virtual group names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreDefinedVirtualGroup {
    Friends,
    Followers,
    Following,
}

impl PreDefinedVirtualGroup {
    pub fn group_id(&self) -> &'static str {
        match self {
            PreDefinedVirtualGroup::Friends => "_default_friends_group_",
            PreDefinedVirtualGroup::Followers => "_followers_group_",
            PreDefinedVirtualGroup::Following => "_following_group_",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupIdentifier {
    network: String,
    virtual_group_owner: Option<String>,
    group_id: String,
}

impl GroupIdentifier {
    /// Create a group identifier. An empty owner is treated as no owner.
    pub fn new(
        network: impl Into<String>,
        virtual_group_owner: Option<String>,
        group_id: impl Into<String>,
    ) -> PersonaResult<Self> {
        let network = network.into();
        let group_id = group_id.into();
        component("network", &network)?;
        component("group_id", &group_id)?;
        let virtual_group_owner = virtual_group_owner.filter(|owner| !owner.is_empty());
        if let Some(owner) = &virtual_group_owner {
            no_slash(owner)?;
        }
        Ok(Self {
            network,
            virtual_group_owner,
            group_id,
        })
    }

    /// A virtual group owned by `owner`.
    pub fn friends_group(owner: &ProfileIdentifier, group_id: impl Into<String>) -> PersonaResult<Self> {
        Self::new(
            owner.network(),
            Some(owner.user_id().to_string()),
            group_id,
        )
    }

    /// The default friends list of `owner`.
    pub fn default_friends_group(owner: &ProfileIdentifier) -> Self {
        Self::predefined(owner, PreDefinedVirtualGroup::Friends)
    }

    pub fn predefined(owner: &ProfileIdentifier, kind: PreDefinedVirtualGroup) -> Self {
        // Components come from an already validated profile identifier
        Self {
            network: owner.network().to_string(),
            virtual_group_owner: Some(owner.user_id().to_string()),
            group_id: kind.group_id().to_string(),
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn virtual_group_owner(&self) -> Option<&str> {
        self.virtual_group_owner.as_deref()
    }

    pub fn is_real(&self) -> bool {
        self.virtual_group_owner.is_none()
    }

    pub fn is_virtual(&self) -> bool {
        self.virtual_group_owner.is_some()
    }

    /// The profile that owns this virtual group.
    ///
    /// Real groups have no owner and return `RealGroupHasNoOwner`.
    pub fn owner(&self) -> PersonaResult<ProfileIdentifier> {
        match &self.virtual_group_owner {
            Some(owner) => ProfileIdentifier::new(self.network.clone(), owner.clone()),
            None => Err(PersonaError::RealGroupHasNoOwner(self.to_text())),
        }
    }

    pub(crate) fn decode_payload(payload: &str) -> Option<Self> {
        let mut parts = payload.split(SEPARATOR);
        let network = parts.next().filter(|s| !s.is_empty())?;
        let owner = parts.next()?;
        let group_id = parts.next().filter(|s| !s.is_empty())?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            network: network.to_string(),
            virtual_group_owner: (!owner.is_empty()).then(|| owner.to_string()),
            group_id: group_id.to_string(),
        })
    }

    pub fn to_text(&self) -> String {
        format!(
            "{}:{}/{}/{}",
            Identifier::GROUP_KIND,
            self.network,
            self.virtual_group_owner.as_deref().unwrap_or_default(),
            self.group_id
        )
    }
}

impl Canonical for GroupIdentifier {
    fn to_text(&self) -> String {
        GroupIdentifier::to_text(self)
    }
}

canonical_text_impls!(GroupIdentifier, Group);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_group() {
        let group = GroupIdentifier::new("twitter", None, "rustlang").unwrap();
        assert!(group.is_real());
        assert!(!group.is_virtual());
        assert_eq!(group.to_text(), "group:twitter//rustlang");
        assert!(matches!(
            group.owner(),
            Err(PersonaError::RealGroupHasNoOwner(_))
        ));
    }

    #[test]
    fn test_empty_owner_is_real() {
        let group = GroupIdentifier::new("twitter", Some(String::new()), "g").unwrap();
        assert!(group.is_real());
    }

    #[test]
    fn test_default_friends_group() {
        let alice = ProfileIdentifier::new("twitter", "alice").unwrap();
        let group = GroupIdentifier::default_friends_group(&alice);
        assert!(group.is_virtual());
        assert_eq!(
            group.to_text(),
            "group:twitter/alice/_default_friends_group_"
        );
        assert_eq!(group.owner().unwrap(), alice);
    }

    #[test]
    fn test_group_roundtrip() {
        let alice = ProfileIdentifier::new("twitter", "alice").unwrap();
        for group in [
            GroupIdentifier::new("twitter", None, "rustlang").unwrap(),
            GroupIdentifier::predefined(&alice, PreDefinedVirtualGroup::Followers),
        ] {
            let parsed: GroupIdentifier = group.to_text().parse().unwrap();
            assert_eq!(parsed, group);
        }
    }

    #[test]
    fn test_rejects_slash() {
        assert!(GroupIdentifier::new("twitter", None, "a/b").is_err());
        assert!(GroupIdentifier::new("twitter", Some("x/y".to_string()), "g").is_err());
    }

    #[test]
    fn test_rejects_empty_components() {
        assert!(matches!(
            GroupIdentifier::new("twitter", None, ""),
            Err(PersonaError::EmptyIdentifierComponent { field: "group_id" })
        ));
        assert!(GroupIdentifier::new("", Some("alice".to_string()), "g").is_err());
    }
}
