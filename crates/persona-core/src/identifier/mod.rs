//! Canonical typed identifiers
//!
//! Every persisted key and cross-record reference in the persona store is an
//! identifier with a canonical, human-readable text form:
//!
//! ```text
//! person:<network>/<userId>
//! group:<network>/<owner or empty>/<groupId>
//! post:<postId>/<inner identifier>
//! post_iv:<network>/<iv>
//! ec_key:secp256k1/<compressed point>
//! ```
//!
//! The text form is the storage and wire format. Equality, hashing, and
//! serde all go through it, so it must stay stable across versions.
//! `FromStr` and `Deserialize` decode through [`IdentifierCodec::global`],
//! so identifiers loaded from the store share the process-wide cache.
//!
//! ## Example
//!
//! ```rust
//! use persona_core::identifier::{Identifier, IdentifierCodec, ProfileIdentifier};
//!
//! let alice = ProfileIdentifier::new("twitter", "alice").unwrap();
//! let text = alice.to_text();
//! assert_eq!(text, "person:twitter/alice");
//!
//! let codec = IdentifierCodec::new();
//! let decoded = codec.decode(&text).unwrap();
//! assert_eq!(*decoded, Identifier::Profile(alice));
//! ```

mod codec;
mod ec_key;
mod group;
mod post;
mod profile;

pub use codec::{DecodeCache, IdentifierCodec};
pub use ec_key::{EcKeyIdentifier, PersonaIdentifier, SECP256K1_CURVE};
pub use group::{GroupIdentifier, PreDefinedVirtualGroup};
pub use post::{PostIdentifier, PostIvIdentifier};
pub use profile::ProfileIdentifier;

use crate::error::{PersonaError, PersonaResult};
use std::fmt;
use std::str::FromStr;

/// Separator between payload components
pub(crate) const SEPARATOR: char = '/';

/// Stand-in for `/` inside payloads that escape it (IVs, compressed points)
pub(crate) const ESCAPED_SEPARATOR: char = '|';

/// Anything with a canonical `<kind>:<payload>` text form.
pub trait Canonical {
    /// The canonical text form.
    fn to_text(&self) -> String;
}

/// Closed set of identifier kinds, dispatched on the `<kind>` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Profile(ProfileIdentifier),
    Group(GroupIdentifier),
    Post(PostIdentifier),
    PostIv(PostIvIdentifier),
    EcKey(EcKeyIdentifier),
}

impl Identifier {
    pub const PROFILE_KIND: &'static str = "person";
    pub const GROUP_KIND: &'static str = "group";
    pub const POST_KIND: &'static str = "post";
    pub const POST_IV_KIND: &'static str = "post_iv";
    pub const EC_KEY_KIND: &'static str = "ec_key";

    /// The `<kind>` prefix of this identifier
    pub fn kind(&self) -> &'static str {
        match self {
            Identifier::Profile(_) => Self::PROFILE_KIND,
            Identifier::Group(_) => Self::GROUP_KIND,
            Identifier::Post(_) => Self::POST_KIND,
            Identifier::PostIv(_) => Self::POST_IV_KIND,
            Identifier::EcKey(_) => Self::EC_KEY_KIND,
        }
    }

    /// Canonical text form
    pub fn to_text(&self) -> String {
        match self {
            Identifier::Profile(id) => id.to_text(),
            Identifier::Group(id) => id.to_text(),
            Identifier::Post(id) => id.to_text(),
            Identifier::PostIv(id) => id.to_text(),
            Identifier::EcKey(id) => id.to_text(),
        }
    }

    /// Compare two identifiers by canonical text
    pub fn equals(a: &Identifier, b: &Identifier) -> bool {
        a.to_text() == b.to_text()
    }

    /// Decode without consulting any cache.
    ///
    /// Splits on the first `:` and hands the remainder to the variant's
    /// decoder. Returns `None` for unknown kinds or a wrong payload arity.
    pub(crate) fn decode_uncached(text: &str) -> Option<Identifier> {
        let (kind, payload) = text.split_once(':')?;
        match kind {
            Self::PROFILE_KIND => ProfileIdentifier::decode_payload(payload).map(Identifier::Profile),
            Self::GROUP_KIND => GroupIdentifier::decode_payload(payload).map(Identifier::Group),
            Self::POST_KIND => PostIdentifier::decode_payload(payload).map(Identifier::Post),
            Self::POST_IV_KIND => PostIvIdentifier::decode_payload(payload).map(Identifier::PostIv),
            Self::EC_KEY_KIND => EcKeyIdentifier::decode_payload(payload).map(Identifier::EcKey),
            _ => None,
        }
    }

    pub fn as_profile(&self) -> Option<&ProfileIdentifier> {
        match self {
            Identifier::Profile(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_ec_key(&self) -> Option<&EcKeyIdentifier> {
        match self {
            Identifier::EcKey(id) => Some(id),
            _ => None,
        }
    }
}

impl Canonical for Identifier {
    fn to_text(&self) -> String {
        Identifier::to_text(self)
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.to_text().cmp(&other.to_text())
    }
}

impl From<ProfileIdentifier> for Identifier {
    fn from(id: ProfileIdentifier) -> Self {
        Identifier::Profile(id)
    }
}

impl From<GroupIdentifier> for Identifier {
    fn from(id: GroupIdentifier) -> Self {
        Identifier::Group(id)
    }
}

impl From<PostIdentifier> for Identifier {
    fn from(id: PostIdentifier) -> Self {
        Identifier::Post(id)
    }
}

impl From<PostIvIdentifier> for Identifier {
    fn from(id: PostIvIdentifier) -> Self {
        Identifier::PostIv(id)
    }
}

impl From<EcKeyIdentifier> for Identifier {
    fn from(id: EcKeyIdentifier) -> Self {
        Identifier::EcKey(id)
    }
}

/// Join the canonical forms of `ids` with `,`.
///
/// When `order_matters` is false the encodings are sorted first, so the
/// result is independent of the iteration order of the source collection.
pub fn ordered_join<'a, T, I>(ids: I, order_matters: bool) -> String
where
    T: Canonical + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut texts: Vec<String> = ids.into_iter().map(Canonical::to_text).collect();
    if !order_matters {
        texts.sort();
    }
    texts.join(",")
}

/// Reject a payload component that contains the separator.
pub(crate) fn no_slash(component: &str) -> PersonaResult<()> {
    if component.contains(SEPARATOR) {
        return Err(PersonaError::InvalidIdentifierComponent {
            component: component.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn non_empty(field: &'static str, component: &str) -> PersonaResult<()> {
    if component.is_empty() {
        return Err(PersonaError::EmptyIdentifierComponent { field });
    }
    Ok(())
}

/// A plain payload component: non-empty, no `/`.
pub(crate) fn component(field: &'static str, value: &str) -> PersonaResult<()> {
    non_empty(field, value)?;
    no_slash(value)
}

/// A payload stored with `/` escaped as `|`. The escape character itself
/// cannot appear, or escaping would stop being reversible.
pub(crate) fn escaped_component(field: &'static str, value: &str) -> PersonaResult<String> {
    non_empty(field, value)?;
    if value.contains(ESCAPED_SEPARATOR) {
        return Err(PersonaError::InvalidIdentifierComponent {
            component: value.to_string(),
        });
    }
    Ok(escape_separator(value))
}

pub(crate) fn escape_separator(component: &str) -> String {
    component.replace(SEPARATOR, &ESCAPED_SEPARATOR.to_string())
}

pub(crate) fn restore_separator(component: &str) -> String {
    component.replace(ESCAPED_SEPARATOR, &SEPARATOR.to_string())
}

/// Implements `Display`, `FromStr`, and string-form serde for an identifier
/// type, all in terms of its canonical text.
macro_rules! canonical_text_impls {
    ($ty:ty, $variant:ident) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.to_text())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::error::PersonaError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let decoded = $crate::identifier::IdentifierCodec::global().decode(s);
                match decoded.as_deref() {
                    Some($crate::identifier::Identifier::$variant(id)) => Ok(id.clone()),
                    _ => Err($crate::error::PersonaError::MalformedIdentifier(
                        s.to_string(),
                    )),
                }
            }
        }

        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_text())
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                text.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use canonical_text_impls;

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl FromStr for Identifier {
    type Err = PersonaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IdentifierCodec::global()
            .decode(s)
            .map(|id| (*id).clone())
            .ok_or_else(|| PersonaError::MalformedIdentifier(s.to_string()))
    }
}

impl serde::Serialize for Identifier {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_text())
    }
}

impl<'de> serde::Deserialize<'de> for Identifier {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
