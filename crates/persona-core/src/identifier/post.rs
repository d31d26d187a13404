//! Post identifiers
//!
//! - `post:<postId>/<inner>` scopes a post under another identifier. The
//!   inner identifier is usually the author's profile, or another post for
//!   replies and comments, so everything after the first `/` belongs to it.
//! - `post_iv:<network>/<iv>` addresses a post by its encryption IV. IVs are
//!   base64 and may contain `/`, which is stored as `|`.

use super::{
    canonical_text_impls, component, escaped_component, restore_separator, Canonical, Identifier,
    SEPARATOR,
};
use crate::error::PersonaResult;

/// A post scoped under another identifier of type `T`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PostIdentifier<T = Identifier> {
    post_id: String,
    inner: Box<T>,
}

impl<T: Canonical> PostIdentifier<T> {
    pub fn new(inner: T, post_id: impl Into<String>) -> PersonaResult<Self> {
        let post_id = post_id.into();
        component("post_id", &post_id)?;
        Ok(Self {
            post_id,
            inner: Box::new(inner),
        })
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn to_text(&self) -> String {
        format!(
            "{}:{}/{}",
            Identifier::POST_KIND,
            self.post_id,
            self.inner.to_text()
        )
    }

    /// Forget the static type of the inner identifier.
    pub fn into_erased(self) -> PostIdentifier
    where
        T: Into<Identifier>,
    {
        PostIdentifier {
            post_id: self.post_id,
            inner: Box::new((*self.inner).into()),
        }
    }
}

impl PostIdentifier {
    pub(crate) fn decode_payload(payload: &str) -> Option<Self> {
        let (post_id, inner) = payload.split_once(SEPARATOR)?;
        if post_id.is_empty() {
            return None;
        }
        let inner = Identifier::decode_uncached(inner)?;
        Some(Self {
            post_id: post_id.to_string(),
            inner: Box::new(inner),
        })
    }
}

impl<T: Canonical> Canonical for PostIdentifier<T> {
    fn to_text(&self) -> String {
        PostIdentifier::to_text(self)
    }
}

canonical_text_impls!(PostIdentifier, Post);

/// A post addressed by `(network, iv)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PostIvIdentifier {
    network: String,
    /// IV with `/` escaped
    encoded_iv: String,
}

impl PostIvIdentifier {
    /// Create a post IV identifier. `/` in the IV is escaped; `|` is
    /// rejected since it is the escape.
    pub fn new(network: impl Into<String>, iv: &str) -> PersonaResult<Self> {
        let network = network.into();
        component("network", &network)?;
        Ok(Self {
            network,
            encoded_iv: escaped_component("iv", iv)?,
        })
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    /// The IV with its `/` characters restored.
    pub fn iv(&self) -> String {
        restore_separator(&self.encoded_iv)
    }

    pub fn to_text(&self) -> String {
        format!(
            "{}:{}/{}",
            Identifier::POST_IV_KIND,
            self.network,
            self.encoded_iv
        )
    }

    pub(crate) fn decode_payload(payload: &str) -> Option<Self> {
        let mut parts = payload.split(SEPARATOR);
        let network = parts.next().filter(|s| !s.is_empty())?;
        let iv = parts.next().filter(|s| !s.is_empty())?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            network: network.to_string(),
            encoded_iv: iv.to_string(),
        })
    }
}

impl Canonical for PostIvIdentifier {
    fn to_text(&self) -> String {
        PostIvIdentifier::to_text(self)
    }
}

canonical_text_impls!(PostIvIdentifier, PostIv);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersonaError;
    use crate::identifier::ProfileIdentifier;

    fn alice() -> ProfileIdentifier {
        ProfileIdentifier::new("twitter", "alice").unwrap()
    }

    #[test]
    fn test_post_on_profile() {
        let post = PostIdentifier::new(alice(), "1234").unwrap();
        assert_eq!(post.to_text(), "post:1234/person:twitter/alice");
        assert_eq!(post.inner(), &alice());

        let erased = post.into_erased();
        let parsed: PostIdentifier = erased.to_text().parse().unwrap();
        assert_eq!(parsed, erased);
        assert_eq!(parsed.inner(), &Identifier::Profile(alice()));
    }

    #[test]
    fn test_nested_comment_chain() {
        let post = PostIdentifier::new(alice(), "1").unwrap().into_erased();
        let comment = PostIdentifier::new(Identifier::Post(post.clone()), "2").unwrap();
        assert_eq!(comment.to_text(), "post:2/post:1/person:twitter/alice");

        let parsed: PostIdentifier = comment.to_text().parse().unwrap();
        assert_eq!(parsed, comment);
        assert_eq!(parsed.inner(), &Identifier::Post(post));
    }

    #[test]
    fn test_post_rejects_slash_in_post_id() {
        assert!(PostIdentifier::new(alice(), "1/2").is_err());
    }

    #[test]
    fn test_post_with_malformed_inner_is_none() {
        assert!(PostIdentifier::decode_payload("1234/nothing").is_none());
        assert!(PostIdentifier::decode_payload("/person:twitter/alice").is_none());
        assert!(PostIdentifier::decode_payload("1234").is_none());
    }

    #[test]
    fn test_post_iv_escapes_slash() {
        let id = PostIvIdentifier::new("twitter", "ab/cd+ef==").unwrap();
        assert_eq!(id.to_text(), "post_iv:twitter/ab|cd+ef==");
        assert_eq!(id.iv(), "ab/cd+ef==");

        let parsed: PostIvIdentifier = id.to_text().parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(parsed.iv(), "ab/cd+ef==");
    }

    #[test]
    fn test_post_iv_rejects_slash_in_network() {
        assert!(PostIvIdentifier::new("a/b", "iv").is_err());
    }

    #[test]
    fn test_post_iv_rejects_escape_char() {
        assert!(matches!(
            PostIvIdentifier::new("twitter", "a|b"),
            Err(PersonaError::InvalidIdentifierComponent { .. })
        ));
        let slashed = PostIvIdentifier::new("twitter", "a/b").unwrap();
        assert_eq!(slashed.iv(), "a/b");
    }

    #[test]
    fn test_rejects_empty_components() {
        assert!(matches!(
            PostIvIdentifier::new("twitter", ""),
            Err(PersonaError::EmptyIdentifierComponent { field: "iv" })
        ));
        assert!(PostIvIdentifier::new("", "abc").is_err());
        assert!(matches!(
            PostIdentifier::new(alice(), ""),
            Err(PersonaError::EmptyIdentifierComponent { field: "post_id" })
        ));
    }
}
