//! Identifier decoding with a shared decode cache
//!
//! The cache maps canonical text to the decoded identifier. Entries are
//! immutable and never evicted, so the cache grows with the number of
//! distinct identifiers seen by the codec's owner. Insertion is
//! set-if-absent: concurrent decoders of the same text end up sharing the
//! first stored value.

use super::{EcKeyIdentifier, Identifier, ProfileIdentifier};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

static GLOBAL_CODEC: OnceLock<IdentifierCodec> = OnceLock::new();

/// Append-only map from canonical text to decoded identifier.
#[derive(Debug, Default)]
pub struct DecodeCache {
    entries: RwLock<HashMap<String, Arc<Identifier>>>,
}

impl DecodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, text: &str) -> Option<Arc<Identifier>> {
        self.entries.read().get(text).cloned()
    }

    /// Insert `value` unless `text` is already cached; returns the cached value.
    pub fn get_or_insert(&self, text: &str, value: Identifier) -> Arc<Identifier> {
        let mut entries = self.entries.write();
        entries
            .entry(text.to_string())
            .or_insert_with(|| Arc::new(value))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Decodes canonical identifier text, caching successful results.
///
/// Cloning a codec shares its cache.
#[derive(Debug, Clone, Default)]
pub struct IdentifierCodec {
    cache: Arc<DecodeCache>,
}

impl IdentifierCodec {
    /// A codec with its own empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// A codec over an existing cache.
    pub fn with_cache(cache: Arc<DecodeCache>) -> Self {
        Self { cache }
    }

    /// The process-wide codec, for call sites that cannot be handed one.
    pub fn global() -> &'static IdentifierCodec {
        GLOBAL_CODEC.get_or_init(IdentifierCodec::new)
    }

    pub fn cache(&self) -> &Arc<DecodeCache> {
        &self.cache
    }

    /// Encode an identifier to its canonical text.
    pub fn encode(&self, id: &Identifier) -> String {
        id.to_text()
    }

    /// Decode canonical text.
    ///
    /// Never fails loudly: malformed text and unknown kinds yield `None`,
    /// since callers routinely probe untrusted strings.
    pub fn decode(&self, text: &str) -> Option<Arc<Identifier>> {
        if let Some(hit) = self.cache.get(text) {
            return Some(hit);
        }
        let decoded = Identifier::decode_uncached(text)?;
        Some(self.cache.get_or_insert(text, decoded))
    }

    /// Decode text that must be a profile identifier.
    pub fn decode_profile(&self, text: &str) -> Option<ProfileIdentifier> {
        self.decode(text)?.as_profile().cloned()
    }

    /// Decode text that must be an EC key identifier.
    pub fn decode_ec_key(&self, text: &str) -> Option<EcKeyIdentifier> {
        self.decode(text)?.as_ec_key().cloned()
    }

    pub fn equals(&self, a: &Identifier, b: &Identifier) -> bool {
        Identifier::equals(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_populates_cache() {
        let codec = IdentifierCodec::new();
        assert!(codec.cache().is_empty());

        let first = codec.decode("person:twitter/alice").unwrap();
        assert_eq!(codec.cache().len(), 1);

        let second = codec.decode("person:twitter/alice").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(codec.cache().len(), 1);
    }

    #[test]
    fn test_failed_decode_is_not_cached() {
        let codec = IdentifierCodec::new();
        assert!(codec.decode("person:twitter").is_none());
        assert!(codec.decode("nonsense").is_none());
        assert!(codec.cache().is_empty());
    }

    #[test]
    fn test_clones_share_cache() {
        let codec = IdentifierCodec::new();
        let clone = codec.clone();
        let a = codec.decode("group:twitter//rust").unwrap();
        let b = clone.decode("group:twitter//rust").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_get_or_insert_keeps_first_value() {
        let cache = DecodeCache::new();
        let first = cache.get_or_insert(
            "person:a/b",
            Identifier::Profile(ProfileIdentifier::new("a", "b").unwrap()),
        );
        let second = cache.get_or_insert(
            "person:a/b",
            Identifier::Profile(ProfileIdentifier::new("a", "b").unwrap()),
        );
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_typed_decoders() {
        let codec = IdentifierCodec::new();
        assert!(codec.decode_profile("person:twitter/alice").is_some());
        assert!(codec.decode_profile("ec_key:secp256k1/AAAA").is_none());
        assert!(codec.decode_ec_key("ec_key:secp256k1/AAAA").is_some());
        assert!(codec.decode_ec_key("person:twitter/alice").is_none());
    }

    #[test]
    fn test_concurrent_decodes_share_one_value() {
        let codec = IdentifierCodec::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let codec = codec.clone();
                std::thread::spawn(move || codec.decode("post_iv:twitter/abc|def").unwrap())
            })
            .collect();
        let values: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for value in &values[1..] {
            assert!(Arc::ptr_eq(&values[0], value));
        }
        assert_eq!(codec.cache().len(), 1);
    }

    #[test]
    fn test_global_codec_is_shared() {
        let a = IdentifierCodec::global();
        let b = IdentifierCodec::global();
        assert!(Arc::ptr_eq(a.cache(), b.cache()));
    }
}
