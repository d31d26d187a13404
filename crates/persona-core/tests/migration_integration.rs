//! Legacy migration integration tests
//!
//! Drives the migration through the public API against an on-disk store and
//! checks the resulting persona/profile graph.

use std::collections::BTreeMap;

use persona_core::keys::{compress_public_key, generate, JsonWebKey};
use persona_core::migrate::migrate_legacy;
use persona_core::{
    ConnectionConfirmState, LegacyPersonRecord, LegacySnapshot, LinkedProfileDetails,
    PersonaEngine, ProfileIdentifier, Storage,
};
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("persona_core=debug")
        .with_test_writer()
        .try_init();
}

fn create_storage() -> (Storage, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let storage = Storage::new(temp_dir.path().join("persona.redb")).unwrap();
    (storage, temp_dir)
}

fn alice() -> ProfileIdentifier {
    "person:twitter/alice".parse().unwrap()
}

fn no_local_keys(_: &ProfileIdentifier) -> Option<JsonWebKey> {
    None
}

#[test]
fn test_single_public_record_end_to_end() {
    init_tracing();
    let (storage, _temp) = create_storage();
    let keys = generate("").unwrap().key_pair;
    let mut row = LegacyPersonRecord::new(alice());
    row.public_key = Some(keys.public_jwk());
    let snapshot = LegacySnapshot {
        observed: vec![row],
        ..Default::default()
    };

    let report = migrate_legacy(&storage, &snapshot, &no_local_keys).unwrap();
    assert!(report.is_clean());

    let expected_id = format!(
        "ec_key:secp256k1/{}",
        compress_public_key(keys.public_key()).replace('/', "|")
    );

    let personas = storage.list_personas().unwrap();
    assert_eq!(personas.len(), 1);
    let persona = &personas[0];
    assert_eq!(persona.identifier.to_text(), expected_id);
    assert!(!persona.has_private_key());
    let expected_links: BTreeMap<_, _> =
        [(alice(), LinkedProfileDetails::pending())].into_iter().collect();
    assert_eq!(persona.linked_profiles, expected_links);

    let profiles = storage.list_profiles().unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].identifier, alice());
    assert_eq!(
        profiles[0].linked_persona.as_ref().map(|p| p.to_text()),
        Some(expected_id)
    );
}

#[test]
fn test_link_graph_invariant_after_migration() {
    init_tracing();
    let (storage, _temp) = create_storage();
    let mine = generate("").unwrap().key_pair;
    let theirs = generate("").unwrap().key_pair;

    let mut owned = LegacyPersonRecord::new(alice());
    owned.public_key = Some(mine.public_jwk());
    owned.private_key = Some(mine.private_jwk());
    let mut observed = Vec::new();
    for user in ["bob", "bob_alt", "carol"] {
        let mut row = LegacyPersonRecord::new(ProfileIdentifier::new("mastodon", user).unwrap());
        if user != "carol" {
            row.public_key = Some(theirs.public_jwk());
        }
        observed.push(row);
    }
    let snapshot = LegacySnapshot {
        owned: vec![owned],
        observed,
        ..Default::default()
    };

    let report = migrate_legacy(&storage, &snapshot, &no_local_keys).unwrap();
    assert_eq!(report.personas_created, 2);
    assert_eq!(report.profiles_created, 4);
    assert_eq!(report.links_attached, 3);

    // Every back-reference is mirrored on the persona side
    for profile in storage.list_profiles().unwrap() {
        if let Some(persona_id) = &profile.linked_persona {
            let persona = storage.query_persona(persona_id).unwrap().unwrap();
            assert!(persona.linked_profiles.contains_key(&profile.identifier));
        }
    }
    assert_eq!(storage.query_my_personas().unwrap().len(), 1);
}

#[tokio::test]
async fn test_engine_migration_preserves_user_decisions() {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let engine = PersonaEngine::new(temp_dir.path()).await.unwrap();
    let keys = generate("").unwrap().key_pair;

    let mut row = LegacyPersonRecord::new(alice());
    row.public_key = Some(keys.public_jwk());
    let snapshot = LegacySnapshot {
        observed: vec![row],
        ..Default::default()
    };

    engine.migrate_legacy(&snapshot, &no_local_keys).await.unwrap();
    engine
        .attach_profile(
            &alice(),
            &keys.identifier(),
            LinkedProfileDetails::with_state(ConnectionConfirmState::Denied),
        )
        .await
        .unwrap();

    let rerun = engine.migrate_legacy(&snapshot, &no_local_keys).await.unwrap();
    assert_eq!(rerun.personas_created, 0);
    assert_eq!(rerun.profiles_created, 0);

    let persona = engine.query_persona(&keys.identifier()).await.unwrap().unwrap();
    assert_eq!(
        persona.linked_profiles[&alice()].connection_confirm_state,
        ConnectionConfirmState::Denied
    );
}
