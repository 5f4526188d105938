//! Several contexts ("tabs") sharing one in-memory origin.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use rust_decimal::Decimal;
use shopstate_core::{CanonicalId, CollectionKind, Entry};
use shopstate_engine::{EngineConfig, MemoryStorage, ShopState, Storage, StorageEvent};
use shopstate_integration_tests::product;

fn id(raw: &str) -> CanonicalId {
    CanonicalId::parse(raw).unwrap()
}

type Tab = ShopState<MemoryStorage>;

fn pair(storage: &MemoryStorage, config: &EngineConfig) -> (Tab, Tab) {
    (
        ShopState::open(storage.clone(), config).unwrap(),
        ShopState::open(storage.clone(), config).unwrap(),
    )
}

#[test]
fn test_own_write_does_not_loop() {
    let storage = MemoryStorage::default();
    let (mut tab, _other) = pair(&storage, &EngineConfig::default());
    let mut changes = tab.cart().subscribe();

    tab.cart_mut().add_item(&product("A", 100));
    assert!(changes.try_recv().is_ok());

    // The echo queued by our own write is consumed without effect.
    assert_eq!(tab.poll_storage_events(), 0);

    // A synthetic notification carrying exactly what we wrote is ignored too.
    let echo = StorageEvent {
        key: tab.cart().key().clone(),
        new_value: tab.cart().last_written().map(ToString::to_string),
    };
    let recomputations = tab.cart().view_recomputations();
    assert!(!tab.apply_storage_event(&echo));
    assert!(changes.try_recv().is_err());
    assert_eq!(tab.cart().view_recomputations(), recomputations);
}

#[test]
fn test_other_tab_adopts_without_writing_back() {
    let storage = MemoryStorage::default();
    let config = EngineConfig::default();
    let (mut tab, mut other) = pair(&storage, &config);
    let mut other_changes = other.cart().subscribe();

    tab.cart_mut().add_item(&product("A", 100));
    tab.cart_mut().add_item(&product("A", 100));
    let written = storage
        .get_item(&config.storage_key(CollectionKind::Cart).unwrap())
        .unwrap();

    assert_eq!(other.poll_storage_events(), 1);
    assert_eq!(other.cart().count(), 2);
    assert_eq!(other.cart().subtotal(), Decimal::from(200));
    assert!(other_changes.try_recv().is_ok());
    assert!(other_changes.try_recv().is_err());

    // Adopting did not touch storage, so the writer sees nothing new.
    assert_eq!(
        storage
            .get_item(&config.storage_key(CollectionKind::Cart).unwrap())
            .unwrap(),
        written
    );
    assert_eq!(tab.poll_storage_events(), 0);
}

#[test]
fn test_mutations_build_on_latest_foreign_state() {
    let storage = MemoryStorage::default();
    let (mut tab, mut other) = pair(&storage, &EngineConfig::default());

    tab.favorites_mut().add_item(&product("X", 1));
    // No explicit poll: the mutation drains pending events first.
    other.favorites_mut().add_item(&product("Y", 1));
    tab.poll_storage_events();

    for state in [&tab, &other] {
        let favorites = state.favorites().snapshot();
        assert_eq!(favorites.len(), 2);
        assert_eq!(favorites.entries()[0].canonical_id(), &id("X"));
        assert_eq!(favorites.entries()[1].canonical_id(), &id("Y"));
    }
}

#[test]
fn test_last_write_wins() {
    let storage = MemoryStorage::default();
    let config = EngineConfig::default();
    let (mut tab, mut other) = pair(&storage, &config);
    let key = config.storage_key(CollectionKind::Cart).unwrap();

    tab.cart_mut().add_item(&product("A", 10));
    storage
        .set_item(&key, r#"[{"canonicalId":"Z","quantity":5,"price":2}]"#)
        .unwrap();

    // Both tabs replace their state wholesale with the last value written.
    for state in [&mut tab, &mut other] {
        state.poll_storage_events();
        assert_eq!(state.cart().snapshot().len(), 1);
        assert!(state.cart().is_in_collection(&id("Z")));
        assert_eq!(state.cart().count(), 5);
        assert_eq!(state.cart().subtotal(), Decimal::from(10));
    }
}

#[test]
fn test_external_clear_and_corruption_read_as_empty() {
    let storage = MemoryStorage::default();
    let config = EngineConfig::default();
    let (mut tab, mut other) = pair(&storage, &config);

    tab.cart_mut().add_item(&product("A", 10));
    tab.favorites_mut().add_item(&product("B", 10));
    other.poll_storage_events();
    assert_eq!(other.cart().count(), 1);

    storage.clear().unwrap();
    storage
        .set_item(
            &config.storage_key(CollectionKind::Favorites).unwrap(),
            "{not json",
        )
        .unwrap();

    for state in [&mut tab, &mut other] {
        state.poll_storage_events();
        assert!(state.cart().snapshot().is_empty());
        assert!(state.favorites().snapshot().is_empty());
    }
}

#[test]
fn test_lagging_tab_resyncs() {
    let storage = MemoryStorage::new(1);
    let config = EngineConfig {
        event_capacity: 1,
        ..EngineConfig::default()
    };
    let (mut tab, mut other) = pair(&storage, &config);

    for n in 0..5 {
        tab.cart_mut().add_item(&product(&format!("P{n}"), 1));
    }

    assert!(other.poll_storage_events() >= 1);
    assert_eq!(other.cart().snapshot(), tab.cart().snapshot());
    assert_eq!(other.cart().count(), 5);
}

#[tokio::test]
async fn test_subscriber_receives_adopted_collection() {
    let storage = MemoryStorage::default();
    let (mut tab, mut other) = pair(&storage, &EngineConfig::default());
    let mut changes = other.cart().subscribe();

    let listener = tokio::spawn(async move {
        let collection = changes.recv().await.unwrap();
        collection.iter().map(Entry::quantity).sum::<u32>()
    });

    tab.cart_mut().add_item(&product("A", 10));
    tab.cart_mut().update_quantity(&id("A"), 3);
    // Both writes are pending; the first one adopted is what the listener sees.
    other.poll_storage_events();
    assert_eq!(other.cart().count(), 3);

    let quantity = tokio::time::timeout(std::time::Duration::from_secs(1), listener)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(quantity, 1);
}
