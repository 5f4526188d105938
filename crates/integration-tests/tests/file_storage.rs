//! Persistence and cross-process polling over `FileStorage`.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use rust_decimal::Decimal;
use shopstate_core::{CanonicalId, CartLine, CollectionKind, Entry};
use shopstate_engine::{FileStorage, ShopState, Storage, StoragePoller, load_collection};
use shopstate_integration_tests::{TempOrigin, product};

fn id(raw: &str) -> CanonicalId {
    CanonicalId::parse(raw).unwrap()
}

#[test]
fn test_state_survives_reopen() {
    let origin = TempOrigin::new();

    {
        let mut state = ShopState::open_from_config(origin.config()).unwrap();
        state.cart_mut().add_item(&product("A", 100));
        state.cart_mut().add_item(&product("A", 100));
        state.cart_mut().add_item(&product("B", 50));
        state.favorites_mut().add_item(&product("X", 1));
    }

    let state = ShopState::open_from_config(origin.config()).unwrap();
    assert_eq!(state.cart().count(), 3);
    assert_eq!(state.cart().subtotal(), Decimal::from(250));
    assert_eq!(state.cart().snapshot().entries()[0].canonical_id(), &id("A"));
    assert!(state.favorites().is_in_collection(&id("X")));
}

#[test]
fn test_empty_collection_round_trips() {
    let origin = TempOrigin::new();

    {
        let mut state = ShopState::open_from_config(origin.config()).unwrap();
        state.cart_mut().add_item(&product("A", 1));
        state.cart_mut().clear();
    }

    let storage = FileStorage::from_config(origin.config()).unwrap();
    let key = origin.config().storage_key(CollectionKind::Cart).unwrap();
    assert_eq!(storage.get_item(&key).unwrap().as_deref(), Some("[]"));

    let state = ShopState::open(storage, origin.config()).unwrap();
    assert!(state.cart().snapshot().is_empty());
}

#[test]
fn test_corrupt_file_loads_empty() {
    let origin = TempOrigin::new();
    let storage = FileStorage::from_config(origin.config()).unwrap();
    let key = origin.config().storage_key(CollectionKind::Cart).unwrap();
    std::fs::write(storage.path_for(&key), "[{\"canonicalId\":").unwrap();

    let mut state = ShopState::open(storage.clone(), origin.config()).unwrap();
    assert!(state.cart().snapshot().is_empty());

    // The next mutation replaces the corrupt blob.
    state.cart_mut().add_item(&product("A", 1));
    let (reloaded, _) = load_collection::<CartLine, _>(&storage, &key);
    assert_eq!(reloaded.len(), 1);
}

#[test]
fn test_writes_leave_no_temp_files() {
    let origin = TempOrigin::new();
    let mut state = ShopState::open_from_config(origin.config()).unwrap();
    for n in 0..3 {
        state.cart_mut().add_item(&product(&format!("P{n}"), 1));
    }
    state.favorites_mut().add_item(&product("X", 1));

    let mut names: Vec<String> = std::fs::read_dir(origin.config().origin_dir().unwrap())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["shopstate.cart.json", "shopstate.favorites.json"]);
}

#[test]
fn test_second_process_sees_changes_by_polling() {
    let origin = TempOrigin::new();
    let config = origin.config();

    // Separate storage handles model separate processes: no shared fan-out.
    let mut writer = ShopState::open(FileStorage::from_config(config).unwrap(), config).unwrap();
    let reader_storage = FileStorage::from_config(config).unwrap();
    let mut reader = ShopState::open(reader_storage.clone(), config).unwrap();
    let mut poller = StoragePoller::new(
        reader_storage,
        [
            config.storage_key(CollectionKind::Cart).unwrap(),
            config.storage_key(CollectionKind::Favorites).unwrap(),
        ],
    );
    assert!(poller.poll().is_empty());

    writer.cart_mut().add_item(&product("A", 100));
    writer.favorites_mut().add_item(&product("X", 1));
    assert_eq!(reader.poll_storage_events(), 0);

    let events = poller.poll();
    assert_eq!(events.len(), 2);
    for event in &events {
        assert!(reader.apply_storage_event(event));
    }
    assert_eq!(reader.cart().count(), 1);
    assert!(reader.favorites().is_in_collection(&id("X")));

    // The reader's own write comes back through the poller as an echo.
    reader.cart_mut().add_item(&product("B", 50));
    let events = poller.poll();
    assert_eq!(events.len(), 1);
    assert!(!reader.apply_storage_event(&events[0]));
    assert_eq!(reader.cart().subtotal(), Decimal::from(150));

    // Removing the file reads as an empty collection.
    std::fs::remove_file(
        FileStorage::from_config(config)
            .unwrap()
            .path_for(&config.storage_key(CollectionKind::Cart).unwrap()),
    )
    .unwrap();
    let events = poller.poll();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].new_value, None);
    assert!(reader.apply_storage_event(&events[0]));
    assert!(reader.cart().snapshot().is_empty());
}
