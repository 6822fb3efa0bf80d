use std::fs;

use photo_kiosk::catalog::Catalog;
use photo_kiosk::events::ImageId;
use photo_kiosk::visited::VisitedStore;
use tempfile::tempdir;

fn id(s: &str) -> ImageId {
    ImageId::from(s)
}

fn stored_paths(path: &std::path::Path) -> Vec<String> {
    let raw = fs::read_to_string(path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    value["visitedPaths"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

#[test]
fn marks_survive_a_reload() {
    let tmp = tempdir().unwrap();
    let db = tmp.path().join("db.json");

    let store = VisitedStore::load(&db);
    assert!(store.is_empty());
    assert!(store.mark_visited(&id("/a.jpg")));
    assert!(store.mark_visited(&id("/b.jpg")));
    assert_eq!(stored_paths(&db), vec!["/a.jpg", "/b.jpg"]);
    drop(store);

    let reloaded = VisitedStore::load(&db);
    assert_eq!(reloaded.len(), 2);
    assert!(reloaded.contains(&id("/a.jpg")));
    assert!(reloaded.contains(&id("/b.jpg")));
    assert_eq!(reloaded.path(), db.as_path());
}

#[test]
fn marking_twice_is_a_no_op() {
    let tmp = tempdir().unwrap();
    let db = tmp.path().join("db.json");
    let store = VisitedStore::load(&db);

    assert!(store.mark_visited(&id("/a.jpg")));
    assert!(!store.mark_visited(&id("/a.jpg")));
    assert_eq!(store.len(), 1);
    assert_eq!(stored_paths(&db), vec!["/a.jpg"]);
}

#[test]
fn missing_file_starts_empty_without_creating_it() {
    let tmp = tempdir().unwrap();
    let db = tmp.path().join("absent.json");
    let store = VisitedStore::load(&db);
    assert!(store.is_empty());
    assert!(!db.exists());
}

#[test]
fn corrupt_file_is_treated_as_empty_and_rewritten_on_mark() {
    let tmp = tempdir().unwrap();
    let db = tmp.path().join("db.json");
    fs::write(&db, "{ not json").unwrap();

    let store = VisitedStore::load(&db);
    assert!(store.is_empty());
    store.mark_visited(&id("/a.jpg"));
    assert_eq!(stored_paths(&db), vec!["/a.jpg"]);
}

#[test]
fn wrong_shape_is_treated_as_empty() {
    let tmp = tempdir().unwrap();
    let db = tmp.path().join("db.json");
    fs::write(&db, r#"{"visitedPaths": "oops"}"#).unwrap();
    assert!(VisitedStore::load(&db).is_empty());
}

#[test]
fn duplicate_entries_are_collapsed_on_load() {
    let tmp = tempdir().unwrap();
    let db = tmp.path().join("db.json");
    fs::write(&db, r#"{"visitedPaths": ["/a.jpg", "/a.jpg", "/b.jpg"]}"#).unwrap();
    assert_eq!(VisitedStore::load(&db).len(), 2);
}

#[test]
fn clear_empties_memory_and_disk() {
    let tmp = tempdir().unwrap();
    let db = tmp.path().join("db.json");
    let store = VisitedStore::load(&db);
    store.mark_visited(&id("/a.jpg"));
    store.mark_visited(&id("/b.jpg"));

    store.clear();
    assert!(store.is_empty());
    assert_eq!(store.resets(), 1);
    assert!(stored_paths(&db).is_empty());
    assert!(VisitedStore::load(&db).is_empty());
}

#[test]
fn unknown_keys_are_preserved_on_rewrite() {
    let tmp = tempdir().unwrap();
    let db = tmp.path().join("db.json");
    fs::write(&db, r#"{"visitedPaths": [], "owner": "lobby", "version": 2}"#).unwrap();

    let store = VisitedStore::load(&db);
    store.mark_visited(&id("/a.jpg"));
    store.clear();

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&db).unwrap()).unwrap();
    assert_eq!(value["owner"], "lobby");
    assert_eq!(value["version"], 2);
    assert!(!tmp.path().join("db.tmp").exists());
}

#[test]
fn covers_is_a_membership_check() {
    let tmp = tempdir().unwrap();
    let store = VisitedStore::load(tmp.path().join("db.json"));
    let catalog = Catalog::new(vec![id("/a.jpg"), id("/b.jpg")]).unwrap();

    store.mark_visited(&id("/a.jpg"));
    store.mark_visited(&id("/stale.jpg"));
    assert_eq!(store.len(), catalog.len());
    assert!(!store.covers(&catalog));

    store.mark_visited(&id("/b.jpg"));
    assert!(store.covers(&catalog));
}

#[test]
fn retain_catalog_prunes_and_persists() {
    let tmp = tempdir().unwrap();
    let db = tmp.path().join("db.json");
    fs::write(&db, r#"{"visitedPaths": ["/a.jpg", "/gone.jpg", "/b.jpg"]}"#).unwrap();
    let store = VisitedStore::load(&db);
    let catalog = Catalog::new(vec![id("/a.jpg"), id("/b.jpg"), id("/c.jpg")]).unwrap();

    assert_eq!(store.retain_catalog(&catalog), 1);
    assert_eq!(store.len(), 2);
    assert_eq!(stored_paths(&db), vec!["/a.jpg", "/b.jpg"]);
    assert_eq!(store.retain_catalog(&catalog), 0);
}

#[test]
fn unwritable_location_keeps_memory_state() {
    let tmp = tempdir().unwrap();
    let db = tmp.path().join("missing-dir").join("db.json");
    let store = VisitedStore::load(&db);
    assert!(store.mark_visited(&id("/a.jpg")));
    assert!(store.contains(&id("/a.jpg")));
    assert!(!db.exists());
}
