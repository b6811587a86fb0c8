//! Integration tests for watch history persisted in the SQLite kv store.

use chrono::Utc;
use loopfocus_core::{Database, HistoryEntry, HistoryStore, KvStore, MediaId, MediaMetadata};

fn entry(raw: &str, title: &str) -> HistoryEntry {
    let id = MediaId::parse(raw).unwrap();
    let mut meta = MediaMetadata::placeholder(&id);
    meta.title = title.to_string();
    HistoryEntry::new(id, meta, Utc::now())
}

#[test]
fn test_history_survives_database_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loopfocus.db");

    {
        let store = HistoryStore::new(Database::open_at(&path).unwrap(), 20);
        store
            .update(|h| {
                h.add(entry("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "Rain"));
                h.add(entry("youtu.be/jfKfPfyJRdk", "Lofi"));
            })
            .unwrap();
    }

    let store = HistoryStore::new(Database::open_at(&path).unwrap(), 20);
    let history = store.load().unwrap();
    let titles: Vec<_> = history.entries().iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Lofi", "Rain"]);
}

#[test]
fn test_readding_moves_to_front_and_refreshes_title() {
    let store = HistoryStore::new(Database::open_memory().unwrap(), 20);
    store
        .update(|h| {
            h.add(entry("dQw4w9WgXcQ", "old title"));
            h.add(entry("jfKfPfyJRdk", "Lofi"));
            h.add(entry("dQw4w9WgXcQ", "new title"));
        })
        .unwrap();

    let history = store.load().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history.entries()[0].title, "new title");
}

#[test]
fn test_clear_and_remove() {
    let store = HistoryStore::new(Database::open_memory().unwrap(), 20);
    let id = MediaId::parse("dQw4w9WgXcQ").unwrap();
    store.update(|h| h.add(entry("dQw4w9WgXcQ", "Rain"))).unwrap();

    let history = store.update(|h| {
        h.remove(&id);
    })
    .unwrap();
    assert!(history.is_empty());

    store.update(|h| h.add(entry("jfKfPfyJRdk", "Lofi"))).unwrap();
    store.clear().unwrap();
    assert!(store.load().unwrap().is_empty());
    assert_eq!(store.store().load("history").unwrap(), None);
}
