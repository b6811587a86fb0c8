//! Recently watched videos.
//!
//! Most recent first, one entry per media id, capped in length. Persisted as
//! a JSON array under a single key of any [`KvStore`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::media::{MediaId, MediaMetadata};
use crate::storage::KvStore;

pub const DEFAULT_MAX_ENTRIES: usize = 20;

const HISTORY_KEY: &str = "history";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub media_id: MediaId,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(media_id: MediaId, metadata: MediaMetadata, added_at: DateTime<Utc>) -> Self {
        Self {
            media_id,
            title: metadata.title,
            author: metadata.author_name,
            thumbnail_url: metadata.thumbnail_url,
            added_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    entries: Vec<HistoryEntry>,
    max_entries: usize,
}

impl History {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Build from stored entries, enforcing ordering invariants on the way in.
    pub fn from_entries(entries: Vec<HistoryEntry>, max_entries: usize) -> Self {
        let mut history = Self::new(max_entries);
        // Oldest first so the newest ends up at the front.
        for entry in entries.into_iter().rev() {
            history.add(entry);
        }
        history
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn get(&self, id: &MediaId) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| &e.media_id == id)
    }

    /// Put `entry` at the front. An existing entry for the same video is
    /// replaced, so re-adding refreshes its metadata and timestamp.
    pub fn add(&mut self, entry: HistoryEntry) {
        self.entries.retain(|e| e.media_id != entry.media_id);
        self.entries.insert(0, entry);
        self.entries.truncate(self.max_entries);
    }

    /// Returns whether anything was removed.
    pub fn remove(&mut self, id: &MediaId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.media_id != id);
        self.entries.len() != before
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

/// Loads and saves a [`History`] through a key-value store.
pub struct HistoryStore<S> {
    store: S,
    max_entries: usize,
}

impl<S: KvStore> HistoryStore<S> {
    pub fn new(store: S, max_entries: usize) -> Self {
        Self { store, max_entries }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the stored history. A value that no longer parses is treated as
    /// empty and will be overwritten on the next save.
    ///
    /// # Errors
    /// Returns an error only if the store itself fails.
    pub fn load(&self) -> Result<History> {
        let Some(raw) = self.store.load(HISTORY_KEY)? else {
            return Ok(History::new(self.max_entries));
        };
        match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
            Ok(entries) => Ok(History::from_entries(entries, self.max_entries)),
            Err(e) => {
                warn!(error = %e, "stored history is unreadable; starting empty");
                Ok(History::new(self.max_entries))
            }
        }
    }

    pub fn save(&self, history: &History) -> Result<()> {
        let raw = serde_json::to_string(history.entries())?;
        self.store.save(HISTORY_KEY, &raw)
    }

    /// Drop the stored history entirely.
    pub fn clear(&self) -> Result<()> {
        self.store.delete(HISTORY_KEY)?;
        Ok(())
    }

    /// Load, apply `f`, save. Returns the updated history.
    pub fn update<F>(&self, f: F) -> Result<History>
    where
        F: FnOnce(&mut History),
    {
        let mut history = self.load()?;
        f(&mut history);
        self.save(&history)?;
        Ok(history)
    }
}
