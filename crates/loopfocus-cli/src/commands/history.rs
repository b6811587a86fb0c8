use chrono::Utc;
use clap::Subcommand;
use loopfocus_core::{
    Config, Database, HistoryEntry, HistoryStore, KvStore, MediaId, MediaMetadata, MetadataClient,
};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List recently watched videos, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a video by link or id
    Add {
        /// Video URL or 11-character id
        url: String,
        /// Skip the title lookup and store a placeholder
        #[arg(long)]
        offline: bool,
    },
    /// Remove a video
    Remove {
        /// Video URL or id
        id: String,
    },
    /// Forget every entry
    Clear,
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let store = HistoryStore::new(Database::open()?, config.history.max_entries);

    match action {
        HistoryAction::List { json } => {
            let history = store.load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(history.entries())?);
            } else if history.is_empty() {
                println!("no history");
            } else {
                for entry in history.entries() {
                    let author = entry.author.as_deref().unwrap_or("-");
                    println!(
                        "{}  {}  ({author})  {}",
                        entry.media_id,
                        entry.title,
                        entry.added_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }
        HistoryAction::Add { url, offline } => {
            let id = MediaId::parse(&url)?;
            let metadata = if offline {
                MediaMetadata::placeholder(&id)
            } else {
                lookup(&id)?
            };
            let entry = HistoryEntry::new(id, metadata, Utc::now());
            println!("{}", add_entry(&store, entry)?);
        }
        HistoryAction::Remove { id } => {
            let id = MediaId::parse(&id)?;
            let mut removed = false;
            store.update(|h| removed = h.remove(&id))?;
            if !removed {
                return Err(format!("not in history: {id}").into());
            }
            println!("removed: {id}");
        }
        HistoryAction::Clear => {
            store.clear()?;
            println!("history cleared");
        }
    }
    Ok(())
}

/// Store `entry` and return the confirmation line. Nothing is reported
/// unless the save went through.
fn add_entry<S: KvStore>(
    store: &HistoryStore<S>,
    entry: HistoryEntry,
) -> Result<String, Box<dyn std::error::Error>> {
    let line = format!("added: {} {}", entry.media_id, entry.title);
    store.update(|h| h.add(entry))?;
    Ok(line)
}

fn lookup(id: &MediaId) -> Result<MediaMetadata, Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let client = MetadataClient::new();
    Ok(rt.block_on(client.fetch_or_placeholder(id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopfocus_core::error::{CoreError, DatabaseError};
    use loopfocus_core::MemoryStore;

    /// Reads fine, refuses every write.
    struct ReadOnlyStore;

    impl KvStore for ReadOnlyStore {
        fn load(&self, _key: &str) -> loopfocus_core::Result<Option<String>> {
            Ok(None)
        }

        fn save(&self, _key: &str, _value: &str) -> loopfocus_core::Result<()> {
            Err(CoreError::Database(DatabaseError::Locked))
        }

        fn delete(&self, _key: &str) -> loopfocus_core::Result<bool> {
            Err(CoreError::Database(DatabaseError::Locked))
        }
    }

    fn rain() -> HistoryEntry {
        let id = MediaId::parse("dQw4w9WgXcQ").unwrap();
        HistoryEntry::new(id.clone(), MediaMetadata::placeholder(&id), Utc::now())
    }

    #[test]
    fn add_reports_after_save() {
        let kv = MemoryStore::new();
        let store = HistoryStore::new(kv, 5);
        let line = add_entry(&store, rain()).unwrap();
        assert_eq!(line, "added: dQw4w9WgXcQ dQw4w9WgXcQ");
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn failed_save_reports_nothing() {
        let store = HistoryStore::new(ReadOnlyStore, 5);
        assert!(add_entry(&store, rain()).is_err());
    }
}
