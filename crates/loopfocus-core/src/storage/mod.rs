mod config;
pub mod database;

pub use config::{Config, HistoryConfig, PlaybackConfig, Preset, TimerConfig};
pub use database::Database;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::{ConfigError, CoreError, DatabaseError, Result};

/// Returns the loopfocus data directory, creating it if needed.
///
/// `LOOPFOCUS_HOME` wins outright. Otherwise `~/.config/loopfocus/`, or
/// `~/.config/loopfocus-dev/` when `LOOPFOCUS_ENV=dev`.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("LOOPFOCUS_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("LOOPFOCUS_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("loopfocus-dev")
            } else {
                base_dir.join("loopfocus")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}

/// String key-value persistence.
pub trait KvStore {
    fn load(&self, key: &str) -> Result<Option<String>>;

    fn save(&self, key: &str, value: &str) -> Result<()>;

    /// Forget `key`. Returns whether it was present.
    fn delete(&self, key: &str) -> Result<bool>;
}

/// Process-local [`KvStore`]. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| CoreError::Database(DatabaseError::Locked))?;
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| CoreError::Database(DatabaseError::Locked))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| CoreError::Database(DatabaseError::Locked))?;
        Ok(values.remove(key).is_some())
    }
}
