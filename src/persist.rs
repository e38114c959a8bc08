//! Local persistence of completion flags.
//!
//! Statuses are stored as one JSON object per data source, keyed by a
//! namespaced identifier derived from the source's identity. The store
//! itself is an injected key-value capability so the pipeline never
//! depends on where the flags live.

use std::cell::RefCell;
use std::collections::HashMap;

use anyhow::{Context, Result};
use log::{debug, warn};
use rusqlite::{Connection, OptionalExtension};

const NAMESPACE_PREFIX: &str = "depflow:status:";

/// String key-value storage.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// SQLite-backed store (see `db::init` for the schema).
pub struct SqliteKv {
    conn: Connection,
}

impl SqliteKv {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open (and initialize) the database at `path`.
    pub fn open(path: &str) -> Result<Self> {
        crate::db::ensure_dir(path)?;
        let conn = crate::db::open(path)?;
        crate::db::init(&conn)?;
        Ok(Self::new(conn))
    }
}

impl KvStore for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}

/// In-process store.
#[derive(Default)]
pub struct MemoryKv {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Persisted status overrides for one data source.
pub struct StatusOverrides {
    store: Box<dyn KvStore>,
    key: String,
}

impl StatusOverrides {
    pub fn new(store: Box<dyn KvStore>, source_identity: &str) -> Self {
        Self {
            store,
            key: format!("{NAMESPACE_PREFIX}{source_identity}"),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the saved `id -> status` map. Unreadable state is treated as empty.
    pub fn load(&self) -> Result<HashMap<String, String>> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(HashMap::new());
        };
        match serde_json::from_str(&raw) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!("ignoring unreadable saved statuses under '{}': {e}", self.key);
                Ok(HashMap::new())
            }
        }
    }

    /// Save the status for one row, keeping every other saved entry.
    pub fn record(&self, id: &str, status: &str) -> Result<()> {
        let mut map = self.load()?;
        map.insert(id.to_string(), status.to_string());
        let json = serde_json::to_string(&map).context("failed to encode statuses")?;
        self.store.set(&self.key, &json)?;
        debug!("saved status '{status}' for '{id}'");
        Ok(())
    }

    /// Forget every saved status for this source.
    pub fn clear(&self) -> Result<()> {
        self.store.remove(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn sqlite() -> Box<dyn KvStore> {
        Box::new(SqliteKv::new(db::open_memory().unwrap()))
    }

    #[test]
    fn sqlite_get_set_remove() {
        let kv = sqlite();
        assert_eq!(kv.get("k").unwrap(), None);
        kv.set("k", "v1").unwrap();
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("v1"));
        kv.set("k", "v2").unwrap();
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("v2"));
        kv.remove("k").unwrap();
        assert_eq!(kv.get("k").unwrap(), None);
    }

    #[test]
    fn memory_get_set_remove() {
        let kv = MemoryKv::new();
        kv.set("k", "v").unwrap();
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("v"));
        kv.remove("k").unwrap();
        assert_eq!(kv.get("k").unwrap(), None);
    }

    #[test]
    fn overrides_round_trip() {
        let overrides = StatusOverrides::new(sqlite(), "/data/tasks.csv");
        assert!(overrides.load().unwrap().is_empty());
        overrides.record("a", "done").unwrap();
        overrides.record("b", "todo").unwrap();
        overrides.record("a", "todo").unwrap();
        let map = overrides.load().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"], "todo");
        assert_eq!(map["b"], "todo");
    }

    #[test]
    fn sources_are_namespaced() {
        let kv = std::rc::Rc::new(MemoryKv::new());
        struct Shared(std::rc::Rc<MemoryKv>);
        impl KvStore for Shared {
            fn get(&self, key: &str) -> Result<Option<String>> {
                self.0.get(key)
            }
            fn set(&self, key: &str, value: &str) -> Result<()> {
                self.0.set(key, value)
            }
            fn remove(&self, key: &str) -> Result<()> {
                self.0.remove(key)
            }
        }

        let one = StatusOverrides::new(Box::new(Shared(kv.clone())), "one.csv");
        let two = StatusOverrides::new(Box::new(Shared(kv.clone())), "two.csv");
        one.record("a", "done").unwrap();
        assert!(two.load().unwrap().is_empty());
        assert_eq!(one.key(), "depflow:status:one.csv");
    }

    #[test]
    fn unreadable_state_is_empty() {
        let kv = MemoryKv::new();
        kv.set("depflow:status:x", "not json").unwrap();
        let overrides = StatusOverrides::new(Box::new(kv), "x");
        assert!(overrides.load().unwrap().is_empty());
    }

    #[test]
    fn clear_forgets_everything() {
        let overrides = StatusOverrides::new(sqlite(), "x");
        overrides.record("a", "done").unwrap();
        overrides.clear().unwrap();
        assert!(overrides.load().unwrap().is_empty());
    }
}
