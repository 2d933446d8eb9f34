use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;

use crate::error::StoreError;
use crate::models::BookRecord;

pub const DEFAULT_STORE_KEY: &str = "books2025";

/// Key-value slot holding the serialized book list.
pub struct LocalStore {
    conn: Connection,
    key: String,
}

impl LocalStore {
    pub fn open(db_path: &Path, key: &str) -> Result<Self, StoreError> {
        if let Some(dir) = db_path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir).map_err(StoreError::DataDir)?;
            }
        }
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn, key)
    }

    pub fn open_in_memory(key: &str) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, key)
    }

    fn with_connection(conn: Connection, key: &str) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(LocalStore {
            conn,
            key: key.to_string(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Empty when nothing was ever saved under the key.
    pub fn load(&self) -> Result<Vec<BookRecord>, StoreError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![self.key],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            None => Ok(vec![]),
            Some(text) => serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
                key: self.key.clone(),
                source,
            }),
        }
    }

    pub fn save(&self, books: &[BookRecord]) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(books).map_err(StoreError::Encode)?;
        self.conn.execute(
            "INSERT INTO meta (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![self.key, encoded, chrono::Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn write_raw(&self, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value, updated_at) VALUES (?1, ?2, 0)",
            params![self.key, value],
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn raw(&self) -> Option<String> {
        self.conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![self.key],
                |row| row.get(0),
            )
            .optional()
            .ok()
            .flatten()
    }

    /// Rows written through this connection since it was opened.
    #[cfg(test)]
    pub(crate) fn total_changes(&self) -> i64 {
        self.conn
            .query_row("SELECT total_changes()", [], |row| row.get(0))
            .unwrap_or(-1)
    }
}

#[cfg(test)]
mod tests {
    use super::{LocalStore, DEFAULT_STORE_KEY};
    use crate::error::StoreError;
    use crate::models::BookRecord;

    fn book(title: &str) -> BookRecord {
        BookRecord {
            title: title.to_string(),
            author: "Someone".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn missing_key_loads_empty_list() {
        let store = LocalStore::open_in_memory(DEFAULT_STORE_KEY).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_overwrites_previous_value() {
        let store = LocalStore::open_in_memory(DEFAULT_STORE_KEY).unwrap();
        store.save(&[book("One")]).unwrap();
        store.save(&[book("One"), book("Two")]).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].title, "Two");
    }

    #[test]
    fn keys_do_not_share_state() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("shelf.db");
        let first = LocalStore::open(&path, "books2025").unwrap();
        first.save(&[book("One")]).unwrap();
        let second = LocalStore::open(&path, "books2026").unwrap();
        assert!(second.load().unwrap().is_empty());
        assert_eq!(first.load().unwrap().len(), 1);
    }

    #[test]
    fn corrupt_value_is_reported_and_kept() {
        let store = LocalStore::open_in_memory(DEFAULT_STORE_KEY).unwrap();
        store.write_raw("{not json").unwrap();
        assert!(matches!(store.load(), Err(StoreError::Corrupt { .. })));
        assert_eq!(store.raw().as_deref(), Some("{not json"));
    }
}
