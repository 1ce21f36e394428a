//! SQLite connection and key/value access

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use crate::backend::Backend;
use crate::migrations::run_migrations;
use crate::Result;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}

impl Backend for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            let value = conn
                .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(value)
        })
    }

    fn put_all(&self, entries: &[(&str, String)]) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();
        self.transaction(|tx| {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
            )?;
            for (key, value) in entries {
                stmt.execute(rusqlite::params![key, value, updated_at])?;
            }
            Ok(())
        })
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_key() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get("settings").unwrap(), None);
    }

    #[test]
    fn test_put_all_overwrites() {
        let db = Database::open_in_memory().unwrap();
        db.put_all(&[("rules", "[]".to_string()), ("meta", "{}".to_string())])
            .unwrap();
        db.put_all(&[("rules", "[1]".to_string())]).unwrap();

        assert_eq!(db.get("rules").unwrap().as_deref(), Some("[1]"));
        assert_eq!(db.get("meta").unwrap().as_deref(), Some("{}"));

        db.with_connection(|conn| {
            let count: i32 = conn.query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))?;
            assert_eq!(count, 2);
            Ok(())
        })
        .unwrap();
    }
}
