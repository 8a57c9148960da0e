use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

/// SQLite-backed key/value table used as a durable storage backend.
pub struct DbManager {
    conn: Connection,
}

impl DbManager {
    /// Opens (or creates) the database file. The parent folder must exist.
    pub fn open(db_path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, rusqlite::Error> {
        let db_manager = Self { conn };
        db_manager.initialize_schema()?;
        Ok(db_manager)
    }

    fn initialize_schema(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
    }

    /// Replaces the stored value for `key` in a single statement.
    pub fn put_value(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::DbManager;

    #[test]
    fn test_missing_key_reads_as_none() {
        let db = DbManager::open_in_memory().expect("in-memory db should open");
        assert_eq!(db.get_value("absent").expect("query should succeed"), None);
    }

    #[test]
    fn test_put_value_overwrites_previous_value() {
        let db = DbManager::open_in_memory().expect("in-memory db should open");

        db.put_value("favorites", "[]").expect("first write");
        db.put_value("favorites", "[{\"id\":\"1\"}]")
            .expect("second write");

        assert_eq!(
            db.get_value("favorites").expect("query should succeed"),
            Some("[{\"id\":\"1\"}]".to_string())
        );
    }
}
