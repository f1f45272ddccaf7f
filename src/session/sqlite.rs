use crate::errors::Result;
use crate::session::TokenStore;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Contains the SQL queries used to interact with the database
pub mod sql_queries {
    pub const CREATE_TABLE: &str =
        "CREATE TABLE IF NOT EXISTS session (key TEXT PRIMARY KEY, value TEXT NOT NULL)";

    pub const UPSERT: &str = "INSERT INTO session (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value";
    pub const SELECT: &str = "SELECT value FROM session WHERE key = ?1";
    pub const DELETE: &str = "DELETE FROM session WHERE key = ?1";
}

/// Key under which the bearer token is stored
const TOKEN_KEY: &str = "token";

/// Session token persisted in a small SQLite key-value table
pub struct SQLiteStore {
    conn: Connection,
}

impl SQLiteStore {
    /// Open (or create) the store in the file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Store that lives only as long as the value, mostly for tests
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(sql_queries::CREATE_TABLE, [])?;
        Ok(SQLiteStore { conn })
    }
}

impl TokenStore for SQLiteStore {
    fn load(&self) -> Result<Option<String>> {
        self.conn
            .query_row(sql_queries::SELECT, params![TOKEN_KEY], |row| row.get(0))
            .optional()
            .map_err(|err| err.into())
    }

    fn save(&mut self, token: &str) -> Result<()> {
        self.conn
            .execute(sql_queries::UPSERT, params![TOKEN_KEY, token])?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.conn.execute(sql_queries::DELETE, params![TOKEN_KEY])?;
        Ok(())
    }
}
