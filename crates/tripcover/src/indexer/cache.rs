//! SQLite cache for indexer responses, keyed by content hash of the request.

use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Cached indexer responses. Key = SHA-256 of the normalized request
/// (endpoint + query document), so the same logical query always hits the
/// same row regardless of how it was assembled.
pub struct QueryCache {
    conn: Mutex<Connection>,
}

impl QueryCache {
    /// Open or create the cache at `path`. Creates parent dirs if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS responses (
                key TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                created_utc INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Content-hash key from a normalized request identifier.
    pub fn key_for(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Cached response body for `key`, or None.
    pub fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        let mut stmt = conn.prepare("SELECT body FROM responses WHERE key = ?1")?;
        let row = stmt
            .query_row([key], |r| r.get::<_, String>(0))
            .optional()?;
        Ok(row)
    }

    /// Insert or replace the response body for `key`.
    pub fn set(&self, key: &str, body: &str) -> Result<(), CacheError> {
        let created = time::OffsetDateTime::now_utc().unix_timestamp();
        let conn = self
            .conn
            .lock()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        conn.execute(
            "INSERT OR REPLACE INTO responses (key, body, created_utc) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, body, created],
        )?;
        Ok(())
    }

    /// Drop rows older than `max_age_secs`. Used before a forced refresh so a
    /// post-transaction re-query does not answer from a pre-transaction body.
    pub fn evict_older_than(&self, max_age_secs: i64) -> Result<usize, CacheError> {
        let cutoff = time::OffsetDateTime::now_utc().unix_timestamp() - max_age_secs;
        let conn = self
            .conn
            .lock()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        let n = conn.execute("DELETE FROM responses WHERE created_utc < ?1", [cutoff])?;
        Ok(n)
    }
}
