//! Persistent settings storage
//!
//! Uses parameterized queries exclusively (no SQL string concatenation).
//! Two tables back everything the service remembers between restarts:
//! `options` for plain name/value settings and `transients` for values with
//! an absolute expiry, checked on read.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

/// Result type for storage operations
pub type DbResult<T> = rusqlite::Result<T>;

const OPT_ACCESS_TOKEN: &str = "access_token";
const OPT_REFRESH_TOKEN: &str = "refresh_token";
const OPT_TOKEN_EXPIRES_AT: &str = "token_expires_at";

/// Initialize the database schema
///
/// Creates tables if they don't exist:
/// - `options`: name/value settings
/// - `transients`: name/value pairs with an absolute expiry (epoch seconds)
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS options (
            name TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS transients (
            name TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            expires_at INTEGER NOT NULL
        );
        ",
    )?;

    log::info!("Settings schema initialized");
    Ok(())
}

/// Stored OAuth token fields.
///
/// `expires_at` is an absolute epoch-seconds timestamp; `None` means the
/// token does not expire (not "expired" — the distinction matters for the
/// connection status display).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenState {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<i64>,
}

/// SQLite-backed key-value store for settings, tokens, and transients.
///
/// Cheap to clone; clones share the same connection.
#[derive(Clone)]
pub struct SettingsStore {
    conn: Arc<Mutex<Connection>>,
}

impl SettingsStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Get an option value, or `None` if it was never set.
    pub fn get_option(&self, name: &str) -> DbResult<Option<String>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT value FROM options WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()
    }

    /// Set an option value, replacing any previous value.
    pub fn set_option(&self, name: &str, value: &str) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO options (name, value) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value",
            params![name, value],
        )?;
        Ok(())
    }

    pub fn delete_option(&self, name: &str) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM options WHERE name = ?1", params![name])?;
        Ok(())
    }

    /// Get a transient value.
    ///
    /// Returns `None` once the stored expiry has passed; expired rows are
    /// deleted on read.
    pub fn get_transient(&self, name: &str) -> DbResult<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT value, expires_at FROM transients WHERE name = ?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((value, expires_at)) if expires_at > Utc::now().timestamp() => Ok(Some(value)),
            Some(_) => {
                conn.execute("DELETE FROM transients WHERE name = ?1", params![name])?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Set a transient value that expires `ttl_secs` from now.
    pub fn set_transient(&self, name: &str, value: &str, ttl_secs: i64) -> DbResult<()> {
        let expires_at = Utc::now().timestamp() + ttl_secs;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO transients (name, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
            params![name, value, expires_at],
        )?;
        Ok(())
    }

    pub fn delete_transient(&self, name: &str) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM transients WHERE name = ?1", params![name])?;
        Ok(())
    }

    /// Read the stored token fields.
    pub fn token_state(&self) -> DbResult<TokenState> {
        Ok(TokenState {
            access_token: self.get_option(OPT_ACCESS_TOKEN)?.unwrap_or_default(),
            refresh_token: self.get_option(OPT_REFRESH_TOKEN)?.unwrap_or_default(),
            expires_at: self
                .get_option(OPT_TOKEN_EXPIRES_AT)?
                .and_then(|v| v.parse().ok()),
        })
    }

    /// Persist a complete token set in one transaction.
    ///
    /// All-or-nothing: a failed exchange must not leave a half-written token
    /// state behind.
    pub fn store_token_set(
        &self,
        access_token: &str,
        refresh_token: &str,
        expires_at: i64,
    ) -> DbResult<()> {
        let expires = expires_at.to_string();
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for (name, value) in [
            (OPT_ACCESS_TOKEN, access_token),
            (OPT_REFRESH_TOKEN, refresh_token),
            (OPT_TOKEN_EXPIRES_AT, expires.as_str()),
        ] {
            tx.execute(
                "INSERT INTO options (name, value) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET value = excluded.value",
                params![name, value],
            )?;
        }
        tx.commit()
    }

    /// Delete all three token fields in one transaction.
    pub fn clear_tokens(&self) -> DbResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for name in [OPT_ACCESS_TOKEN, OPT_REFRESH_TOKEN, OPT_TOKEN_EXPIRES_AT] {
            tx.execute("DELETE FROM options WHERE name = ?1", params![name])?;
        }
        tx.commit()
    }
}
