//! `SQLite` access for redirections.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::ApiError;

/// Embedded schema migrations. Entry `n` upgrades the schema to version
/// `n + 1`.
const MIGRATIONS: &[&str] = &[include_str!("../migrations/0001_create_redirection.sql")];

/// DSN prefix selecting a private in-memory database.
const MEMORY_DSN: &str = ":memory:";

/// Shared handle to the service database.
#[derive(Debug, Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens the database named by `dsn`.
    ///
    /// Any DSN starting with `:memory:` opens a fresh in-memory database;
    /// everything else is treated as a file path.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Database`] when the database cannot be opened.
    pub fn open(dsn: &str) -> Result<Self, ApiError> {
        let connection = if dsn.starts_with(MEMORY_DSN) {
            Connection::open_in_memory()?
        } else {
            Connection::open(dsn)?
        };
        tracing::debug!(dsn, "opened database");
        Ok(Self::from_connection(connection))
    }

    /// Wraps an existing connection.
    #[must_use]
    pub fn from_connection(connection: Connection) -> Self {
        Self {
            connection: Arc::new(Mutex::new(connection)),
        }
    }

    /// Returns the underlying connection, shared with this handle.
    #[must_use]
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.connection)
    }

    /// Applies every migration newer than the recorded schema version and
    /// returns the resulting version.
    ///
    /// Each migration runs in its own transaction together with the version
    /// bump, so a failed migration leaves the previous version intact.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Migration`] when a migration fails.
    pub fn migrate(&self) -> Result<usize, ApiError> {
        let mut connection = self.connection.lock();
        let current: usize = connection
            .pragma_query_value(None, "user_version", |row| row.get::<_, i64>(0))
            .map(|version| usize::try_from(version).unwrap_or(0))?;
        for (index, sql) in MIGRATIONS.iter().enumerate().skip(current) {
            let version = index + 1;
            let apply = |connection: &mut Connection| -> rusqlite::Result<()> {
                let tx = connection.transaction()?;
                tx.execute_batch(sql)?;
                tx.pragma_update(None, "user_version", i64::try_from(version).unwrap_or(i64::MAX))?;
                tx.commit()
            };
            apply(&mut *connection).map_err(|source| ApiError::Migration { version, source })?;
            tracing::info!(version, "applied migration");
        }
        Ok(MIGRATIONS.len().max(current))
    }

    /// Checks that the database answers a trivial query.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Database`] when the query fails.
    pub fn ping(&self) -> Result<(), ApiError> {
        self.connection
            .lock()
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    /// Stores a new redirection created at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Database`] when the insert fails, including when
    /// `key` is already taken.
    pub fn insert_redirection(&self, key: &str, url: &str, at: DateTime<Utc>) -> Result<(), ApiError> {
        let stamp = at.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        self.connection.lock().execute(
            "INSERT INTO redirection (key, url, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![key, url, stamp, stamp],
        )?;
        Ok(())
    }

    /// Looks up the target URL for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Database`] when the query fails.
    pub fn find_url(&self, key: &str) -> Result<Option<String>, ApiError> {
        let url = self
            .connection
            .lock()
            .query_row("SELECT url FROM redirection WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(url)
    }

    /// Removes the redirection for `key`, returning how many rows went.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Database`] when the delete fails.
    pub fn delete_redirection(&self, key: &str) -> Result<usize, ApiError> {
        let removed = self
            .connection
            .lock()
            .execute("DELETE FROM redirection WHERE key = ?1", [key])?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::Database;
    use chrono::{DateTime, Utc};
    use rstest::{fixture, rstest};

    #[fixture]
    fn database() -> Database {
        let database = Database::open(":memory:").expect("open in-memory database");
        database.migrate().expect("migrate");
        database
    }

    fn instant() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2009-11-10T23:00:00Z")
            .expect("valid instant")
            .with_timezone(&Utc)
    }

    #[rstest]
    fn migrations_are_idempotent(database: Database) {
        assert_eq!(database.migrate().expect("second run"), 1);
        let version: i64 = database
            .connection()
            .lock()
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("read version");
        assert_eq!(version, 1);
    }

    #[rstest]
    fn stores_and_finds_redirections(database: Database) {
        database
            .insert_redirection("abc", "http://example.com", instant())
            .expect("insert");
        assert_eq!(
            database.find_url("abc").expect("query").as_deref(),
            Some("http://example.com")
        );
        assert_eq!(database.find_url("nope").expect("query"), None);
        let created: String = database
            .connection()
            .lock()
            .query_row("SELECT created_at FROM redirection WHERE key = 'abc'", [], |row| {
                row.get(0)
            })
            .expect("read timestamp");
        assert_eq!(created, "2009-11-10T23:00:00Z");
    }

    #[rstest]
    fn duplicate_keys_are_rejected(database: Database) {
        database
            .insert_redirection("abc", "http://example.com", instant())
            .expect("first insert");
        assert!(
            database
                .insert_redirection("abc", "http://example.org", instant())
                .is_err()
        );
    }

    #[rstest]
    fn deleting_is_idempotent(database: Database) {
        database
            .insert_redirection("abc", "http://example.com", instant())
            .expect("insert");
        assert_eq!(database.delete_redirection("abc").expect("delete"), 1);
        assert_eq!(database.delete_redirection("abc").expect("delete again"), 0);
    }

    #[rstest]
    fn ping_answers(database: Database) {
        database.ping().expect("ping");
    }
}
