//! The relational store capability consumed by the fixture loader and the
//! record verifier, plus its `SQLite` implementation.

use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, ToSql, params_from_iter};

use crate::error::StoreError;
use crate::value::{ColumnKind, ColumnValue};

/// A positional statement parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    /// SQL `NULL`.
    Null,
    /// Integer parameter.
    Integer(i64),
    /// Text parameter.
    Text(String),
}

impl SqlParam {
    /// Binds `raw` as an integer when it parses as one, otherwise as text.
    #[must_use]
    pub fn integer_or_text(raw: &str) -> Self {
        raw.parse::<i64>()
            .map_or_else(|_| Self::Text(raw.to_owned()), Self::Integer)
    }
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Self::Integer(value) => ToSqlOutput::Borrowed(ValueRef::Integer(*value)),
            Self::Text(text) => ToSqlOutput::Borrowed(ValueRef::Text(text.as_bytes())),
        })
    }
}

/// Column metadata reported by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Whether the column participates in the primary key.
    pub primary_key: bool,
}

/// Minimal relational store contract.
///
/// Any engine that can execute parameterised statements, return a single
/// row and describe a table's columns satisfies it.
pub trait Store: Send + Sync {
    /// Executes a statement, returning the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the store rejects the statement.
    fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<usize, StoreError>;

    /// Runs a query and returns its first row, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the query fails.
    fn query_row(&self, sql: &str, params: &[SqlParam])
    -> Result<Option<Vec<ColumnValue>>, StoreError>;

    /// Describes the columns of `table`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the metadata cannot be read.
    fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, StoreError>;
}

/// Quotes an identifier so table and column names are never interpreted as
/// SQL.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// [`Store`] backed by a shared `rusqlite` connection.
///
/// The connection is shared with the system under test so that fixtures,
/// handler writes and verification all observe the same database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Wraps an existing shared connection.
    #[must_use]
    pub const fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when `SQLite` cannot open the database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let connection = Connection::open_in_memory()?;
        Ok(Self::new(Arc::new(Mutex::new(connection))))
    }

    /// Runs a batch of semicolon-separated statements, such as a schema.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when any statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<(), StoreError> {
        self.connection.lock().execute_batch(sql)?;
        Ok(())
    }

    /// Returns the shared connection handle.
    #[must_use]
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.connection)
    }
}

impl Store for SqliteStore {
    fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<usize, StoreError> {
        let connection = self.connection.lock();
        Ok(connection.execute(sql, params_from_iter(params.iter()))?)
    }

    fn query_row(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Option<Vec<ColumnValue>>, StoreError> {
        let connection = self.connection.lock();
        let mut statement = connection.prepare(sql)?;
        let kinds: Vec<ColumnKind> = statement
            .columns()
            .iter()
            .map(|column| ColumnKind::from_declared_type(column.decl_type()))
            .collect();
        let row = statement
            .query_row(params_from_iter(params.iter()), |row| {
                kinds
                    .iter()
                    .enumerate()
                    .map(|(index, kind)| row.get_ref(index).map(|raw| column_value(raw, *kind)))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
            .optional()?;
        Ok(row)
    }

    fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, StoreError> {
        let connection = self.connection.lock();
        let mut statement = connection.prepare("SELECT name, pk FROM pragma_table_info(?1)")?;
        let columns = statement
            .query_map([table], |row| {
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    primary_key: row.get::<_, i64>(1)? > 0,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(columns)
    }
}

fn column_value(raw: ValueRef<'_>, kind: ColumnKind) -> ColumnValue {
    match raw {
        ValueRef::Null => ColumnValue::Null,
        ValueRef::Integer(value) => ColumnValue::Integer(value),
        ValueRef::Real(value) => ColumnValue::Real(value),
        ValueRef::Text(bytes) => kind.interpret_text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => ColumnValue::from_bytes(bytes.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().expect("open in-memory store");
        store
            .execute_batch(
                "CREATE TABLE sample (
                    id INTEGER PRIMARY KEY,
                    label TEXT,
                    seen_at DATETIME,
                    payload JSON,
                    peer INET,
                    token BLOB
                );",
            )
            .expect("create sample table");
        store
    }

    #[rstest]
    fn maps_values_by_declared_type(store: SqliteStore) {
        store
            .execute(
                "INSERT INTO sample VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
                &[
                    SqlParam::Integer(1),
                    SqlParam::Text("first".into()),
                    SqlParam::Text("2009-11-10 23:00:00+00:00".into()),
                    SqlParam::Text(r#"{"b": 1, "a": 2}"#.into()),
                    SqlParam::Text("10.1.2.3/8".into()),
                ],
            )
            .expect("insert sample row");
        let row = store
            .query_row(
                "SELECT id, label, seen_at, payload, peer, token FROM sample WHERE id = ?1",
                &[SqlParam::Integer(1)],
            )
            .expect("query sample row")
            .expect("row exists");
        let rendered: Vec<String> = row.iter().map(ColumnValue::normalise).collect();
        assert_eq!(
            rendered,
            vec![
                "1",
                "first",
                "2009-11-10T23:00:00Z",
                r#"{"a":2,"b":1}"#,
                "10.1.2.3",
                "<nil>"
            ]
        );
    }

    #[rstest]
    fn query_row_returns_none_without_match(store: SqliteStore) {
        let row = store
            .query_row("SELECT id FROM sample WHERE id = ?1", &[SqlParam::Integer(9)])
            .expect("query succeeds");
        assert!(row.is_none());
    }

    #[rstest]
    fn reports_primary_key_flags(store: SqliteStore) {
        let columns = store.table_columns("sample").expect("read metadata");
        let keys: Vec<&str> = columns
            .iter()
            .filter(|column| column.primary_key)
            .map(|column| column.name.as_str())
            .collect();
        assert_eq!(keys, vec!["id"]);
    }

    #[rstest]
    #[case("42", SqlParam::Integer(42))]
    #[case("-7", SqlParam::Integer(-7))]
    #[case("abc", SqlParam::Text("abc".into()))]
    #[case("4.5", SqlParam::Text("4.5".into()))]
    fn parses_key_values(#[case] raw: &str, #[case] expected: SqlParam) {
        assert_eq!(SqlParam::integer_or_text(raw), expected);
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_identifier("plain"), "\"plain\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }
}
