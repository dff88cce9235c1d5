//! rusqlite-backed [`Executor`] for relq.
//!
//! Wraps a [`rusqlite::Connection`] and maps parameter binding and row
//! extraction through [`relq_core::Value`]. SQLite has no in-band
//! found-rows mechanism, so calc-rows queries always take the COUNT
//! fallback round-trip.

use relq_core::{Executor, RelqError, Result, Row, Value};
use rusqlite::types::{ToSqlOutput, Value as SqliteValue, ValueRef};
use rusqlite::{params_from_iter, Connection};

/// A SQLite database client.
pub struct Client {
    conn: Connection,
}

impl Client {
    /// Wraps an existing connection.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens an in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Connection::open_in_memory().map(Self::new).map_err(map_err)
    }

    /// Opens a database file.
    pub fn open(path: &str) -> Result<Self> {
        Connection::open(path).map(Self::new).map_err(map_err)
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Runs a batch of semicolon-separated statements, e.g. schema setup.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql).map_err(map_err)
    }
}

impl Executor for Client {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        tracing::trace!(%sql, params = params.len(), "executing statement");
        let mut stmt = self.conn.prepare(sql).map_err(map_err)?;
        let columns: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        let mut rows = stmt
            .query(params_from_iter(params.iter().map(Bind)))
            .map_err(map_err)?;

        let mut out = Vec::new();
        while let Some(raw) = rows.next().map_err(map_err)? {
            let mut row = Row::new();
            for (i, name) in columns.iter().enumerate() {
                let value: SqliteValue = raw.get(i).map_err(map_err)?;
                row.push(name, convert(value));
            }
            out.push(row);
        }
        Ok(out)
    }
}

struct Bind<'a>(&'a Value);

impl rusqlite::ToSql for Bind<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            Value::Null => ToSqlOutput::Owned(SqliteValue::Null),
            Value::Integer(i) => ToSqlOutput::Owned(SqliteValue::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Owned(SqliteValue::Real(*r)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

fn convert(value: SqliteValue) -> Value {
    match value {
        SqliteValue::Null => Value::Null,
        SqliteValue::Integer(i) => Value::Integer(i),
        SqliteValue::Real(r) => Value::Real(r),
        SqliteValue::Text(s) => Value::Text(s),
        SqliteValue::Blob(b) => Value::Blob(b),
    }
}

fn map_err(err: rusqlite::Error) -> RelqError {
    RelqError::Execution(err.to_string())
}
