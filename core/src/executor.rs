//! Database client boundary.

use crate::error::{RelqError, Result};
use crate::row::Row;
use crate::value::Value;

/// Executes compiled statements against a database.
///
/// Implemented by driver crates; the builder and planner only ever talk to
/// the database through this trait, so any backend that can run
/// `(sql, params) -> rows` plugs in.
pub trait Executor {
    /// Runs a statement with positional `?` placeholders and returns the
    /// result rows as ordered column/value mappings.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Dialect keyword enabling an in-band total-row count, injected into
    /// the select list when `calc_rows` is requested (e.g. MySQL's
    /// `SQL_CALC_FOUND_ROWS`). `None` means the builder falls back to a
    /// separate `SELECT COUNT(*)` round-trip with identical filtering.
    fn calc_rows_modifier(&self) -> Option<&'static str> {
        None
    }

    /// Total matching rows for the previous calc-rows query, for drivers
    /// whose dialect reports it in-band.
    fn found_rows(&self) -> Result<u64> {
        Err(RelqError::IllegalState(
            "driver has no in-band found-rows mechanism".into(),
        ))
    }
}
