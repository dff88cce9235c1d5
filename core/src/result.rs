//! Result envelope returned by terminal operations.

use serde_json::Value as JsonValue;

use crate::error::{RelqError, Result};
use crate::row::Row;

/// Rows produced by a terminal operation, with the optional
/// total-count-without-limit annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    rows: Vec<Row>,
    found_rows: Option<u64>,
}

impl ResultSet {
    pub(crate) fn new(rows: Vec<Row>, found_rows: Option<u64>) -> Self {
        Self { rows, found_rows }
    }

    /// The result rows in query order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Consumes the envelope into its rows.
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// The first row, if any.
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// True iff at least one row was returned.
    pub fn exists(&self) -> bool {
        !self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total rows matching the query's filters, ignoring LIMIT/OFFSET.
    ///
    /// Fails with [`RelqError::IllegalState`] unless the query requested
    /// `calc_rows()`.
    pub fn found_rows(&self) -> Result<u64> {
        self.found_rows.ok_or_else(|| {
            RelqError::IllegalState("found_rows() requires calc_rows() on the query".into())
        })
    }

    /// Plain-mapping view of all rows.
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Array(self.rows.iter().map(Row::to_json).collect())
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Row> {
        self.rows.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Row;
    type IntoIter = core::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
