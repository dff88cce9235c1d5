//! SQL fragments with bound parameters.

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::value::Value;

/// A part of an SQL statement: literal text or a bound parameter.
#[derive(Debug, Clone)]
pub enum SqlChunk {
    Text(CompactString),
    Param(Value),
}

/// A SQL statement or fragment with parameters.
///
/// Keeps SQL text and bound values together as an ordered chunk list so
/// that parameter order always matches placeholder order. Rendering a
/// parameter emits the positional `?` placeholder; the value itself only
/// ever leaves through [`Sql::params`] or [`Sql::into_parts`].
#[derive(Debug, Clone, Default)]
pub struct Sql {
    chunks: SmallVec<[SqlChunk; 4]>,
}

impl Sql {
    /// Creates an empty fragment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fragment from literal SQL text, not a parameter.
    pub fn raw(text: impl AsRef<str>) -> Self {
        let mut sql = Self::new();
        sql.push_raw(text.as_ref());
        sql
    }

    /// Creates a fragment holding a single bound parameter.
    pub fn parameter(value: impl Into<Value>) -> Self {
        let mut sql = Self::new();
        sql.push_param(value.into());
        sql
    }

    /// Creates a comma-separated placeholder list: `?, ?, ?`.
    pub fn parameters<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let mut sql = Self::new();
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                sql.push_raw(", ");
            }
            sql.push_param(value.into());
        }
        sql
    }

    /// Appends another fragment, merging text and parameters.
    pub fn append(mut self, other: Sql) -> Self {
        self.chunks.extend(other.chunks);
        self
    }

    /// Appends literal SQL text.
    pub fn append_raw(mut self, text: impl AsRef<str>) -> Self {
        self.push_raw(text.as_ref());
        self
    }

    /// Joins fragments with a separator.
    pub fn join<I>(parts: I, separator: &str) -> Self
    where
        I: IntoIterator<Item = Sql>,
    {
        let mut out = Self::new();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                out.push_raw(separator);
            }
            out.chunks.extend(part.chunks);
        }
        out
    }

    pub(crate) fn push_raw(&mut self, text: &str) {
        self.chunks.push(SqlChunk::Text(CompactString::from(text)));
    }

    pub(crate) fn push_param(&mut self, value: Value) {
        self.chunks.push(SqlChunk::Param(value));
    }

    pub(crate) fn push_sql(&mut self, other: Sql) {
        self.chunks.extend(other.chunks);
    }

    /// Returns true if the fragment holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Renders the SQL string, with `?` placeholders for parameters.
    pub fn sql(&self) -> String {
        let capacity: usize = self
            .chunks
            .iter()
            .map(|chunk| match chunk {
                SqlChunk::Text(text) => text.len(),
                SqlChunk::Param(_) => 1,
            })
            .sum();

        let mut buf = String::with_capacity(capacity);
        for chunk in &self.chunks {
            match chunk {
                SqlChunk::Text(text) => buf.push_str(text),
                SqlChunk::Param(_) => buf.push('?'),
            }
        }
        buf
    }

    /// Returns references to parameter values in placeholder order.
    pub fn params(&self) -> Vec<&Value> {
        self.chunks
            .iter()
            .filter_map(|chunk| match chunk {
                SqlChunk::Param(value) => Some(value),
                SqlChunk::Text(_) => None,
            })
            .collect()
    }

    /// Consumes the fragment into its SQL string and owned parameters.
    pub fn into_parts(self) -> (String, Vec<Value>) {
        let text = self.sql();
        let params = self
            .chunks
            .into_iter()
            .filter_map(|chunk| match chunk {
                SqlChunk::Param(value) => Some(value),
                SqlChunk::Text(_) => None,
            })
            .collect();
        (text, params)
    }
}

impl core::fmt::Display for Sql {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, r#"sql: "{}", params: {:?}"#, self.sql(), self.params())
    }
}

impl From<&str> for Sql {
    fn from(text: &str) -> Self {
        Sql::raw(text)
    }
}
