//! Result rows and nested relation data.

use compact_str::CompactString;
use serde_json::{Map, Value as JsonValue};

use crate::value::Value;

/// Relation data attached to a row under its alias.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    /// One-to-one: a single matched row, or `None` when no match exists.
    One(Option<Row>),
    /// One-to-many: the ordered matched rows, possibly empty.
    Many(Vec<Row>),
}

/// An ordered mapping from column name to scalar, plus any relation data
/// the planner attached.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<CompactString>,
    values: Vec<Value>,
    relations: Vec<(CompactString, Related)>,
}

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a row from `(column, value)` pairs, preserving order.
    pub fn from_pairs<I, S, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, V)>,
        S: AsRef<str>,
        V: Into<Value>,
    {
        let mut row = Self::new();
        for (column, value) in pairs {
            row.push(column.as_ref(), value);
        }
        row
    }

    /// Appends a column/value pair.
    pub fn push(&mut self, column: &str, value: impl Into<Value>) {
        self.columns.push(CompactString::from(column));
        self.values.push(value.into());
    }

    /// Looks up a column value by name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Column names in SELECT order.
    pub fn columns(&self) -> &[CompactString] {
        &self.columns
    }

    /// Values in SELECT order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Relation data attached under the given alias.
    pub fn related(&self, alias: &str) -> Option<&Related> {
        self.relations
            .iter()
            .find(|(name, _)| name == alias)
            .map(|(_, related)| related)
    }

    /// The single row of a one-to-one relation, if it matched.
    pub fn one(&self, alias: &str) -> Option<&Row> {
        match self.related(alias) {
            Some(Related::One(row)) => row.as_ref(),
            _ => None,
        }
    }

    /// The rows of a one-to-many relation.
    pub fn many(&self, alias: &str) -> Option<&[Row]> {
        match self.related(alias) {
            Some(Related::Many(rows)) => Some(rows.as_slice()),
            _ => None,
        }
    }

    /// Attached relations in declaration order.
    pub fn relations(&self) -> &[(CompactString, Related)] {
        &self.relations
    }

    /// Attaches relation data, replacing any earlier attachment under the
    /// same alias so repeated resolution stays idempotent.
    pub(crate) fn set_relation(&mut self, alias: &str, related: Related) {
        if let Some(slot) = self.relations.iter_mut().find(|(name, _)| name == alias) {
            slot.1 = related;
        } else {
            self.relations.push((CompactString::from(alias), related));
        }
    }

    /// Plain-mapping view: a JSON object with relation data embedded under
    /// its alias.
    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::with_capacity(self.columns.len() + self.relations.len());
        for (column, value) in self.columns.iter().zip(&self.values) {
            map.insert(column.to_string(), value_to_json(value));
        }
        for (alias, related) in &self.relations {
            let json = match related {
                Related::One(Some(row)) => row.to_json(),
                Related::One(None) => JsonValue::Null,
                Related::Many(rows) => JsonValue::Array(rows.iter().map(Row::to_json).collect()),
            };
            map.insert(alias.to_string(), json);
        }
        JsonValue::Object(map)
    }
}

fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Integer(i) => JsonValue::from(*i),
        Value::Real(r) => serde_json::Number::from_f64(*r)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Text(s) => JsonValue::String(s.clone()),
        Value::Blob(b) => JsonValue::Array(b.iter().map(|byte| JsonValue::from(*byte)).collect()),
    }
}
