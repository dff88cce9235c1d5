//! Relation attachment metadata.
//!
//! A [`RelationSpec`] records how related rows connect to the base table.
//! Declaring one performs no I/O: eager kinds (`One`, `Many`) are resolved
//! by the planner after the base query runs, aggregate kinds compile into
//! the base query's select list as correlated sub-selects.

use core::fmt;
use std::rc::Rc;

use compact_str::CompactString;

use crate::builder::QueryBuilder;
use crate::error::{RelqError, Result};

/// How a relation is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// One-to-one eager load: attaches a single row or nothing.
    One,
    /// One-to-many eager load: attaches an ordered row sequence.
    Many,
    /// `COUNT(*)` correlated sub-select.
    Count,
    /// `SUM(column)` correlated sub-select.
    Sum,
    /// `AVG(column)` correlated sub-select.
    Avg,
    /// `MAX(column)` correlated sub-select.
    Max,
    /// `MIN(column)` correlated sub-select.
    Min,
}

impl RelationKind {
    /// Eager kinds resolve through a second round-trip; the rest inline
    /// into the base query's SQL.
    pub const fn is_eager(self) -> bool {
        matches!(self, RelationKind::One | RelationKind::Many)
    }

    pub(crate) const fn aggregate_fn(self) -> Option<&'static str> {
        match self {
            RelationKind::Count => Some("COUNT"),
            RelationKind::Sum => Some("SUM"),
            RelationKind::Avg => Some("AVG"),
            RelationKind::Max => Some("MAX"),
            RelationKind::Min => Some("MIN"),
            RelationKind::One | RelationKind::Many => None,
        }
    }

    pub(crate) const fn alias_suffix(self) -> Option<&'static str> {
        match self {
            RelationKind::Count => Some("count"),
            RelationKind::Sum => Some("sum"),
            RelationKind::Avg => Some("avg"),
            RelationKind::Max => Some("max"),
            RelationKind::Min => Some("min"),
            RelationKind::One | RelationKind::Many => None,
        }
    }
}

/// Callback refining the scoped query for a relation: extra conditions,
/// ordering, limits, or nested relation declarations.
pub type Configurator = Rc<dyn Fn(&mut QueryBuilder)>;

/// A declared relation attachment.
#[derive(Clone)]
pub struct RelationSpec {
    pub kind: RelationKind,
    /// Relation name as declared by the caller.
    pub name: CompactString,
    /// Related table.
    pub table: CompactString,
    /// Key column on the related table.
    pub foreign_key: CompactString,
    /// Key column on the base table.
    pub local_key: CompactString,
    /// Output alias. Defaults to the relation name, or `{name}_{agg}` for
    /// aggregate kinds.
    pub alias: CompactString,
    /// Column fed to SUM/AVG/MAX/MIN. Unused for other kinds.
    pub aggregate_column: Option<CompactString>,
    /// Optional sub-query configurator applied to the scoped builder.
    pub configurator: Option<Configurator>,
}

impl RelationSpec {
    /// Creates a spec with the default alias for its kind.
    pub fn new(kind: RelationKind, name: &str, table: &str, foreign_key: &str, local_key: &str) -> Self {
        let alias = match kind.alias_suffix() {
            Some(suffix) => CompactString::from(format!("{name}_{suffix}")),
            None => CompactString::from(name),
        };
        Self {
            kind,
            name: CompactString::from(name),
            table: CompactString::from(table),
            foreign_key: CompactString::from(foreign_key),
            local_key: CompactString::from(local_key),
            alias,
            aggregate_column: None,
            configurator: None,
        }
    }

    /// Overrides the output alias.
    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = CompactString::from(alias);
        self
    }

    /// Sets the column an aggregate kind operates on.
    pub fn column(mut self, column: &str) -> Self {
        self.aggregate_column = Some(CompactString::from(column));
        self
    }

    /// Attaches a sub-query configurator.
    pub fn scope(mut self, configurator: impl Fn(&mut QueryBuilder) + 'static) -> Self {
        self.configurator = Some(Rc::new(configurator));
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(RelqError::Configuration("relation name is empty".into()));
        }
        if self.table.is_empty() {
            return Err(RelqError::Configuration(format!(
                "relation '{}' has no related table",
                self.name
            )));
        }
        if self.foreign_key.is_empty() || self.local_key.is_empty() {
            return Err(RelqError::Configuration(format!(
                "relation '{}' is missing a foreign or local key",
                self.name
            )));
        }
        let needs_column = matches!(
            self.kind,
            RelationKind::Sum | RelationKind::Avg | RelationKind::Max | RelationKind::Min
        );
        if needs_column && self.aggregate_column.as_ref().map_or(true, |c| c.is_empty()) {
            return Err(RelqError::Configuration(format!(
                "aggregate relation '{}' requires a column",
                self.name
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for RelationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationSpec")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("table", &self.table)
            .field("foreign_key", &self.foreign_key)
            .field("local_key", &self.local_key)
            .field("alias", &self.alias)
            .field("aggregate_column", &self.aggregate_column)
            .field("configurator", &self.configurator.is_some())
            .finish()
    }
}
