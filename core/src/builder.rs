//! The fluent query builder and its terminal operations.
//!
//! A [`QueryBuilder`] is an ordinary owned value created per logical query:
//! no process-wide registration, no shared state between chains. The
//! database client is passed explicitly to the terminal operations.

use compact_str::CompactString;

use crate::condition::{Combinator, ConditionNode, Operand};
use crate::error::{RelqError, Result};
use crate::executor::Executor;
use crate::planner;
use crate::relation::{RelationKind, RelationSpec};
use crate::result::ResultSet;
use crate::row::Row;
use crate::value::Value;

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub(crate) const fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Join flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    pub(crate) const fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct JoinClause {
    pub kind: JoinKind,
    pub table: CompactString,
    pub on: CompactString,
}

#[derive(Debug, Clone)]
pub(crate) enum SelectExpr {
    /// An identifier, quoted per dotted segment.
    Column(CompactString),
    /// Verbatim SQL text (expressions, literals).
    Raw(CompactString),
}

#[derive(Debug, Clone)]
pub(crate) struct SelectItem {
    pub expr: SelectExpr,
    pub alias: Option<CompactString>,
}

/// Accumulates one logical query: select list, source table, joins,
/// condition tree, grouping, ordering, limits, and declared relations.
///
/// All non-terminal methods return `&mut Self` for chaining; terminal
/// methods take the [`Executor`] and produce a [`ResultSet`] or fail
/// atomically.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    pub(crate) from: CompactString,
    pub(crate) select: Vec<SelectItem>,
    pub(crate) joins: Vec<JoinClause>,
    pub(crate) conditions: Vec<ConditionNode>,
    pub(crate) group_by: Vec<CompactString>,
    pub(crate) having: Vec<ConditionNode>,
    pub(crate) order_by: Vec<(CompactString, SortOrder)>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) calc_rows: bool,
    pub(crate) relations: Vec<RelationSpec>,
    /// First configuration error captured during chaining; surfaced by the
    /// next compile or terminal call.
    pub(crate) deferred: Option<RelqError>,
}

impl QueryBuilder {
    /// Starts a fresh query over the given table.
    pub fn table(name: impl AsRef<str>) -> Self {
        QueryBuilder {
            from: CompactString::from(name.as_ref()),
            ..Default::default()
        }
    }

    // -------------------------------------------------------------------------
    // Select list
    // -------------------------------------------------------------------------

    /// Adds columns to the select list. An empty select list compiles to `*`.
    pub fn select<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for column in columns {
            self.select.push(SelectItem {
                expr: SelectExpr::Column(CompactString::from(column.as_ref())),
                alias: None,
            });
        }
        self
    }

    /// Adds a verbatim select expression.
    pub fn select_raw(&mut self, expr: &str) -> &mut Self {
        self.select.push(SelectItem {
            expr: SelectExpr::Raw(CompactString::from(expr)),
            alias: None,
        });
        self
    }

    /// Adds an aliased column.
    pub fn select_as(&mut self, column: &str, alias: &str) -> &mut Self {
        self.select.push(SelectItem {
            expr: SelectExpr::Column(CompactString::from(column)),
            alias: Some(CompactString::from(alias)),
        });
        self
    }

    // -------------------------------------------------------------------------
    // Conditions
    // -------------------------------------------------------------------------

    /// Adds an AND predicate with an explicit operator.
    pub fn r#where(&mut self, column: &str, operator: &str, value: impl Into<Value>) -> &mut Self {
        self.push_condition(ConditionNode::leaf(
            Combinator::And,
            column,
            operator,
            Operand::Value(value.into()),
        ))
    }

    /// Two-argument form of [`QueryBuilder::r#where`]: operator defaults to `=`.
    pub fn where_eq(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.r#where(column, "=", value)
    }

    /// Adds an OR predicate with an explicit operator.
    pub fn or_where(&mut self, column: &str, operator: &str, value: impl Into<Value>) -> &mut Self {
        self.push_condition(ConditionNode::leaf(
            Combinator::Or,
            column,
            operator,
            Operand::Value(value.into()),
        ))
    }

    /// Two-argument form of [`QueryBuilder::or_where`].
    pub fn or_where_eq(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.or_where(column, "=", value)
    }

    /// Adds a column-to-column predicate. Neither side is bound; both render
    /// as identifiers.
    pub fn where_column(&mut self, column: &str, operator: &str, other: &str) -> &mut Self {
        self.push_condition(ConditionNode::leaf(
            Combinator::And,
            column,
            operator,
            Operand::Column(CompactString::from(other)),
        ))
    }

    /// Adds an `IN` predicate over bound values. An empty list renders as
    /// `IN (NULL)`, which matches nothing.
    pub fn where_in<I, V>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.push_condition(ConditionNode::leaf(
            Combinator::And,
            column,
            "IN",
            Operand::Values(values),
        ))
    }

    /// Adds a `NOT IN` predicate over bound values.
    pub fn where_not_in<I, V>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.push_condition(ConditionNode::leaf(
            Combinator::And,
            column,
            "NOT IN",
            Operand::Values(values),
        ))
    }

    /// Adds an `IS NULL` predicate.
    pub fn where_null(&mut self, column: &str) -> &mut Self {
        self.push_condition(ConditionNode::leaf(
            Combinator::And,
            column,
            "IS NULL",
            Operand::None,
        ))
    }

    /// Adds an `IS NOT NULL` predicate.
    pub fn where_not_null(&mut self, column: &str) -> &mut Self {
        self.push_condition(ConditionNode::leaf(
            Combinator::And,
            column,
            "IS NOT NULL",
            Operand::None,
        ))
    }

    /// Adds a `LIKE` predicate. The pattern is bound as-is; callers supply
    /// their own wildcards.
    pub fn where_like(&mut self, column: &str, pattern: impl Into<Value>) -> &mut Self {
        self.r#where(column, "LIKE", pattern)
    }

    /// OR variant of [`QueryBuilder::where_like`].
    pub fn or_where_like(&mut self, column: &str, pattern: impl Into<Value>) -> &mut Self {
        self.or_where(column, "LIKE", pattern)
    }

    /// Convenience search: one grouped predicate OR-ing `LIKE '%term%'`
    /// across the given columns.
    pub fn search<I, S>(&mut self, columns: I, term: &str) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pattern = format!("%{term}%");
        let columns: Vec<CompactString> = columns
            .into_iter()
            .map(|c| CompactString::from(c.as_ref()))
            .collect();
        self.where_group(move |group| {
            for column in &columns {
                group.or_where_like(column.as_str(), pattern.as_str());
            }
        })
    }

    /// Opens a parenthesized AND group for the duration of the configurator.
    ///
    /// The group is spliced into the tree only after the configurator
    /// returns, so a panicking configurator leaks nothing into siblings.
    pub fn where_group(&mut self, configure: impl FnOnce(&mut QueryBuilder)) -> &mut Self {
        self.push_group(Combinator::And, configure)
    }

    /// Opens a parenthesized OR group.
    pub fn or_where_group(&mut self, configure: impl FnOnce(&mut QueryBuilder)) -> &mut Self {
        self.push_group(Combinator::Or, configure)
    }

    /// Adds an `EXISTS (SELECT 1 FROM table ...)` predicate over a
    /// caller-configured sub-query. Use [`QueryBuilder::where_column`]
    /// inside the configurator to correlate with the base table.
    pub fn where_exists(
        &mut self,
        table: &str,
        configure: impl FnOnce(&mut QueryBuilder),
    ) -> &mut Self {
        let query = self.exists_subquery(table, None, configure);
        self.push_condition(ConditionNode::Exists {
            combinator: Combinator::And,
            negated: false,
            query: Box::new(query),
        })
    }

    /// Adds a `NOT EXISTS` predicate over a caller-configured sub-query.
    pub fn where_not_exists(
        &mut self,
        table: &str,
        configure: impl FnOnce(&mut QueryBuilder),
    ) -> &mut Self {
        let query = self.exists_subquery(table, None, configure);
        self.push_condition(ConditionNode::Exists {
            combinator: Combinator::And,
            negated: true,
            query: Box::new(query),
        })
    }

    /// Filters base rows to those with at least one related row, without
    /// fetching the related rows. Compiles into the base statement; never
    /// issues a second round-trip.
    pub fn where_exists_relation(
        &mut self,
        table: &str,
        foreign_key: &str,
        local_key: &str,
    ) -> &mut Self {
        self.exists_relation(Combinator::And, false, table, foreign_key, local_key, |_| {})
    }

    /// [`QueryBuilder::where_exists_relation`] with a sub-query configurator.
    pub fn where_exists_relation_scoped(
        &mut self,
        table: &str,
        foreign_key: &str,
        local_key: &str,
        configure: impl FnOnce(&mut QueryBuilder),
    ) -> &mut Self {
        self.exists_relation(Combinator::And, false, table, foreign_key, local_key, configure)
    }

    /// OR variant of [`QueryBuilder::where_exists_relation`].
    pub fn or_where_exists_relation(
        &mut self,
        table: &str,
        foreign_key: &str,
        local_key: &str,
    ) -> &mut Self {
        self.exists_relation(Combinator::Or, false, table, foreign_key, local_key, |_| {})
    }

    /// Filters base rows to those with no related row.
    pub fn where_not_exists_relation(
        &mut self,
        table: &str,
        foreign_key: &str,
        local_key: &str,
    ) -> &mut Self {
        self.exists_relation(Combinator::And, true, table, foreign_key, local_key, |_| {})
    }

    /// Adds a HAVING predicate. Aggregate filters belong here rather than
    /// in WHERE.
    pub fn having(&mut self, column: &str, operator: &str, value: impl Into<Value>) -> &mut Self {
        self.having.push(ConditionNode::leaf(
            Combinator::And,
            column,
            operator,
            Operand::Value(value.into()),
        ));
        self
    }

    // -------------------------------------------------------------------------
    // Relation registry
    // -------------------------------------------------------------------------

    /// Records a relation spec against this query. Duplicate aliases
    /// overwrite the earlier declaration (last write wins); re-declaring a
    /// relation with a refined sub-query is a supported override.
    pub fn attach(&mut self, spec: RelationSpec) -> &mut Self {
        if let Err(err) = spec.validate() {
            self.set_deferred(err);
            return self;
        }
        if let Some(slot) = self.relations.iter_mut().find(|s| s.alias == spec.alias) {
            *slot = spec;
        } else {
            self.relations.push(spec);
        }
        self
    }

    /// Declares a one-to-one eager load resolved after the base query.
    pub fn with_one(
        &mut self,
        name: &str,
        table: &str,
        foreign_key: &str,
        local_key: &str,
    ) -> &mut Self {
        self.attach(RelationSpec::new(
            RelationKind::One,
            name,
            table,
            foreign_key,
            local_key,
        ))
    }

    /// [`QueryBuilder::with_one`] with a sub-query configurator.
    pub fn with_one_scoped(
        &mut self,
        name: &str,
        table: &str,
        foreign_key: &str,
        local_key: &str,
        configure: impl Fn(&mut QueryBuilder) + 'static,
    ) -> &mut Self {
        self.attach(
            RelationSpec::new(RelationKind::One, name, table, foreign_key, local_key)
                .scope(configure),
        )
    }

    /// Declares a one-to-many eager load resolved after the base query.
    ///
    /// A LIMIT set by the configurator applies to the single batched
    /// secondary query, capping the combined result across all parents,
    /// not per parent.
    pub fn with_many(
        &mut self,
        name: &str,
        table: &str,
        foreign_key: &str,
        local_key: &str,
    ) -> &mut Self {
        self.attach(RelationSpec::new(
            RelationKind::Many,
            name,
            table,
            foreign_key,
            local_key,
        ))
    }

    /// [`QueryBuilder::with_many`] with a sub-query configurator.
    pub fn with_many_scoped(
        &mut self,
        name: &str,
        table: &str,
        foreign_key: &str,
        local_key: &str,
        configure: impl Fn(&mut QueryBuilder) + 'static,
    ) -> &mut Self {
        self.attach(
            RelationSpec::new(RelationKind::Many, name, table, foreign_key, local_key)
                .scope(configure),
        )
    }

    /// Inlines `(SELECT COUNT(*) ...)` into the select list as
    /// `{name}_count`. Compile-time effect only; no second round-trip.
    pub fn with_count(
        &mut self,
        name: &str,
        table: &str,
        foreign_key: &str,
        local_key: &str,
    ) -> &mut Self {
        self.attach(RelationSpec::new(
            RelationKind::Count,
            name,
            table,
            foreign_key,
            local_key,
        ))
    }

    /// Inlines `(SELECT SUM(column) ...)` as `{name}_sum`.
    pub fn with_sum(
        &mut self,
        name: &str,
        table: &str,
        foreign_key: &str,
        local_key: &str,
        column: &str,
    ) -> &mut Self {
        self.attach(
            RelationSpec::new(RelationKind::Sum, name, table, foreign_key, local_key)
                .column(column),
        )
    }

    /// Inlines `(SELECT AVG(column) ...)` as `{name}_avg`.
    pub fn with_avg(
        &mut self,
        name: &str,
        table: &str,
        foreign_key: &str,
        local_key: &str,
        column: &str,
    ) -> &mut Self {
        self.attach(
            RelationSpec::new(RelationKind::Avg, name, table, foreign_key, local_key)
                .column(column),
        )
    }

    /// Inlines `(SELECT MAX(column) ...)` as `{name}_max`.
    pub fn with_max(
        &mut self,
        name: &str,
        table: &str,
        foreign_key: &str,
        local_key: &str,
        column: &str,
    ) -> &mut Self {
        self.attach(
            RelationSpec::new(RelationKind::Max, name, table, foreign_key, local_key)
                .column(column),
        )
    }

    /// Inlines `(SELECT MIN(column) ...)` as `{name}_min`.
    pub fn with_min(
        &mut self,
        name: &str,
        table: &str,
        foreign_key: &str,
        local_key: &str,
        column: &str,
    ) -> &mut Self {
        self.attach(
            RelationSpec::new(RelationKind::Min, name, table, foreign_key, local_key)
                .column(column),
        )
    }

    // -------------------------------------------------------------------------
    // Shaping
    // -------------------------------------------------------------------------

    /// Adds an INNER JOIN with a raw ON expression.
    pub fn join(&mut self, table: &str, on: &str) -> &mut Self {
        self.joins.push(JoinClause {
            kind: JoinKind::Inner,
            table: CompactString::from(table),
            on: CompactString::from(on),
        });
        self
    }

    /// Adds a LEFT JOIN with a raw ON expression.
    pub fn left_join(&mut self, table: &str, on: &str) -> &mut Self {
        self.joins.push(JoinClause {
            kind: JoinKind::Left,
            table: CompactString::from(table),
            on: CompactString::from(on),
        });
        self
    }

    /// Adds GROUP BY columns.
    pub fn group_by<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for column in columns {
            self.group_by.push(CompactString::from(column.as_ref()));
        }
        self
    }

    /// Adds an ascending ORDER BY column.
    pub fn order_by(&mut self, column: &str) -> &mut Self {
        self.order_by.push((CompactString::from(column), SortOrder::Asc));
        self
    }

    /// Adds a descending ORDER BY column.
    pub fn order_by_desc(&mut self, column: &str) -> &mut Self {
        self.order_by.push((CompactString::from(column), SortOrder::Desc));
        self
    }

    /// Sets LIMIT.
    pub fn limit(&mut self, n: u64) -> &mut Self {
        self.limit = Some(n);
        self
    }

    /// Sets OFFSET.
    pub fn offset(&mut self, n: u64) -> &mut Self {
        self.offset = Some(n);
        self
    }

    /// Requests the total matching row count ignoring LIMIT/OFFSET,
    /// readable through [`ResultSet::found_rows`].
    pub fn calc_rows(&mut self) -> &mut Self {
        self.calc_rows = true;
        self
    }

    // -------------------------------------------------------------------------
    // Terminals
    // -------------------------------------------------------------------------

    /// Compiles and runs the query, resolves eager relations, and returns
    /// the envelope. Fails atomically: either a complete envelope or one
    /// error for the whole chain.
    pub fn get<E: Executor + ?Sized>(&self, executor: &E) -> Result<ResultSet> {
        let modifier = if self.calc_rows {
            executor.calc_rows_modifier()
        } else {
            None
        };
        let compiled = self.compile_with(modifier)?;
        let (text, params) = compiled.into_parts();
        tracing::debug!(sql = %text, params = params.len(), "executing base query");
        let mut rows = executor.execute(&text, &params)?;

        let found_rows = if self.calc_rows {
            let total = match modifier {
                Some(_) => executor.found_rows()?,
                None => self.run_count(executor)?,
            };
            Some(total)
        } else {
            None
        };

        planner::resolve(executor, &mut rows, &self.relations, 0)?;
        Ok(ResultSet::new(rows, found_rows))
    }

    /// Runs the query with `LIMIT 1` and returns the first row, if any.
    pub fn first<E: Executor + ?Sized>(&self, executor: &E) -> Result<Option<Row>> {
        let mut probe = self.clone();
        probe.limit = Some(1);
        Ok(probe.get(executor)?.into_rows().into_iter().next())
    }

    /// Like [`QueryBuilder::first`], failing with [`RelqError::NotFound`]
    /// when no row matches.
    pub fn first_or_fail<E: Executor + ?Sized>(&self, executor: &E) -> Result<Row> {
        self.first(executor)?.ok_or(RelqError::NotFound)
    }

    /// True iff at least one row matches. Replaces the select list with a
    /// constant and skips eager loads; exists-filter relations still
    /// compile into the single probed statement.
    pub fn exists<E: Executor + ?Sized>(&self, executor: &E) -> Result<bool> {
        let mut probe = self.clone();
        probe.relations.retain(|spec| !spec.kind.is_eager());
        probe.select.clear();
        probe.select_raw("1");
        probe.order_by.clear();
        probe.limit = Some(1);
        probe.offset = None;
        probe.calc_rows = false;
        Ok(!probe.get(executor)?.is_empty())
    }

    /// Newest row by the given column (ORDER BY column DESC, first).
    pub fn latest<E: Executor + ?Sized>(&self, executor: &E, column: &str) -> Result<Option<Row>> {
        let mut probe = self.clone();
        probe.order_by = vec![(CompactString::from(column), SortOrder::Desc)];
        probe.first(executor)
    }

    /// Oldest row by the given column (ORDER BY column ASC, first).
    pub fn oldest<E: Executor + ?Sized>(&self, executor: &E, column: &str) -> Result<Option<Row>> {
        let mut probe = self.clone();
        probe.order_by = vec![(CompactString::from(column), SortOrder::Asc)];
        probe.first(executor)
    }

    /// Runs the query in successive LIMIT/OFFSET windows, applying the full
    /// relation pipeline per window so memory stays bounded. The callback
    /// returns `false` to stop early.
    pub fn chunk<E, F>(&self, executor: &E, size: u64, mut each: F) -> Result<()>
    where
        E: Executor + ?Sized,
        F: FnMut(&ResultSet) -> bool,
    {
        if size == 0 {
            return Err(RelqError::IllegalState("chunk size must be positive".into()));
        }
        let base_offset = self.offset.unwrap_or(0);
        let mut window = 0u64;
        loop {
            let mut probe = self.clone();
            probe.limit = Some(size);
            probe.offset = Some(base_offset + window * size);
            probe.calc_rows = false;
            let page = probe.get(executor)?;
            if page.is_empty() {
                break;
            }
            let page_len = page.len() as u64;
            if !each(&page) {
                break;
            }
            if page_len < size {
                break;
            }
            window += 1;
        }
        Ok(())
    }

    /// Pagination helper: `calc_rows` plus LIMIT/OFFSET for a 1-based page.
    pub fn paginate<E: Executor + ?Sized>(
        &self,
        executor: &E,
        page: u64,
        per_page: u64,
    ) -> Result<ResultSet> {
        if page == 0 {
            return Err(RelqError::IllegalState("page numbers are 1-based".into()));
        }
        if per_page == 0 {
            return Err(RelqError::IllegalState("per_page must be positive".into()));
        }
        let mut probe = self.clone();
        probe.calc_rows = true;
        probe.limit = Some(per_page);
        probe.offset = Some((page - 1) * per_page);
        probe.get(executor)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn push_condition(&mut self, node: ConditionNode) -> &mut Self {
        self.conditions.push(node);
        self
    }

    fn push_group(
        &mut self,
        combinator: Combinator,
        configure: impl FnOnce(&mut QueryBuilder),
    ) -> &mut Self {
        let mut group = QueryBuilder::table(self.from.as_str());
        configure(&mut group);
        if !group.conditions.is_empty() {
            self.conditions.push(ConditionNode::Group {
                combinator,
                children: group.conditions,
            });
        }
        self
    }

    fn exists_subquery(
        &self,
        table: &str,
        correlation: Option<(&str, &str)>,
        configure: impl FnOnce(&mut QueryBuilder),
    ) -> QueryBuilder {
        let mut sub = QueryBuilder::table(table);
        sub.select_raw("1");
        if let Some((foreign_key, local_key)) = correlation {
            let related = format!("{table}.{foreign_key}");
            let base = format!("{}.{local_key}", self.from);
            sub.where_column(&related, "=", &base);
        }
        configure(&mut sub);
        sub
    }

    fn exists_relation(
        &mut self,
        combinator: Combinator,
        negated: bool,
        table: &str,
        foreign_key: &str,
        local_key: &str,
        configure: impl FnOnce(&mut QueryBuilder),
    ) -> &mut Self {
        if table.is_empty() || foreign_key.is_empty() || local_key.is_empty() {
            self.set_deferred(RelqError::Configuration(
                "exists-filter relation is missing a table or key column".into(),
            ));
            return self;
        }
        let query = self.exists_subquery(table, Some((foreign_key, local_key)), configure);
        self.push_condition(ConditionNode::Exists {
            combinator,
            negated,
            query: Box::new(query),
        })
    }

    /// Runs the COUNT fallback sharing FROM/JOIN/WHERE with the base query.
    fn run_count<E: Executor + ?Sized>(&self, executor: &E) -> Result<u64> {
        let compiled = self.compile_count()?;
        let (text, params) = compiled.into_parts();
        tracing::debug!(sql = %text, "executing count query");
        let rows = executor.execute(&text, &params)?;
        let total = rows
            .first()
            .and_then(|row| row.values().first())
            .and_then(Value::as_i64)
            .ok_or_else(|| RelqError::Execution("count query returned no usable row".into()))?;
        Ok(total.max(0) as u64)
    }

    pub(crate) fn set_deferred(&mut self, err: RelqError) {
        if self.deferred.is_none() {
            self.deferred = Some(err);
        }
    }
}
