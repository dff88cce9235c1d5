//! Deterministic SQL generation from builder state.
//!
//! Clause order is fixed: SELECT (with relation sub-selects inlined), FROM,
//! JOINs in declaration order, WHERE, GROUP BY, HAVING, ORDER BY,
//! LIMIT/OFFSET. Compilation is a pure function of the builder; the same
//! state always renders the same SQL and parameter list.

use compact_str::CompactString;

use crate::builder::{QueryBuilder, SelectExpr, SelectItem};
use crate::condition::{ConditionNode, Operand};
use crate::error::{RelqError, Result};
use crate::relation::RelationSpec;
use crate::sql::Sql;

impl QueryBuilder {
    /// Renders the query into SQL text plus its ordered parameter list.
    pub fn compile(&self) -> Result<Sql> {
        self.compile_with(None)
    }

    pub(crate) fn compile_with(&self, modifier: Option<&str>) -> Result<Sql> {
        if let Some(err) = &self.deferred {
            return Err(err.clone());
        }
        if self.from.is_empty() {
            return Err(RelqError::Compilation("query has no source table".into()));
        }
        self.check_aggregate_aliases()?;

        let mut out = Sql::new();
        out.push_raw("SELECT ");
        if let Some(keyword) = modifier {
            out.push_raw(keyword);
            out.push_raw(" ");
        }

        if self.select.is_empty() {
            out.push_raw("*");
        } else {
            for (i, item) in self.select.iter().enumerate() {
                if i > 0 {
                    out.push_raw(", ");
                }
                render_select_item(item, &mut out);
            }
        }

        for spec in self.relations.iter().filter(|s| !s.kind.is_eager()) {
            out.push_raw(", (");
            out.push_sql(self.compile_aggregate(spec)?);
            out.push_raw(") AS ");
            out.push_raw(&quoted(&spec.alias));
        }

        out.push_raw(" FROM ");
        out.push_raw(&quoted(&self.from));

        for join in &self.joins {
            out.push_raw(" ");
            out.push_raw(join.kind.keyword());
            out.push_raw(" ");
            out.push_raw(&quoted(&join.table));
            out.push_raw(" ON ");
            out.push_raw(&join.on);
        }

        if !self.conditions.is_empty() {
            out.push_raw(" WHERE ");
            render_condition_list(&self.conditions, &mut out)?;
        }

        if !self.group_by.is_empty() {
            out.push_raw(" GROUP BY ");
            for (i, column) in self.group_by.iter().enumerate() {
                if i > 0 {
                    out.push_raw(", ");
                }
                out.push_raw(&quoted(column));
            }
        }

        if !self.having.is_empty() {
            out.push_raw(" HAVING ");
            render_condition_list(&self.having, &mut out)?;
        }

        if !self.order_by.is_empty() {
            out.push_raw(" ORDER BY ");
            for (i, (column, direction)) in self.order_by.iter().enumerate() {
                if i > 0 {
                    out.push_raw(", ");
                }
                out.push_raw(&quoted(column));
                out.push_raw(" ");
                out.push_raw(direction.keyword());
            }
        }

        if let Some(n) = self.limit {
            out.push_raw(&format!(" LIMIT {n}"));
        }
        if let Some(n) = self.offset {
            out.push_raw(&format!(" OFFSET {n}"));
        }

        Ok(out)
    }

    /// Renders the `SELECT COUNT(*)` fallback sharing FROM/JOIN/WHERE with
    /// the base query, sans select list, ORDER BY and LIMIT/OFFSET. A
    /// grouped query is wrapped as a derived table so the count reflects
    /// groups, matching what pagination would return.
    pub fn compile_count(&self) -> Result<Sql> {
        if let Some(err) = &self.deferred {
            return Err(err.clone());
        }
        if self.from.is_empty() {
            return Err(RelqError::Compilation("query has no source table".into()));
        }

        if self.group_by.is_empty() && self.having.is_empty() {
            let mut out = Sql::new();
            out.push_raw("SELECT COUNT(*) AS \"found_rows\" FROM ");
            out.push_raw(&quoted(&self.from));
            for join in &self.joins {
                out.push_raw(" ");
                out.push_raw(join.kind.keyword());
                out.push_raw(" ");
                out.push_raw(&quoted(&join.table));
                out.push_raw(" ON ");
                out.push_raw(&join.on);
            }
            if !self.conditions.is_empty() {
                out.push_raw(" WHERE ");
                render_condition_list(&self.conditions, &mut out)?;
            }
            return Ok(out);
        }

        let mut inner = self.clone();
        inner.limit = None;
        inner.offset = None;
        inner.order_by.clear();
        inner.calc_rows = false;
        let mut out = Sql::new();
        out.push_raw("SELECT COUNT(*) AS \"found_rows\" FROM (");
        out.push_sql(inner.compile()?);
        out.push_raw(") AS \"count_source\"");
        Ok(out)
    }

    /// Compiles the correlated sub-select for an aggregate relation: a
    /// scoped query over the related table pinned to the base table's key,
    /// with any caller scope applied on top.
    fn compile_aggregate(&self, spec: &RelationSpec) -> Result<Sql> {
        let mut sub = QueryBuilder::table(spec.table.as_str());

        let function = spec
            .kind
            .aggregate_fn()
            .ok_or_else(|| RelqError::Compilation(format!("relation '{}' is not an aggregate", spec.name)))?;
        let expr = match &spec.aggregate_column {
            Some(column) => format!("{function}({})", quoted(column)),
            None => format!("{function}(*)"),
        };
        sub.select_raw(&expr);

        let related = format!("{}.{}", spec.table, spec.foreign_key);
        let base = format!("{}.{}", self.from, spec.local_key);
        sub.where_column(&related, "=", &base);

        if let Some(scope) = &spec.configurator {
            scope(&mut sub);
        }
        // Eager loads declared inside an aggregate scope have no parent
        // rows to merge onto; drop them instead of leaking sub-selects.
        sub.relations.retain(|s| !s.kind.is_eager());
        sub.compile()
    }

    fn check_aggregate_aliases(&self) -> Result<()> {
        for spec in self.relations.iter().filter(|s| !s.kind.is_eager()) {
            let collision = self
                .select
                .iter()
                .any(|item| item.alias.as_deref() == Some(spec.alias.as_str()));
            if collision {
                return Err(RelqError::Compilation(format!(
                    "aggregate alias '{}' collides with an explicit select alias",
                    spec.alias
                )));
            }
        }
        Ok(())
    }
}

fn render_select_item(item: &SelectItem, out: &mut Sql) {
    match &item.expr {
        SelectExpr::Column(column) => out.push_raw(&quoted(column)),
        SelectExpr::Raw(expr) => out.push_raw(expr),
    }
    if let Some(alias) = &item.alias {
        out.push_raw(" AS ");
        out.push_raw(&quoted(alias));
    }
}

/// Renders a condition list with combinator keywords between siblings and
/// exact parenthesization for groups. Empty groups are skipped before any
/// keyword is emitted.
pub(crate) fn render_condition_list(nodes: &[ConditionNode], out: &mut Sql) -> Result<()> {
    let nodes: Vec<&ConditionNode> = nodes.iter().filter(|n| !n.is_empty_group()).collect();
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            out.push_raw(node.combinator().keyword());
        }
        match node {
            ConditionNode::Leaf {
                column,
                operator,
                operand,
                ..
            } => {
                out.push_raw(&quoted(column));
                out.push_raw(" ");
                out.push_raw(operator);
                match operand {
                    Operand::Value(value) => {
                        out.push_raw(" ");
                        out.push_param(value.clone());
                    }
                    Operand::Values(values) => {
                        out.push_raw(" (");
                        if values.is_empty() {
                            out.push_raw("NULL");
                        } else {
                            for (j, value) in values.iter().enumerate() {
                                if j > 0 {
                                    out.push_raw(", ");
                                }
                                out.push_param(value.clone());
                            }
                        }
                        out.push_raw(")");
                    }
                    Operand::Column(other) => {
                        out.push_raw(" ");
                        out.push_raw(&quoted(other));
                    }
                    Operand::None => {}
                }
            }
            ConditionNode::Group { children, .. } => {
                out.push_raw("(");
                render_condition_list(children, out)?;
                out.push_raw(")");
            }
            ConditionNode::Exists { negated, query, .. } => {
                out.push_raw(if *negated { "NOT EXISTS (" } else { "EXISTS (" });
                out.push_sql(query.compile()?);
                out.push_raw(")");
            }
        }
    }
    Ok(())
}

/// Double-quotes an identifier, quoting dotted paths per segment. `*` and
/// expressions (anything containing a parenthesis or space) pass through
/// verbatim.
pub(crate) fn quoted(ident: &str) -> CompactString {
    if ident == "*" || ident.contains('(') || ident.contains(' ') {
        return CompactString::from(ident);
    }
    let mut buf = CompactString::with_capacity(ident.len() + 4);
    for (i, part) in ident.split('.').enumerate() {
        if i > 0 {
            buf.push('.');
        }
        if part == "*" {
            buf.push('*');
        } else {
            buf.push('"');
            buf.push_str(part);
            buf.push('"');
        }
    }
    buf
}
