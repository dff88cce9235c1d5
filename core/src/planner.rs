//! Batched eager-load resolution.
//!
//! Given the base result rows and the declared One/Many relations, issues
//! one secondary query per relation keyed by the distinct set of parent
//! keys, then merges the grouped results back onto the parents. Nested
//! declarations recurse depth-first so nested data is attached to
//! secondary rows before the parent merge runs.

use hashbrown::{HashMap, HashSet};

use crate::builder::QueryBuilder;
use crate::error::{RelqError, Result};
use crate::executor::Executor;
use crate::relation::{RelationKind, RelationSpec};
use crate::row::{Related, Row};
use crate::value::Value;

/// Bound on nested relation graphs. Self-referential declarations (a scope
/// re-attaching its own relation) are cut off here rather than recursing
/// forever.
pub(crate) const MAX_DEPTH: usize = 8;

pub(crate) fn resolve<E: Executor + ?Sized>(
    executor: &E,
    rows: &mut [Row],
    specs: &[RelationSpec],
    depth: usize,
) -> Result<()> {
    for spec in specs.iter().filter(|s| s.kind.is_eager()) {
        if depth >= MAX_DEPTH {
            return Err(RelqError::Configuration(format!(
                "relation '{}' exceeds the maximum nesting depth of {MAX_DEPTH}",
                spec.alias
            )));
        }
        resolve_relation(executor, rows, spec, depth)?;
    }
    Ok(())
}

fn resolve_relation<E: Executor + ?Sized>(
    executor: &E,
    rows: &mut [Row],
    spec: &RelationSpec,
    depth: usize,
) -> Result<()> {
    // Distinct parent keys; duplicates collapse so shared keys cost one
    // probe value. NULL keys never match and are excluded.
    let mut keys: HashSet<Value> = HashSet::new();
    for row in rows.iter() {
        if let Some(value) = row.get(&spec.local_key) {
            if !value.is_null() {
                keys.insert(value.clone());
            }
        }
    }

    if keys.is_empty() {
        tracing::debug!(relation = %spec.alias, "no parent keys, skipping round-trip");
        for row in rows.iter_mut() {
            row.set_relation(&spec.alias, empty_related(spec.kind));
        }
        return Ok(());
    }

    let mut sub = QueryBuilder::table(spec.table.as_str());
    sub.where_in(spec.foreign_key.as_str(), keys.iter().cloned());
    if let Some(scope) = &spec.configurator {
        scope(&mut sub);
    }
    let nested = sub.relations.clone();

    let compiled = sub.compile()?;
    let (text, params) = compiled.into_parts();
    tracing::debug!(
        relation = %spec.alias,
        parents = keys.len(),
        sql = %text,
        "resolving eager relation"
    );
    let mut related_rows = executor.execute(&text, &params)?;

    // Nested data must be in place before the parent merge.
    resolve(executor, &mut related_rows, &nested, depth + 1)?;

    let mut groups: HashMap<Value, Vec<Row>> = HashMap::new();
    for row in related_rows {
        let key = row.get(&spec.foreign_key).cloned();
        match key {
            Some(key) if !key.is_null() => groups.entry(key).or_default().push(row),
            _ => {}
        }
    }

    for row in rows.iter_mut() {
        let attached = match row.get(&spec.local_key) {
            Some(key) if !key.is_null() => match spec.kind {
                RelationKind::One => {
                    Related::One(groups.get(key).and_then(|group| group.first()).cloned())
                }
                RelationKind::Many => {
                    Related::Many(groups.get(key).cloned().unwrap_or_default())
                }
                _ => unreachable!("non-eager kinds never reach the planner"),
            },
            _ => empty_related(spec.kind),
        };
        row.set_relation(&spec.alias, attached);
    }
    Ok(())
}

fn empty_related(kind: RelationKind) -> Related {
    match kind {
        RelationKind::One => Related::One(None),
        RelationKind::Many => Related::Many(Vec::new()),
        _ => unreachable!("non-eager kinds never reach the planner"),
    }
}
