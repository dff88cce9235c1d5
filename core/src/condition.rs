//! Condition tree data model.
//!
//! Pure data: nodes accumulate in caller-chain order and are rendered by
//! the compiler with exact parenthesization per nesting level.

use compact_str::CompactString;

use crate::builder::QueryBuilder;
use crate::value::Value;

/// Boolean combinator joining a node to its preceding sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    pub(crate) const fn keyword(self) -> &'static str {
        match self {
            Combinator::And => " AND ",
            Combinator::Or => " OR ",
        }
    }
}

/// Right-hand side of a leaf predicate.
#[derive(Debug, Clone)]
pub enum Operand {
    /// A single bound value: `"age" > ?`
    Value(Value),
    /// A bound value list: `"id" IN (?, ?, ?)`
    Values(Vec<Value>),
    /// A column reference, rendered as an identifier and never bound.
    /// Used for correlated predicates like `"posts"."user_id" = "users"."id"`.
    Column(CompactString),
    /// No right-hand side; the operator carries the full predicate tail,
    /// as in `"deleted_at" IS NULL`.
    None,
}

/// A node in the condition tree.
#[derive(Debug, Clone)]
pub enum ConditionNode {
    /// A single predicate.
    Leaf {
        combinator: Combinator,
        column: CompactString,
        operator: CompactString,
        operand: Operand,
    },
    /// A parenthesized group of child nodes.
    Group {
        combinator: Combinator,
        children: Vec<ConditionNode>,
    },
    /// An EXISTS / NOT EXISTS wrapper around a nested query.
    Exists {
        combinator: Combinator,
        negated: bool,
        query: Box<QueryBuilder>,
    },
}

impl ConditionNode {
    pub(crate) fn leaf(
        combinator: Combinator,
        column: &str,
        operator: &str,
        operand: Operand,
    ) -> Self {
        ConditionNode::Leaf {
            combinator,
            column: CompactString::from(column),
            operator: CompactString::from(operator),
            operand,
        }
    }

    pub(crate) fn combinator(&self) -> Combinator {
        match self {
            ConditionNode::Leaf { combinator, .. }
            | ConditionNode::Group { combinator, .. }
            | ConditionNode::Exists { combinator, .. } => *combinator,
        }
    }

    /// Groups with no children render to nothing and are skipped entirely.
    pub(crate) fn is_empty_group(&self) -> bool {
        matches!(self, ConditionNode::Group { children, .. } if children.is_empty())
    }
}
