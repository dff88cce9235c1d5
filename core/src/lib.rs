//! # relq-core
//!
//! Relation-aware query construction over a pluggable database client.
//!
//! The crate extends a plain select/where/order/limit builder with
//! declarative relation loading: one-to-one and one-to-many eager loads
//! resolved through batched secondary queries, aggregate relations
//! (count/sum/avg/max/min) compiled as correlated sub-selects, and
//! exists-filter relations compiled into the base statement's WHERE
//! clause. Execution is delegated to any [`Executor`] implementation;
//! driver crates provide concrete backends.
//!
//! ```no_run
//! use relq_core::{Executor, QueryBuilder};
//!
//! fn list_users(db: &dyn Executor) -> relq_core::Result<()> {
//!     let users = QueryBuilder::table("users")
//!         .where_eq("status", "active")
//!         .with_many("posts", "posts", "user_id", "id")
//!         .with_count("posts", "posts", "user_id", "id")
//!         .order_by("name")
//!         .get(db)?;
//!     for user in users.rows() {
//!         println!("{}", user.to_json());
//!     }
//!     Ok(())
//! }
//! ```

pub mod builder;
mod compile;
pub mod condition;
pub mod error;
pub mod executor;
mod planner;
pub mod relation;
pub mod result;
pub mod row;
pub mod sql;
pub mod value;

pub use builder::{JoinKind, QueryBuilder, SortOrder};
pub use condition::{Combinator, ConditionNode, Operand};
pub use error::{RelqError, Result};
pub use executor::Executor;
pub use relation::{Configurator, RelationKind, RelationSpec};
pub use result::ResultSet;
pub use row::{Related, Row};
pub use sql::{Sql, SqlChunk};
pub use value::Value;

/// Commonly used items.
pub mod prelude {
    pub use crate::builder::{QueryBuilder, SortOrder};
    pub use crate::error::{RelqError, Result};
    pub use crate::executor::Executor;
    pub use crate::relation::{RelationKind, RelationSpec};
    pub use crate::result::ResultSet;
    pub use crate::row::{Related, Row};
    pub use crate::value::Value;
}
