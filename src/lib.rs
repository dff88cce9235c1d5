//! # relq
//!
//! A relation-aware SQL query builder: a fluent select/where/order/limit
//! surface extended with declarative relation loading. One-to-one and
//! one-to-many relations eager-load through batched secondary queries;
//! aggregate relations (count/sum/avg/max/min) and exists-filters compile
//! into the base statement. Pagination totals come from `calc_rows()`.
//!
//! ## Quick start
//!
//! ```
//! use relq::{Client, QueryBuilder};
//!
//! # fn main() -> relq::Result<()> {
//! let db = Client::open_in_memory()?;
//! db.execute_batch(
//!     "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);
//!      CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER, title TEXT);
//!      INSERT INTO users (id, name) VALUES (1, 'Alice'), (2, 'Bob');
//!      INSERT INTO posts (id, user_id, title) VALUES
//!          (10, 1, 'first'), (11, 1, 'second'), (12, 2, 'third');",
//! )?;
//!
//! let users = QueryBuilder::table("users")
//!     .with_many("posts", "posts", "user_id", "id")
//!     .order_by("id")
//!     .get(&db)?;
//!
//! assert_eq!(users.len(), 2);
//! assert_eq!(users.rows()[0].many("posts").unwrap().len(), 2);
//! assert_eq!(users.rows()[1].many("posts").unwrap().len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! Every query chain is an ordinary owned [`QueryBuilder`] value and the
//! database client is passed explicitly to the terminal operations; any
//! backend implementing [`Executor`] plugs in.

pub use relq_core::{
    Combinator, ConditionNode, Configurator, Executor, JoinKind, Operand, QueryBuilder, Related,
    RelationKind, RelationSpec, RelqError, Result, ResultSet, Row, SortOrder, Sql, SqlChunk, Value,
};

#[cfg(feature = "rusqlite")]
pub use relq_rusqlite::Client;

/// Commonly used items.
pub mod prelude {
    pub use relq_core::prelude::*;

    #[cfg(feature = "rusqlite")]
    pub use relq_rusqlite::Client;
}
