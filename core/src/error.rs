use thiserror::Error;

/// Errors produced by query construction, compilation, and execution.
#[derive(Debug, Clone, Error)]
pub enum RelqError {
    /// Malformed relation spec: missing key columns, bad nesting depth
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The builder state cannot be rendered into SQL
    #[error("compilation error: {0}")]
    Compilation(String),

    /// Failure surfaced by the database client, including secondary
    /// queries issued during relation resolution
    #[error("execution error: {0}")]
    Execution(String),

    /// An accessor was called out of protocol order
    /// (e.g. `found_rows()` without `calc_rows()`)
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// No rows returned when at least one was expected
    #[error("no rows found")]
    NotFound,
}

/// Result type for query operations
pub type Result<T> = std::result::Result<T, RelqError>;
