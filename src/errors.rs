//! # Graph Persistence Error Types
//!
//! Error taxonomy for the schema-mapped persistence layer.
//!
//! ## Error Categories
//!
//! - **Input validation**: `UnsupportedPropertyType`, `NullArrayElement`,
//!   `InvalidPropertyKey` — rejected before any write is attempted, the
//!   database is never touched.
//! - **Transaction-fatal**: everything else — the enclosing transaction must
//!   be rolled back by the caller; the layer never retries a failed write
//!   because inserts are not idempotent (a retry would mint a duplicate
//!   identity registry entry).

use thiserror::Error;

use crate::property::PropertyType;

/// Errors raised by the graph persistence layer.
#[derive(Debug, Error)]
pub enum SqlGraphError {
    /// The identity registry insert did not yield a generated key. An
    /// id-less element cannot exist, so this aborts the transaction.
    #[error("identity registry insert for `{schema}.{table}` did not return a generated id")]
    IdentityAllocation { schema: String, table: String },

    /// A property name was reused with a type incompatible with the column
    /// that already backs it. Never auto-resolved: the second writer fails.
    #[error(
        "column `{column}` on `{table}` already holds {existing}, cannot store {requested}"
    )]
    SchemaConflict {
        table: String,
        column: String,
        existing: PropertyType,
        requested: PropertyType,
    },

    /// The value's shape is outside the closed set of supported property
    /// types (nested arrays, objects, nulls, mixed-type arrays).
    #[error("unsupported property value type: {0}")]
    UnsupportedPropertyType(String),

    /// Property array values may not contain null elements.
    #[error("property array value elements may not be null")]
    NullArrayElement,

    /// Property keys must be non-empty.
    #[error("invalid property key: {0}")]
    InvalidPropertyKey(String),

    /// A lazy load by primary key found no row. Either the element was
    /// deleted externally or the registry is out of sync with the data.
    #[error("no row found for element {id} in `{table}`")]
    ElementNotFound { id: i64, table: String },

    /// An edge row did not yield resolvable in/out endpoint columns.
    #[error("corrupt edge {id} in `{table}`: {reason}")]
    CorruptEdge {
        id: i64,
        table: String,
        reason: String,
    },

    /// The element was removed in this transaction; further mutation would
    /// silently resurrect the row.
    #[error("element {id} has been removed")]
    ElementRemoved { id: i64 },

    /// Underlying database failure, propagated as transaction-fatal.
    #[error("statement execution failed: {0}")]
    Statement(#[from] rusqlite::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SqlGraphError>;
