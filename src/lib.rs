//! sqlgraph - A property graph persisted in a relational database
//!
//! This crate maps property-graph semantics onto relational tables:
//! - One table per vertex kind (`schema.V_Label`) and per edge kind
//!   (`schema.E_Label`), with edge endpoints as foreign-key columns
//! - A global identity registry assigning every element a unique id
//! - On-demand schema evolution: first use of a label or property name
//!   creates the table or column it needs
//! - Lazily loaded elements and an optional batch mode that buffers
//!   writes until commit
//!
//! The graph handle is single-threaded by construction; concurrent
//! writers each open their own [`SqlGraph`] over the same database.

pub mod batch;
pub mod config;
pub mod errors;
pub mod graph;
pub mod identity;
pub mod property;
pub mod schema;
pub mod structure;
pub mod tx;

pub use config::GraphConfig;
pub use errors::{Result, SqlGraphError};
pub use graph::SqlGraph;
pub use property::{PropertyType, PropertyValue};
pub use schema::SchemaTable;
pub use structure::{Direction, Edge, Vertex};
