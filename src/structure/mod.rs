//! In-memory graph elements: vertices, edges, and their shared lifecycle.
//!
//! An element is either *fresh* (just inserted, all supplied properties
//! cached) or a *stub* referencing only (SchemaTable, id), whose row is
//! loaded and cached the first time any property or endpoint accessor is
//! invoked. The unloaded state is never observable from outside.

pub mod edge;
pub mod element;
pub mod vertex;

pub use edge::Edge;
pub use vertex::Vertex;

/// Edge direction relative to a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Edges leaving the vertex.
    Out,
    /// Edges arriving at the vertex.
    In,
    /// Both of the above; a self-loop is reported once per side.
    Both,
}
