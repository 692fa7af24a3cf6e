//! Schema mapping between graph element kinds and relational tables.
//!
//! [`schema_table`] owns the naming rules (kind prefixes, endpoint column
//! suffixes and their reversible parsing); [`manager`] owns the catalog
//! cache and on-demand schema evolution.

pub mod manager;
pub mod schema_table;

pub use manager::SchemaManager;
pub use schema_table::{
    parse_in_endpoint_column, parse_out_endpoint_column, parse_physical_table, quote_ident,
    ElementKind, SchemaTable, EDGE_PREFIX, ID_COLUMN, IN_VERTEX_COLUMN_END, OUT_VERTEX_COLUMN_END,
    VERTEX_PREFIX,
};
