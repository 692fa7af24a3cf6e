//! Element kind naming: (schema, table) pairs and the deterministic,
//! reversible rules that map them onto physical table and column names.
//!
//! # Naming rules
//!
//! - Vertex kind `public.Person` is stored in table `"public.V_Person"`,
//!   edge kind `public.Knows` in `"public.E_Knows"` (one quoted identifier,
//!   the dot is part of the name).
//! - An edge row references its endpoints through two foreign-key columns
//!   named from the endpoint's schema-qualified kind plus a fixed suffix:
//!   `"public.Person_OUT_ID"` holds the out-vertex id, `"public.Person_IN_ID"`
//!   the in-vertex id. Parsing a column name recovers the endpoint's
//!   [`SchemaTable`] unambiguously.

use std::fmt;

/// Prefix for per-kind vertex tables.
pub const VERTEX_PREFIX: &str = "V_";
/// Prefix for per-kind edge tables.
pub const EDGE_PREFIX: &str = "E_";
/// Suffix of the edge column holding the in-vertex id.
pub const IN_VERTEX_COLUMN_END: &str = "_IN_ID";
/// Suffix of the edge column holding the out-vertex id.
pub const OUT_VERTEX_COLUMN_END: &str = "_OUT_ID";
/// Primary-key column shared by every graph table.
pub const ID_COLUMN: &str = "ID";

/// Whether an element kind is stored as a vertex table or an edge table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Vertex,
    Edge,
}

impl ElementKind {
    /// The table-name prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            ElementKind::Vertex => VERTEX_PREFIX,
            ElementKind::Edge => EDGE_PREFIX,
        }
    }
}

/// The (schema name, table name) pair identifying an element kind.
///
/// Immutable value type; equality by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaTable {
    schema: String,
    table: String,
}

impl SchemaTable {
    pub fn of(schema: impl Into<String>, table: impl Into<String>) -> Self {
        SchemaTable {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Parse a user-facing label into a `SchemaTable`.
    ///
    /// `"hr.Employee"` splits on the first dot; a bare `"Person"` falls back
    /// to the default schema.
    pub fn from_label(label: &str, default_schema: &str) -> Self {
        match label.split_once('.') {
            Some((schema, table)) => SchemaTable::of(schema, table),
            None => SchemaTable::of(default_schema, label),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Physical name of this kind's table, e.g. `public.V_Person`.
    pub fn physical_name(&self, kind: ElementKind) -> String {
        format!("{}.{}{}", self.schema, kind.prefix(), self.table)
    }

    /// Name of the edge column referencing a vertex of this kind as the
    /// in-endpoint, e.g. `public.Person_IN_ID`.
    pub fn in_column_name(&self) -> String {
        format!("{}.{}{}", self.schema, self.table, IN_VERTEX_COLUMN_END)
    }

    /// Name of the edge column referencing a vertex of this kind as the
    /// out-endpoint, e.g. `public.Person_OUT_ID`.
    pub fn out_column_name(&self) -> String {
        format!("{}.{}{}", self.schema, self.table, OUT_VERTEX_COLUMN_END)
    }
}

impl fmt::Display for SchemaTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Quote an identifier for use in a SQL statement, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Recover the endpoint `SchemaTable` from an in-endpoint column name, or
/// `None` if the column is not in-endpoint-shaped.
pub fn parse_in_endpoint_column(column: &str) -> Option<SchemaTable> {
    parse_endpoint(column, IN_VERTEX_COLUMN_END)
}

/// Recover the endpoint `SchemaTable` from an out-endpoint column name, or
/// `None` if the column is not out-endpoint-shaped.
pub fn parse_out_endpoint_column(column: &str) -> Option<SchemaTable> {
    parse_endpoint(column, OUT_VERTEX_COLUMN_END)
}

fn parse_endpoint(column: &str, suffix: &str) -> Option<SchemaTable> {
    let qualified = column.strip_suffix(suffix)?;
    let (schema, table) = qualified.split_once('.')?;
    if schema.is_empty() || table.is_empty() {
        return None;
    }
    Some(SchemaTable::of(schema, table))
}

/// Recover the `SchemaTable` and kind from a physical table name, or `None`
/// for tables this layer does not own (the identity registry, user tables).
pub fn parse_physical_table(name: &str) -> Option<(SchemaTable, ElementKind)> {
    let (schema, prefixed) = name.split_once('.')?;
    if schema.is_empty() {
        return None;
    }
    if let Some(table) = prefixed.strip_prefix(VERTEX_PREFIX) {
        if !table.is_empty() {
            return Some((SchemaTable::of(schema, table), ElementKind::Vertex));
        }
    }
    if let Some(table) = prefixed.strip_prefix(EDGE_PREFIX) {
        if !table.is_empty() {
            return Some((SchemaTable::of(schema, table), ElementKind::Edge));
        }
    }
    None
}
