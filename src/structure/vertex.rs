//! Vertices: elements with no relational structure beyond their own row.

use std::collections::BTreeMap;

use rusqlite::params;

use crate::errors::Result;
use crate::graph::SqlGraph;
use crate::property::PropertyValue;
use crate::schema::{parse_physical_table, quote_ident, ElementKind, SchemaTable, ID_COLUMN};
use crate::structure::element::ElementCore;
use crate::structure::{Direction, Edge};

/// A vertex handle. Fresh after creation, or a lazily-loaded stub when
/// returned from a lookup or traversal.
#[derive(Debug)]
pub struct Vertex {
    pub(crate) core: ElementCore,
}

impl Vertex {
    pub(crate) fn new_fresh(
        graph: SqlGraph,
        id: i64,
        schema_table: SchemaTable,
        properties: BTreeMap<String, PropertyValue>,
    ) -> Self {
        Vertex {
            core: ElementCore::new_fresh(graph, id, schema_table, ElementKind::Vertex, properties),
        }
    }

    pub(crate) fn new_stub(graph: SqlGraph, id: i64, schema_table: SchemaTable) -> Self {
        Vertex {
            core: ElementCore::new_stub(graph, id, schema_table, ElementKind::Vertex),
        }
    }

    /// The globally unique element id.
    pub fn id(&self) -> i64 {
        self.core.id()
    }

    /// The vertex kind's table name.
    pub fn label(&self) -> &str {
        self.core.label()
    }

    pub fn schema_table(&self) -> &SchemaTable {
        self.core.schema_table()
    }

    /// Whether the row has been loaded into the cache. Fresh vertices are
    /// born loaded; stubs load on first access.
    pub fn is_loaded(&self) -> bool {
        self.core.is_loaded()
    }

    fn ensure_loaded(&self) -> Result<()> {
        if !self.core.is_loaded() {
            self.core.load_row()?;
        }
        Ok(())
    }

    /// Read a property, loading the row first if this is a stub.
    pub fn property(&self, key: &str) -> Result<Option<PropertyValue>> {
        self.ensure_loaded()?;
        Ok(self.core.cached_property(key))
    }

    /// All property names currently set on this vertex.
    pub fn keys(&self) -> Result<Vec<String>> {
        self.ensure_loaded()?;
        Ok(self.core.cached_keys())
    }

    /// Write a property, evolving the schema on first use of the name.
    pub fn set_property(&self, key: &str, value: impl Into<PropertyValue>) -> Result<()> {
        self.core.set_property(key, value.into())
    }

    /// Delete this vertex's row and registry entry. Edges referencing it
    /// are not cascaded.
    pub fn remove(&self) -> Result<()> {
        self.core.remove()
    }

    /// Create an edge from this vertex (out-endpoint) to `to` (in-endpoint).
    pub fn add_edge(
        &self,
        label: &str,
        to: &Vertex,
        properties: &[(&str, PropertyValue)],
    ) -> Result<Edge> {
        self.core.graph().add_edge(label, self, to, properties)
    }

    /// Iterate edges incident to this vertex in the given direction,
    /// optionally restricted to the given edge labels.
    ///
    /// Scans every known edge table carrying an endpoint column for this
    /// vertex's kind; returned edges are stubs that load on first access.
    pub fn edges(&self, direction: Direction, labels: &[&str]) -> Result<Vec<Edge>> {
        let graph = self.core.graph();
        graph.tx().read_write()?;
        // Buffered edge inserts must be visible to the scan below.
        graph.tx().flush()?;
        // Edge tables created by another handle since this graph opened are
        // only in the live catalog.
        graph
            .inner
            .schema_manager
            .borrow_mut()
            .load(graph.connection())?;
        let st = self.core.schema_table();
        let my_in_column = st.in_column_name();
        let my_out_column = st.out_column_name();

        let mut targets: Vec<(String, String, SchemaTable)> = Vec::new();
        {
            let schema_manager = graph.inner.schema_manager.borrow();
            for (physical, columns) in schema_manager.tables() {
                let (edge_st, kind) = match parse_physical_table(physical) {
                    Some(parsed) => parsed,
                    None => continue,
                };
                if kind != ElementKind::Edge {
                    continue;
                }
                if !labels.is_empty()
                    && !labels
                        .iter()
                        .any(|l| *l == edge_st.table() || *l == edge_st.to_string())
                {
                    continue;
                }
                if matches!(direction, Direction::Out | Direction::Both)
                    && columns.contains_key(&my_out_column)
                {
                    targets.push((physical.to_string(), my_out_column.clone(), edge_st.clone()));
                }
                if matches!(direction, Direction::In | Direction::Both)
                    && columns.contains_key(&my_in_column)
                {
                    targets.push((physical.to_string(), my_in_column.clone(), edge_st.clone()));
                }
            }
        }

        let conn = graph.connection();
        let mut edges = Vec::new();
        for (physical, column, edge_st) in targets {
            let sql = format!(
                "SELECT {} FROM {} WHERE {} = ?1",
                quote_ident(ID_COLUMN),
                quote_ident(&physical),
                quote_ident(&column)
            );
            log::debug!("{}", sql);
            let mut stmt = conn.prepare(&sql)?;
            let ids: Vec<i64> = stmt
                .query_map(params![self.id()], |row| row.get(0))?
                .collect::<rusqlite::Result<_>>()?;
            for id in ids {
                edges.push(Edge::new_stub(graph.clone(), id, edge_st.clone()));
            }
        }
        Ok(edges)
    }
}
