//! Edges: elements owning two endpoint references stored as foreign-key
//! columns on the edge's row.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::errors::Result;
use crate::graph::SqlGraph;
use crate::property::PropertyValue;
use crate::schema::{ElementKind, SchemaTable};
use crate::structure::element::{ElementCore, Endpoints};
use crate::structure::{Direction, Vertex};

/// An edge handle. Fresh after creation (endpoints known), or a
/// lazily-loaded stub whose endpoints are reconstructed from the row's
/// endpoint columns on first access.
#[derive(Debug)]
pub struct Edge {
    pub(crate) core: ElementCore,
    endpoints: RefCell<Option<Endpoints>>,
}

impl Edge {
    pub(crate) fn new_fresh(
        graph: SqlGraph,
        id: i64,
        schema_table: SchemaTable,
        endpoints: Endpoints,
        properties: BTreeMap<String, PropertyValue>,
    ) -> Self {
        Edge {
            core: ElementCore::new_fresh(graph, id, schema_table, ElementKind::Edge, properties),
            endpoints: RefCell::new(Some(endpoints)),
        }
    }

    pub(crate) fn new_stub(graph: SqlGraph, id: i64, schema_table: SchemaTable) -> Self {
        Edge {
            core: ElementCore::new_stub(graph, id, schema_table, ElementKind::Edge),
            endpoints: RefCell::new(None),
        }
    }

    /// The globally unique element id.
    pub fn id(&self) -> i64 {
        self.core.id()
    }

    /// The edge kind's table name.
    pub fn label(&self) -> &str {
        self.core.label()
    }

    pub fn schema_table(&self) -> &SchemaTable {
        self.core.schema_table()
    }

    pub fn is_loaded(&self) -> bool {
        self.core.is_loaded()
    }

    /// One row fetch populates both the property cache and the endpoint
    /// references.
    fn ensure_loaded(&self) -> Result<()> {
        if self.core.is_loaded() && self.endpoints.borrow().is_some() {
            return Ok(());
        }
        let endpoints = self.core.load_row()?;
        *self.endpoints.borrow_mut() = endpoints;
        Ok(())
    }

    fn resolved_endpoints(&self) -> Result<Endpoints> {
        self.ensure_loaded()?;
        match self.endpoints.borrow().as_ref() {
            Some(eps) => Ok(eps.clone()),
            None => Err(crate::errors::SqlGraphError::CorruptEdge {
                id: self.id(),
                table: self.core.physical_table(),
                reason: "endpoint columns did not resolve".to_string(),
            }),
        }
    }

    /// The vertex this edge points at (in-endpoint).
    pub fn in_vertex(&self) -> Result<Vertex> {
        let eps = self.resolved_endpoints()?;
        Ok(Vertex::new_stub(self.core.graph().clone(), eps.in_id, eps.in_st))
    }

    /// The vertex this edge leaves from (out-endpoint).
    pub fn out_vertex(&self) -> Result<Vertex> {
        let eps = self.resolved_endpoints()?;
        Ok(Vertex::new_stub(self.core.graph().clone(), eps.out_id, eps.out_st))
    }

    /// Endpoint vertices by direction: OUT first, then IN for `Both`.
    pub fn vertices(&self, direction: Direction) -> Result<Vec<Vertex>> {
        let mut out = Vec::new();
        if matches!(direction, Direction::Out | Direction::Both) {
            out.push(self.out_vertex()?);
        }
        if matches!(direction, Direction::In | Direction::Both) {
            out.push(self.in_vertex()?);
        }
        Ok(out)
    }

    pub fn property(&self, key: &str) -> Result<Option<PropertyValue>> {
        self.ensure_loaded()?;
        Ok(self.core.cached_property(key))
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        self.ensure_loaded()?;
        Ok(self.core.cached_keys())
    }

    pub fn set_property(&self, key: &str, value: impl Into<PropertyValue>) -> Result<()> {
        self.core.set_property(key, value.into())
    }

    /// Delete this edge's row and registry entry. Never removes its
    /// endpoint vertices.
    pub fn remove(&self) -> Result<()> {
        self.core.remove()
    }
}
