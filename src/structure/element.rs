//! Shared element core: identity, property cache, lazy row loading, and the
//! write paths common to vertices and edges.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

use rusqlite::params;
use rusqlite::types::ValueRef;

use crate::errors::{Result, SqlGraphError};
use crate::graph::SqlGraph;
use crate::identity;
use crate::property::{codec, PropertyType, PropertyValue};
use crate::schema::{
    parse_in_endpoint_column, parse_out_endpoint_column, quote_ident, ElementKind, SchemaTable,
    ID_COLUMN,
};

/// Resolved endpoint references of a loaded edge row.
#[derive(Debug, Clone)]
pub(crate) struct Endpoints {
    pub in_st: SchemaTable,
    pub in_id: i64,
    pub out_st: SchemaTable,
    pub out_id: i64,
}

#[derive(Debug, Default)]
struct ElementData {
    properties: BTreeMap<String, PropertyValue>,
    loaded: bool,
    removed: bool,
}

/// State shared by [`Vertex`](crate::structure::Vertex) and
/// [`Edge`](crate::structure::Edge).
pub(crate) struct ElementCore {
    graph: SqlGraph,
    id: i64,
    schema_table: SchemaTable,
    kind: ElementKind,
    data: RefCell<ElementData>,
}

// The graph handle carries no useful diagnostics; format the rest.
impl fmt::Debug for ElementCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementCore")
            .field("id", &self.id)
            .field("schema_table", &self.schema_table)
            .field("kind", &self.kind)
            .field("data", &self.data)
            .finish()
    }
}

impl ElementCore {
    /// A fresh element: just inserted, all supplied properties cached, no
    /// database round trip needed for reads.
    pub fn new_fresh(
        graph: SqlGraph,
        id: i64,
        schema_table: SchemaTable,
        kind: ElementKind,
        properties: BTreeMap<String, PropertyValue>,
    ) -> Self {
        ElementCore {
            graph,
            id,
            schema_table,
            kind,
            data: RefCell::new(ElementData {
                properties,
                loaded: true,
                removed: false,
            }),
        }
    }

    /// An identifier-only stub; the row is fetched on first access.
    pub fn new_stub(graph: SqlGraph, id: i64, schema_table: SchemaTable, kind: ElementKind) -> Self {
        ElementCore {
            graph,
            id,
            schema_table,
            kind,
            data: RefCell::new(ElementData::default()),
        }
    }

    pub fn graph(&self) -> &SqlGraph {
        &self.graph
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn label(&self) -> &str {
        self.schema_table.table()
    }

    pub fn schema_table(&self) -> &SchemaTable {
        &self.schema_table
    }

    pub fn physical_table(&self) -> String {
        self.schema_table.physical_name(self.kind)
    }

    pub fn is_loaded(&self) -> bool {
        self.data.borrow().loaded
    }

    pub fn is_removed(&self) -> bool {
        self.data.borrow().removed
    }

    pub fn cached_property(&self, key: &str) -> Option<PropertyValue> {
        self.data.borrow().properties.get(key).cloned()
    }

    pub fn cached_keys(&self) -> Vec<String> {
        self.data.borrow().properties.keys().cloned().collect()
    }

    /// Fetch this element's row by primary key and cache its properties.
    ///
    /// Exactly one row must exist. For edges, the two endpoint foreign-key
    /// columns are parsed back into endpoint references; a row yielding
    /// anything other than exactly one non-null in-endpoint and one non-null
    /// out-endpoint is a fatal [`SqlGraphError::CorruptEdge`]. Returns the
    /// endpoints for edges, `None` for vertices.
    pub fn load_row(&self) -> Result<Option<Endpoints>> {
        self.graph.tx().read_write()?;
        // Buffered writes must be visible to this read.
        self.graph.tx().flush()?;
        let physical = self.physical_table();
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1",
            quote_ident(&physical),
            quote_ident(ID_COLUMN)
        );
        log::debug!("{}", sql);
        let conn = self.graph.connection();
        let mut stmt = conn.prepare(&sql)?;
        let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let mut rows = stmt.query(params![self.id])?;
        let row = rows.next()?.ok_or_else(|| SqlGraphError::ElementNotFound {
            id: self.id,
            table: physical.clone(),
        })?;

        let mut in_endpoint: Option<(SchemaTable, i64)> = None;
        let mut out_endpoint: Option<(SchemaTable, i64)> = None;
        let mut properties = BTreeMap::new();
        for (i, name) in names.iter().enumerate() {
            if name == ID_COLUMN {
                continue;
            }
            if self.kind == ElementKind::Edge {
                if let Some(st) = parse_in_endpoint_column(name) {
                    if let Some(endpoint_id) = row.get::<_, Option<i64>>(i)? {
                        if in_endpoint.is_some() {
                            return Err(self.corrupt("multiple non-null in-endpoint columns"));
                        }
                        in_endpoint = Some((st, endpoint_id));
                    }
                    continue;
                }
                if let Some(st) = parse_out_endpoint_column(name) {
                    if let Some(endpoint_id) = row.get::<_, Option<i64>>(i)? {
                        if out_endpoint.is_some() {
                            return Err(self.corrupt("multiple non-null out-endpoint columns"));
                        }
                        out_endpoint = Some((st, endpoint_id));
                    }
                    continue;
                }
            }
            let raw = row.get_ref(i)?;
            if matches!(raw, ValueRef::Null) {
                continue;
            }
            match self.declared_type(&physical, name)? {
                Some(ty) => {
                    properties.insert(name.clone(), codec::decode(ty, raw)?);
                }
                None => {
                    log::warn!("skipping column `{}` on `{}` with no declared type", name, physical);
                }
            }
        }

        let endpoints = match self.kind {
            ElementKind::Vertex => None,
            ElementKind::Edge => match (in_endpoint, out_endpoint) {
                (Some((in_st, in_id)), Some((out_st, out_id))) => Some(Endpoints {
                    in_st,
                    in_id,
                    out_st,
                    out_id,
                }),
                (None, _) => return Err(self.corrupt("no non-null in-endpoint column")),
                (_, None) => return Err(self.corrupt("no non-null out-endpoint column")),
            },
        };

        let mut data = self.data.borrow_mut();
        data.properties = properties;
        data.loaded = true;
        Ok(endpoints)
    }

    /// Validate, ensure the backing column, then write — through the batch
    /// buffer when one is tracking this element, immediately otherwise. The
    /// cache is updated unconditionally after either path succeeds, so
    /// reads-after-write observe the new value before any flush.
    pub fn set_property(&self, key: &str, value: PropertyValue) -> Result<()> {
        validate_property_key(key)?;
        if self.is_removed() {
            return Err(SqlGraphError::ElementRemoved { id: self.id });
        }
        self.graph.tx().read_write()?;
        let physical = self.physical_table();
        self.graph
            .inner
            .schema_manager
            .borrow_mut()
            .ensure_column(self.graph.connection(), &physical, key, value.property_type())?;

        let handled = self.graph.tx().is_in_batch_mode()
            && self
                .graph
                .inner
                .tx_state
                .batch
                .borrow_mut()
                .update_property(self.id, &physical, key, value.clone());
        if !handled {
            let sql = format!(
                "UPDATE {} SET {} = ?1 WHERE {} = ?2",
                quote_ident(&physical),
                quote_ident(key),
                quote_ident(ID_COLUMN)
            );
            log::debug!("{}", sql);
            self.graph.connection().execute(&sql, params![value, self.id])?;
        }

        self.data
            .borrow_mut()
            .properties
            .insert(key.to_string(), value);
        Ok(())
    }

    /// Delete this element's row and its identity registry row. The
    /// instance refuses further mutation afterwards.
    pub fn remove(&self) -> Result<()> {
        if self.is_removed() {
            return Err(SqlGraphError::ElementRemoved { id: self.id });
        }
        self.graph.tx().read_write()?;
        self.graph.inner.tx_state.batch.borrow_mut().forget(self.id);
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            quote_ident(&self.physical_table()),
            quote_ident(ID_COLUMN)
        );
        log::debug!("{}", sql);
        self.graph.connection().execute(&sql, params![self.id])?;
        identity::release(self.graph.connection(), self.id)?;
        self.data.borrow_mut().removed = true;
        Ok(())
    }

    /// Declared type of a column, refreshing the catalog cache once when
    /// the column is unknown — another handle may have added it after this
    /// graph's cache was loaded. Only a column still absent from the live
    /// catalog is treated as foreign.
    fn declared_type(&self, physical: &str, column: &str) -> Result<Option<PropertyType>> {
        let cached = self
            .graph
            .inner
            .schema_manager
            .borrow()
            .column_type(physical, column);
        if cached.is_some() {
            return Ok(cached);
        }
        let mut schema_manager = self.graph.inner.schema_manager.borrow_mut();
        schema_manager.refresh_table(self.graph.connection(), physical)?;
        Ok(schema_manager.column_type(physical, column))
    }

    fn corrupt(&self, reason: &str) -> SqlGraphError {
        SqlGraphError::CorruptEdge {
            id: self.id,
            table: self.physical_table(),
            reason: reason.to_string(),
        }
    }
}

/// Property keys must be non-empty and must not shadow the primary key.
pub(crate) fn validate_property_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(SqlGraphError::InvalidPropertyKey(
            "property key may not be empty".to_string(),
        ));
    }
    if key == ID_COLUMN {
        return Err(SqlGraphError::InvalidPropertyKey(format!(
            "`{}` is reserved for the primary key",
            ID_COLUMN
        )));
    }
    Ok(())
}
