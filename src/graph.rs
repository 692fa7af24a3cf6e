//! The graph handle: connection ownership, element creation, and id lookup.
//!
//! [`SqlGraph`] is a cheaply cloneable handle over one connection, one schema
//! cache, and one transaction scope. It is deliberately not `Send`/`Sync`:
//! concurrent writers each open their own graph over the same database file
//! and coordinate through the relational engine, not through shared memory.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use crate::config::GraphConfig;
use crate::errors::Result;
use crate::identity;
use crate::property::{codec, PropertyValue};
use crate::schema::{quote_ident, ElementKind, SchemaManager, SchemaTable, ID_COLUMN};
use crate::structure::element::{validate_property_key, Endpoints};
use crate::structure::{Edge, Vertex};
use crate::tx::{TransactionState, Tx};

pub(crate) struct GraphInner {
    pub(crate) config: GraphConfig,
    pub(crate) conn: Connection,
    pub(crate) schema_manager: RefCell<SchemaManager>,
    pub(crate) tx_state: TransactionState,
}

/// A property graph persisted in a relational database.
pub struct SqlGraph {
    pub(crate) inner: Rc<GraphInner>,
}

impl Clone for SqlGraph {
    fn clone(&self) -> Self {
        SqlGraph {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl SqlGraph {
    /// Open (creating if necessary) the graph described by `config`.
    pub fn open(config: GraphConfig) -> Result<Self> {
        let conn = match &config.database_path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        // WAL is refused on some targets (e.g. in-memory); fall back
        // silently to the default journal.
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        conn.pragma_update(None, "busy_timeout", config.busy_timeout_ms)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        identity::bootstrap(&conn)?;
        let mut schema_manager = SchemaManager::new(config.default_schema.clone());
        schema_manager.load(&conn)?;
        log::info!(
            "graph opened at {}",
            config
                .database_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| ":memory:".to_string())
        );

        Ok(SqlGraph {
            inner: Rc::new(GraphInner {
                config,
                conn,
                schema_manager: RefCell::new(schema_manager),
                tx_state: TransactionState::default(),
            }),
        })
    }

    /// Open a throwaway in-memory graph with default configuration.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(GraphConfig::default())
    }

    /// The transaction scope of this graph.
    pub fn tx(&self) -> Tx<'_> {
        Tx {
            graph: self.inner.as_ref(),
        }
    }

    /// The underlying connection, for callers needing raw SQL access.
    pub fn connection(&self) -> &Connection {
        &self.inner.conn
    }

    pub fn config(&self) -> &GraphConfig {
        &self.inner.config
    }

    /// Create a vertex of the given label with the given initial properties.
    ///
    /// First use of a label creates its table; first use of a property name
    /// on that label creates its column. In batch mode the id is minted
    /// immediately but the row insert is deferred to the flush at commit.
    pub fn add_vertex(&self, label: &str, properties: &[(&str, PropertyValue)]) -> Result<Vertex> {
        self.tx().read_write()?;
        let st = SchemaTable::from_label(label, &self.inner.config.default_schema);
        let physical = st.physical_name(ElementKind::Vertex);
        for (key, _) in properties {
            validate_property_key(key)?;
        }

        {
            let mut schema_manager = self.inner.schema_manager.borrow_mut();
            schema_manager.ensure_vertex_table(&self.inner.conn, &st)?;
            for (key, value) in properties {
                schema_manager.ensure_column(
                    &self.inner.conn,
                    &physical,
                    key,
                    value.property_type(),
                )?;
            }
        }

        let prefixed = format!("{}{}", ElementKind::Vertex.prefix(), st.table());
        let id = identity::allocate(&self.inner.conn, st.schema(), &prefixed)?;

        let props: BTreeMap<String, PropertyValue> = properties
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        if self.tx().is_in_batch_mode() {
            self.inner
                .tx_state
                .batch
                .borrow_mut()
                .buffer_vertex_insert(id, physical, props.clone());
        } else {
            let mut columns = Vec::with_capacity(props.len());
            for (key, value) in &props {
                columns.push((key.clone(), codec::encode(value)?));
            }
            insert_row(&self.inner.conn, &physical, id, columns)?;
        }
        Ok(Vertex::new_fresh(self.clone(), id, st, props))
    }

    /// Create an edge of the given label from `out_v` to `in_v`.
    ///
    /// The edge row lives in the label's table and references its endpoints
    /// through per-endpoint-kind foreign-key columns; a label first used
    /// between other vertex kinds grows the columns it needs.
    pub fn add_edge(
        &self,
        label: &str,
        out_v: &Vertex,
        in_v: &Vertex,
        properties: &[(&str, PropertyValue)],
    ) -> Result<Edge> {
        self.tx().read_write()?;
        let st = SchemaTable::from_label(label, &self.inner.config.default_schema);
        let physical = st.physical_name(ElementKind::Edge);
        for (key, _) in properties {
            validate_property_key(key)?;
        }

        let in_st = in_v.schema_table().clone();
        let out_st = out_v.schema_table().clone();
        let in_column = in_st.in_column_name();
        let out_column = out_st.out_column_name();
        {
            let mut schema_manager = self.inner.schema_manager.borrow_mut();
            schema_manager.ensure_edge_table(&self.inner.conn, &st, &in_st, &out_st)?;
            for (key, value) in properties {
                schema_manager.ensure_column(
                    &self.inner.conn,
                    &physical,
                    key,
                    value.property_type(),
                )?;
            }
        }

        let prefixed = format!("{}{}", ElementKind::Edge.prefix(), st.table());
        let id = identity::allocate(&self.inner.conn, st.schema(), &prefixed)?;

        let props: BTreeMap<String, PropertyValue> = properties
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        if self.tx().is_in_batch_mode() {
            self.inner.tx_state.batch.borrow_mut().buffer_edge_insert(
                id,
                physical,
                in_column,
                out_column,
                in_v.id(),
                out_v.id(),
                props.clone(),
            );
        } else {
            let mut columns = Vec::with_capacity(props.len() + 2);
            columns.push((in_column, Value::Integer(in_v.id())));
            columns.push((out_column, Value::Integer(out_v.id())));
            for (key, value) in &props {
                columns.push((key.clone(), codec::encode(value)?));
            }
            insert_row(&self.inner.conn, &physical, id, columns)?;
        }

        let endpoints = Endpoints {
            in_st,
            in_id: in_v.id(),
            out_st,
            out_id: out_v.id(),
        };
        Ok(Edge::new_fresh(self.clone(), id, st, endpoints, props))
    }

    /// Look up a vertex by bare id. `None` if no element with that id
    /// exists, or it is not a vertex. The returned vertex is a stub.
    pub fn vertex(&self, id: i64) -> Result<Option<Vertex>> {
        self.tx().read_write()?;
        Ok(self
            .resolve_stub(id, ElementKind::Vertex)?
            .map(|st| Vertex::new_stub(self.clone(), id, st)))
    }

    /// Look up an edge by bare id. `None` if no element with that id exists,
    /// or it is not an edge. The returned edge is a stub.
    pub fn edge(&self, id: i64) -> Result<Option<Edge>> {
        self.tx().read_write()?;
        Ok(self
            .resolve_stub(id, ElementKind::Edge)?
            .map(|st| Edge::new_stub(self.clone(), id, st)))
    }

    fn resolve_stub(&self, id: i64, kind: ElementKind) -> Result<Option<SchemaTable>> {
        let Some((schema, prefixed)) = identity::resolve(&self.inner.conn, id)? else {
            return Ok(None);
        };
        match prefixed.strip_prefix(kind.prefix()) {
            Some(table) => Ok(Some(SchemaTable::of(schema, table))),
            None => Ok(None),
        }
    }
}

/// Single-row insert with an explicit primary key and encoded columns.
fn insert_row(
    conn: &Connection,
    physical: &str,
    id: i64,
    columns: Vec<(String, Value)>,
) -> Result<()> {
    let mut names = vec![quote_ident(ID_COLUMN)];
    let mut values = vec![Value::Integer(id)];
    for (name, value) in columns {
        names.push(quote_ident(&name));
        values.push(value);
    }
    let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(physical),
        names.join(", "),
        placeholders.join(", ")
    );
    log::debug!("{}", sql);
    conn.execute(&sql, params_from_iter(values))?;
    Ok(())
}
