//! On-demand schema evolution.
//!
//! The graph is schema-less from the caller's point of view: the first time
//! a (kind, property name, type) triple is seen, the backing table/column is
//! created here, before the write that references it. The manager keeps a
//! cache of the relational catalog (physical table -> column -> declared
//! [`PropertyType`]), populated from the live database on open and refreshed
//! after every DDL.
//!
//! First-use creation must be safe under concurrent writers. All
//! check-then-create sequences run under a process-wide lock with a catalog
//! re-check inside it, so the second-arriving creator observes the
//! already-created column and proceeds instead of erroring. A cross-process
//! race that still reaches the DDL is resolved by re-reading the catalog
//! after the failed statement.

use std::collections::HashMap;
use std::sync::Mutex;

use lazy_static::lazy_static;
use rusqlite::Connection;

use crate::errors::{Result, SqlGraphError};
use crate::property::PropertyType;
use crate::schema::schema_table::{
    quote_ident, parse_physical_table, ElementKind, SchemaTable, ID_COLUMN,
};

lazy_static! {
    /// Serializes check-then-create schema evolution across all graph
    /// instances in the process.
    static ref DDL_LOCK: Mutex<()> = Mutex::new(());
}

fn ddl_guard() -> std::sync::MutexGuard<'static, ()> {
    DDL_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Cache of the relational catalog plus the DDL that evolves it.
#[derive(Debug)]
pub struct SchemaManager {
    default_schema: String,
    /// Physical table name -> column name -> declared property type.
    tables: HashMap<String, HashMap<String, PropertyType>>,
}

impl SchemaManager {
    pub fn new(default_schema: impl Into<String>) -> Self {
        SchemaManager {
            default_schema: default_schema.into(),
            tables: HashMap::new(),
        }
    }

    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    /// Populate the cache from the live catalog. Called once on open.
    pub fn load(&mut self, conn: &Connection) -> Result<()> {
        self.tables.clear();
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        for name in names {
            if parse_physical_table(&name).is_some() {
                self.refresh_table(conn, &name)?;
            }
        }
        log::debug!("schema cache loaded, {} graph tables", self.tables.len());
        Ok(())
    }

    /// Re-read one table's columns from the catalog into the cache. Also
    /// the recovery path when a read observes a column another handle added
    /// after this cache was loaded.
    pub(crate) fn refresh_table(&mut self, conn: &Connection, physical: &str) -> Result<()> {
        let sql = format!("PRAGMA table_info({})", quote_ident(physical));
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut columns = HashMap::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get(1)?;
            let decl: String = row.get(2)?;
            match PropertyType::from_sql_type(&decl) {
                Some(ty) => {
                    columns.insert(name, ty);
                }
                None => {
                    log::warn!(
                        "ignoring column `{}` on `{}` with foreign type `{}`",
                        name,
                        physical,
                        decl
                    );
                }
            }
        }
        if columns.is_empty() {
            self.tables.remove(physical);
        } else {
            self.tables.insert(physical.to_string(), columns);
        }
        Ok(())
    }

    /// Declared type of a column, from the cache.
    pub fn column_type(&self, physical: &str, column: &str) -> Option<PropertyType> {
        self.tables.get(physical)?.get(column).copied()
    }

    pub fn has_table(&self, physical: &str) -> bool {
        self.tables.contains_key(physical)
    }

    /// Iterate the cached catalog: (physical table name, columns).
    pub fn tables(&self) -> impl Iterator<Item = (&str, &HashMap<String, PropertyType>)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Ensure the per-kind vertex table exists. Idempotent.
    pub fn ensure_vertex_table(&mut self, conn: &Connection, st: &SchemaTable) -> Result<()> {
        let physical = st.physical_name(ElementKind::Vertex);
        if self.has_table(&physical) {
            return Ok(());
        }
        let _guard = ddl_guard();
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({} INTEGER PRIMARY KEY)",
            quote_ident(&physical),
            quote_ident(ID_COLUMN)
        );
        log::info!("{}", sql);
        conn.execute(&sql, [])?;
        self.refresh_table(conn, &physical)
    }

    /// Ensure the per-kind edge table exists with endpoint columns for the
    /// given in/out vertex kinds. A later edge of the same label between new
    /// kinds adds further nullable endpoint columns to the same table.
    pub fn ensure_edge_table(
        &mut self,
        conn: &Connection,
        st: &SchemaTable,
        in_st: &SchemaTable,
        out_st: &SchemaTable,
    ) -> Result<()> {
        let physical = st.physical_name(ElementKind::Edge);
        if !self.has_table(&physical) {
            let _guard = ddl_guard();
            let sql = format!(
                "CREATE TABLE IF NOT EXISTS {} ({} INTEGER PRIMARY KEY, {} BIGINT, {} BIGINT)",
                quote_ident(&physical),
                quote_ident(ID_COLUMN),
                quote_ident(&in_st.in_column_name()),
                quote_ident(&out_st.out_column_name())
            );
            log::info!("{}", sql);
            conn.execute(&sql, [])?;
            self.refresh_table(conn, &physical)?;
        }
        // The table may predate these endpoint kinds.
        self.ensure_column(conn, &physical, &in_st.in_column_name(), PropertyType::Long)?;
        self.ensure_column(conn, &physical, &out_st.out_column_name(), PropertyType::Long)?;
        Ok(())
    }

    /// Ensure `column` exists on `physical` with a type compatible with
    /// `ty`.
    ///
    /// Idempotent: a compatible existing column is a no-op. A missing column
    /// is added with `ALTER TABLE`. An existing column of an incompatible
    /// type fails with [`SqlGraphError::SchemaConflict`]; the conflict is
    /// never auto-resolved. Must happen-before any write referencing the
    /// column.
    pub fn ensure_column(
        &mut self,
        conn: &Connection,
        physical: &str,
        column: &str,
        ty: PropertyType,
    ) -> Result<()> {
        if let Some(existing) = self.column_type(physical, column) {
            return check_compatible(physical, column, existing, ty);
        }

        let _guard = ddl_guard();
        // A concurrent creator may have won the race; re-check the live
        // catalog before issuing DDL.
        self.refresh_table(conn, physical)?;
        if let Some(existing) = self.column_type(physical, column) {
            return check_compatible(physical, column, existing, ty);
        }

        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            quote_ident(physical),
            quote_ident(column),
            ty.sql_type()
        );
        log::info!("{}", sql);
        match conn.execute(&sql, []) {
            Ok(_) => {
                self.tables
                    .entry(physical.to_string())
                    .or_default()
                    .insert(column.to_string(), ty);
                Ok(())
            }
            Err(e) => {
                // Lost a cross-process race. If the column now exists with a
                // compatible type, proceed; otherwise surface the conflict
                // or the original failure.
                self.refresh_table(conn, physical)?;
                match self.column_type(physical, column) {
                    Some(existing) => check_compatible(physical, column, existing, ty),
                    None => Err(SqlGraphError::Statement(e)),
                }
            }
        }
    }
}

fn check_compatible(
    physical: &str,
    column: &str,
    existing: PropertyType,
    requested: PropertyType,
) -> Result<()> {
    if existing == requested {
        Ok(())
    } else {
        Err(SqlGraphError::SchemaConflict {
            table: physical.to_string(),
            column: column.to_string(),
            existing,
            requested,
        })
    }
}
