//! Global element identity registry.
//!
//! A single table assigns a monotonically generated identifier to every
//! element, vertex or edge, and records which (schema, prefixed table) owns
//! it. Per-kind tables reuse that identifier as their own primary key, which
//! is the sole reason cross-kind id uniqueness holds; no other component may
//! mint ids.
//!
//! The registry is write-path-only in the common case: traversal results
//! carry their owning [`SchemaTable`](crate::schema::SchemaTable), so reads
//! never consult it. [`resolve`] exists for bare-id lookups.

use rusqlite::{params, Connection};

use crate::errors::{Result, SqlGraphError};
use crate::schema::quote_ident;

/// Name of the global identity registry table.
pub const ELEMENTS_TABLE: &str = "ELEMENTS";

/// Create the registry table if this is a fresh database.
///
/// `AUTOINCREMENT` keeps ids monotonic: an id is assigned once at creation
/// and never reassigned, even after the owning row is deleted.
pub fn bootstrap(conn: &Connection) -> Result<()> {
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (\
         {} INTEGER PRIMARY KEY AUTOINCREMENT, \
         \"ELEMENT_SCHEMA\" TEXT NOT NULL, \
         \"ELEMENT_TABLE\" TEXT NOT NULL)",
        quote_ident(ELEMENTS_TABLE),
        quote_ident("ID")
    );
    log::debug!("{}", sql);
    conn.execute(&sql, [])?;
    Ok(())
}

/// Mint a new element id owned by (`schema`, `prefixed_table`).
///
/// `prefixed_table` carries the kind prefix (`V_Person`, `E_Knows`) so a
/// bare id can later be resolved to its concrete kind. Failing to obtain a
/// generated key is fatal: an id-less element cannot exist.
pub fn allocate(conn: &Connection, schema: &str, prefixed_table: &str) -> Result<i64> {
    let sql = format!(
        "INSERT INTO {} (\"ELEMENT_SCHEMA\", \"ELEMENT_TABLE\") VALUES (?1, ?2)",
        quote_ident(ELEMENTS_TABLE)
    );
    log::debug!("{}", sql);
    let inserted = conn.execute(&sql, params![schema, prefixed_table])?;
    if inserted != 1 {
        return Err(SqlGraphError::IdentityAllocation {
            schema: schema.to_string(),
            table: prefixed_table.to_string(),
        });
    }
    Ok(conn.last_insert_rowid())
}

/// Resolve a bare id to its owning (schema, prefixed table), or `None` if no
/// element with that id exists.
pub fn resolve(conn: &Connection, id: i64) -> Result<Option<(String, String)>> {
    let sql = format!(
        "SELECT \"ELEMENT_SCHEMA\", \"ELEMENT_TABLE\" FROM {} WHERE \"ID\" = ?1",
        quote_ident(ELEMENTS_TABLE)
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![id])?;
    match rows.next()? {
        Some(row) => Ok(Some((row.get(0)?, row.get(1)?))),
        None => Ok(None),
    }
}

/// Delete the registry row as part of the owning element's removal.
pub fn release(conn: &Connection, id: i64) -> Result<()> {
    let sql = format!("DELETE FROM {} WHERE \"ID\" = ?1", quote_ident(ELEMENTS_TABLE));
    log::debug!("{}", sql);
    conn.execute(&sql, params![id])?;
    Ok(())
}
