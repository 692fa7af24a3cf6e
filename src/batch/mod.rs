//! In-memory write buffering for batch mode.
//!
//! While batch mode is active, inserts and follow-up property writes
//! accumulate here instead of issuing one statement per mutation, and are
//! flushed as bulk operations at commit, or earlier when a read needs to
//! observe them. Entries are keyed by element
//! identity; repeated writes to the same property of the same element merge
//! (last write per property wins), so no intermediate value is ever
//! persisted from the buffer. Rollback discards the buffer without touching
//! the database.
//!
//! Flush order across distinct elements is unspecified; within one element
//! it is the merged final state. Inserts flush before updates, grouped by
//! target table as multi-row statements.

use std::collections::{BTreeMap, BTreeSet};

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use crate::errors::Result;
use crate::property::{codec, PropertyValue};
use crate::schema::{quote_ident, ID_COLUMN};

/// SQLite caps bound parameters per statement; stay well under it.
const MAX_PARAMS_PER_STATEMENT: usize = 900;

#[derive(Debug, Clone)]
enum PendingKind {
    VertexInsert,
    EdgeInsert {
        in_column: String,
        out_column: String,
        in_id: i64,
        out_id: i64,
    },
    Update,
}

#[derive(Debug, Clone)]
struct PendingEntry {
    physical: String,
    kind: PendingKind,
    properties: BTreeMap<String, PropertyValue>,
}

impl PendingEntry {
    /// All columns this entry contributes, encoded, endpoint ids included.
    fn columns(&self) -> Result<BTreeMap<String, Value>> {
        let mut out = BTreeMap::new();
        for (key, value) in &self.properties {
            out.insert(key.clone(), codec::encode(value)?);
        }
        if let PendingKind::EdgeInsert {
            in_column,
            out_column,
            in_id,
            out_id,
        } = &self.kind
        {
            out.insert(in_column.clone(), Value::Integer(*in_id));
            out.insert(out_column.clone(), Value::Integer(*out_id));
        }
        Ok(out)
    }
}

/// Pending writes of one transaction, keyed by element id.
#[derive(Debug, Default)]
pub struct BatchManager {
    entries: BTreeMap<i64, PendingEntry>,
}

impl BatchManager {
    pub fn new() -> Self {
        BatchManager::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Track a freshly created vertex whose row insert is deferred to flush.
    pub fn buffer_vertex_insert(
        &mut self,
        id: i64,
        physical: String,
        properties: BTreeMap<String, PropertyValue>,
    ) {
        self.entries.insert(
            id,
            PendingEntry {
                physical,
                kind: PendingKind::VertexInsert,
                properties,
            },
        );
    }

    /// Track a freshly created edge whose row insert is deferred to flush.
    #[allow(clippy::too_many_arguments)]
    pub fn buffer_edge_insert(
        &mut self,
        id: i64,
        physical: String,
        in_column: String,
        out_column: String,
        in_id: i64,
        out_id: i64,
        properties: BTreeMap<String, PropertyValue>,
    ) {
        self.entries.insert(
            id,
            PendingEntry {
                physical,
                kind: PendingKind::EdgeInsert {
                    in_column,
                    out_column,
                    in_id,
                    out_id,
                },
                properties,
            },
        );
    }

    /// Merge a property write into the element's pending entry.
    ///
    /// Returns `true` when the element already has a pending insert or
    /// update tracked — the write is handled here and the caller must not
    /// also issue an immediate statement. Returns `false` for the first
    /// write to an untracked element: the caller falls back to an immediate
    /// statement, and the element is tracked from now on so subsequent
    /// writes merge.
    pub fn update_property(
        &mut self,
        id: i64,
        physical: &str,
        key: &str,
        value: PropertyValue,
    ) -> bool {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.properties.insert(key.to_string(), value);
            return true;
        }
        self.entries.insert(
            id,
            PendingEntry {
                physical: physical.to_string(),
                kind: PendingKind::Update,
                properties: BTreeMap::from([(key.to_string(), value)]),
            },
        );
        false
    }

    /// Drop any pending state for a removed element.
    pub fn forget(&mut self, id: i64) {
        self.entries.remove(&id);
    }

    /// Discard everything without touching the database.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Flush all pending inserts then updates and clear the buffer.
    ///
    /// On any failure the buffer is left cleared and the error propagates;
    /// the enclosing transaction must roll back — a partial flush is not a
    /// supported outcome.
    pub fn flush(&mut self, conn: &Connection) -> Result<()> {
        let entries = std::mem::take(&mut self.entries);

        // Inserts grouped by target table.
        let mut inserts: BTreeMap<String, Vec<(i64, BTreeMap<String, Value>)>> = BTreeMap::new();
        let mut updates: Vec<(i64, String, BTreeMap<String, Value>)> = Vec::new();
        for (id, entry) in entries {
            let columns = entry.columns()?;
            match entry.kind {
                PendingKind::Update => updates.push((id, entry.physical, columns)),
                _ => inserts
                    .entry(entry.physical)
                    .or_default()
                    .push((id, columns)),
            }
        }

        for (physical, rows) in &inserts {
            flush_inserts(conn, physical, rows)?;
        }
        for (id, physical, columns) in &updates {
            flush_update(conn, *id, physical, columns)?;
        }
        Ok(())
    }
}

/// Multi-row insert over the union of buffered columns; absent properties
/// bind NULL.
fn flush_inserts(
    conn: &Connection,
    physical: &str,
    rows: &[(i64, BTreeMap<String, Value>)],
) -> Result<()> {
    let column_union: BTreeSet<&str> = rows
        .iter()
        .flat_map(|(_, cols)| cols.keys().map(String::as_str))
        .collect();
    let params_per_row = column_union.len() + 1;
    let rows_per_statement = (MAX_PARAMS_PER_STATEMENT / params_per_row).max(1);

    let mut column_list = quote_ident(ID_COLUMN);
    for col in &column_union {
        column_list.push_str(", ");
        column_list.push_str(&quote_ident(col));
    }
    let row_placeholder = format!("({})", vec!["?"; params_per_row].join(", "));

    for chunk in rows.chunks(rows_per_statement) {
        let placeholders = vec![row_placeholder.as_str(); chunk.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            quote_ident(physical),
            column_list,
            placeholders
        );
        log::debug!("batch flush: {}", sql);
        let mut params: Vec<Value> = Vec::with_capacity(chunk.len() * params_per_row);
        for (id, columns) in chunk {
            params.push(Value::Integer(*id));
            for col in &column_union {
                params.push(columns.get(*col).cloned().unwrap_or(Value::Null));
            }
        }
        conn.execute(&sql, params_from_iter(params))?;
    }
    Ok(())
}

fn flush_update(
    conn: &Connection,
    id: i64,
    physical: &str,
    columns: &BTreeMap<String, Value>,
) -> Result<()> {
    let assignments: Vec<String> = columns
        .keys()
        .enumerate()
        .map(|(i, col)| format!("{} = ?{}", quote_ident(col), i + 1))
        .collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?{}",
        quote_ident(physical),
        assignments.join(", "),
        quote_ident(ID_COLUMN),
        columns.len() + 1
    );
    log::debug!("batch flush: {}", sql);
    let mut params: Vec<Value> = columns.values().cloned().collect();
    params.push(Value::Integer(id));
    conn.execute(&sql, params_from_iter(params))?;
    Ok(())
}
