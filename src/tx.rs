//! Transaction context: implicit-transaction fencing, commit/rollback, and
//! the batch-mode toggle.
//!
//! Every graph operation that touches the database first calls
//! [`Tx::read_write`], which opens an implicit transaction on first access.
//! [`Tx::commit`] flushes any batch-buffered writes and commits;
//! [`Tx::rollback`] discards the buffer and rolls back. A failed flush rolls
//! the whole transaction back — there is no partial-flush outcome.
//!
//! A transaction context is bound to one logical unit of work and is not
//! safe for concurrent use; threads needing concurrent graph access each
//! open their own [`SqlGraph`](crate::graph::SqlGraph).

use std::cell::{Cell, RefCell};

use crate::batch::BatchManager;
use crate::errors::Result;
use crate::graph::GraphInner;

/// Per-graph transaction state. Interior mutability keeps the whole graph
/// handle `&self`-driven; the graph is single-threaded by construction.
#[derive(Debug, Default)]
pub(crate) struct TransactionState {
    open: Cell<bool>,
    batch_mode: Cell<bool>,
    pub(crate) batch: RefCell<BatchManager>,
}

/// Borrowed handle to the graph's transaction scope.
pub struct Tx<'g> {
    pub(crate) graph: &'g GraphInner,
}

impl Tx<'_> {
    /// Begin the implicit transaction if this is the first access.
    pub fn read_write(&self) -> Result<()> {
        let state = &self.graph.tx_state;
        if !state.open.get() {
            log::debug!("BEGIN");
            self.graph.conn.execute_batch("BEGIN")?;
            state.open.set(true);
        }
        Ok(())
    }

    /// Flush pending batch writes into the open transaction without
    /// committing.
    ///
    /// Reads that must observe buffered writes (stub loads, traversal)
    /// call this, so batch mode never serves stale results. Any flush
    /// failure rolls the transaction back before propagating, so the
    /// database never holds a partial flush.
    pub fn flush(&self) -> Result<()> {
        let state = &self.graph.tx_state;
        if state.batch.borrow().is_empty() {
            return Ok(());
        }
        // The borrow must end before a failed flush rolls back.
        let flushed = state.batch.borrow_mut().flush(&self.graph.conn);
        if let Err(e) = flushed {
            self.rollback()?;
            return Err(e);
        }
        Ok(())
    }

    /// Flush pending batch writes and commit.
    pub fn commit(&self) -> Result<()> {
        self.flush()?;
        let state = &self.graph.tx_state;
        if state.open.get() {
            log::debug!("COMMIT");
            self.graph.conn.execute_batch("COMMIT")?;
            state.open.set(false);
        }
        state.batch_mode.set(false);
        Ok(())
    }

    /// Discard pending batch writes and roll back.
    pub fn rollback(&self) -> Result<()> {
        let state = &self.graph.tx_state;
        state.batch.borrow_mut().clear();
        if state.open.get() {
            log::debug!("ROLLBACK");
            self.graph.conn.execute_batch("ROLLBACK")?;
            state.open.set(false);
        }
        state.batch_mode.set(false);
        Ok(())
    }

    /// Buffer subsequent writes until commit. Lasts for the current
    /// transaction; commit and rollback reset it.
    pub fn batch_mode_on(&self) {
        self.graph.tx_state.batch_mode.set(true);
    }

    pub fn batch_mode_off(&self) {
        self.graph.tx_state.batch_mode.set(false);
    }

    pub fn is_in_batch_mode(&self) -> bool {
        self.graph.tx_state.batch_mode.get()
    }

    pub fn is_open(&self) -> bool {
        self.graph.tx_state.open.get()
    }
}
