//! Read access and serialized write transactions
//!
//! Lock order for writes: write lock first, then a pooled connection. The
//! pool's own lock is only held for bookkeeping inside `acquire()`/release,
//! never across a write.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use super::CatalogStore;
use crate::error::{CatalogError, Result};

impl CatalogStore {
    /// Run `f` on a pooled connection without taking the write lock
    pub(crate) fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let pool = self.pool()?;
        let conn = pool.acquire()?;
        f(&conn)
    }

    /// Serialized write; errors from `f` propagate unchanged after rollback
    pub(crate) fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        self.serialized(f, |e| e)
    }

    /// Scoped transaction for multi-statement work.
    ///
    /// Commits when `f` returns `Ok`. When `f` fails the transaction is rolled
    /// back and the failure is reported as `CatalogError::Transaction`.
    ///
    /// The write lock is held while `f` runs and is not reentrant: `f` must
    /// only use the `tx` it is given. Calling another `CatalogStore` write
    /// from inside `f` deadlocks the calling thread.
    pub fn transaction<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        self.serialized(f, |e| CatalogError::Transaction(Box::new(e)))
    }

    fn serialized<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T>,
        on_body_error: impl FnOnce(CatalogError) -> CatalogError,
    ) -> Result<T> {
        let _writer = self.write_lock.lock();
        let pool = self.pool()?;
        let mut conn = pool.acquire()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;

        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback() {
                    tracing::warn!("Rollback failed after write error: {}", rollback);
                }
                Err(on_body_error(e))
            }
        }
    }
}
