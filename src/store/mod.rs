//! Catalog storage with SQLite
//!
//! `CatalogStore` is the single entry point: it owns the connection pool,
//! runs schema reconciliation on `connect()`, and exposes the repository
//! operations for projects, files, slides, elements, and keywords.
//!
//! Reads check out a pooled connection and run directly. Writes first take
//! the process-wide write lock, then run inside a transaction (see `tx`).

mod elements;
mod files;
mod keywords;
mod migrate;
mod models;
mod pool;
mod projects;
mod schema;
mod search;
mod slides;
mod tx;

use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{CatalogError, Result};

pub use migrate::SchemaAction;
pub use models::{
    BoundingBox, ConversionStatus, Element, File, Keyword, KeywordKind, NewElement, NewSlide,
    Project, Slide, Timestamps,
};
pub use pool::{ConnectionPool, PoolStatus, PooledConnection, StoreConfig};
pub use schema::SCHEMA_VERSION;

pub struct CatalogStore {
    config: StoreConfig,
    pool: RwLock<Option<Arc<ConnectionPool>>>,
    /// Held for the duration of every write; at most one writer in flight
    write_lock: Mutex<()>,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>, pool_size: usize) -> Self {
        Self::with_config(StoreConfig::new(path, pool_size))
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            pool: RwLock::new(None),
            write_lock: Mutex::new(()),
        }
    }

    /// Construct and connect in one step
    pub fn open(config: StoreConfig) -> Result<Self> {
        let store = Self::with_config(config);
        store.connect()?;
        Ok(store)
    }

    /// Open the pool and bring the schema up to date.
    ///
    /// Calling `connect()` on a connected store is a no-op. The write lock is
    /// held throughout, so concurrent writers wait for reconciliation; the
    /// pool slot itself is only locked to install the finished pool.
    pub fn connect(&self) -> Result<SchemaAction> {
        let _writer = self.write_lock.lock();
        if self.is_connected() {
            return Ok(SchemaAction::UpToDate);
        }

        let pool = ConnectionPool::initialize(self.config.clone())?;
        let action = pool.acquire().and_then(|mut conn| migrate::reconcile(&mut conn));

        match action {
            Ok(action) => {
                tracing::info!(
                    "Connected to catalog {} (pool size {})",
                    self.config.path.display(),
                    self.config.pool_size
                );
                *self.pool.write() = Some(Arc::new(pool));
                Ok(action)
            }
            Err(e) => {
                pool.shutdown();
                Err(e)
            }
        }
    }

    /// Close every connection. Connections still checked out close on release.
    pub fn close(&self) {
        if let Some(pool) = self.pool.write().take() {
            pool.shutdown();
            tracing::info!("Closed catalog {}", self.config.path.display());
        }
    }

    pub fn is_connected(&self) -> bool {
        self.pool.read().is_some()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn pool_status(&self) -> Option<PoolStatus> {
        self.pool.read().as_ref().map(|pool| pool.status())
    }

    pub fn schema_version(&self) -> Result<i64> {
        self.read(|conn| migrate::schema_version(conn))
    }

    fn pool(&self) -> Result<Arc<ConnectionPool>> {
        self.pool
            .read()
            .as_ref()
            .cloned()
            .ok_or_else(|| CatalogError::Connection("catalog store is not connected".into()))
    }
}

impl Drop for CatalogStore {
    fn drop(&mut self) {
        self.close();
    }
}

/// Trimmed value of a required text field
fn require<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed)
}

/// Map "no rows changed" to a not-found error for update/delete by id
fn affected(rows: usize, resource: &'static str, id: i64) -> Result<()> {
    if rows == 0 {
        return Err(CatalogError::not_found(resource, id));
    }
    Ok(())
}

/// True if `sql` (a `SELECT 1 ... WHERE id = ?` query) returns a row
fn exists(conn: &Connection, sql: &str, id: i64) -> Result<bool> {
    Ok(conn
        .query_row(sql, params![id], |_| Ok(()))
        .optional()?
        .is_some())
}
