//! Bounded pool of SQLite connections shared across threads
//!
//! The pool is filled eagerly to `pool_size` and never holds more than
//! `pool_size` live connections. A slot freed by a discarded connection is
//! refilled lazily on the next `acquire()`.

use parking_lot::{Condvar, Mutex};
use rusqlite::Connection;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::error::{CatalogError, Result};

/// Re-check interval while waiting for a released connection
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Connection settings handed to `CatalogStore`
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub pool_size: usize,
    /// How long `acquire()` waits for a free connection
    pub acquire_timeout: Duration,
    /// SQLite busy handler timeout applied to every connection
    pub busy_timeout: Duration,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>, pool_size: usize) -> Self {
        Self {
            path: path.into(),
            pool_size,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub capacity: usize,
    pub idle: usize,
    pub in_use: usize,
}

struct PoolState {
    idle: Vec<Connection>,
    /// Live connections, idle plus checked out
    open: usize,
    closed: bool,
}

pub struct ConnectionPool {
    config: StoreConfig,
    state: Mutex<PoolState>,
    available: Condvar,
    /// Liveness check run on every checkout
    is_alive: fn(&Connection) -> bool,
}

impl ConnectionPool {
    /// Open `pool_size` configured connections up front
    pub fn initialize(config: StoreConfig) -> Result<Self> {
        if config.pool_size == 0 {
            return Err(CatalogError::validation("pool size must be at least 1"));
        }

        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut idle = Vec::with_capacity(config.pool_size);
        for _ in 0..config.pool_size {
            idle.push(open_connection(&config)?);
        }

        tracing::debug!(
            "Opened {} connections to {}",
            config.pool_size,
            config.path.display()
        );

        Ok(Self {
            state: Mutex::new(PoolState {
                open: idle.len(),
                idle,
                closed: false,
            }),
            available: Condvar::new(),
            config,
            is_alive,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Check out a connection, waiting up to the configured timeout
    pub fn acquire(&self) -> Result<PooledConnection<'_>> {
        let deadline = Instant::now() + self.config.acquire_timeout;
        let mut state = self.state.lock();

        loop {
            if state.closed {
                return Err(CatalogError::Connection("connection pool is shut down".into()));
            }

            if let Some(conn) = state.idle.pop() {
                drop(state);
                return self.checkout(conn);
            }

            if state.open < self.config.pool_size {
                // Reserve the slot before opening outside the lock
                state.open += 1;
                drop(state);
                return match open_connection(&self.config) {
                    Ok(conn) => Ok(PooledConnection::new(self, conn)),
                    Err(e) => {
                        self.forget_slot();
                        Err(e)
                    }
                };
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(CatalogError::Connection(format!(
                    "timed out after {:?} waiting for a pooled connection",
                    self.config.acquire_timeout
                )));
            }
            self.available.wait_for(&mut state, (deadline - now).min(POLL_INTERVAL));
        }
    }

    /// Check a pooled connection, replacing it if it no longer answers
    fn checkout(&self, conn: Connection) -> Result<PooledConnection<'_>> {
        if (self.is_alive)(&conn) {
            return Ok(PooledConnection::new(self, conn));
        }

        tracing::warn!("Discarding dead pooled connection, opening a replacement");
        drop(conn);
        match open_connection(&self.config) {
            Ok(fresh) => Ok(PooledConnection::new(self, fresh)),
            Err(e) => {
                self.forget_slot();
                Err(e)
            }
        }
    }

    fn release(&self, conn: Connection) {
        let conn = match reset(conn) {
            Some(conn) => conn,
            None => {
                self.forget_slot();
                return;
            }
        };

        let mut state = self.state.lock();
        if state.closed || state.idle.len() >= self.config.pool_size {
            state.open -= 1;
            drop(state);
            drop(conn);
        } else {
            state.idle.push(conn);
            drop(state);
        }
        self.available.notify_one();
    }

    /// Give up a reserved slot whose connection was discarded
    fn forget_slot(&self) {
        let mut state = self.state.lock();
        state.open = state.open.saturating_sub(1);
        drop(state);
        self.available.notify_one();
    }

    pub fn status(&self) -> PoolStatus {
        let state = self.state.lock();
        PoolStatus {
            capacity: self.config.pool_size,
            idle: state.idle.len(),
            in_use: state.open - state.idle.len(),
        }
    }

    /// Close idle connections now; checked-out ones close when released
    pub fn shutdown(&self) {
        let drained: Vec<Connection> = {
            let mut state = self.state.lock();
            state.closed = true;
            let drained: Vec<Connection> = state.idle.drain(..).collect();
            state.open -= drained.len();
            drained
        };
        let count = drained.len();
        drop(drained);
        self.available.notify_all();
        tracing::debug!("Connection pool shut down, closed {} idle connections", count);
    }
}

fn open_connection(config: &StoreConfig) -> Result<Connection> {
    let conn = Connection::open(&config.path).map_err(|e| {
        CatalogError::Connection(format!("failed to open {}: {}", config.path.display(), e))
    })?;
    configure(&conn, config.busy_timeout).map_err(|e| {
        CatalogError::Connection(format!(
            "failed to configure connection to {}: {}",
            config.path.display(),
            e
        ))
    })?;
    Ok(conn)
}

fn configure(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    Ok(())
}

fn is_alive(conn: &Connection) -> bool {
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        .map(|v| v == 1)
        .unwrap_or(false)
}

/// Roll back anything a caller left open; `None` if the connection is unusable
fn reset(conn: Connection) -> Option<Connection> {
    if conn.is_autocommit() {
        return Some(conn);
    }
    match conn.execute_batch("ROLLBACK") {
        Ok(()) if conn.is_autocommit() => Some(conn),
        _ => {
            tracing::warn!("Closing pooled connection stuck in an open transaction");
            None
        }
    }
}

/// Connection checked out of a pool, returned on drop
pub struct PooledConnection<'a> {
    pool: &'a ConnectionPool,
    conn: Option<Connection>,
}

impl<'a> PooledConnection<'a> {
    fn new(pool: &'a ConnectionPool, conn: Connection) -> Self {
        Self {
            pool,
            conn: Some(conn),
        }
    }
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn pool_config(dir: &TempDir, size: usize, timeout_ms: u64) -> StoreConfig {
        let mut config = StoreConfig::new(dir.path().join("pool.db"), size);
        config.acquire_timeout = Duration::from_millis(timeout_ms);
        config
    }

    #[test]
    fn test_connections_are_configured() {
        let dir = TempDir::new().unwrap();
        let pool = ConnectionPool::initialize(pool_config(&dir, 1, 500)).unwrap();
        let conn = pool.acquire().unwrap();

        let fk: i64 = conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0)).unwrap();
        let journal: String = conn.query_row("PRAGMA journal_mode", [], |r| r.get(0)).unwrap();
        let temp: i64 = conn.query_row("PRAGMA temp_store", [], |r| r.get(0)).unwrap();
        assert_eq!(fk, 1);
        assert_eq!(journal.to_lowercase(), "wal");
        assert_eq!(temp, 2);
    }

    #[test]
    fn test_prefills_to_pool_size() {
        let dir = TempDir::new().unwrap();
        let pool = ConnectionPool::initialize(pool_config(&dir, 3, 500)).unwrap();
        assert_eq!(
            pool.status(),
            PoolStatus {
                capacity: 3,
                idle: 3,
                in_use: 0
            }
        );

        let _a = pool.acquire().unwrap();
        let _b = pool.acquire().unwrap();
        assert_eq!(pool.status().in_use, 2);
        assert_eq!(pool.status().idle, 1);
    }

    #[test]
    fn test_acquire_times_out_when_exhausted() {
        let dir = TempDir::new().unwrap();
        let pool = ConnectionPool::initialize(pool_config(&dir, 1, 150)).unwrap();
        let _held = pool.acquire().unwrap();

        let started = Instant::now();
        let err = pool.acquire().err().expect("pool should be exhausted");
        assert!(matches!(err, CatalogError::Connection(_)));
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[test]
    fn test_waiter_receives_released_connection() {
        let dir = TempDir::new().unwrap();
        let pool = Arc::new(ConnectionPool::initialize(pool_config(&dir, 1, 2_000)).unwrap());

        let held = pool.acquire().unwrap();
        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.acquire().map(|_| ()).is_ok())
        };
        thread::sleep(Duration::from_millis(100));
        drop(held);

        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_never_exceeds_pool_size_under_load() {
        let dir = TempDir::new().unwrap();
        let pool = Arc::new(ConnectionPool::initialize(pool_config(&dir, 2, 5_000)).unwrap());
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let current = Arc::clone(&current);
                let peak = Arc::clone(&peak);
                thread::spawn(move || {
                    for _ in 0..5 {
                        let conn = pool.acquire().unwrap();
                        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        let _: i64 = conn.query_row("SELECT 1", [], |r| r.get(0)).unwrap();
                        thread::sleep(Duration::from_millis(5));
                        current.fetch_sub(1, Ordering::SeqCst);
                        drop(conn);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(pool.status().in_use == 0);
        assert!(pool.status().idle <= 2);
    }

    #[test]
    fn test_open_transaction_is_rolled_back_on_release() {
        let dir = TempDir::new().unwrap();
        let pool = ConnectionPool::initialize(pool_config(&dir, 1, 500)).unwrap();
        {
            let conn = pool.acquire().unwrap();
            conn.execute_batch("CREATE TABLE t (v INTEGER); BEGIN; INSERT INTO t VALUES (1);")
                .unwrap();
        }
        let conn = pool.acquire().unwrap();
        assert!(conn.is_autocommit());
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_acquire_after_shutdown_fails() {
        let dir = TempDir::new().unwrap();
        let pool = ConnectionPool::initialize(pool_config(&dir, 2, 500)).unwrap();
        let held = pool.acquire().unwrap();
        pool.shutdown();

        assert!(matches!(pool.acquire(), Err(CatalogError::Connection(_))));
        drop(held);
        assert_eq!(pool.status().in_use, 0);
        assert_eq!(pool.status().idle, 0);
    }

    #[test]
    fn test_dead_connection_is_replaced_silently() {
        let dir = TempDir::new().unwrap();
        let mut pool = ConnectionPool::initialize(pool_config(&dir, 2, 500)).unwrap();
        pool.is_alive = |_| false;

        let conn = pool.acquire().unwrap();
        let one: i64 = conn.query_row("SELECT 1", [], |r| r.get(0)).unwrap();
        assert_eq!(one, 1);
        assert_eq!(
            pool.status(),
            PoolStatus {
                capacity: 2,
                idle: 1,
                in_use: 1
            }
        );
    }

    #[test]
    fn test_failed_replacement_frees_the_slot() {
        let dir = TempDir::new().unwrap();
        let mut pool = ConnectionPool::initialize(pool_config(&dir, 1, 500)).unwrap();
        pool.is_alive = |_| false;
        pool.config.path = dir.path().join("missing").join("pool.db");

        assert!(matches!(pool.acquire(), Err(CatalogError::Connection(_))));
        assert_eq!(pool.status().in_use, 0);
        assert_eq!(pool.status().idle, 0);

        // The freed slot is reopened once the file is reachable again
        pool.config.path = dir.path().join("pool.db");
        assert!(pool.acquire().is_ok());
    }

    #[test]
    fn test_zero_pool_size_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = ConnectionPool::initialize(pool_config(&dir, 0, 500));
        assert!(matches!(result, Err(CatalogError::Validation(_))));
    }
}
