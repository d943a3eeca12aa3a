//! The database wraps an r2d2 pool of rusqlite connections to the demo schema.
use std::borrow::Borrow;
use std::sync::Arc;
use std::time::Duration;

use itertools::Itertools;
use log::*;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::DatabaseConfig;
use crate::errors::{DbError, Result};
use crate::rows::{self, ClaimableRow, SourceRow};

/// A connection checked out of the pool.  Dropping it returns it.
pub type Connection = r2d2::PooledConnection<SqliteConnectionManager>;

/// The two demo tables.
///
/// This is not a migration system: the schema is fixed, and we only make sure it exists.
pub(crate) const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS source (
    id INTEGER PRIMARY KEY,
    text_val TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS locking (
    id INTEGER PRIMARY KEY,
    locked_val BOOLEAN NOT NULL DEFAULT 0,
    owner TEXT
);
"#;

/// SQL that we run once, when the database is opened and before the pool exists.
///
/// WAL lets readers (the streaming demos) carry on while a claim holds the write lock.  The journal mode persists in
/// the file, so pooled connections don't need to set it again.
const OPEN_SQL: &str = r#"
PRAGMA journal_mode = WAL;
"#;

/// SQL that every pooled connection runs when it is created.
///
/// - Enables foreign key enforcement (though the demo schema has none).
/// - NORMAL sync is durable enough under WAL and keeps the seeding fast.
/// - Raises the default cache size, which is sized for phones.
const CONNECTION_SQL: &str = r#"
PRAGMA foreign_keys = 1;
PRAGMA synchronous = NORMAL;
PRAGMA cache_size = -100000;
"#;

/// A snapshot of the pool's bookkeeping.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PoolState {
    /// Connections currently open, idle or not.
    pub connections: u32,
    /// Connections sitting in the pool, ready to be acquired.
    pub idle_connections: u32,
}

/// The connection provider for the demos.
///
/// Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct Database {
    pool: r2d2::Pool<SqliteConnectionManager>,
    config: Arc<DatabaseConfig>,
}

/// Open a plain connection, set the database up, and log what we found.
fn bootstrap(config: &DatabaseConfig) -> Result<()> {
    let conn = rusqlite::Connection::open(config.get_path())?;
    conn.busy_timeout(config.get_lock_wait_timeout())?;
    conn.execute_batch(OPEN_SQL)?;
    conn.execute_batch(SCHEMA_SQL)?;

    let mut statement =
        conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
    let tables = statement
        .query_map([], |r| r.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    info!(
        "{} has the following tables: {}",
        config.get_path().display(),
        tables.iter().join(", ")
    );
    Ok(())
}

impl Database {
    pub fn open(config: DatabaseConfig) -> Result<Database> {
        info!("Opening database at {}", config.get_path().display());
        bootstrap(&config)?;

        let lock_wait = config.get_lock_wait_timeout();
        let manager = SqliteConnectionManager::file(config.get_path()).with_init(move |conn| {
            conn.busy_timeout(lock_wait)?;
            conn.execute_batch(CONNECTION_SQL)
        });

        // r2d2 panics on a zero sized pool or a zero timeout, so clamp rather than trust the caller.
        let pool = r2d2::Pool::builder()
            .max_size(config.get_max_connections().max(1))
            .connection_timeout(config.get_acquire_timeout().max(Duration::from_millis(1)))
            .build(manager)
            .map_err(DbError::PoolSetup)?;
        debug!(
            "Pool ready with up to {} connections",
            config.get_max_connections()
        );

        Ok(Database {
            pool,
            config: Arc::new(config),
        })
    }

    /// Check a connection out of the pool.
    ///
    /// Waits at most the configured acquire timeout, then fails with [DbError::PoolExhausted].  The connection goes
    /// back to the pool when dropped.
    pub fn acquire(&self) -> Result<Connection> {
        self.pool.get().map_err(|source| DbError::PoolExhausted {
            waited: self.config.get_acquire_timeout(),
            source,
        })
    }

    pub fn pool_state(&self) -> PoolState {
        let state = self.pool.state();
        PoolState {
            connections: state.connections,
            idle_connections: state.idle_connections,
        }
    }

    /// Replace the `locking` table with `count` unclaimed rows.
    pub fn reset_locking_rows(&self, count: i64) -> Result<()> {
        rows::reset_locking_rows(&*self.acquire()?, count)
    }

    pub fn load_claimable_rows(&self) -> Result<Vec<ClaimableRow>> {
        rows::load_claimable_rows(&*self.acquire()?)
    }

    pub fn insert_source_rows<I, R>(&self, rows: I) -> Result<usize>
    where
        I: IntoIterator<Item = R>,
        R: Borrow<SourceRow>,
    {
        rows::insert_source_rows(&*self.acquire()?, rows)
    }

    pub fn clear_source_rows(&self) -> Result<()> {
        rows::clear_source_rows(&*self.acquire()?)
    }

    pub fn count_source_rows(&self) -> Result<i64> {
        rows::count_source_rows(&*self.acquire()?)
    }
}
