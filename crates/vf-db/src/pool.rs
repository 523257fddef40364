//! r2d2 pool over the shared SQLite file.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use vf_core::{Error, Result};

use crate::migrations;

pub type DbPool = Pool<SqliteConnectionManager>;

pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Connections per process. Every frontend and the coordinator open their
/// own pool on the same file.
const MAX_CONNECTIONS: u32 = 4;

/// How long a writer waits on another process's lock before failing.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Open (creating if needed) the database at `path` and migrate it.
///
/// Connections use WAL so readers never block the writer, and a busy timeout
/// so `BEGIN IMMEDIATE` from several processes queues instead of failing.
pub fn init_pool(path: &Path) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL; PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"
        ))
    });
    let pool = Pool::builder()
        .max_size(MAX_CONNECTIONS)
        .build(manager)
        .map_err(|e| Error::database(format!("open {}: {e}", path.display())))?;
    migrate(pool)
}

/// A private in-memory database for tests.
///
/// The single connection is never recycled, since the database disappears
/// with its last connection.
pub fn init_memory_pool() -> Result<DbPool> {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let name = format!("file:vf_mem_{}?mode=memory&cache=shared", NEXT.fetch_add(1, Ordering::Relaxed));

    let pool = Pool::builder()
        .max_size(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connection_timeout(Duration::from_secs(30))
        .build(SqliteConnectionManager::file(name))
        .map_err(|e| Error::database(format!("open in-memory database: {e}")))?;
    migrate(pool)
}

fn migrate(pool: DbPool) -> Result<DbPool> {
    let conn = get_conn(&pool)?;
    migrations::run_migrations(&conn)?;
    drop(conn);
    Ok(pool)
}

pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("no database connection available: {e}")))
}
