//! Schema migrations, tracked through SQLite's `user_version` pragma.
//!
//! Every process runs them on startup; the version check and the migration
//! share one `BEGIN IMMEDIATE` transaction, so concurrent starts apply each
//! step once.

use rusqlite::{Connection, TransactionBehavior};
use vf_core::{Error, Result};

/// Version 1: videos and sessions.
const V1_INITIAL: &str = r#"
CREATE TABLE videos (
    video_id         TEXT PRIMARY KEY,
    user_id          TEXT NOT NULL,
    name             TEXT NOT NULL,
    extension        TEXT NOT NULL,
    width            INTEGER,
    height           INTEGER,
    extracted_audio  INTEGER NOT NULL DEFAULT 0,
    audio_processing INTEGER NOT NULL DEFAULT 0,
    resizes          TEXT NOT NULL DEFAULT '{}',
    created_at       TEXT NOT NULL
);

CREATE INDEX idx_videos_user ON videos(user_id, created_at);

CREATE TABLE sessions (
    token      TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

/// Applied in order; `user_version` ends at the last index + 1.
const MIGRATIONS: &[&str] = &[V1_INITIAL];

fn db_err(context: &str) -> impl Fn(rusqlite::Error) -> Error + '_ {
    move |e| Error::database(format!("{context}: {e}"))
}

/// Bring the schema up to date.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    for (index, sql) in MIGRATIONS.iter().enumerate() {
        let version = index as i64 + 1;

        let tx = rusqlite::Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
            .map_err(db_err("begin migration"))?;
        let current: i64 = tx
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(db_err("read schema version"))?;
        if current >= version {
            continue;
        }

        tx.execute_batch(sql)
            .map_err(|e| Error::database(format!("migration {version} failed: {e}")))?;
        tx.pragma_update(None, "user_version", version)
            .map_err(db_err("record schema version"))?;
        tx.commit().map_err(db_err("commit migration"))?;

        tracing::info!(version, "Applied database migration");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0)).unwrap();
        assert_eq!(version, MIGRATIONS.len() as i64);
    }
}
