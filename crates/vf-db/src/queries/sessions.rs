//! Session token lookup.

use chrono::Utc;
use rand::RngCore;
use rusqlite::Connection;
use vf_core::{Error, Result, UserId};

use crate::models::Session;

/// Issue a new random session token for a user.
pub fn create_session(conn: &Connection, user_id: UserId) -> Result<Session> {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![&token, user_id.to_string(), &now],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Session {
        token,
        user_id,
        created_at: now,
    })
}

/// Look up a session by token.
pub fn get_session(conn: &Connection, token: &str) -> Result<Option<Session>> {
    let result = conn.query_row(
        "SELECT token, user_id, created_at FROM sessions WHERE token = ?1",
        [token],
        Session::from_row,
    );
    match result {
        Ok(s) => Ok(Some(s)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{get_conn, init_memory_pool};

    #[test]
    fn create_and_lookup() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let user = UserId::new();

        let session = create_session(&conn, user).unwrap();
        assert_eq!(session.token.len(), 64);

        let found = get_session(&conn, &session.token).unwrap().unwrap();
        assert_eq!(found.user_id, user);
        assert!(get_session(&conn, "nope").unwrap().is_none());
    }
}
