//! [`VideoStore`]: the metadata store handle.
//!
//! Every mutation goes through [`VideoStore::update`], which runs the
//! caller's mutator inside a `BEGIN IMMEDIATE` transaction. SQLite takes the
//! write lock before the row is read, so two processes updating the same
//! record are serialized and no reader ever sees a half-applied change.

use rusqlite::TransactionBehavior;
use vf_core::{Error, Result, UserId, VideoId, VideoRecord};

use crate::models::Session;
use crate::pool::{get_conn, DbPool};
use crate::queries::{sessions, videos};

/// Cheaply cloneable handle over the metadata database.
#[derive(Clone)]
pub struct VideoStore {
    pool: DbPool,
}

impl std::fmt::Debug for VideoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoStore")
            .field("max_connections", &self.pool.max_size())
            .finish()
    }
}

impl VideoStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Fetch one record.
    pub fn get(&self, id: &VideoId) -> Result<VideoRecord> {
        let conn = get_conn(&self.pool)?;
        videos::get_video(&conn, id)?.ok_or_else(|| Error::not_found("video", id))
    }

    /// Store a new record.
    pub fn insert(&self, record: &VideoRecord) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        videos::insert_video(&conn, record)
    }

    pub fn list_for_user(&self, user_id: UserId) -> Result<Vec<VideoRecord>> {
        let conn = get_conn(&self.pool)?;
        videos::list_videos_for_user(&conn, user_id)
    }

    pub fn all_ids(&self) -> Result<Vec<VideoId>> {
        let conn = get_conn(&self.pool)?;
        videos::list_video_ids(&conn)
    }

    /// Atomic read-modify-write of one record.
    ///
    /// The mutator sees the current committed state. If it returns `Err`, the
    /// transaction is rolled back and nothing is written.
    pub fn update<T>(
        &self,
        id: &VideoId,
        mutate: impl FnOnce(&mut VideoRecord) -> Result<T>,
    ) -> Result<T> {
        let mut conn = get_conn(&self.pool)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| Error::database(e.to_string()))?;

        let mut record = videos::get_video(&tx, id)?.ok_or_else(|| Error::not_found("video", id))?;
        let out = mutate(&mut record)?;
        videos::save_video_state(&tx, &record)?;

        tx.commit().map_err(|e| Error::database(e.to_string()))?;
        Ok(out)
    }

    /// Resolve a session token to its user.
    pub fn user_for_token(&self, token: &str) -> Result<Option<UserId>> {
        let conn = get_conn(&self.pool)?;
        Ok(sessions::get_session(&conn, token)?.map(|s| s.user_id))
    }

    pub fn create_session(&self, user_id: UserId) -> Result<Session> {
        let conn = get_conn(&self.pool)?;
        sessions::create_session(&conn, user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use std::sync::Arc;
    use vf_core::{ResizeKey, ResizeState};

    fn store_with_video() -> (VideoStore, VideoId) {
        let store = VideoStore::new(init_memory_pool().unwrap());
        let record = VideoRecord::new(VideoId::new(), UserId::new(), "clip", "mp4", None);
        store.insert(&record).unwrap();
        (store, record.video_id)
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = VideoStore::new(init_memory_pool().unwrap());
        let err = store.get(&VideoId::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn update_applies_mutation() {
        let (store, id) = store_with_video();
        let key = ResizeKey::new(640, 480).unwrap();

        let returned = store
            .update(&id, |v| {
                v.resizes.insert(key, ResizeState::PROCESSING);
                Ok(v.resizes.len())
            })
            .unwrap();

        assert_eq!(returned, 1);
        assert_eq!(store.get(&id).unwrap().resize_state(&key), Some(ResizeState::PROCESSING));
    }

    #[test]
    fn failed_mutator_rolls_back() {
        let (store, id) = store_with_video();

        let result: Result<()> = store.update(&id, |v| {
            v.extracted_audio = true;
            Err(Error::Validation("nope".into()))
        });

        assert!(result.is_err());
        assert!(!store.get(&id).unwrap().extracted_audio);
    }

    #[test]
    fn update_missing_is_not_found() {
        let store = VideoStore::new(init_memory_pool().unwrap());
        let err = store.update(&VideoId::new(), |_| Ok(())).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn concurrent_updates_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let pool = crate::pool::init_pool(&dir.path().join("v.db")).unwrap();
        let store = VideoStore::new(pool);
        let record = VideoRecord::new(VideoId::new(), UserId::new(), "clip", "mp4", None);
        store.insert(&record).unwrap();
        let id = Arc::new(record.video_id);

        let handles: Vec<_> = (0..8u32)
            .map(|i| {
                let store = store.clone();
                let id = Arc::clone(&id);
                std::thread::spawn(move || {
                    store
                        .update(&id, |v| {
                            let key = ResizeKey::new(320 + i * 2, 240).unwrap();
                            v.resizes.insert(key, ResizeState::DONE);
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // No lost updates: every writer's key survived.
        assert_eq!(store.get(&id).unwrap().resizes.len(), 8);
    }

    #[test]
    fn sessions_resolve_to_users() {
        let store = VideoStore::new(init_memory_pool().unwrap());
        let user = UserId::new();
        let session = store.create_session(user).unwrap();

        assert_eq!(store.user_for_token(&session.token).unwrap(), Some(user));
        assert_eq!(store.user_for_token("missing").unwrap(), None);
    }
}
