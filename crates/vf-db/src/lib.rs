//! vf-db: metadata store.
//!
//! SQLite-backed storage for video records and sessions with connection
//! pooling and embedded migrations. [`VideoStore`] is the handle the rest of
//! the workspace uses; its [`update`](VideoStore::update) is the only way a
//! video record is mutated after upload.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
pub mod store;

pub use pool::DbPool;
pub use store::VideoStore;
