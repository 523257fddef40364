//! Query modules, one per table.

pub mod sessions;
pub mod videos;
