//! Storage for points, trophies, tags, role grants and leaderboard routing.
//!
//! [`Store`] keeps everything in memory behind a mutex and hands every change
//! to a [`Persistence`] backend while still holding the lock, so snapshots
//! reach disk in the order the changes happened.

mod data;
mod json_file;
mod store;

pub use data::StoreData;
pub use json_file::JsonFile;
pub use store::{JsonFileStore, MemoryStore, Store, Volatile};

/// Errors from loading or saving store data.
#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "storage I/O error: {}", e),
            StoreError::Json(e) => write!(f, "storage format error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            StoreError::Json(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Json(e)
    }
}

/// Where a [`Store`] writes its snapshot after each change.
pub trait Persistence: Send + Sync {
    fn save(&self, data: &StoreData) -> Result<(), StoreError>;
}
