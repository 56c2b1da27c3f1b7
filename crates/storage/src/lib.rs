#![forbid(unsafe_code)]

pub mod progress;
pub mod repository;
pub mod sqlite;

pub use progress::{DEFAULT_PROGRESS_KEY, ProgressError, ProgressSnapshot, ProgressStore};
pub use repository::{InMemoryStore, KeyValueStore, Storage, StorageError};
