//! Storage abstraction and implementations for NeuroCoach.
//!
//! This crate provides a trait-based storage interface with an in-memory
//! backend, a JSON file backend and, behind the `sqlite` feature, a SQLite
//! backend.

#![warn(missing_docs)]

pub mod trait_;
pub mod memory;
pub mod json_storage;
#[cfg(feature = "sqlite")]
pub mod sqlite_storage;

pub use trait_::{Storage, StorageError, Result};
pub use memory::MemoryStorage;
pub use json_storage::JsonStorage;
#[cfg(feature = "sqlite")]
pub use sqlite_storage::SqliteStorage;
