//! TabSnooze database layer.
//!
//! Provides SQLite connection management, schema migrations, and the
//! SQLite-backed key-value store the scheduler persists its state into.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use tabsnooze::database::{Database, SqliteKvStore};
//!
//! // Open a persistent database
//! let db = Arc::new(Database::open("tabsnooze.db").expect("failed to open database"));
//!
//! // Or use an in-memory database for testing
//! let db = Arc::new(Database::open_in_memory().expect("failed to open in-memory database"));
//!
//! // Expose it to the scheduler as a key-value store
//! let store = SqliteKvStore::new(db);
//! ```

pub mod connection;
pub mod kv_store;
pub mod migrations;

pub use connection::Database;
pub use kv_store::SqliteKvStore;
