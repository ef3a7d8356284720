//! # slidecast-store
//!
//! Durable session metadata behind the [`SessionStore`] trait.
//!
//! | Backend | Type | Use |
//! |---------|------|-----|
//! | `SQLite` | [`SqliteSessionStore`] | production; r2d2 pool, WAL, embedded migrations |
//! | memory | [`MemorySessionStore`] | tests and throwaway demo servers |

#![deny(unsafe_code)]

pub mod errors;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use errors::{Result, StoreError};
pub use memory::MemorySessionStore;
pub use sqlite::connection::{ConnectionConfig, ConnectionPool, new_file, new_in_memory};
pub use sqlite::migrations::run_migrations;
pub use sqlite::store::SqliteSessionStore;
pub use store::SessionStore;
