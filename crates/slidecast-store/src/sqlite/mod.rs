//! `SQLite` backend.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `connection` | r2d2 pool with per-connection pragmas |
//! | `migrations` | embedded, versioned schema |
//! | `repository` | stateless SQL over a borrowed `Connection` |
//! | `store` | async [`SessionStore`](crate::SessionStore) adapter over the pool |

pub mod connection;
pub mod migrations;
pub mod repository;
pub mod store;
