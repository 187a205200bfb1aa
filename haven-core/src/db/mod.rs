//! Database layer for haven
//!
//! This module provides the on-disk storage layer using SQLite with:
//! - Schema migrations
//! - A key/value repository backing [`crate::store::PersistentStore`]

pub mod repo;
pub mod schema;

pub use repo::Database;
