//! Storage layer for Communities
//!
//! Provides the in-memory and SQL-backed Directory implementations.

pub mod memory_store;
pub mod migrations;
pub mod sql_store;

pub use memory_store::MemoryDirectory;
pub use migrations::{migrate, CURRENT_COMMUNITY_SCHEMA_VERSION};
pub use sql_store::SqliteDirectory;
