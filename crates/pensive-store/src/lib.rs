//! pensive-store - SQLite storage engine
//!
//! This crate provides durable, batched persistence for documents and
//! their embedding vectors using SQLite.

mod schema;
mod sqlite;

pub use sqlite::SqliteEngine;

// Re-export schema for testing/migrations
pub use schema::SCHEMA;
