//! Access to the reader's own SQLite database (`.kobo/KoboReader.sqlite`).
//!
//! The database belongs to the reader's firmware: it decides which books
//! exist (rows appear once it has indexed a file) and tracks reading state.
//! shelfsync only looks rows up by their content identifier and corrects
//! their metadata and read status; it never creates or deletes rows, and it
//! never migrates the schema.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::models::{CatalogRecord, ReadStatus, RecordMetadata};
pub use crate::repo::{CONTENT_TYPE_BOOK, Repository};
