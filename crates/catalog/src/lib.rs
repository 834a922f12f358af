//! Remote catalog access for shelfsync.
//!
//! The sync engine only ever talks to the catalog through the
//! [`CatalogClient`] trait; [`HttpCatalog`] is the Audiobookshelf
//! implementation and `MockCatalog` (behind the `mock` feature) an in-memory
//! one for tests.

mod client;
pub mod error;
mod http;
#[cfg(feature = "mock")]
mod mock;
mod models;
mod retry;

pub use crate::client::{CatalogClient, ContentStream, DetailOptions};
pub use crate::http::HttpCatalog;
#[cfg(feature = "mock")]
pub use crate::mock::MockCatalog;
pub use crate::models::{ContentFile, Library, MediaType, RemoteItem, SeriesMembership};
pub use crate::retry::RetryPolicy;
