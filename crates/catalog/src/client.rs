//! Remote catalog client trait.

use crate::error::Result;
use crate::models::{Library, RemoteItem};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// Streamed bytes of a content file.
pub type ContentStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send + 'static>>;

/// What to include when fetching an item's detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailOptions {
    /// Include the authenticated user's progress (finished flag).
    pub include_progress: bool,
    /// Include full author objects.
    pub include_authors: bool,
    /// Return the expanded (non-minified) item.
    pub expanded: bool,
}
impl DetailOptions {
    /// Enough detail to download the content file.
    pub fn content() -> Self {
        Self {
            include_progress: false,
            include_authors: false,
            expanded: true,
        }
    }

    /// Everything needed to mirror metadata and reading progress.
    pub fn full() -> Self {
        Self {
            include_progress: true,
            include_authors: true,
            expanded: true,
        }
    }
}

/// Read access to a remote media-library catalog.
///
/// Authentication is the implementation's concern: a client handed to the
/// sync engine is expected to already be able to talk to the server.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// All libraries visible to the authenticated user.
    async fn list_libraries(&self) -> Result<Vec<Library>>;

    /// Every item in a library, in catalog order.
    async fn list_items(&self, library_id: &str) -> Result<Vec<RemoteItem>>;

    /// A single item in its richer form (progress, series, content file).
    async fn fetch_item_detail(&self, item_id: &str, options: DetailOptions) -> Result<RemoteItem>;

    /// Open a stream over a content file's bytes.
    ///
    /// Retries (if any) cover opening the stream; an error yielded by the
    /// stream mid-transfer is final.
    async fn fetch_content(&self, item_id: &str, ino: &str) -> Result<ContentStream>;
}
