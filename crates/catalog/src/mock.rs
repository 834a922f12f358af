//! In-memory catalog for testing.

use crate::client::{CatalogClient, ContentStream, DetailOptions};
use crate::error::{ErrorKind, Result};
use crate::models::{Library, RemoteItem};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory catalog for testing.
///
/// State lives behind [`RwLock`]s so tests can change the catalog between two
/// sync runs through a shared handle. Listings behave like the real server:
/// progress is only reported by [`fetch_item_detail`](CatalogClient::fetch_item_detail)
/// with [`DetailOptions::include_progress`] set.
///
/// # Examples
///
/// ```
/// use shelfsync_catalog::{CatalogClient, ContentFile, Library, MediaType, MockCatalog, RemoteItem};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let catalog = MockCatalog::default()
///     .with_library(Library::new("lib_1", "Ebooks", MediaType::Book))
///     .with_item("lib_1", RemoteItem::new("li_1", "Author/Title").with_content(ContentFile::new("7", "Title.epub")));
/// assert_eq!(catalog.list_items("lib_1").await?.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MockCatalog {
    libraries: RwLock<Vec<Library>>,
    items: RwLock<HashMap<String, Vec<RemoteItem>>>,
    content: RwLock<HashMap<String, Vec<u8>>>,
    failing: RwLock<HashSet<String>>,
    truncated: RwLock<HashSet<String>>,
    content_requests: AtomicUsize,
}

impl MockCatalog {
    pub fn with_library(mut self, library: Library) -> Self {
        self.libraries.get_mut().push(library);
        self
    }

    /// Add an item to a library. If the item has a content file, its bytes
    /// are `"content of <item id>"`.
    pub fn with_item(mut self, library_id: &str, item: RemoteItem) -> Self {
        if item.content.is_some() {
            let bytes = format!("content of {}", item.id).into_bytes();
            self.content.get_mut().insert(item.id.clone(), bytes);
        }
        self.items.get_mut().entry(library_id.to_string()).or_default().push(item);
        self
    }

    /// Replace (or append) an item, keyed by its ID.
    pub async fn upsert_item(&self, library_id: &str, item: RemoteItem) {
        if item.content.is_some() {
            let bytes = format!("content of {}", item.id).into_bytes();
            self.content.write().await.entry(item.id.clone()).or_insert(bytes);
        }
        let mut items = self.items.write().await;
        let items = items.entry(library_id.to_string()).or_default();
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }

    pub async fn remove_item(&self, library_id: &str, item_id: &str) {
        if let Some(items) = self.items.write().await.get_mut(library_id) {
            items.retain(|item| item.id != item_id);
        }
    }

    /// Make every content download of this item fail with a network error.
    pub async fn fail_content(&self, item_id: &str) {
        self.failing.write().await.insert(item_id.to_string());
    }

    /// Make every content download of this item break off with a network
    /// error after its first chunk.
    pub async fn fail_content_midway(&self, item_id: &str) {
        self.truncated.write().await.insert(item_id.to_string());
    }

    /// Number of content downloads requested so far (failed ones included).
    pub fn content_requests(&self) -> usize {
        self.content_requests.load(Ordering::SeqCst)
    }

    async fn find(&self, item_id: &str) -> Option<RemoteItem> {
        self.items.read().await.values().flatten().find(|item| item.id == item_id).cloned()
    }
}

#[async_trait]
impl CatalogClient for MockCatalog {
    async fn list_libraries(&self) -> Result<Vec<Library>> {
        Ok(self.libraries.read().await.clone())
    }

    async fn list_items(&self, library_id: &str) -> Result<Vec<RemoteItem>> {
        if !self.libraries.read().await.iter().any(|library| library.id == library_id) {
            exn::bail!(ErrorKind::NotFound(library_id.to_string()));
        }
        let items = self.items.read().await.get(library_id).cloned().unwrap_or_default();
        Ok(items.into_iter().map(|item| item.with_finished(false)).collect())
    }

    async fn fetch_item_detail(&self, item_id: &str, options: DetailOptions) -> Result<RemoteItem> {
        let Some(item) = self.find(item_id).await else {
            exn::bail!(ErrorKind::NotFound(item_id.to_string()));
        };
        Ok(match options.include_progress {
            true => item,
            false => item.with_finished(false),
        })
    }

    async fn fetch_content(&self, item_id: &str, ino: &str) -> Result<ContentStream> {
        self.content_requests.fetch_add(1, Ordering::SeqCst);
        if self.failing.read().await.contains(item_id) {
            exn::bail!(ErrorKind::Network(format!("injected failure for {item_id}")));
        }
        let item = self.find(item_id).await;
        if item.and_then(|item| item.content).is_none_or(|content| content.ino != ino) {
            exn::bail!(ErrorKind::NotFound(format!("{item_id}/{ino}")));
        }
        let Some(bytes) = self.content.read().await.get(item_id).cloned() else {
            exn::bail!(ErrorKind::NotFound(format!("{item_id}/{ino}")));
        };
        // Deliver in two chunks so consumers exercise their streaming path.
        let middle = bytes.len() / 2;
        let mut chunks: Vec<Result<Bytes>> = vec![Ok(Bytes::copy_from_slice(&bytes[..middle]))];
        match self.truncated.read().await.contains(item_id) {
            true => chunks.push(Err(ErrorKind::Network(format!("connection reset while downloading {item_id}")).into())),
            false => chunks.push(Ok(Bytes::copy_from_slice(&bytes[middle..]))),
        }
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}
