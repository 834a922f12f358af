//! Filesystem side of a sync: removing and downloading items.

use crate::error::{DescribeExt, ErrorKind, Result};
use futures::StreamExt;
use shelfsync_catalog::{CatalogClient, ContentFile, DetailOptions, RemoteItem};
use shelfsync_device::{DeviceItem, LibraryDir};
use tracing::instrument;

/// Applies removals and downloads to a library's subtree on the device.
///
/// Items are handled one at a time and each completed call leaves the device
/// in a consistent state for that item.
pub struct Materializer<'a> {
    catalog: &'a dyn CatalogClient,
    library: &'a LibraryDir,
    dry_run: bool,
}

impl<'a> Materializer<'a> {
    pub fn new(catalog: &'a dyn CatalogClient, library: &'a LibraryDir, dry_run: bool) -> Self {
        Self { catalog, library, dry_run }
    }

    /// Recursively delete an item's directory.
    #[instrument(level = "debug", skip_all, fields(item = %item.id))]
    pub async fn remove(&self, item: &DeviceItem) -> Result<()> {
        if self.dry_run {
            tracing::info!(item = %item.id, path = %item.dir.display(), "would remove item");
            return Ok(());
        }
        self.library.remove(item).await.or_describe(ErrorKind::Filesystem)?;
        tracing::info!(item = %item.id, path = %item.dir.display(), "removed item");
        Ok(())
    }

    /// Create the item's directory, write its marker, then stream its content
    /// file into place. Returns the number of bytes written.
    ///
    /// The marker goes first: if the content transfer fails afterwards the
    /// directory is left with a marker and no content file, and later scans
    /// report the item as present.
    #[instrument(level = "debug", skip_all, fields(item = %item.id))]
    pub async fn download(&self, item: &RemoteItem) -> Result<u64> {
        let content = self.content_file(item).await?;
        // Validates the placement path before anything touches the disk.
        let dir = self.library.item_dir(&item.rel_path).or_describe(ErrorKind::Filesystem)?;
        if self.dry_run {
            tracing::info!(item = %item.id, path = %dir.join(&content.filename).display(), "would download item");
            return Ok(0);
        }

        let dir = self.library.write_marker(&item.rel_path, &item.id).await.or_describe(ErrorKind::Filesystem)?;
        let mut stream = self.catalog.fetch_content(&item.id, &content.ino).await.or_describe(ErrorKind::Fetch)?;
        let mut file = self.library.create_content(&dir, &content.filename).await.or_describe(ErrorKind::Filesystem)?;
        while let Some(chunk) = stream.next().await {
            let written = match chunk.or_describe(ErrorKind::Fetch) {
                Ok(chunk) => file.write(&chunk).await.or_describe(ErrorKind::Filesystem),
                Err(err) => Err(err),
            };
            if let Err(err) = written {
                file.discard().await;
                return Err(err);
            }
        }
        let size = file.commit().await.or_describe(ErrorKind::Filesystem)?;
        tracing::info!(item = %item.id, path = %dir.display(), bytes = size, "downloaded item");
        Ok(size)
    }

    /// Listings usually carry the content file; fall back to the item detail.
    async fn content_file(&self, item: &RemoteItem) -> Result<ContentFile> {
        if let Some(content) = &item.content {
            return Ok(content.clone());
        }
        let detail = self
            .catalog
            .fetch_item_detail(&item.id, DetailOptions::content())
            .await
            .or_describe(ErrorKind::Fetch)?;
        match detail.content {
            Some(content) => Ok(content),
            None => exn::bail!(ErrorKind::MissingContent),
        }
    }
}
