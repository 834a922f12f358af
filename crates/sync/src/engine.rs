//! A complete sync run.

use crate::error::{ErrorKind, Result};
use crate::materialize::Materializer;
use crate::plan::Plan;
use crate::reconcile::{Reconciled, Reconciler};
use crate::summary::{RunSummary, Stage};
use exn::ResultExt;
use shelfsync_catalog::{CatalogClient, Library, MediaType};
use shelfsync_device::Device;
use shelfsync_store::{Database, Repository};
use std::path::Path;
use tracing::instrument;

/// What to sync and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Library name (case-insensitive) or ID.
    pub library: String,
    /// Mark books the catalog reports as finished as finished on the reader.
    pub progress_sync: bool,
    /// Plan and compare, but change nothing on the device.
    pub dry_run: bool,
}
impl Options {
    pub fn new(library: impl Into<String>) -> Self {
        Self { library: library.into(), progress_sync: true, dry_run: false }
    }
}

/// Sync a library onto the reader mounted at `device_root`.
///
/// The reader's database is opened once and closed before returning, on
/// every path. An `Err` means the run was aborted before anything on the
/// device changed; item-level problems are reported in the summary instead.
#[instrument(skip_all, fields(library = %options.library, device = %device_root.display()))]
pub async fn sync(catalog: &dyn CatalogClient, device_root: &Path, options: &Options) -> Result<RunSummary> {
    let device = Device::open(device_root).or_raise(|| ErrorKind::DeviceNotMounted)?;
    let database = Database::connect(&device.database_path())
        .await
        .or_raise(|| ErrorKind::DatabaseUnavailable)?;
    let result = sync_device(catalog, &device, &database, options).await;
    database.close().await;
    result
}

/// Sync a library onto an opened device and database. The caller owns (and
/// closes) the database.
pub async fn sync_device(
    catalog: &dyn CatalogClient,
    device: &Device,
    database: &Database,
    options: &Options,
) -> Result<RunSummary> {
    let library = resolve_library(catalog, &options.library).await?;
    let library_dir = device
        .library(&library.id)
        .or_raise(|| ErrorKind::LibraryNotFound(options.library.clone()))?;

    let remote = catalog.list_items(&library.id).await.or_raise(|| ErrorKind::Catalog)?;
    let on_device = library_dir.scan().await.or_raise(|| ErrorKind::Integrity)?;
    let plan = Plan::new(&remote, &on_device);
    tracing::info!(
        library = %library.id,
        remote = remote.len(),
        on_device = on_device.len(),
        remove = plan.to_remove.len(),
        download = plan.to_download.len(),
        reconcile = plan.to_reconcile.len(),
        dry_run = options.dry_run,
        "planned sync"
    );

    let mut summary = RunSummary::start(options.dry_run);
    let materializer = Materializer::new(catalog, &library_dir, options.dry_run);
    for item in &plan.to_remove {
        match materializer.remove(item).await {
            Ok(()) => summary.removed += 1,
            Err(err) => summary.fail(&item.id, Stage::Remove, &err),
        }
    }
    for item in &plan.to_download {
        match materializer.download(item).await {
            Ok(_) => summary.downloaded += 1,
            Err(err) => summary.fail(&item.id, Stage::Download, &err),
        }
    }

    // Items downloaded above are reconciled on the next run, once the reader
    // has indexed them.
    let repository = Repository::new(database.pool().clone(), options.dry_run);
    let reconciler = Reconciler::new(catalog, &library_dir, &repository, options.progress_sync);
    for (item, _) in &plan.to_reconcile {
        match reconciler.reconcile(item).await {
            Ok(Reconciled::Unchanged) => {},
            Ok(Reconciled::NotRegistered) => summary.unregistered += 1,
            Ok(Reconciled::Updated { status }) => {
                summary.metadata_updated += 1;
                if status {
                    summary.status_updated += 1;
                }
            },
            Err(err) => summary.fail(&item.id, Stage::Reconcile, &err),
        }
    }

    let summary = summary.finish();
    tracing::info!(
        removed = summary.removed,
        downloaded = summary.downloaded,
        metadata_updated = summary.metadata_updated,
        status_updated = summary.status_updated,
        unregistered = summary.unregistered,
        failed = summary.failures.len(),
        "sync complete"
    );
    Ok(summary)
}

/// Find the configured library by name (case-insensitive) or ID.
async fn resolve_library(catalog: &dyn CatalogClient, wanted: &str) -> Result<Library> {
    let libraries = catalog.list_libraries().await.or_raise(|| ErrorKind::Catalog)?;
    let lowered = wanted.to_lowercase();
    let Some(library) = libraries
        .into_iter()
        .find(|library| library.id == wanted || library.name.to_lowercase() == lowered)
    else {
        exn::bail!(ErrorKind::LibraryNotFound(wanted.to_string()));
    };
    if library.media_type != MediaType::Book {
        exn::bail!(ErrorKind::NotBookLibrary(library.name));
    }
    Ok(library)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use shelfsync_catalog::MockCatalog;

    fn catalog() -> MockCatalog {
        MockCatalog::default()
            .with_library(Library::new("lib_1", "Ebooks", MediaType::Book))
            .with_library(Library::new("lib_2", "Podcasts", MediaType::Podcast))
    }

    #[rstest]
    #[case("Ebooks")]
    #[case("ebooks")]
    #[case("EBOOKS")]
    #[case("lib_1")]
    #[tokio::test]
    async fn test_resolve_library(#[case] wanted: &str) {
        let library = resolve_library(&catalog(), wanted).await.unwrap();
        assert_eq!(library.id, "lib_1");
    }

    #[tokio::test]
    async fn test_resolve_library_not_found() {
        let err = resolve_library(&catalog(), "Comics").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::LibraryNotFound(name) if name == "Comics"));
    }

    #[tokio::test]
    async fn test_resolve_library_wrong_media_type() {
        let err = resolve_library(&catalog(), "podcasts").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotBookLibrary(_)));
    }
}
