//! Database side of a sync: converging the reader's rows on the catalog.

use crate::error::{DescribeExt, ErrorKind, Result};
use shelfsync_catalog::{CatalogClient, DetailOptions, RemoteItem};
use shelfsync_device::LibraryDir;
use shelfsync_store::{CatalogRecord, ReadStatus, RecordMetadata, Repository};
use tracing::instrument;

/// A correcting write for one database row.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// Always written in full, even when only the status changes.
    pub metadata: RecordMetadata,
    /// Set only when the row must move to a new read status.
    pub status: Option<ReadStatus>,
}

/// What reconciling one item did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// The row already matched the catalog.
    Unchanged,
    /// The reader has no row for the item yet.
    NotRegistered,
    /// The row was rewritten; `status` tells whether the read status changed.
    Updated { status: bool },
}

/// The row metadata the catalog says an item should have.
///
/// Series columns come from the item's first series and are empty when it
/// has none.
pub fn desired_metadata(item: &RemoteItem) -> RecordMetadata {
    let series = item.primary_series();
    RecordMetadata {
        title: item.title.clone(),
        subtitle: item.subtitle.clone(),
        attribution: item.author_name.clone(),
        description: item.description.clone(),
        series: series.map(|series| series.name.clone()),
        series_number: series.and_then(|series| series.sequence.clone()),
        series_number_float: series.and_then(|series| series.sequence_number()),
        series_id: series.map(|series| series.id.clone()),
    }
}

/// Decide the minimal write that brings `record` in line with `item`.
///
/// Series columns only take part in the comparison when the item belongs to
/// a series. The read status only ever moves to finished, and only when
/// `progress_sync` is on.
pub fn converge(item: &RemoteItem, record: &CatalogRecord, progress_sync: bool) -> Option<Update> {
    let desired = desired_metadata(item);
    let stored = &record.metadata;
    let mut differs = desired.title != stored.title
        || desired.subtitle != stored.subtitle
        || desired.attribution != stored.attribution
        || desired.description != stored.description;
    if item.primary_series().is_some() {
        differs = differs
            || desired.series != stored.series
            || desired.series_number != stored.series_number
            || desired.series_number_float != stored.series_number_float
            || desired.series_id != stored.series_id;
    }
    let finish = progress_sync && item.finished && record.read_status != ReadStatus::Finished;
    match differs || finish {
        true => Some(Update { metadata: desired, status: finish.then_some(ReadStatus::Finished) }),
        false => None,
    }
}

/// Converges the reader's database rows for items present on both sides.
pub struct Reconciler<'a> {
    catalog: &'a dyn CatalogClient,
    library: &'a LibraryDir,
    repository: &'a Repository,
    progress_sync: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        catalog: &'a dyn CatalogClient,
        library: &'a LibraryDir,
        repository: &'a Repository,
        progress_sync: bool,
    ) -> Self {
        Self { catalog, library, repository, progress_sync }
    }

    /// Fetch the item's detail (listings carry neither progress nor the full
    /// series), locate its row and write the correction, if any.
    #[instrument(level = "debug", skip_all, fields(item = %item.id))]
    pub async fn reconcile(&self, item: &RemoteItem) -> Result<Reconciled> {
        let detail = self
            .catalog
            .fetch_item_detail(&item.id, DetailOptions::full())
            .await
            .or_describe(ErrorKind::Fetch)?;
        let Some(content) = &detail.content else {
            exn::bail!(ErrorKind::MissingContent);
        };
        // Recomputed from the current placement path on every run.
        let content_id = self
            .library
            .content_id(&detail.rel_path, &content.filename)
            .or_describe(ErrorKind::Filesystem)?;
        let Some(record) = self.repository.find(&content_id).await.or_describe(ErrorKind::Store)? else {
            tracing::debug!(item = %item.id, content_id = %content_id, "not indexed by the reader yet");
            return Ok(Reconciled::NotRegistered);
        };
        let Some(update) = converge(&detail, &record, self.progress_sync) else {
            return Ok(Reconciled::Unchanged);
        };
        let written = self
            .repository
            .update(&content_id, &update.metadata, update.status)
            .await
            .or_describe(ErrorKind::Store)?;
        if !written {
            // The reader dropped the row between lookup and update.
            return Ok(Reconciled::NotRegistered);
        }
        tracing::info!(
            item = %item.id,
            content_id = %content_id,
            finished = update.status.is_some(),
            "updated reader metadata"
        );
        Ok(Reconciled::Updated { status: update.status.is_some() })
    }
}
