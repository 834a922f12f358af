//! Outcome of a sync run.

use crate::error::{Error, ErrorKind};
use derive_more::Display;
use time::OffsetDateTime;

/// The step an item failed in.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    #[display("remove")]
    Remove,
    #[display("download")]
    Download,
    #[display("reconcile")]
    Reconcile,
}

/// An item the run could not converge. It is retried on the next run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// Catalog identity of the item.
    pub id: String,
    pub stage: Stage,
    pub reason: String,
}
impl ItemFailure {
    pub fn new(id: impl Into<String>, stage: Stage, err: &Error) -> Self {
        let kind: &ErrorKind = err;
        Self { id: id.into(), stage, reason: kind.to_string() }
    }
}

/// Counts of what a completed run changed, plus the items it gave up on.
///
/// In a dry run the counts describe what would have changed.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: OffsetDateTime,
    pub finished_at: OffsetDateTime,
    pub dry_run: bool,
    pub removed: usize,
    pub downloaded: usize,
    /// Database rows whose metadata was rewritten.
    pub metadata_updated: usize,
    /// Database rows marked as finished.
    pub status_updated: usize,
    /// Items on the device the reader has not indexed yet.
    pub unregistered: usize,
    pub failures: Vec<ItemFailure>,
}

impl RunSummary {
    pub(crate) fn start(dry_run: bool) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            started_at: now,
            finished_at: now,
            dry_run,
            removed: 0,
            downloaded: 0,
            metadata_updated: 0,
            status_updated: 0,
            unregistered: 0,
            failures: Vec::new(),
        }
    }

    pub(crate) fn fail(&mut self, id: &str, stage: Stage, err: &Error) {
        let failure = ItemFailure::new(id, stage, err);
        tracing::warn!(item = %failure.id, stage = %failure.stage, reason = %failure.reason, "item failed");
        self.failures.push(failure);
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = OffsetDateTime::now_utc();
        self
    }

    /// `true` if no item failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// `true` if the run (would have) changed nothing.
    pub fn is_noop(&self) -> bool {
        self.removed == 0 && self.downloaded == 0 && self.metadata_updated == 0 && self.status_updated == 0
    }

    pub fn duration(&self) -> time::Duration {
        self.finished_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_make_run_unclean() {
        let mut summary = RunSummary::start(false);
        assert!(summary.is_clean());
        assert!(summary.is_noop());
        summary.fail("li_1", Stage::Download, &ErrorKind::MissingContent.into());
        let summary = summary.finish();
        assert!(!summary.is_clean());
        assert_eq!(summary.failures[0], ItemFailure {
            id: "li_1".to_string(),
            stage: Stage::Download,
            reason: "item has no ebook file".to_string(),
        });
        assert!(summary.duration() >= time::Duration::ZERO);
    }
}
