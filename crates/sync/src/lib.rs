//! Reconciles an Audiobookshelf library with a Kobo reader.
//!
//! Three sources of state take part in a run, each with its own idea of an
//! item's identity:
//!
//! - the remote catalog, keyed by opaque item IDs;
//! - the device tree, where an `abs-item.json` marker records which catalog
//!   item a directory holds;
//! - the reader's database, keyed by a content identifier derived from the
//!   library, the item's placement path and its content filename.
//!
//! A run scans the device tree, [plans](Plan) removals, downloads and
//! reconciliations by catalog ID, applies them one item at a time and
//! returns a [`RunSummary`].

mod engine;
pub mod error;
mod materialize;
mod plan;
mod reconcile;
mod summary;

pub use crate::engine::{Options, sync, sync_device};
pub use crate::materialize::Materializer;
pub use crate::plan::Plan;
pub use crate::reconcile::{Reconciled, Reconciler, Update, converge, desired_metadata};
pub use crate::summary::{ItemFailure, RunSummary, Stage};
