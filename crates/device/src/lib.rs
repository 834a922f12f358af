//! The reader side of a sync: where items live on the device, how they are
//! recognised, and the filesystem mutations that add or remove them.

mod device;
pub mod error;
mod identity;
mod path;
mod scan;

pub use crate::device::{DATABASE_FILE, Device, LibraryDir, PartFile};
pub use crate::identity::{ContentId, DeviceItem, LIBRARY_DIR, MARKER_FILE, Marker, READER_MOUNT, identify};
pub use crate::path::validate as validate_path;
