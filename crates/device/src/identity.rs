//! Item identity on the device.
//!
//! Two identity schemes meet here:
//! - the **marker file** inside every synced item directory, which records
//!   the remote catalog's opaque item ID and is the only thing the device tree
//!   is matched on (directory names are never interpreted), and
//! - the **content identifier**, the path-shaped key the reader's own database
//!   uses for a book. It is derived from where the content file lives and is
//!   unrelated to the catalog ID.
//!
//! The marker's ID is trusted as-is. Any future integrity check (comparing a
//! content hash, say) belongs in [`identify`] so nothing downstream changes.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

/// Name of the marker file written into every synced item directory.
pub const MARKER_FILE: &str = "abs-item.json";
/// Where the reader sees its user storage, as used in content identifiers.
pub const READER_MOUNT: &str = "/mnt/onboard";
/// Directory (below the device root) holding one subdirectory per library.
pub const LIBRARY_DIR: &str = "abs-library";

/// Contents of a marker file.
///
/// Unknown fields are ignored so that newer marker files stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub id: String,
}
impl Marker {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).or_raise(|| ErrorKind::Marker(PathBuf::from(MARKER_FILE)))
    }
}

/// An item found in the device tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceItem {
    /// Catalog identity, copied from the marker file.
    pub id: String,
    /// Absolute directory containing the marker (and the content file).
    pub dir: PathBuf,
}

/// Returns `true` if the file name is that of a marker file.
pub fn is_marker(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.eq_ignore_ascii_case(MARKER_FILE))
}

/// Read a marker file and produce the device item it describes.
///
/// Anything short of a readable JSON object with a non-empty `id` is a
/// [`Marker`](ErrorKind::Marker) error: a device tree with a corrupt marker
/// cannot be trusted.
pub async fn identify(marker_path: &Path) -> Result<DeviceItem> {
    let bytes = tokio::fs::read(marker_path).await.or_raise(|| ErrorKind::Marker(marker_path.to_path_buf()))?;
    let marker: Marker = serde_json::from_slice(&bytes).or_raise(|| ErrorKind::Marker(marker_path.to_path_buf()))?;
    if marker.id.trim().is_empty() {
        exn::bail!(ErrorKind::Marker(marker_path.to_path_buf()));
    }
    let Some(dir) = marker_path.parent() else {
        exn::bail!(ErrorKind::Marker(marker_path.to_path_buf()));
    };
    Ok(DeviceItem { id: marker.id, dir: dir.to_path_buf() })
}

/// Key of a book in the reader's own database.
///
/// Always recomputed from `(library ID, placement path, content filename)`
/// rather than stored, so it follows the catalog if a placement changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentId(String);
impl ContentId {
    pub fn new(library_id: &str, rel_path: &str, filename: &str) -> Self {
        let mut id = format!("file://{READER_MOUNT}/{LIBRARY_DIR}");
        for segment in [library_id, rel_path, filename] {
            let segment = segment.trim_matches('/');
            if !segment.is_empty() {
                id.push('/');
                id.push_str(segment);
            }
        }
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
impl Display for ContentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("lib_1", "Author/Series/01", "Title.epub", "file:///mnt/onboard/abs-library/lib_1/Author/Series/01/Title.epub")]
    #[case("lib_1", "/Author/Title/", "Title.kepub.epub", "file:///mnt/onboard/abs-library/lib_1/Author/Title/Title.kepub.epub")]
    #[case("lib_1", "", "Loose.epub", "file:///mnt/onboard/abs-library/lib_1/Loose.epub")]
    fn test_content_id(#[case] library: &str, #[case] rel_path: &str, #[case] filename: &str, #[case] expected: &str) {
        assert_eq!(ContentId::new(library, rel_path, filename).as_str(), expected);
    }

    #[test]
    fn test_content_id_is_deterministic() {
        let a = ContentId::new("lib_1", "Author/Title", "Title.epub");
        let b = ContentId::new("lib_1", "Author/Title", "Title.epub");
        assert_eq!(a.as_str().as_bytes(), b.as_str().as_bytes());
    }

    #[rstest]
    #[case("abs-item.json", true)]
    #[case("ABS-ITEM.JSON", true)]
    #[case("old-abs-item.json", false)]
    #[case("Title.epub", false)]
    fn test_is_marker(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_marker(&Path::new("/device/abs-library/lib_1/x").join(name)), expected);
    }

    #[tokio::test]
    async fn test_identify_ignores_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MARKER_FILE);
        tokio::fs::write(&path, br#"{"id": "li_1", "synced_at": 1700000000}"#).await.unwrap();
        let item = identify(&path).await.unwrap();
        assert_eq!(item, DeviceItem { id: "li_1".to_string(), dir: dir.path().to_path_buf() });
    }

    #[rstest]
    #[case::not_json(&b"not json"[..])]
    #[case::missing_id(&br#"{"identity": "li_1"}"#[..])]
    #[case::empty_id(&br#"{"id": " "}"#[..])]
    #[case::wrong_type(&br#"{"id": 42}"#[..])]
    #[tokio::test]
    async fn test_identify_malformed(#[case] contents: &[u8]) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MARKER_FILE);
        tokio::fs::write(&path, contents).await.unwrap();
        let err = identify(&path).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Marker(_)));
    }

    #[test]
    fn test_marker_shape() {
        let bytes = Marker::new("li_1").to_bytes().unwrap();
        assert_eq!(bytes, br#"{"id":"li_1"}"#);
    }
}
