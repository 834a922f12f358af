//! Device tree scanning.

use crate::error::{ErrorKind, Result};
use crate::identity::{DeviceItem, identify, is_marker};
use async_stream::stream;
use futures::{Stream, TryStreamExt};
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

enum WalkEntry {
    Marker(PathBuf),
    Descend(PathBuf),
    Skip,
}

async fn process_entry(entry: DirEntry) -> Result<WalkEntry> {
    let path = entry.path();
    let file_type = entry.file_type().await.map_err(|e| ErrorKind::io(e, &path))?;
    if file_type.is_dir() {
        return Ok(WalkEntry::Descend(path));
    }
    if file_type.is_file() && is_marker(&path) {
        return Ok(WalkEntry::Marker(path));
    }
    // Content files, partial downloads and (most likely broken) symlinks.
    Ok(WalkEntry::Skip)
}

/// Stream every item below `root`, one per marker file found.
///
/// A missing `root` yields nothing: the library has simply never been synced
/// to this device. Every other failure (an unreadable directory, a corrupt
/// marker) is yielded as an error; callers must treat the scan as
/// untrustworthy rather than skip the entry, or a missing item would be
/// downloaded again.
pub fn scan_stream(root: &Path) -> impl Stream<Item = Result<DeviceItem>> + '_ {
    stream! {
        let mut stack = vec![root.to_path_buf()];
        let mut is_root = true;
        'dirs: while let Some(current) = stack.pop() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(err) if is_root && err.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = %current.display(), "library directory does not exist yet");
                    return;
                },
                Err(err) => {
                    yield Err(exn::Exn::from(ErrorKind::io(err, &current)));
                    continue 'dirs;
                },
            };
            is_root = false;
            'entries: loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break 'entries,
                    Err(err) => {
                        yield Err(exn::Exn::from(ErrorKind::io(err, &current)));
                        continue 'dirs;
                    },
                };
                match process_entry(entry).await {
                    Ok(WalkEntry::Marker(marker)) => yield identify(&marker).await,
                    Ok(WalkEntry::Descend(dir)) => stack.push(dir),
                    Ok(WalkEntry::Skip) => {},
                    Err(err) => yield Err(err),
                }
            }
        }
    }
}

/// Collect [`scan_stream`], failing on the first error.
pub async fn scan(root: &Path) -> Result<Vec<DeviceItem>> {
    scan_stream(root).try_collect().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MARKER_FILE;

    async fn place(root: &Path, rel: &str, id: &str) -> PathBuf {
        let dir = root.join(rel);
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join(MARKER_FILE), format!(r#"{{"id":"{id}"}}"#)).await.unwrap();
        dir
    }

    #[tokio::test]
    async fn test_missing_root_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let items = scan(&temp.path().join("abs-library/lib_1")).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_empty_root_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        assert!(scan(temp.path()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_finds_nested_markers() {
        let temp = tempfile::tempdir().unwrap();
        let a = place(temp.path(), "Pratchett/Discworld/Mort", "li_a").await;
        let b = place(temp.path(), "Gaiman/Coraline", "li_b").await;
        fs::write(a.join("Mort.epub"), b"epub").await.unwrap();
        // Directories without a marker are not items, whatever their name.
        fs::create_dir_all(temp.path().join("li_c")).await.unwrap();

        let mut items = scan(temp.path()).await.unwrap();
        items.sort_by(|x, y| x.id.cmp(&y.id));
        assert_eq!(items, vec![
            DeviceItem { id: "li_a".to_string(), dir: a },
            DeviceItem { id: "li_b".to_string(), dir: b },
        ]);
    }

    #[tokio::test]
    async fn test_marker_without_content_is_present() {
        let temp = tempfile::tempdir().unwrap();
        place(temp.path(), "Author/Title", "li_partial").await;
        let items = scan(temp.path()).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "li_partial");
    }

    #[tokio::test]
    async fn test_corrupt_marker_fails_scan() {
        let temp = tempfile::tempdir().unwrap();
        place(temp.path(), "Author/Good", "li_good").await;
        let bad = temp.path().join("Author/Bad");
        fs::create_dir_all(&bad).await.unwrap();
        fs::write(bad.join(MARKER_FILE), b"{\"id\":").await.unwrap();
        let err = scan(temp.path()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Marker(path) if path.starts_with(&bad)));
    }
}
