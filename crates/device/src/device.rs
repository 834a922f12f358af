//! Device layout and filesystem mutations.

use crate::error::{ErrorKind, Result};
use crate::identity::{ContentId, DeviceItem, LIBRARY_DIR, MARKER_FILE, Marker};
use crate::path::{validate as validate_path, validate_segment};
use crate::scan;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Location of the reader's database below the device root.
pub const DATABASE_FILE: &str = ".kobo/KoboReader.sqlite";
/// Suffix of content files still being downloaded.
const PART_SUFFIX: &str = ".part";

/// A mounted reader.
///
/// # Examples
///
/// ```no_run
/// use shelfsync_device::Device;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let device = Device::open("/media/KOBOeReader")?;
/// let library = device.library("lib_c1u6t4p45c35rf0nzd")?;
/// for item in library.scan().await? {
///     println!("{} in {}", item.id, item.dir.display());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Device {
    root: PathBuf,
}
impl Device {
    /// Open the device mounted at `root`.
    ///
    /// Returns [`NotMounted`](ErrorKind::NotMounted) unless `root` is an
    /// existing directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            exn::bail!(ErrorKind::NotMounted(root));
        }
        Ok(Self { root })
    }

    /// Path of the reader's own database.
    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    /// The directory holding a library's items (it may not exist yet).
    pub fn library(&self, library_id: &str) -> Result<LibraryDir> {
        let library_id = validate_segment(library_id)?;
        Ok(LibraryDir {
            id: library_id.to_string(),
            path: self.root.join(LIBRARY_DIR).join(library_id),
        })
    }
}

/// A library's subtree on the device: `<device>/abs-library/<library id>/`.
#[derive(Debug, Clone)]
pub struct LibraryDir {
    id: String,
    path: PathBuf,
}
impl LibraryDir {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory an item with the given placement path lives in.
    pub fn item_dir(&self, rel_path: &str) -> Result<PathBuf> {
        Ok(self.path.join(validate_path(rel_path)?))
    }

    /// Key of an item's content file in the reader's database.
    ///
    /// Built from the same normalised path [`item_dir`](Self::item_dir) and
    /// [`create_content`](Self::create_content) write to, so
    /// `Author//Title` and `Author/./Title` both name `Author/Title`.
    pub fn content_id(&self, rel_path: &str, filename: &str) -> Result<ContentId> {
        let dir = slashed(&validate_path(rel_path)?);
        let file = slashed(&validate_path(filename)?);
        Ok(ContentId::new(&self.id, &dir, &file))
    }

    /// Every item in this library's subtree.
    pub async fn scan(&self) -> Result<Vec<DeviceItem>> {
        scan::scan(&self.path).await
    }

    /// Recursively delete an item's directory.
    pub async fn remove(&self, item: &DeviceItem) -> Result<()> {
        // Scanned directories are always strictly inside the library.
        if item.dir == self.path || !item.dir.starts_with(&self.path) {
            exn::bail!(ErrorKind::InvalidPath(item.dir.clone()));
        }
        fs::remove_dir_all(&item.dir).await.map_err(|e| ErrorKind::io(e, &item.dir))?;
        tracing::debug!(item = %item.id, path = %item.dir.display(), "removed item directory");
        Ok(())
    }

    /// Create an item's directory (if needed) and write its marker file.
    pub async fn write_marker(&self, rel_path: &str, item_id: &str) -> Result<PathBuf> {
        let dir = self.item_dir(rel_path)?;
        fs::create_dir_all(&dir).await.map_err(|e| ErrorKind::io(e, &dir))?;
        let path = dir.join(MARKER_FILE);
        let bytes = Marker::new(item_id).to_bytes()?;
        fs::write(&path, bytes).await.map_err(|e| ErrorKind::io(e, &path))?;
        Ok(dir)
    }

    /// Start writing a content file into an item directory.
    ///
    /// Bytes go to `<filename>.part` until [`PartFile::commit`] renames it into
    /// place, so a content file is never half-written.
    pub async fn create_content(&self, dir: &Path, filename: &str) -> Result<PartFile> {
        let relative = validate_path(filename)?;
        let target = dir.join(relative);
        if !target.starts_with(&self.path) {
            exn::bail!(ErrorKind::InvalidPath(target));
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await.map_err(|e| ErrorKind::io(e, parent))?;
        }
        let mut part = target.clone().into_os_string();
        part.push(PART_SUFFIX);
        let part = PathBuf::from(part);
        let file = fs::File::create(&part).await.map_err(|e| ErrorKind::io(e, &part))?;
        Ok(PartFile { file, part, target, written: 0 })
    }
}

/// Join a validated relative path with `/`, whatever the host separator.
fn slashed(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// A content file being written.
#[derive(Debug)]
pub struct PartFile {
    file: fs::File,
    part: PathBuf,
    target: PathBuf,
    written: u64,
}
impl PartFile {
    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.file.write_all(chunk).await.map_err(|e| ErrorKind::io(e, &self.part))?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Flush and move the file into place, returning its size.
    ///
    /// On failure the partial file is deleted, as with [`discard`](Self::discard).
    pub async fn commit(self) -> Result<u64> {
        let Self { mut file, part, target, written } = self;
        let synced = match file.flush().await {
            Ok(()) => file.sync_all().await,
            Err(err) => Err(err),
        };
        drop(file);
        let moved = match synced {
            Ok(()) => fs::rename(&part, &target).await.map_err(|e| ErrorKind::io(e, &target)),
            Err(err) => Err(ErrorKind::io(err, &part)),
        };
        if let Err(kind) = moved {
            remove_part(&part).await;
            return Err(kind.into());
        }
        Ok(written)
    }

    /// Abandon the download and delete the partial file.
    pub async fn discard(self) {
        drop(self.file);
        remove_part(&self.part).await;
    }
}

async fn remove_part(part: &Path) {
    if let Err(err) = fs::remove_file(part).await {
        tracing::warn!(path = %part.display(), error = %err, "could not delete partial download");
    }
}
