//! Disk Manager - low-level file I/O for table pages.
//!
//! The [`DiskManager`] handles all direct file operations:
//! - Reading and writing pages
//! - Managing the table directory

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::common::{PageId, Result};
use crate::storage::page::Page;

/// Manages disk I/O for the pages of a single table.
///
/// # Directory Layout
/// Every page is stored in its own file, named by its id:
/// ```text
/// <table dir>/
/// ├── 6f1c0f0e-52a4-4d2e-9a51-0c1e6c2f7a11
/// ├── 9b3e5c2d-7f10-4a8b-b1c4-2d6e8f0a3b57
/// └── ...
/// ```
/// Pages link to each other through their headers, so the directory itself
/// carries no order.
///
/// # Thread Safety
/// `DiskManager` is **single-threaded**. The owning row store serializes
/// access through its lock.
///
/// # Durability
/// All writes are followed by `fsync()`.
#[derive(Debug)]
pub struct DiskManager {
    dir: PathBuf,
}

impl DiskManager {
    /// Open a table directory, creating it if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The table directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn page_path(&self, page_id: PageId) -> PathBuf {
        self.dir.join(page_id.to_string())
    }

    /// Whether a file exists for this page.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.page_path(page_id).is_file()
    }

    /// Read a page from disk.
    ///
    /// A page that was never written reads as a fresh, empty, unlinked page
    /// with the requested id. The boolean is `true` if the page came from a
    /// file.
    ///
    /// # Errors
    /// Returns `Error::PageIdMismatch` if the file holds another page, or
    /// an I/O or header error if the file cannot be read.
    pub fn read_page(&self, page_id: PageId) -> Result<(Page, bool)> {
        match fs::read(self.page_path(page_id)) {
            Ok(data) => Ok((Page::from_bytes(page_id, &data)?, true)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok((Page::new(page_id), false)),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a page to disk.
    ///
    /// # Durability
    /// This method calls `fsync()` after writing to ensure the data is
    /// persisted to disk.
    pub fn write_page(&self, page: &Page) -> Result<()> {
        write_synced(&self.page_path(page.id()), &page.to_bytes())
    }

    /// Number of page files in the directory.
    pub fn page_count(&self) -> Result<usize> {
        let mut count = 0;
        for entry in fs::read_dir(&self.dir)? {
            if entry?.file_type()?.is_file() {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Replace the file at `path` with `data` and fsync it.
///
/// The data is written to a sibling temporary file and renamed over the
/// target, so readers see either the old or the new contents.
pub(crate) fn write_synced(path: &Path, data: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = File::create(&tmp)?;
    file.write_all(data)?;
    file.sync_all()?; // fsync for durability
    fs::rename(&tmp, path)?;
    Ok(())
}
