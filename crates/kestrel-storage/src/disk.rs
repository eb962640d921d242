//! On-disk paged files.

use crate::file::PageFile;
use kestrel_common::{FileId, KestrelError, PageBuf, PageId, PageNum, Result, StorageConfig, PAGE_SIZE};
use log::debug;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A single data file holding pages at `page_num * PAGE_SIZE`.
///
/// Deleted page numbers are tracked in memory only and handed out again by
/// `allocate_page` before the file grows.
#[derive(Debug)]
pub struct DiskFile {
    file_id: FileId,
    path: PathBuf,
    fsync_enabled: bool,
    inner: Mutex<DiskFileInner>,
}

#[derive(Debug)]
struct DiskFileInner {
    file: File,
    /// Number of page slots in the file.
    num_pages: u32,
    /// Deleted slots available for reuse.
    free_pages: BTreeSet<PageNum>,
}

impl DiskFile {
    /// Opens or creates the data file at `path`.
    pub fn open(file_id: FileId, path: impl Into<PathBuf>, fsync_enabled: bool) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let file_size = file.metadata()?.len();
        let num_pages = (file_size / PAGE_SIZE as u64) as u32;

        Ok(Self {
            file_id,
            path,
            fsync_enabled,
            inner: Mutex::new(DiskFileInner {
                file,
                num_pages,
                free_pages: BTreeSet::new(),
            }),
        })
    }

    /// Returns the path of the data file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Forces buffered writes to disk.
    pub fn sync(&self) -> Result<()> {
        self.inner.lock().file.sync_all()?;
        Ok(())
    }

    fn page_id(&self, page_num: PageNum) -> PageId {
        PageId::new(self.file_id, page_num)
    }

    fn check_exists(&self, inner: &DiskFileInner, page_num: PageNum) -> Result<()> {
        if page_num >= inner.num_pages || inner.free_pages.contains(&page_num) {
            return Err(KestrelError::PageNotFound {
                page_id: self.page_id(page_num),
            });
        }
        Ok(())
    }

    fn write_slot(&self, inner: &mut DiskFileInner, page_num: PageNum, data: &PageBuf) -> Result<()> {
        let offset = (page_num as u64) * (PAGE_SIZE as u64);
        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.write_all(data)?;

        if self.fsync_enabled {
            inner.file.sync_all()?;
        }
        Ok(())
    }
}

impl PageFile for DiskFile {
    fn file_id(&self) -> FileId {
        self.file_id
    }

    fn read_page(&self, page_num: PageNum, buf: &mut PageBuf) -> Result<()> {
        let mut inner = self.inner.lock();
        self.check_exists(&inner, page_num)?;

        let offset = (page_num as u64) * (PAGE_SIZE as u64);
        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.read_exact(buf)?;
        Ok(())
    }

    fn write_page(&self, page_num: PageNum, data: &PageBuf) -> Result<()> {
        let mut inner = self.inner.lock();
        self.check_exists(&inner, page_num)?;
        self.write_slot(&mut inner, page_num, data)
    }

    fn allocate_page(&self) -> Result<PageNum> {
        let mut inner = self.inner.lock();
        let zeroes = [0u8; PAGE_SIZE];

        if let Some(page_num) = inner.free_pages.pop_first() {
            self.write_slot(&mut inner, page_num, &zeroes)?;
            debug!("{}: reused page slot {}", self.file_id, page_num);
            return Ok(page_num);
        }

        let page_num = inner.num_pages;
        self.write_slot(&mut inner, page_num, &zeroes)?;
        inner.num_pages = page_num + 1;
        Ok(page_num)
    }

    fn delete_page(&self, page_num: PageNum) -> Result<()> {
        let mut inner = self.inner.lock();
        self.check_exists(&inner, page_num)?;
        self.write_slot(&mut inner, page_num, &[0u8; PAGE_SIZE])?;
        inner.free_pages.insert(page_num);
        Ok(())
    }

    fn num_pages(&self) -> Result<u32> {
        Ok(self.inner.lock().num_pages)
    }
}

impl Drop for DiskFile {
    fn drop(&mut self) {
        let _ = self.inner.get_mut().file.sync_all();
    }
}

/// Opens and caches data files under one directory, keyed by file id.
pub struct DiskManager {
    config: StorageConfig,
    files: Mutex<HashMap<FileId, Arc<DiskFile>>>,
}

impl DiskManager {
    /// Creates a new disk manager, creating the data directory if needed.
    pub fn new(config: StorageConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        Ok(Self {
            config,
            files: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Generates the file path for a given file ID.
    pub fn file_path(&self, file_id: FileId) -> PathBuf {
        self.config.data_dir.join(format!("{:08}.dat", file_id.0))
    }

    /// Opens or creates a data file, returning the shared handle.
    pub fn open_file(&self, file_id: FileId) -> Result<Arc<DiskFile>> {
        let mut files = self.files.lock();

        if let Some(file) = files.get(&file_id) {
            return Ok(Arc::clone(file));
        }

        let file = Arc::new(DiskFile::open(
            file_id,
            self.file_path(file_id),
            self.config.fsync_enabled,
        )?);
        files.insert(file_id, Arc::clone(&file));
        debug!("opened {}", file.path().display());

        Ok(file)
    }

    /// Returns the handle of an already open file.
    pub fn get_file(&self, file_id: FileId) -> Result<Arc<DiskFile>> {
        self.files
            .lock()
            .get(&file_id)
            .cloned()
            .ok_or(KestrelError::FileNotOpen(file_id))
    }

    /// Flushes all open files to disk.
    pub fn flush(&self) -> Result<()> {
        let files = self.files.lock();
        for file in files.values() {
            file.sync()?;
        }
        Ok(())
    }

    /// Closes a specific file. Outstanding handles stay usable.
    pub fn close_file(&self, file_id: FileId) -> Result<()> {
        let removed = self.files.lock().remove(&file_id);
        if let Some(file) = removed {
            file.sync()?;
        }
        Ok(())
    }

    /// Closes and deletes a data file.
    pub fn delete_file(&self, file_id: FileId) -> Result<()> {
        self.close_file(file_id)?;
        let path = self.file_path(file_id);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}
