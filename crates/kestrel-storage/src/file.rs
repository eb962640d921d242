//! Paged file contract consumed by the buffer manager.

use kestrel_common::{FileId, PageBuf, PageNum, Result};
use std::sync::Arc;

/// A file made of fixed-size pages addressed by page number.
///
/// Implementations synchronize internally; every method takes `&self` so a
/// single handle can be shared between the buffer manager and its callers.
pub trait PageFile: Send + Sync {
    /// Stable identity of this file, distinct across files.
    fn file_id(&self) -> FileId;

    /// Reads page `page_num` into `buf`.
    ///
    /// Fails with `PageNotFound` if the page was never allocated or has
    /// been deleted.
    fn read_page(&self, page_num: PageNum, buf: &mut PageBuf) -> Result<()>;

    /// Writes `data` back as the content of page `page_num`.
    fn write_page(&self, page_num: PageNum, data: &PageBuf) -> Result<()>;

    /// Extends the file by one zero-filled page and returns its number.
    fn allocate_page(&self) -> Result<PageNum>;

    /// Removes page `page_num` from the file.
    fn delete_page(&self, page_num: PageNum) -> Result<()>;

    /// Returns the number of page slots in the file, deleted ones included.
    fn num_pages(&self) -> Result<u32>;
}

/// Shared handle to a paged file.
pub type FileRef = Arc<dyn PageFile>;
