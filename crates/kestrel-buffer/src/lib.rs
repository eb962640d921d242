//! Buffer management for KestrelDB.
//!
//! This crate caches fixed-size pages of files in a bounded pool of frames:
//! - Page table from (file, page number) to frame
//! - Clock (second-chance) replacement with write-back of dirty victims
//! - Pin counting so pages in use are never evicted
//! - RAII guards that unpin on drop

mod descriptor;
mod frame;
mod guard;
mod manager;
mod page_table;
mod replacer;
mod stats;

pub use frame::{BufferFrame, FrameId};
pub use guard::{PageReadGuard, PageRef, PageWriteGuard};
pub use manager::BufferManager;
pub use page_table::PageTable;
pub use stats::{BufferSnapshot, BufferStats, FrameInfo};
