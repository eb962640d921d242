//! Paged file storage for Kestrel.
//!
//! This crate provides:
//! - The `PageFile` contract the buffer manager reads and writes through
//! - `DiskFile` and `DiskManager` for page-level file I/O
//! - `MemFile`, an in-memory file that logs its I/O

mod disk;
mod file;
mod mem;

pub use disk::{DiskFile, DiskManager};
pub use file::{FileRef, PageFile};
pub use mem::MemFile;
