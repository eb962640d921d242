//! Error types for Kestrel.

use crate::page::{FileId, PageId};
use thiserror::Error;

/// Result type alias using KestrelError.
pub type Result<T> = std::result::Result<T, KestrelError>;

/// Errors that can occur in Kestrel operations.
///
/// The buffer conditions (`BufferExceeded`, `PageNotPinned`, `PagePinned`)
/// are expected, recoverable outcomes that callers are meant to match on.
#[derive(Debug, Error)]
pub enum KestrelError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not open: {0}")]
    FileNotOpen(FileId),

    // Storage errors
    #[error("Page not found: {page_id}")]
    PageNotFound { page_id: PageId },

    // Buffer errors
    #[error("Buffer exceeded, all frames are pinned")]
    BufferExceeded,

    #[error("Page not pinned: {page_id} in frame {frame_id}")]
    PageNotPinned { page_id: PageId, frame_id: u32 },

    #[error("Page pinned: {page_id} in frame {frame_id} (pin count {pin_count})")]
    PagePinned {
        page_id: PageId,
        frame_id: u32,
        pin_count: u32,
    },

    #[error("Page table entry already present: {page_id} -> frame {frame_id}")]
    HashAlreadyPresent { page_id: PageId, frame_id: u32 },

    #[error("Page table full")]
    PageTableFull,

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter { name: String, value: String },
}

impl KestrelError {
    /// Returns true for the buffer conditions a caller can resolve by
    /// unpinning pages and retrying.
    pub fn is_pin_conflict(&self) -> bool {
        matches!(
            self,
            KestrelError::BufferExceeded | KestrelError::PagePinned { .. }
        )
    }
}
