//! Kestrel common types, errors, and configuration.
//!
//! This crate provides shared definitions used across all Kestrel components.

pub mod config;
pub mod error;
pub mod page;

pub use config::{BufferPoolConfig, KestrelConfig, StorageConfig};
pub use error::{KestrelError, Result};
pub use page::{zeroed_page, FileId, PageBuf, PageId, PageNum, PAGE_SIZE};
