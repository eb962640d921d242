//! Configuration structures for Kestrel.

use crate::error::{KestrelError, Result};
use crate::page::PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the buffer pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferPoolConfig {
    /// Number of frames in the pool.
    pub num_frames: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self { num_frames: 1024 }
    }
}

impl BufferPoolConfig {
    /// Returns the total pool size in bytes.
    pub fn pool_size_bytes(&self) -> usize {
        self.num_frames * PAGE_SIZE
    }

    /// Rejects configurations the buffer manager cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.num_frames == 0 || self.num_frames > u32::MAX as usize {
            return Err(KestrelError::InvalidParameter {
                name: "num_frames".to_string(),
                value: self.num_frames.to_string(),
            });
        }
        Ok(())
    }
}

/// Storage configuration for on-disk page files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for data files.
    pub data_dir: PathBuf,
    /// Enable fsync after writes.
    pub fsync_enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            fsync_enabled: true,
        }
    }
}

/// Top-level configuration combining buffer and storage settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KestrelConfig {
    pub buffer: BufferPoolConfig,
    pub storage: StorageConfig,
}

impl KestrelConfig {
    /// Parses and validates a JSON configuration document.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: KestrelConfig =
            serde_json::from_str(json).map_err(|e| KestrelError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            KestrelError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&contents)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<()> {
        self.buffer.validate()?;
        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(KestrelError::ConfigError("data_dir is empty".to_string()));
        }
        Ok(())
    }
}
