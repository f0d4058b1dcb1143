// src/config.rs

//! Configuration management for the loader.
//!
//! This module provides configuration parsing from TOML files, environment
//! variable overrides, and validation of configuration values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{LoaderError, Result};

/// Smallest window budget the cache will accept. Below this the staging
/// overhead dominates any benefit of keeping records resident.
pub const MIN_CAPACITY_BYTES: usize = 1_000_000;

// Top-level loader configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub iterator: IteratorConfig,
}

// Storage configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    // Base path for all store files.
    pub base_path: PathBuf,
    // Buffer size in bytes for I/O operations.
    pub buffer_size: usize,
    // Whether to use memory-mapped I/O for reads.
    pub use_mmap: bool,
    // File size threshold (bytes) above which to use mmap.
    pub mmap_threshold: u64,
}

/// Window cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Byte budget for the in-memory window. Must be at least 1 MB.
    pub capacity_bytes: usize,
}

/// Minibatch iterator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IteratorConfig {
    // Number of samples per minibatch.
    pub minibatch_size: usize,
    // Sample axis: 0 = sample-major, 1 = time-major.
    pub axis: usize,
    // Index of the first sample of each epoch.
    pub start_index: usize,
    /// Exclusive upper bound for iteration. Absent means "until the
    /// shortest container ends"; resolved once at iterator construction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_index: Option<usize>,
    // Whether to emit a validity mask alongside each container.
    pub make_mask: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./data"),
            buffer_size: 64 * 1024, // 64 KB
            use_mmap: true,
            mmap_threshold: 1024 * 1024, // 1 MB
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: 256 * 1024 * 1024, // 256 MB
        }
    }
}

impl Default for IteratorConfig {
    fn default() -> Self {
        Self {
            minibatch_size: 32,
            axis: 0,
            start_index: 0,
            stop_index: None,
            make_mask: false,
        }
    }
}

impl FromStr for LoaderConfig {
    type Err = LoaderError;

    /// Parse configuration from a TOML string.
    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| LoaderError::config_with_source("failed to parse TOML config", e))
    }
}

impl LoaderConfig {
    // Load configuration from a TOML file.
    //
    // # Errors
    //
    // Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LoaderError::storage_with_source(path, "failed to read config file", e)
        })?;
        let config: Self = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    // Apply environment variable overrides.
    //
    // Environment variables are prefixed with `LDR_` and use underscores
    // to separate nested fields. For example:
    // - `LDR_STORAGE_BASE_PATH` overrides `storage.base_path`
    // - `LDR_CACHE_CAPACITY_BYTES` overrides `cache.capacity_bytes`
    // - `LDR_ITERATOR_MINIBATCH_SIZE` overrides `iterator.minibatch_size`
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        // Storage overrides
        if let Ok(val) = std::env::var("LDR_STORAGE_BASE_PATH") {
            self.storage.base_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("LDR_STORAGE_BUFFER_SIZE") {
            if let Ok(v) = val.parse() {
                self.storage.buffer_size = v;
            }
        }
        if let Ok(val) = std::env::var("LDR_STORAGE_USE_MMAP") {
            if let Ok(v) = val.parse() {
                self.storage.use_mmap = v;
            }
        }
        if let Ok(val) = std::env::var("LDR_STORAGE_MMAP_THRESHOLD") {
            if let Ok(v) = val.parse() {
                self.storage.mmap_threshold = v;
            }
        }

        // Cache overrides
        if let Ok(val) = std::env::var("LDR_CACHE_CAPACITY_BYTES") {
            if let Ok(v) = val.parse() {
                self.cache.capacity_bytes = v;
            }
        }

        // Iterator overrides
        if let Ok(val) = std::env::var("LDR_ITERATOR_MINIBATCH_SIZE") {
            if let Ok(v) = val.parse() {
                self.iterator.minibatch_size = v;
            }
        }
        if let Ok(val) = std::env::var("LDR_ITERATOR_AXIS") {
            if let Ok(v) = val.parse() {
                self.iterator.axis = v;
            }
        }
        if let Ok(val) = std::env::var("LDR_ITERATOR_START_INDEX") {
            if let Ok(v) = val.parse() {
                self.iterator.start_index = v;
            }
        }
        if let Ok(val) = std::env::var("LDR_ITERATOR_STOP_INDEX") {
            if let Ok(v) = val.parse() {
                self.iterator.stop_index = Some(v);
            }
        }
        if let Ok(val) = std::env::var("LDR_ITERATOR_MAKE_MASK") {
            if let Ok(v) = val.parse() {
                self.iterator.make_mask = v;
            }
        }

        self
    }

    // Validate all configuration values.
    //
    // # Errors
    //
    // Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        // Storage validation
        if self.storage.buffer_size == 0 {
            return Err(LoaderError::config(
                "storage.buffer_size must be greater than 0",
            ));
        }

        // Cache validation
        if self.cache.capacity_bytes < MIN_CAPACITY_BYTES {
            return Err(LoaderError::config(format!(
                "cache.capacity_bytes must be at least {MIN_CAPACITY_BYTES} bytes (1 MB)",
            )));
        }

        // Iterator validation
        if self.iterator.minibatch_size == 0 {
            return Err(LoaderError::config(
                "iterator.minibatch_size must be greater than 0",
            ));
        }

        if self.iterator.axis > 1 {
            return Err(LoaderError::config(format!(
                "iterator.axis must be 0 or 1, got {}",
                self.iterator.axis
            )));
        }

        if let Some(stop) = self.iterator.stop_index {
            if stop <= self.iterator.start_index {
                return Err(LoaderError::config(
                    "iterator.stop_index must be greater than iterator.start_index",
                ));
            }
        }

        Ok(())
    }
}
