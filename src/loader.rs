// src/loader.rs

//! Loader orchestration.
//!
//! This module provides the `Loader` struct that ties configuration to the
//! other components: store writers and readers, window caches, and
//! minibatch iterators.
//!
//! # Example
//!
//! ```no_run
//! use loader_core::{Container, Loader};
//! use ndarray::Array1;
//!
//! let loader = Loader::new().unwrap();
//!
//! // Build a corpus of 64-feature records.
//! let mut writer = loader.create_store("corpus.f32", 64).unwrap();
//! writer.append_row(Array1::zeros(64).view()).unwrap();
//! writer.finish().unwrap();
//!
//! // Read it back through a bounded memory window.
//! let store = loader.open_store("corpus.f32", 64).unwrap();
//! let cache = loader.swapped(store).unwrap();
//!
//! // Iterate minibatches.
//! let mut iter = loader.minibatches(vec![Container::store(cache)]).unwrap();
//! while let Some(batch) = iter.advance().unwrap() {
//!     // Process batch[0]
//! }
//! ```

use std::path::Path;

use crate::batch::{Container, MinibatchIterator};
use crate::cache::WindowCache;
use crate::config::LoaderConfig;
use crate::error::Result;
use crate::store::{FileStore, FileStoreWriter, ReadOptions, SampleStore};

/// Ties configuration to stores, caches, and iterators.
///
/// All store paths are resolved relative to `storage.base_path`; cache and
/// iterator parameters come from the `[cache]` and `[iterator]` sections.
pub struct Loader {
    config: LoaderConfig,
}

impl Loader {
    /// Creates a loader with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the default configuration fails validation.
    pub fn new() -> Result<Self> {
        Self::from_config(LoaderConfig::default())
    }

    /// Creates a loader from a configuration file.
    ///
    /// The file is TOML; environment variable overrides are applied after
    /// loading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or is invalid.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = LoaderConfig::from_file(path)?.with_env_overrides();
        Self::from_config(config)
    }

    /// Creates a loader from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn from_config(config: LoaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Opens a writer for a new record file under the storage base path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create_store(&self, path: impl AsRef<Path>, width: usize) -> Result<FileStoreWriter> {
        let full = self.config.storage.base_path.join(path);
        FileStoreWriter::create(full, width, self.config.storage.buffer_size)
    }

    /// Opens a record file under the storage base path for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is malformed.
    pub fn open_store(&self, path: impl AsRef<Path>, width: usize) -> Result<FileStore> {
        let full = self.config.storage.base_path.join(path);
        FileStore::open(full, width, &ReadOptions::from(&self.config.storage))
    }

    /// Wraps a store in a window cache with the configured byte budget.
    ///
    /// # Errors
    ///
    /// Returns an error if the budget cannot hold a single record.
    pub fn swapped<S: SampleStore>(&self, store: S) -> Result<WindowCache<S>> {
        WindowCache::new(store, self.config.cache.capacity_bytes)
    }

    /// Builds a minibatch iterator over `containers` from the configured
    /// iterator section.
    ///
    /// # Errors
    ///
    /// Returns an error if the containers are incompatible with the
    /// configuration.
    pub fn minibatches(&self, containers: Vec<Container>) -> Result<MinibatchIterator> {
        MinibatchIterator::new(containers, &self.config.iterator)
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }
}
