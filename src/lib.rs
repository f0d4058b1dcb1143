// src/lib.rs

//! Minibatch Iteration Runtime - Core Library
//!
//! This crate provides minibatch iteration over large sample arrays: a
//! bounded memory window cache that stages on-disk records into memory on
//! demand, sample stores over raw record files, and iterators that draw
//! fixed-size batches from one or more aligned containers, with optional
//! padding and validity masks for variable-length sequences.

pub mod config;
pub mod error;
pub mod store;

// Re-export commonly used types for convenience
pub use config::{CacheConfig, IteratorConfig, LoaderConfig, StorageConfig, MIN_CAPACITY_BYTES};
pub use error::{LoaderError, Result};
pub use store::{FileStore, FileStoreWriter, MemStore, ReadOptions, SampleStore};

pub mod cache;
pub use cache::WindowCache;

pub mod batch;
pub use batch::{Axis, Container, MinibatchIterator};

pub mod loader;
pub use loader::Loader;
