// src/store/mod.rs

//! Sample stores: indexable arrays of fixed-width `f32` records.
//!
//! This module provides the [`SampleStore`] read interface plus two
//! implementations: an in-memory store used during corpus construction and
//! in tests, and a file-backed store over raw little-endian `f32` records
//! with buffered or memory-mapped reads.
//!
//! Stores are append-only while a corpus is being built (through
//! [`MemStore::push_row`] or [`FileStoreWriter`]) and immutable once
//! iteration begins.

mod local;
mod memory;
mod traits;

pub use local::{FileStore, FileStoreWriter, ReadOptions};
pub use memory::MemStore;
pub use traits::SampleStore;
