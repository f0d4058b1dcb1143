// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {

    #[error("Storage error at '{path}': {message}")]
    Storage {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(
        "Requested range [{start}:{stop}] ({requested} records) exceeds window \
         capacity of {max_records} records"
    )]
    Capacity {
        start: usize,
        stop: usize,
        requested: usize,
        max_records: usize,
    },

    #[error("Index range [{start}:{stop}] out of range for store of length {len}")]
    OutOfRange {
        start: usize,
        stop: usize,
        len: usize,
    },

    #[error("Shape error: {message}")]
    Shape {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, LoaderError>;

// Convenience constructors
impl LoaderError {

    pub fn storage(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn storage_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn capacity(start: usize, stop: usize, max_records: usize) -> Self {
        Self::Capacity {
            start,
            stop,
            requested: stop.saturating_sub(start),
            max_records,
        }
    }

    pub fn out_of_range(start: usize, stop: usize, len: usize) -> Self {
        Self::OutOfRange { start, stop, len }
    }

    pub fn shape(message: impl Into<String>) -> Self {
        Self::Shape {
            message: message.into(),
        }
    }

    /// Whether this error signals an index past the end of a backing store.
    ///
    /// Iterators treat this class of fault as exhaustion rather than a hard
    /// failure.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::OutOfRange { .. })
    }
}
