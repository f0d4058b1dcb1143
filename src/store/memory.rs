// src/store/memory.rs

//! In-memory sample store.

use ndarray::{s, Array2, ArrayView1};

use super::traits::SampleStore;
use crate::error::{LoaderError, Result};

/// A sample store backed by an in-memory array.
///
/// Rows are appended during corpus construction with [`push_row`]; once
/// iteration begins the store is treated as immutable, matching the
/// append-then-read lifecycle of the on-disk stores.
///
/// [`push_row`]: MemStore::push_row
#[derive(Debug, Clone)]
pub struct MemStore {
    rows: Array2<f32>,
}

impl MemStore {
    /// Creates an empty store for records of `width` features.
    pub fn new(width: usize) -> Self {
        Self {
            rows: Array2::zeros((0, width)),
        }
    }

    /// Wraps an existing `(samples, features)` array.
    pub fn from_array(rows: Array2<f32>) -> Self {
        Self { rows }
    }

    /// Appends one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the row width does not match the store width.
    pub fn push_row(&mut self, row: ArrayView1<f32>) -> Result<()> {
        if row.len() != self.record_width() {
            return Err(LoaderError::shape(format!(
                "cannot append row of width {} to store of width {}",
                row.len(),
                self.record_width()
            )));
        }
        self.rows
            .push_row(row)
            .map_err(|e| LoaderError::shape(format!("failed to append row: {e}")))
    }

    /// The full backing array.
    pub fn rows(&self) -> &Array2<f32> {
        &self.rows
    }
}

impl SampleStore for MemStore {
    fn len(&self) -> usize {
        self.rows.nrows()
    }

    fn record_width(&self) -> usize {
        self.rows.ncols()
    }

    fn read_range(&mut self, start: usize, stop: usize) -> Result<Array2<f32>> {
        if start > stop || stop > self.len() {
            return Err(LoaderError::out_of_range(start, stop, self.len()));
        }
        Ok(self.rows.slice(s![start..stop, ..]).to_owned())
    }
}
