// src/store/traits.rs

//! Read interface for sample stores.
//!
//! A sample store is an array of fixed-width `f32` records with the sample
//! axis leading. Implementations may keep records in memory or on disk;
//! the window cache and the minibatch iterators only see this trait.

use ndarray::Array2;

use crate::error::Result;

/// Read access to an indexable array of fixed-width records.
///
/// Reads take `&mut self`: file-backed stores seek, and the window cache
/// mutates its resident range on a miss. This also makes a read plus any
/// reload it triggers one atomic unit per call.
///
/// # Object Safety
///
/// This trait is object-safe and can be used with `Box<dyn SampleStore>`.
pub trait SampleStore {
    /// Number of records in the store.
    fn len(&self) -> usize;

    /// Whether the store holds no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Features per record, with any trailing dimensions flattened.
    fn record_width(&self) -> usize;

    /// Size of one element in bytes.
    fn elem_size(&self) -> usize {
        std::mem::size_of::<f32>()
    }

    /// Size of one record in bytes.
    fn record_bytes(&self) -> usize {
        self.record_width() * self.elem_size()
    }

    /// Shape of the store as `(samples, features)`.
    fn shape(&self) -> (usize, usize) {
        (self.len(), self.record_width())
    }

    /// Reads records `[start, stop)` as a `(stop - start, width)` block.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is out of bounds or the read fails.
    fn read_range(&mut self, start: usize, stop: usize) -> Result<Array2<f32>>;
}

impl<S: SampleStore + ?Sized> SampleStore for Box<S> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn record_width(&self) -> usize {
        (**self).record_width()
    }

    fn elem_size(&self) -> usize {
        (**self).elem_size()
    }

    fn read_range(&mut self, start: usize, stop: usize) -> Result<Array2<f32>> {
        (**self).read_range(start, stop)
    }
}
