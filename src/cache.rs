// src/cache.rs

//! Memory window cache over a sample store.
//!
//! [`WindowCache`] wraps a [`SampleStore`] and keeps one contiguous run of
//! records resident in a bounded in-memory buffer. Reads that fall inside
//! the resident window are served from memory; reads outside it reload the
//! window from the backing store. Minibatch access is near-sequential, so a
//! single sliding window amortizes one reload across many sub-range reads
//! until the cursor leaves the window.

use std::ops::Range;

use ndarray::{s, Array1, Array2};

use crate::config::MIN_CAPACITY_BYTES;
use crate::error::{LoaderError, Result};
use crate::store::SampleStore;

/// A bounded in-memory window over a backing sample store.
///
/// The window buffer is allocated lazily on the first cache miss and reused
/// for the lifetime of the cache; it is never reallocated. The resident
/// range never spans more records than fit in the configured byte budget,
/// and a single request larger than the budget fails with
/// [`LoaderError::Capacity`] rather than bypassing the window.
///
/// Reads take `&mut self`, so a read and any reload it triggers form one
/// atomic unit per call; the cache cannot be reentered mid-reload. Two
/// iteration contexts sharing one cache instance will thrash the window
/// against each other; give each its own instance.
pub struct WindowCache<S> {
    store: S,
    capacity_bytes: usize,
    max_records: usize,
    // (0, width) until the first miss, then (max_records, width) forever.
    window: Array2<f32>,
    // `None` is the empty range, so the first access always misses.
    valid: Option<Range<usize>>,
    reloads: u64,
}

impl<S: SampleStore> WindowCache<S> {
    /// Wraps `store` with a window of at most `capacity_bytes` bytes.
    ///
    /// Does not allocate; the buffer is allocated on the first miss.
    ///
    /// # Errors
    ///
    /// Returns an error if `capacity_bytes` is below the 1 MB floor or too
    /// small to hold a single record.
    pub fn new(store: S, capacity_bytes: usize) -> Result<Self> {
        if capacity_bytes < MIN_CAPACITY_BYTES {
            return Err(LoaderError::config(format!(
                "cache capacity of {capacity_bytes} bytes is below the \
                 {MIN_CAPACITY_BYTES}-byte floor"
            )));
        }

        let record_bytes = store.record_bytes();
        if record_bytes == 0 {
            return Err(LoaderError::config(
                "cannot cache a store with zero-byte records",
            ));
        }

        let max_records = capacity_bytes / record_bytes;
        if max_records == 0 {
            return Err(LoaderError::config(format!(
                "cache capacity of {capacity_bytes} bytes cannot hold a single \
                 {record_bytes}-byte record"
            )));
        }

        let width = store.record_width();
        Ok(Self {
            store,
            capacity_bytes,
            max_records,
            window: Array2::zeros((0, width)),
            valid: None,
            reloads: 0,
        })
    }

    /// The configured byte budget.
    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }

    /// Maximum number of records the window can hold.
    pub fn max_records(&self) -> usize {
        self.max_records
    }

    /// Number of reloads from the backing store so far.
    ///
    /// A read served from the resident window does not change this count,
    /// which makes hit/miss behavior observable without timing.
    pub fn reload_count(&self) -> u64 {
        self.reloads
    }

    /// The record range currently resident, if any.
    pub fn resident_range(&self) -> Option<Range<usize>> {
        self.valid.clone()
    }

    /// A reference to the wrapped store.
    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Unwraps the cache, returning the backing store.
    pub fn into_inner(self) -> S {
        self.store
    }

    /// Reads a single record.
    ///
    /// A negative index counts from the end of the store, resolving to the
    /// same record direct backing-store indexing would return.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds or a reload fails.
    pub fn read_row(&mut self, index: i64) -> Result<Array1<f32>> {
        let start = resolve_index(index, self.store.len())?;
        let lower = self.ensure_window(start, start + 1)?;
        Ok(self.window.row(start - lower).to_owned())
    }

    /// Reads the records selected by `start..stop` with `step`.
    ///
    /// Bounds follow slice conventions on the backing store: negative bounds
    /// count from the end, an absent `stop` means the end of the store, and
    /// out-of-range bounds are clamped. An empty selection returns an empty
    /// block without touching the window.
    ///
    /// # Errors
    ///
    /// Returns an error if `step` is zero, the resolved range exceeds the
    /// window capacity, or a reload fails.
    pub fn read_slice(
        &mut self,
        start: i64,
        stop: Option<i64>,
        step: usize,
    ) -> Result<Array2<f32>> {
        if step == 0 {
            return Err(LoaderError::config("slice step must be greater than 0"));
        }
        let len = self.store.len();
        let start = clamp_bound(start, len);
        let stop = stop.map_or(len, |s| clamp_bound(s, len));
        if start >= stop {
            return Ok(Array2::zeros((0, self.store.record_width())));
        }

        let lower = self.ensure_window(start, stop)?;
        let step = step as isize;
        Ok(self
            .window
            .slice(s![start - lower..stop - lower;step, ..])
            .to_owned())
    }

    /// Makes `[start, stop)` resident and returns the window's lower bound.
    ///
    /// Requires `start < stop <= self.store.len()`.
    fn ensure_window(&mut self, start: usize, stop: usize) -> Result<usize> {
        if let Some(valid) = &self.valid {
            if valid.start <= start && stop <= valid.end {
                return Ok(valid.start);
            }
        }

        if stop - start > self.max_records {
            return Err(LoaderError::capacity(start, stop, self.max_records));
        }

        if self.window.nrows() == 0 {
            tracing::info!(
                capacity_bytes = self.capacity_bytes,
                max_records = self.max_records,
                record_width = self.store.record_width(),
                "allocating window buffer"
            );
            self.window = Array2::zeros((self.max_records, self.store.record_width()));
        }

        // Fill greedily from `start` so near-sequential reads keep hitting
        // the same window instead of reloading per request.
        let copied = self.max_records.min(self.store.len() - start);
        let block = self.store.read_range(start, start + copied)?;
        self.window.slice_mut(s![..copied, ..]).assign(&block);
        self.valid = Some(start..start + copied);
        self.reloads += 1;
        tracing::debug!(
            start,
            stop = start + copied,
            reloads = self.reloads,
            "window reloaded"
        );

        Ok(start)
    }
}

impl<S: SampleStore> SampleStore for WindowCache<S> {
    fn len(&self) -> usize {
        self.store.len()
    }

    fn record_width(&self) -> usize {
        self.store.record_width()
    }

    fn elem_size(&self) -> usize {
        self.store.elem_size()
    }

    fn read_range(&mut self, start: usize, stop: usize) -> Result<Array2<f32>> {
        if start > stop || stop > self.store.len() {
            return Err(LoaderError::out_of_range(start, stop, self.store.len()));
        }
        if start == stop {
            return Ok(Array2::zeros((0, self.store.record_width())));
        }
        let lower = self.ensure_window(start, stop)?;
        Ok(self
            .window
            .slice(s![start - lower..stop - lower, ..])
            .to_owned())
    }
}

/// Resolves a possibly negative single index against `len`.
fn resolve_index(index: i64, len: usize) -> Result<usize> {
    let resolved = if index < 0 {
        len as i64 + index
    } else {
        index
    };
    if resolved < 0 || resolved as usize >= len {
        let start = resolved.max(0) as usize;
        return Err(LoaderError::out_of_range(start, start + 1, len));
    }
    Ok(resolved as usize)
}

/// Resolves a possibly negative slice bound against `len`, clamping to
/// `[0, len]` the way slicing on the backing store does.
fn clamp_bound(bound: i64, len: usize) -> usize {
    let resolved = if bound < 0 { len as i64 + bound } else { bound };
    resolved.clamp(0, len as i64) as usize
}
