// src/batch/iterator.rs

use ndarray::ArrayD;

use crate::config::IteratorConfig;
use crate::error::{LoaderError, Result};

use super::container::{batch_len, Axis, Container};

/// A cursor over aligned containers, yielding fixed-size minibatches.
///
/// Each draw slices every container at the same index range along the
/// configured sample axis. `advance` returns `Ok(Some(batch))` with one
/// array per container (or `(data, mask)` pairs when masks are enabled) and
/// `Ok(None)` at the end of an epoch. Epoch end always rewinds the cursor,
/// so the next call starts a fresh epoch.
///
/// A trailing batch narrower than `minibatch_size` is dropped, never
/// returned; callers can rely on every batch having the full size.
pub struct MinibatchIterator {
    containers: Vec<Container>,
    minibatch_size: usize,
    axis: Axis,
    start_index: usize,
    stop_index: usize,
    cursor: usize,
    make_mask: bool,
}

impl std::fmt::Debug for MinibatchIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MinibatchIterator")
            .field("containers", &self.containers.len())
            .field("minibatch_size", &self.minibatch_size)
            .field("axis", &self.axis)
            .field("start_index", &self.start_index)
            .field("stop_index", &self.stop_index)
            .field("cursor", &self.cursor)
            .field("make_mask", &self.make_mask)
            .finish()
    }
}

impl MinibatchIterator {
    /// Builds an iterator over `containers`.
    ///
    /// An absent `stop_index` resolves here, once, to the shortest
    /// container's sample count.
    ///
    /// # Errors
    ///
    /// Returns an error if the container list is empty, `minibatch_size` is
    /// zero, the axis value is invalid, a container's layout does not match
    /// the axis, or a ragged container has mixed feature widths.
    pub fn new(containers: Vec<Container>, config: &IteratorConfig) -> Result<Self> {
        if containers.is_empty() {
            return Err(LoaderError::config("at least one container is required"));
        }
        if config.minibatch_size == 0 {
            return Err(LoaderError::config(
                "minibatch_size must be greater than 0",
            ));
        }
        let axis = Axis::from_index(config.axis)?;
        for container in &containers {
            container.check_axis(axis)?;
            container.validate()?;
        }

        let shortest = containers
            .iter()
            .map(Container::sample_count)
            .min()
            .unwrap_or(0);
        let stop_index = config.stop_index.unwrap_or(shortest);

        Ok(Self {
            containers,
            minibatch_size: config.minibatch_size,
            axis,
            start_index: config.start_index,
            stop_index,
            cursor: config.start_index,
            make_mask: config.make_mask,
        })
    }

    /// Declares one-hot class sizes for categorical containers.
    ///
    /// `sizes` must have one entry per container; `None` leaves a container
    /// untouched. Expansion itself is not implemented, so any `Some` entry
    /// is rejected here instead of miscomputing later.
    ///
    /// # Errors
    ///
    /// Returns an error if the lengths differ or any expansion is requested.
    pub fn with_one_hot_classes(self, sizes: &[Option<usize>]) -> Result<Self> {
        if sizes.len() != self.containers.len() {
            return Err(LoaderError::config(format!(
                "got {} one-hot class sizes for {} containers",
                sizes.len(),
                self.containers.len()
            )));
        }
        if sizes.iter().any(Option::is_some) {
            return Err(LoaderError::config(
                "one-hot conversion is not implemented",
            ));
        }
        Ok(self)
    }

    /// Draws the next minibatch.
    ///
    /// Returns `Ok(None)` when the epoch is exhausted: the next range would
    /// pass `stop_index`, a container came back short or misaligned, or a
    /// backing store reported the range out of bounds. The cursor is
    /// rewound in every one of those cases. Other errors also rewind the
    /// cursor before propagating, so a failed call never leaves a
    /// half-consumed epoch behind.
    pub fn advance(&mut self) -> Result<Option<Vec<ArrayD<f32>>>> {
        let start = self.cursor;
        let stop = start + self.minibatch_size;
        if stop > self.stop_index {
            self.reset();
            return Ok(None);
        }

        let mut batch = Vec::with_capacity(if self.make_mask {
            self.containers.len() * 2
        } else {
            self.containers.len()
        });
        for i in 0..self.containers.len() {
            let data = match self.containers[i].extract(start, stop) {
                Ok(data) => data,
                Err(e) if e.is_out_of_range() => {
                    self.reset();
                    return Ok(None);
                }
                Err(e) => {
                    self.reset();
                    return Err(e);
                }
            };
            // Every container must span the full minibatch along the sample
            // axis; a short or misaligned one ends the epoch.
            if batch_len(&data, self.axis) != self.minibatch_size {
                self.reset();
                return Ok(None);
            }
            if self.make_mask {
                let mask = self.containers[i].mask(&data, start);
                batch.push(data);
                batch.push(mask);
            } else {
                batch.push(data);
            }
        }

        self.cursor = stop;
        Ok(Some(batch))
    }

    /// Rewinds the cursor to the start of the epoch.
    pub fn reset(&mut self) {
        self.cursor = self.start_index;
    }

    /// Number of samples per minibatch.
    pub fn minibatch_size(&self) -> usize {
        self.minibatch_size
    }

    /// The configured sample axis.
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// The resolved exclusive upper bound of the epoch.
    pub fn stop_index(&self) -> usize {
        self.stop_index
    }

    /// The current cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Fraction of the epoch consumed, between 0.0 and 1.0.
    pub fn progress(&self) -> f64 {
        let total = self.stop_index.saturating_sub(self.start_index);
        if total == 0 {
            return 1.0;
        }
        let done = self.cursor.saturating_sub(self.start_index);
        (done as f64 / total as f64).min(1.0)
    }
}

impl Iterator for MinibatchIterator {
    type Item = Result<Vec<ArrayD<f32>>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::WindowCache;
    use crate::config::MIN_CAPACITY_BYTES;
    use crate::store::MemStore;
    use ndarray::{Array2, Array3};

    fn dense(n: usize, width: usize) -> Container {
        Container::Dense(Array2::from_shape_fn((n, width), |(i, j)| {
            (i * width + j) as f32
        }))
    }

    fn ragged(lengths: &[usize], width: usize) -> Container {
        Container::Ragged(
            lengths
                .iter()
                .map(|&n| Array2::from_shape_fn((n, width), |(i, j)| (i * width + j) as f32))
                .collect(),
        )
    }

    fn config(minibatch_size: usize, axis: usize) -> IteratorConfig {
        IteratorConfig {
            minibatch_size,
            axis,
            ..IteratorConfig::default()
        }
    }

    #[test]
    fn test_epoch_batch_count() {
        let mut iter = MinibatchIterator::new(vec![dense(12, 2)], &config(3, 0)).unwrap();

        for i in 0..4 {
            let batch = iter.advance().unwrap().unwrap();
            assert_eq!(batch.len(), 1);
            assert_eq!(batch[0].shape(), &[3, 2]);
            assert_eq!(batch[0][[0, 0]], (i * 3 * 2) as f32);
        }
        assert!(iter.advance().unwrap().is_none());

        // The implicit reset starts a fresh epoch.
        let batch = iter.advance().unwrap().unwrap();
        assert_eq!(batch[0][[0, 0]], 0.0);
    }

    #[test]
    fn test_reset_reproduces_slices() {
        let mut iter = MinibatchIterator::new(vec![dense(20, 3)], &config(5, 0)).unwrap();

        let mut first = Vec::new();
        while let Some(batch) = iter.advance().unwrap() {
            first.push(batch);
        }

        iter.reset();
        let mut second = Vec::new();
        while let Some(batch) = iter.advance().unwrap() {
            second.push(batch);
        }

        assert_eq!(first.len(), 4);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a[0], b[0]);
        }
    }

    #[test]
    fn test_partial_final_batch_is_dropped() {
        let mut iter = MinibatchIterator::new(vec![dense(10, 2)], &config(3, 0)).unwrap();

        let mut count = 0;
        while iter.advance().unwrap().is_some() {
            count += 1;
        }
        // 10 % 3 leaves a 1-sample tail, which is never returned.
        assert_eq!(count, 3);
    }

    #[test]
    fn test_start_and_stop_bounds() {
        let config = IteratorConfig {
            minibatch_size: 4,
            start_index: 2,
            stop_index: Some(14),
            ..IteratorConfig::default()
        };
        let mut iter = MinibatchIterator::new(vec![dense(20, 1)], &config).unwrap();

        let batch = iter.advance().unwrap().unwrap();
        assert_eq!(batch[0][[0, 0]], 2.0);
        let batch = iter.advance().unwrap().unwrap();
        assert_eq!(batch[0][[0, 0]], 6.0);
        let batch = iter.advance().unwrap().unwrap();
        assert_eq!(batch[0][[0, 0]], 10.0);
        // [14, 18) passes stop_index 14.
        assert!(iter.advance().unwrap().is_none());
        assert_eq!(iter.cursor(), 2);
    }

    #[test]
    fn test_misaligned_containers_end_epoch() {
        let config = IteratorConfig {
            minibatch_size: 5,
            stop_index: Some(10),
            ..IteratorConfig::default()
        };
        let mut iter =
            MinibatchIterator::new(vec![dense(10, 2), dense(7, 2)], &config).unwrap();

        // [0, 5) fits both containers.
        assert!(iter.advance().unwrap().is_some());
        // [5, 10) comes back short from the 7-sample container.
        assert!(iter.advance().unwrap().is_none());
        assert_eq!(iter.cursor(), 0);
    }

    #[test]
    fn test_stop_resolves_to_shortest_container() {
        let iter = MinibatchIterator::new(vec![dense(10, 2), dense(7, 2)], &config(2, 0)).unwrap();
        assert_eq!(iter.stop_index(), 7);
    }

    #[test]
    fn test_dense_masks_interleaved() {
        let config = IteratorConfig {
            minibatch_size: 2,
            make_mask: true,
            ..IteratorConfig::default()
        };
        let mut iter =
            MinibatchIterator::new(vec![dense(6, 3), dense(6, 4)], &config).unwrap();

        let batch = iter.advance().unwrap().unwrap();
        assert_eq!(batch.len(), 4);
        assert_eq!(batch[0].shape(), &[2, 3]);
        assert_eq!(batch[1].shape(), &[2]);
        assert_eq!(batch[2].shape(), &[2, 4]);
        assert_eq!(batch[3].shape(), &[2]);
        assert!(batch[1].iter().all(|&v| v == 1.0));
        assert!(batch[3].iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_ragged_batches_padded_and_masked() {
        let config = IteratorConfig {
            minibatch_size: 3,
            axis: 1,
            make_mask: true,
            ..IteratorConfig::default()
        };
        let mut iter = MinibatchIterator::new(vec![ragged(&[3, 5, 2], 4)], &config).unwrap();

        let batch = iter.advance().unwrap().unwrap();
        assert_eq!(batch.len(), 2);
        let (data, mask) = (&batch[0], &batch[1]);
        assert_eq!(data.shape(), &[5, 3, 4]);
        assert_eq!(mask.shape(), &[5, 3]);

        for (i, &len) in [3usize, 5, 2].iter().enumerate() {
            for row in 0..5 {
                let expected = if row < len { 1.0 } else { 0.0 };
                assert_eq!(mask[[row, i]], expected, "mask[{row}, {i}]");
            }
        }

        assert!(iter.advance().unwrap().is_none());
    }

    #[test]
    fn test_time_major_axis_one() {
        let block = Array3::from_shape_fn((4, 9, 2), |(t, s, f)| (t * 100 + s * 10 + f) as f32);
        let mut iter =
            MinibatchIterator::new(vec![Container::TimeMajor(block)], &config(3, 1)).unwrap();

        let mut count = 0;
        while let Some(batch) = iter.advance().unwrap() {
            assert_eq!(batch[0].shape(), &[4, 3, 2]);
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn test_store_container_epoch() {
        let rows = Array2::from_shape_fn((16, 2), |(i, j)| (i * 2 + j) as f32);
        let cache = WindowCache::new(MemStore::from_array(rows), MIN_CAPACITY_BYTES).unwrap();
        let mut iter =
            MinibatchIterator::new(vec![Container::store(cache)], &config(4, 0)).unwrap();

        let mut count = 0;
        while let Some(batch) = iter.advance().unwrap() {
            assert_eq!(batch[0].shape(), &[4, 2]);
            assert_eq!(batch[0][[0, 0]], (count * 8) as f32);
            count += 1;
        }
        assert_eq!(count, 4);
    }

    #[test]
    fn test_store_out_of_range_ends_epoch() {
        // An explicit stop past the store's end: the over-reach surfaces as
        // epoch end, not a hard failure.
        let config = IteratorConfig {
            minibatch_size: 5,
            stop_index: Some(15),
            ..IteratorConfig::default()
        };
        let mut iter = MinibatchIterator::new(
            vec![Container::store(MemStore::from_array(Array2::zeros((10, 2))))],
            &config,
        )
        .unwrap();

        assert!(iter.advance().unwrap().is_some());
        assert!(iter.advance().unwrap().is_some());
        // [10, 15) starts past the last record.
        assert!(iter.advance().unwrap().is_none());
        assert_eq!(iter.cursor(), 0);

        // A start index past the store's end trips the store's range check
        // on the very first draw; that too is just epoch end.
        let config = IteratorConfig {
            minibatch_size: 5,
            start_index: 12,
            stop_index: Some(20),
            ..IteratorConfig::default()
        };
        let mut iter = MinibatchIterator::new(
            vec![Container::store(MemStore::from_array(Array2::zeros((10, 2))))],
            &config,
        )
        .unwrap();
        assert!(iter.advance().unwrap().is_none());
        assert_eq!(iter.cursor(), 12);
    }

    #[test]
    fn test_rejects_bad_construction() {
        assert!(MinibatchIterator::new(vec![], &config(4, 0)).is_err());
        assert!(MinibatchIterator::new(vec![dense(8, 2)], &config(0, 0)).is_err());
        assert!(MinibatchIterator::new(vec![dense(8, 2)], &config(4, 2)).is_err());
        // Dense layout on the time axis and ragged on the sample axis both
        // fail loudly.
        assert!(MinibatchIterator::new(vec![dense(8, 2)], &config(4, 1)).is_err());
        assert!(MinibatchIterator::new(vec![ragged(&[2, 3], 2)], &config(2, 0)).is_err());
    }

    #[test]
    fn test_one_hot_classes() {
        let iter = MinibatchIterator::new(vec![dense(8, 2), dense(8, 2)], &config(2, 0)).unwrap();
        let iter = iter.with_one_hot_classes(&[None, None]).unwrap();

        let result = iter.with_one_hot_classes(&[None]);
        assert!(result.is_err());

        let iter = MinibatchIterator::new(vec![dense(8, 2)], &config(2, 0)).unwrap();
        let result = iter.with_one_hot_classes(&[Some(10)]);
        assert!(result.unwrap_err().to_string().contains("not implemented"));
    }

    #[test]
    fn test_iterator_adapter() {
        let iter = MinibatchIterator::new(vec![dense(12, 2)], &config(4, 0)).unwrap();
        let batches: Vec<_> = iter.map(|r| r.unwrap()).collect();
        assert_eq!(batches.len(), 3);
    }

    #[test]
    fn test_progress() {
        let mut iter = MinibatchIterator::new(vec![dense(10, 1)], &config(5, 0)).unwrap();
        assert_eq!(iter.progress(), 0.0);
        iter.advance().unwrap();
        assert!((iter.progress() - 0.5).abs() < f64::EPSILON);
        iter.advance().unwrap();
        assert!((iter.progress() - 1.0).abs() < f64::EPSILON);
    }
}
