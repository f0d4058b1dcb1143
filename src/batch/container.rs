// src/batch/container.rs

//! Batch containers and the sample-axis convention.

use ndarray::{s, Array2, Array3, ArrayD};

use crate::error::{LoaderError, Result};
use crate::store::SampleStore;

/// Which axis of a container carries the samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Axis 0: rows are samples.
    Sample,
    /// Axis 1: the second dimension is samples; the first is a time/step
    /// axis shared across all containers.
    Time,
}

impl Axis {
    /// Parses a numeric axis value.
    ///
    /// # Errors
    ///
    /// Returns an error for values outside `{0, 1}`.
    pub fn from_index(axis: usize) -> Result<Self> {
        match axis {
            0 => Ok(Self::Sample),
            1 => Ok(Self::Time),
            _ => Err(LoaderError::config(format!(
                "axis must be 0 or 1, got {axis}"
            ))),
        }
    }

    /// The numeric axis value.
    pub fn index(self) -> usize {
        match self {
            Self::Sample => 0,
            Self::Time => 1,
        }
    }
}

/// One container of samples fed to a minibatch iterator.
///
/// The variant tags which extraction algorithm applies; mask production is
/// uniform across variants and applied after extraction.
pub enum Container {
    /// A rectangular `(samples, features)` array. Samples on axis 0.
    Dense(Array2<f32>),
    /// A rectangular `(time, samples, features)` array. Samples on axis 1.
    TimeMajor(Array3<f32>),
    /// A backing store, possibly wrapped in a window cache. Samples on
    /// axis 0.
    Store(Box<dyn SampleStore>),
    /// Variable-length `(len_i, features)` elements, zero-padded to the
    /// longest element in each batch. Samples on axis 1.
    Ragged(Vec<Array2<f32>>),
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dense(a) => f.debug_tuple("Dense").field(&a.dim()).finish(),
            Self::TimeMajor(a) => f.debug_tuple("TimeMajor").field(&a.dim()).finish(),
            Self::Store(s) => f.debug_tuple("Store").field(&s.shape()).finish(),
            Self::Ragged(v) => f.debug_tuple("Ragged").field(&v.len()).finish(),
        }
    }
}

impl Container {
    /// Wraps a store (or window cache) as a container.
    pub fn store(store: impl SampleStore + 'static) -> Self {
        Self::Store(Box::new(store))
    }

    /// Number of samples along this container's sample axis.
    pub fn sample_count(&self) -> usize {
        match self {
            Self::Dense(rows) => rows.nrows(),
            Self::TimeMajor(block) => block.dim().1,
            Self::Store(store) => store.len(),
            Self::Ragged(elements) => elements.len(),
        }
    }

    /// The sample axis this variant is laid out for.
    pub fn natural_axis(&self) -> Axis {
        match self {
            Self::Dense(_) | Self::Store(_) => Axis::Sample,
            Self::TimeMajor(_) | Self::Ragged(_) => Axis::Time,
        }
    }

    fn variant_name(&self) -> &'static str {
        match self {
            Self::Dense(_) => "dense",
            Self::TimeMajor(_) => "time-major",
            Self::Store(_) => "store",
            Self::Ragged(_) => "ragged",
        }
    }

    /// Checks this container against the iterator's configured axis.
    pub(crate) fn check_axis(&self, axis: Axis) -> Result<()> {
        if self.natural_axis() == axis {
            return Ok(());
        }
        if matches!(self, Self::Ragged(_)) {
            return Err(LoaderError::config(
                "ragged containers cannot be padded along axis 0; \
                 use axis 1 (time-major)",
            ));
        }
        Err(LoaderError::config(format!(
            "{} containers carry samples on axis {}, but the iterator is \
             configured for axis {}",
            self.variant_name(),
            self.natural_axis().index(),
            axis.index()
        )))
    }

    /// Validates internal consistency. Ragged elements must share one
    /// feature width so a batch can be padded into one block.
    pub(crate) fn validate(&self) -> Result<()> {
        if let Self::Ragged(elements) = self {
            if let Some(first) = elements.first() {
                let width = first.ncols();
                for (i, elem) in elements.iter().enumerate() {
                    if elem.ncols() != width {
                        return Err(LoaderError::config(format!(
                            "ragged element {i} has width {}, expected {width}",
                            elem.ncols()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Extracts samples `[start, stop)` along the sample axis.
    ///
    /// The range is clamped to the container's end, so a short tail comes
    /// back as a batch narrower than requested rather than an error. Stores
    /// report a start past their end as [`LoaderError::OutOfRange`].
    pub(crate) fn extract(&mut self, start: usize, stop: usize) -> Result<ArrayD<f32>> {
        match self {
            Self::Dense(rows) => {
                let stop = stop.min(rows.nrows());
                let start = start.min(stop);
                Ok(rows.slice(s![start..stop, ..]).to_owned().into_dyn())
            }
            Self::TimeMajor(block) => {
                let stop = stop.min(block.dim().1);
                let start = start.min(stop);
                Ok(block.slice(s![.., start..stop, ..]).to_owned().into_dyn())
            }
            Self::Store(store) => {
                let stop = stop.min(store.len());
                if start > stop {
                    return Err(LoaderError::out_of_range(start, stop, store.len()));
                }
                Ok(store.read_range(start, stop)?.into_dyn())
            }
            Self::Ragged(elements) => {
                let stop = stop.min(elements.len());
                let start = start.min(stop);
                Ok(pad_ragged(&elements[start..stop]).into_dyn())
            }
        }
    }

    /// Builds the validity mask for a batch extracted from this container.
    ///
    /// The mask has the shape of `data` with the trailing feature axis
    /// dropped. Rectangular variants are fully valid; ragged masks are 1
    /// where the time index is inside the element and 0 in the padding.
    /// `data` must have just been extracted from `start`, so the element
    /// range is known to be in bounds.
    pub(crate) fn mask(&self, data: &ArrayD<f32>, start: usize) -> ArrayD<f32> {
        let dims = &data.shape()[..data.ndim() - 1];
        if let Self::Ragged(elements) = self {
            let (max_len, batch) = (dims[0], dims[1]);
            let mut mask = Array2::<f32>::zeros((max_len, batch));
            for (i, elem) in elements[start..start + batch].iter().enumerate() {
                mask.slice_mut(s![..elem.nrows(), i]).fill(1.0);
            }
            return mask.into_dyn();
        }
        ArrayD::ones(dims.to_vec())
    }
}

/// Pads ragged elements into a `(max_len, batch, features)` block, leaving
/// the area past each element's length zero.
fn pad_ragged(slice: &[Array2<f32>]) -> Array3<f32> {
    let batch = slice.len();
    let max_len = slice.iter().map(|e| e.nrows()).max().unwrap_or(0);
    let width = slice.first().map_or(0, |e| e.ncols());
    let mut padded = Array3::zeros((max_len, batch, width));
    for (i, elem) in slice.iter().enumerate() {
        padded.slice_mut(s![..elem.nrows(), i, ..]).assign(elem);
    }
    padded
}

/// Number of samples in an extracted batch along `axis`.
pub(crate) fn batch_len(data: &ArrayD<f32>, axis: Axis) -> usize {
    data.shape().get(axis.index()).copied().unwrap_or(0)
}
