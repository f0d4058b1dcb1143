// src/batch/mod.rs

//! Minibatch extraction over aligned containers.
//!
//! A [`MinibatchIterator`] walks one or more equally long containers in
//! fixed-size steps along a shared sample axis. Containers are tagged by
//! layout ([`Container`]): rectangular variants slice directly, ragged
//! variants are zero-padded to the longest element in each batch, and store
//! variants read through a [`SampleStore`](crate::store::SampleStore),
//! typically one wrapped in a window cache. Validity masks can be
//! interleaved with the data for variable-length sequence batches.

mod container;
mod iterator;

pub use container::{Axis, Container};
pub use iterator::MinibatchIterator;
