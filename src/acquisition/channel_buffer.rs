// src/acquisition/channel_buffer.rs
//! Rolling per-channel history for live display
//!
//! Fixed-capacity circular store over a channels-by-capacity matrix. One
//! producer appends decoded samples, one consumer snapshots the window for
//! rendering; neither path allocates beyond the snapshot copy and neither
//! blocks. Not designed for concurrent mutation.

use ndarray::{concatenate, s, Array2, Axis};
use thiserror::Error;

/// Contract violation: a sample with the wrong number of channel values.
///
/// This is a programming error on the caller's side and is surfaced rather
/// than silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("expected {expected} channel values, got {actual}")]
pub struct ShapeError {
    /// Channel count the buffer was built for.
    pub expected: usize,
    /// Channel count of the rejected sample.
    pub actual: usize,
}

/// Fixed-capacity rolling buffer of per-channel signal magnitudes.
///
/// Capacity is fixed at construction (sample rate times window seconds for
/// display use); the buffer never grows.
#[derive(Debug, Clone)]
pub struct ChannelRingBuffer {
    data: Array2<f32>,
    channels: usize,
    capacity: usize,
    index: usize,
    filled: bool,
}

impl ChannelRingBuffer {
    /// Create a buffer holding `capacity` samples for `channels` channels.
    ///
    /// # Panics
    ///
    /// Panics if `channels` or `capacity` is zero; both come from validated
    /// configuration.
    pub fn new(channels: usize, capacity: usize) -> Self {
        assert!(channels > 0, "channel count must be non-zero");
        assert!(capacity > 0, "capacity must be non-zero");
        Self {
            data: Array2::zeros((channels, capacity)),
            channels,
            capacity,
            index: 0,
            filled: false,
        }
    }

    /// Append one multi-channel sample, overwriting the oldest once full.
    pub fn append(&mut self, values: &[f32]) -> Result<(), ShapeError> {
        if values.len() != self.channels {
            return Err(ShapeError {
                expected: self.channels,
                actual: values.len(),
            });
        }
        for (channel, &value) in values.iter().enumerate() {
            self.data[[channel, self.index]] = value;
        }
        self.index = (self.index + 1) % self.capacity;
        if self.index == 0 {
            self.filled = true;
        }
        Ok(())
    }

    /// All currently-held samples as a channels-by-length matrix, ordered
    /// oldest to newest.
    ///
    /// Before the first wrap this returns only the samples written so far.
    pub fn snapshot(&self) -> Array2<f32> {
        if !self.filled {
            self.data.slice(s![.., ..self.index]).to_owned()
        } else {
            concatenate![
                Axis(1),
                self.data.slice(s![.., self.index..]),
                self.data.slice(s![.., ..self.index])
            ]
        }
    }

    /// Reset to empty, zeroing the backing storage.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
        self.index = 0;
        self.filled = false;
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        if self.filled {
            self.capacity
        } else {
            self.index
        }
    }

    /// Whether no samples have been appended since creation or `clear`.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the buffer has wrapped at least once.
    pub fn is_full(&self) -> bool {
        self.filled
    }

    /// Configured channel count.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Configured capacity in samples.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
