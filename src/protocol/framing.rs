// src/protocol/framing.rs
//! Frame synchronization for the raw WL-EMG byte stream
//!
//! The radio link delivers bytes in arbitrary chunks with no alignment
//! guarantees: frames may be split across reads, preceded by garbage, or
//! partially lost. The synchronizer accumulates incoming bytes, hunts for the
//! 3-byte marker and slices out exactly [`FRAME_LENGTH`] bytes per frame.
//! Framing loss is expected on a live link and is counted, not reported as an
//! error.

use crate::protocol::types::{RawFrame, FRAME_LENGTH, FRAME_MARKER};

/// Resynchronizing frame extractor over an arbitrarily-chunked byte stream.
///
/// Guarantees: every emitted frame starts with [`FRAME_MARKER`] and is exactly
/// [`FRAME_LENGTH`] bytes long. The internal accumulator never retains more
/// than `FRAME_LENGTH - 1` bytes when no marker is present, so memory stays
/// bounded under sustained non-frame noise.
#[derive(Debug, Default)]
pub struct FrameSynchronizer {
    accumulator: Vec<u8>,
    frames_recovered: u64,
    bytes_discarded: u64,
}

impl FrameSynchronizer {
    /// Create an empty synchronizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append newly-arrived bytes and lazily drain any complete frames.
    ///
    /// The returned iterator borrows the synchronizer; frames left unconsumed
    /// stay in the accumulator and are yielded by the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Frames<'_> {
        self.accumulator.extend_from_slice(bytes);
        Frames { sync: self }
    }

    /// Total frames emitted so far.
    pub fn frames_recovered(&self) -> u64 {
        self.frames_recovered
    }

    /// Total garbage bytes dropped while hunting for the marker.
    pub fn bytes_discarded(&self) -> u64 {
        self.bytes_discarded
    }

    /// Number of bytes currently waiting for more data.
    pub fn pending_len(&self) -> usize {
        self.accumulator.len()
    }

    /// Drop all buffered bytes, e.g. when a connection is restarted.
    pub fn reset(&mut self) {
        self.accumulator.clear();
    }

    fn extract_frame(&mut self) -> Option<RawFrame> {
        while self.accumulator.len() >= FRAME_LENGTH {
            let marker_pos = find_marker(&self.accumulator);

            let pos = match marker_pos {
                Some(pos) => pos,
                None => {
                    // No marker anywhere: keep only the tail that could still
                    // hold the start of a marker straddling the chunk boundary.
                    let keep = FRAME_LENGTH - 1;
                    if self.accumulator.len() > keep {
                        let dropped = self.accumulator.len() - keep;
                        self.discard(dropped);
                    }
                    return None;
                }
            };

            if pos > 0 {
                // Leading noise before the marker.
                self.discard(pos);
            }

            if self.accumulator.len() < FRAME_LENGTH {
                return None;
            }

            let mut frame = [0u8; FRAME_LENGTH];
            frame.copy_from_slice(&self.accumulator[..FRAME_LENGTH]);
            self.accumulator.drain(..FRAME_LENGTH);
            self.frames_recovered += 1;
            return Some(frame);
        }
        None
    }

    fn discard(&mut self, count: usize) {
        self.accumulator.drain(..count);
        self.bytes_discarded += count as u64;
        tracing::trace!(bytes = count, "discarded unsynchronized bytes");
    }
}

/// Draining iterator of complete frames, produced by [`FrameSynchronizer::feed`].
pub struct Frames<'a> {
    sync: &'a mut FrameSynchronizer,
}

impl Iterator for Frames<'_> {
    type Item = RawFrame;

    fn next(&mut self) -> Option<RawFrame> {
        self.sync.extract_frame()
    }
}

fn find_marker(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(FRAME_MARKER.len())
        .position(|window| window == FRAME_MARKER)
}
