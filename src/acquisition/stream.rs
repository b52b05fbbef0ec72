// src/acquisition/stream.rs
//! Byte-source read loop producing typed samples
//!
//! [`SampleStream`] pulls chunks from a [`ByteSource`], resynchronizes frames
//! and decodes them, exposing the result as a pull-based sequence instead of
//! a registered callback. Corrupt frames are counted and dropped; only a
//! source I/O failure ends the stream. Cancellation is cooperative: the stop
//! flag is checked every iteration and each read is bounded by the configured
//! timeout, so stop latency is bounded too.

use crate::config::StreamConfig;
use crate::protocol::{decode_frame, FrameSynchronizer, Sample};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Byte source failure; the only error class that terminates the pipeline.
#[derive(Debug, Error)]
pub enum SourceIoError {
    /// Underlying transport I/O failure.
    #[error("byte source I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// The transport reported that the link is gone.
    #[error("byte source disconnected: {0}")]
    Disconnected(String),
}

/// External collaborator delivering raw bytes from a radio or serial link.
///
/// Implementations must return whatever bytes are currently available within
/// `timeout`, returning an empty buffer on a quiet link rather than blocking
/// indefinitely. No framing is expected: any chunking is acceptable.
#[async_trait]
pub trait ByteSource: Send {
    /// Read available bytes, waiting at most `timeout`.
    async fn read_available(&mut self, timeout: Duration) -> Result<Vec<u8>, SourceIoError>;
}

/// Cloneable handle that requests a cooperative stop of the read loop.
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// Ask the stream to finish after its current iteration.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Counters describing the life of one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Raw bytes received from the source.
    pub bytes_received: u64,
    /// Marker-aligned frames recovered by the synchronizer.
    pub frames_recovered: u64,
    /// Garbage bytes discarded while hunting for the marker.
    pub bytes_discarded: u64,
    /// Frames decoded into typed samples.
    pub frames_decoded: u64,
    /// Frames dropped because they failed to decode.
    pub decode_errors: u64,
}

/// Lazy sequence of typed samples pulled from a byte source.
///
/// One stream per connection; constructing a new stream on reconnect starts
/// from a clean synchronizer.
pub struct SampleStream<S: ByteSource> {
    source: S,
    sync: FrameSynchronizer,
    pending: VecDeque<Sample>,
    stop: Arc<AtomicBool>,
    read_timeout: Duration,
    idle_sleep: Duration,
    bytes_received: u64,
    frames_decoded: u64,
    decode_errors: u64,
}

impl<S: ByteSource> SampleStream<S> {
    /// Wrap a byte source with the given read-loop settings.
    pub fn new(source: S, config: &StreamConfig) -> Self {
        Self {
            source,
            sync: FrameSynchronizer::new(),
            pending: VecDeque::new(),
            stop: Arc::new(AtomicBool::new(false)),
            read_timeout: config.read_timeout(),
            idle_sleep: config.idle_sleep(),
            bytes_received: 0,
            frames_decoded: 0,
            decode_errors: 0,
        }
    }

    /// Handle for stopping this stream from another task.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: Arc::clone(&self.stop),
        }
    }

    /// Pull the next decoded sample.
    ///
    /// Waits for data when the link is quiet, sleeping briefly between polls
    /// so the loop never busy-spins. Returns `Ok(None)` once a stop has been
    /// requested and all already-decoded samples are drained; a source error
    /// ends the stream and is propagated to the caller.
    pub async fn next_sample(&mut self) -> Result<Option<Sample>, SourceIoError> {
        loop {
            if let Some(sample) = self.pending.pop_front() {
                return Ok(Some(sample));
            }
            if self.stop.load(Ordering::Relaxed) {
                tracing::debug!(
                    frames_decoded = self.frames_decoded,
                    "sample stream stopped"
                );
                return Ok(None);
            }

            let bytes = self.source.read_available(self.read_timeout).await?;
            if bytes.is_empty() {
                tokio::time::sleep(self.idle_sleep).await;
                continue;
            }
            self.bytes_received += bytes.len() as u64;

            for frame in self.sync.feed(&bytes) {
                match decode_frame(&frame) {
                    Ok(sample) => self.pending.push_back(sample),
                    Err(err) => {
                        self.decode_errors += 1;
                        tracing::warn!(error = %err, "dropping undecodable frame");
                    }
                }
            }
            self.frames_decoded += self.pending.len() as u64;
        }
    }

    /// Counters accumulated since the stream was created.
    pub fn stats(&self) -> StreamStats {
        StreamStats {
            bytes_received: self.bytes_received,
            frames_recovered: self.sync.frames_recovered(),
            bytes_discarded: self.sync.bytes_discarded(),
            frames_decoded: self.frames_decoded,
            decode_errors: self.decode_errors,
        }
    }

    /// Give the wrapped source back, e.g. to close the transport.
    pub fn into_source(self) -> S {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode_muscle_frame, MUSCLE_CHANNEL_COUNT};

    /// Test double replaying scripted chunks, then reporting a quiet link.
    struct ScriptedSource {
        chunks: VecDeque<Vec<u8>>,
        fail_after: Option<usize>,
        reads: usize,
    }

    impl ScriptedSource {
        fn new(chunks: Vec<Vec<u8>>) -> Self {
            Self {
                chunks: chunks.into(),
                fail_after: None,
                reads: 0,
            }
        }

        fn failing_after(chunks: Vec<Vec<u8>>, reads: usize) -> Self {
            Self {
                chunks: chunks.into(),
                fail_after: Some(reads),
                reads: 0,
            }
        }
    }

    #[async_trait]
    impl ByteSource for ScriptedSource {
        async fn read_available(&mut self, _timeout: Duration) -> Result<Vec<u8>, SourceIoError> {
            if let Some(limit) = self.fail_after {
                if self.reads >= limit {
                    return Err(SourceIoError::Disconnected("link lost".to_string()));
                }
            }
            self.reads += 1;
            Ok(self.chunks.pop_front().unwrap_or_default())
        }
    }

    fn fast_config() -> StreamConfig {
        StreamConfig {
            read_timeout_ms: 10,
            idle_sleep_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_samples_emerge_from_chunked_bytes() {
        let first = encode_muscle_frame(1, &[5; MUSCLE_CHANNEL_COUNT]);
        let second = encode_muscle_frame(2, &[6; MUSCLE_CHANNEL_COUNT]);

        // Two frames delivered as three ragged chunks with leading noise.
        let mut bytes = vec![0x00, 0x17];
        bytes.extend_from_slice(&first);
        bytes.extend_from_slice(&second);
        let chunks = vec![
            bytes[..7].to_vec(),
            bytes[7..40].to_vec(),
            bytes[40..].to_vec(),
        ];

        let mut stream = SampleStream::new(ScriptedSource::new(chunks), &fast_config());
        let stop = stream.stop_handle();

        let a = stream.next_sample().await.unwrap().unwrap();
        let b = stream.next_sample().await.unwrap().unwrap();
        assert_eq!(a.sequence(), 1);
        assert_eq!(b.sequence(), 2);

        stop.stop();
        assert!(stream.next_sample().await.unwrap().is_none());

        let stats = stream.stats();
        assert_eq!(stats.frames_recovered, 2);
        assert_eq!(stats.frames_decoded, 2);
        assert_eq!(stats.bytes_discarded, 2);
        assert_eq!(stats.decode_errors, 0);
    }

    #[tokio::test]
    async fn test_corrupt_frame_is_dropped_not_fatal() {
        let good = encode_muscle_frame(9, &[1; MUSCLE_CHANNEL_COUNT]);
        let mut corrupt = encode_muscle_frame(10, &[2; MUSCLE_CHANNEL_COUNT]);
        corrupt[3] = 0xEE; // unknown type byte

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&corrupt);
        bytes.extend_from_slice(&good);

        let mut stream = SampleStream::new(ScriptedSource::new(vec![bytes]), &fast_config());
        let sample = stream.next_sample().await.unwrap().unwrap();
        assert_eq!(sample.sequence(), 9);

        let stats = stream.stats();
        assert_eq!(stats.decode_errors, 1);
        assert_eq!(stats.frames_decoded, 1);
    }

    #[tokio::test]
    async fn test_source_error_terminates_stream() {
        let frame = encode_muscle_frame(3, &[7; MUSCLE_CHANNEL_COUNT]);
        let mut stream = SampleStream::new(
            ScriptedSource::failing_after(vec![frame.to_vec()], 1),
            &fast_config(),
        );

        assert!(stream.next_sample().await.unwrap().is_some());
        let err = stream.next_sample().await.unwrap_err();
        assert!(matches!(err, SourceIoError::Disconnected(_)));
    }

    #[tokio::test]
    async fn test_stop_drains_pending_samples_first() {
        let first = encode_muscle_frame(1, &[0; MUSCLE_CHANNEL_COUNT]);
        let second = encode_muscle_frame(2, &[0; MUSCLE_CHANNEL_COUNT]);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&first);
        bytes.extend_from_slice(&second);

        let mut stream = SampleStream::new(ScriptedSource::new(vec![bytes]), &fast_config());
        let stop = stream.stop_handle();

        // Both frames decode on the first read; stop before draining.
        let a = stream.next_sample().await.unwrap().unwrap();
        stop.stop();
        let b = stream.next_sample().await.unwrap().unwrap();
        assert_eq!((a.sequence(), b.sequence()), (1, 2));
        assert!(stream.next_sample().await.unwrap().is_none());
        assert!(stop.is_stopped());
    }
}
