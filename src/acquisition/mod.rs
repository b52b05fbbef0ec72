// src/acquisition/mod.rs
//! Sample acquisition: rolling channel history and the stream read loop

pub mod channel_buffer;
pub mod stream;

pub use channel_buffer::{ChannelRingBuffer, ShapeError};
pub use stream::{ByteSource, SampleStream, SourceIoError, StopHandle, StreamStats};
