//! wlemg-core: acquisition core for a wireless EMG biosensor
//!
//! This library turns the raw byte stream of a wireless surface-EMG sensor
//! into calibrated, quality-annotated channel data. It provides:
//!
//! - Frame resynchronization over arbitrarily chunked byte input
//! - Decoding of muscle (microvolt) and motion (gyro/accelerometer) frames
//! - A rolling per-channel history buffer sized for display windows
//! - An adaptive per-channel signal quality classifier with hysteresis
//! - A synthetic signal source for development without hardware
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use wlemg_core::config::PipelineConfig;
//! use wlemg_core::acquisition::SampleStream;
//! use wlemg_core::pipeline::SignalPipeline;
//! use wlemg_core::source::{SyntheticByteSource, SyntheticConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::default();
//!     let source = SyntheticByteSource::new(SyntheticConfig::default());
//!     let mut stream = SampleStream::new(source, &config.stream);
//!     let mut pipeline = SignalPipeline::new(&config);
//!
//!     while let Some(sample) = stream.next_sample().await? {
//!         pipeline.ingest(&sample)?;
//!         if !pipeline.quality().calibrating() {
//!             println!("levels: {:?}", pipeline.quality_levels());
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod config;
pub mod pipeline;
pub mod protocol;
pub mod quality;
pub mod source;

// Re-export commonly used types for convenience
pub use acquisition::{
    ByteSource, ChannelRingBuffer, SampleStream, ShapeError, SourceIoError, StopHandle,
    StreamStats,
};
pub use config::{ConfigError, PipelineConfig, QualityConfig, StreamConfig};
pub use pipeline::SignalPipeline;
pub use protocol::{
    decode_frame, DecodeError, FrameSynchronizer, MotionSample, MuscleSample, Sample,
};
pub use quality::{QualityClassifier, QualityLevel};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
