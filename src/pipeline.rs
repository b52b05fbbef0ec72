// src/pipeline.rs
//! Routing decoded samples into history and quality state
//!
//! One pipeline per session: muscle samples land in the rolling display
//! buffer and the quality classifier, the latest motion sample is retained
//! for orientation display. Single mutator, no locks; consumers needing
//! concurrent access must own independent copies per the concurrency model.

use crate::acquisition::{ChannelRingBuffer, ShapeError};
use crate::config::PipelineConfig;
use crate::protocol::{MotionSample, Sample};
use crate::quality::{QualityClassifier, QualityLevel};
use ndarray::Array2;

/// Owns the per-session display and quality state fed by one sample stream.
#[derive(Debug, Clone)]
pub struct SignalPipeline {
    history: ChannelRingBuffer,
    quality: QualityClassifier,
    last_motion: Option<MotionSample>,
    muscle_samples: u64,
    motion_samples: u64,
}

impl SignalPipeline {
    /// Build the pipeline from a validated configuration.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            history: ChannelRingBuffer::new(config.channel_count, config.history_capacity()),
            quality: QualityClassifier::new(config.quality.clone(), config.channel_count),
            last_motion: None,
            muscle_samples: 0,
            motion_samples: 0,
        }
    }

    /// Route one decoded sample to its consumers.
    ///
    /// Muscle samples must carry the configured channel count; a mismatch is
    /// a contract violation surfaced to the caller, and the sample is not
    /// partially applied.
    pub fn ingest(&mut self, sample: &Sample) -> Result<(), ShapeError> {
        match sample {
            Sample::Muscle(muscle) => {
                self.history.append(&muscle.channels_uv)?;
                for (channel, &value) in muscle.channels_uv.iter().enumerate() {
                    self.quality.observe(channel, value);
                }
                self.muscle_samples += 1;
            }
            Sample::Motion(motion) => {
                self.last_motion = Some(motion.clone());
                self.motion_samples += 1;
            }
        }
        Ok(())
    }

    /// Oldest-to-newest channel history for rendering.
    pub fn history_snapshot(&self) -> Array2<f32> {
        self.history.snapshot()
    }

    /// Current per-channel quality levels.
    pub fn quality_levels(&self) -> Vec<QualityLevel> {
        self.quality.levels()
    }

    /// Access the classifier, e.g. for baselines or a forced recalibration.
    pub fn quality(&self) -> &QualityClassifier {
        &self.quality
    }

    /// Mutable access to the classifier.
    pub fn quality_mut(&mut self) -> &mut QualityClassifier {
        &mut self.quality
    }

    /// Most recent motion sample, if any arrived yet.
    pub fn last_motion(&self) -> Option<&MotionSample> {
        self.last_motion.as_ref()
    }

    /// Muscle samples ingested so far.
    pub fn muscle_samples(&self) -> u64 {
        self.muscle_samples
    }

    /// Motion samples ingested so far.
    pub fn motion_samples(&self) -> u64 {
        self.motion_samples
    }

    /// Drop all history and restart quality calibration, e.g. on reconnect.
    pub fn reset(&mut self) {
        self.history.clear();
        self.quality.recalibrate();
        self.last_motion = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{MuscleSample, MUSCLE_CHANNEL_COUNT};

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    fn muscle(sequence: u8, value: f32) -> Sample {
        Sample::Muscle(MuscleSample {
            sequence,
            channels_uv: vec![value; MUSCLE_CHANNEL_COUNT],
        })
    }

    #[test]
    fn test_muscle_samples_reach_history_and_quality() {
        let mut pipeline = SignalPipeline::new(&config());
        for i in 0..10 {
            pipeline.ingest(&muscle(i, 100.0)).unwrap();
        }
        assert_eq!(pipeline.muscle_samples(), 10);
        assert_eq!(pipeline.history_snapshot().dim(), (8, 10));
        assert!(pipeline.quality().calibrating());
    }

    #[test]
    fn test_motion_samples_only_update_last_motion() {
        let mut pipeline = SignalPipeline::new(&config());
        let motion = Sample::Motion(MotionSample {
            sequence: 3,
            gyro_rads: [0.1, 0.2, 0.3],
            accel_mss: [0.0, 0.0, 9.8],
            remainder: vec![0; 6],
        });
        pipeline.ingest(&motion).unwrap();

        assert_eq!(pipeline.motion_samples(), 1);
        assert_eq!(pipeline.history_snapshot().dim(), (8, 0));
        assert_eq!(pipeline.last_motion().unwrap().sequence, 3);
    }

    #[test]
    fn test_channel_mismatch_is_rejected_whole() {
        let mut pipeline = SignalPipeline::new(&config());
        let bad = Sample::Muscle(MuscleSample {
            sequence: 0,
            channels_uv: vec![1.0; 3],
        });
        assert!(pipeline.ingest(&bad).is_err());
        assert_eq!(pipeline.muscle_samples(), 0);
        assert!(pipeline.history_snapshot().is_empty());
    }

    #[test]
    fn test_reset_restarts_calibration_and_clears_history() {
        let mut pipeline = SignalPipeline::new(&config());
        for i in 0..600 {
            pipeline.ingest(&muscle(i as u8, 500.0)).unwrap();
        }
        assert!(!pipeline.quality().calibrating());

        pipeline.reset();
        assert!(pipeline.quality().calibrating());
        assert!(pipeline.history_snapshot().is_empty());
        assert!(pipeline.last_motion().is_none());
    }
}
