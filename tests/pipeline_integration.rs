//! End-to-end tests: wire bytes through frame sync, decoding, the rolling
//! history buffer and the quality classifier.

use wlemg_core::config::{PipelineConfig, QualityConfig, StreamConfig};
use wlemg_core::pipeline::SignalPipeline;
use wlemg_core::protocol::{MuscleSample, Sample, MUSCLE_CHANNEL_COUNT};
use wlemg_core::quality::QualityLevel;
use wlemg_core::source::{SyntheticByteSource, SyntheticConfig};
use wlemg_core::SampleStream;

const REST_UV: f32 = 1000.0;

fn short_calibration_config() -> PipelineConfig {
    PipelineConfig {
        quality: QualityConfig {
            calibration_samples: 100,
            settle_samples: 10,
            recalibration_interval_samples: 6000,
            noise_floor_min_uv: 100.0,
        },
        ..PipelineConfig::default()
    }
}

fn muscle(sequence: u8, value: f32) -> Sample {
    Sample::Muscle(MuscleSample {
        sequence,
        channels_uv: vec![value; MUSCLE_CHANNEL_COUNT],
    })
}

/// A sharp sustained contraction after calibration climbs exactly one level
/// per sample, and releasing it drops every channel back to idle in a single
/// sample.
#[test]
fn test_contraction_rises_stepwise_and_releases_at_once() {
    let config = short_calibration_config();
    let mut pipeline = SignalPipeline::new(&config);

    let mut sequence: u8 = 0;
    for _ in 0..config.quality.calibration_samples {
        pipeline.ingest(&muscle(sequence, REST_UV)).unwrap();
        sequence = sequence.wrapping_add(1);
    }
    assert!(!pipeline.quality().calibrating());
    assert_eq!(
        pipeline.quality_levels(),
        vec![QualityLevel::Idle; MUSCLE_CHANNEL_COUNT]
    );

    // Constant rest gives a clamped 100 uV floor; +5000 uV clears the
    // highest rising threshold (12x floor) on every channel.
    let expected = [
        QualityLevel::Weak,
        QualityLevel::Good,
        QualityLevel::Strong,
        QualityLevel::Optimal,
        QualityLevel::Optimal,
    ];
    for &level in &expected {
        pipeline.ingest(&muscle(sequence, REST_UV + 5000.0)).unwrap();
        sequence = sequence.wrapping_add(1);
        assert_eq!(pipeline.quality_levels(), vec![level; MUSCLE_CHANNEL_COUNT]);
    }

    // Back below the lowest rising threshold: idle within one sample.
    pipeline.ingest(&muscle(sequence, REST_UV + 100.0)).unwrap();
    assert_eq!(
        pipeline.quality_levels(),
        vec![QualityLevel::Idle; MUSCLE_CHANNEL_COUNT]
    );
}

/// History keeps only the most recent window, oldest to newest.
#[test]
fn test_history_window_keeps_most_recent_samples() {
    let config = short_calibration_config();
    let capacity = config.history_capacity();
    let mut pipeline = SignalPipeline::new(&config);

    for i in 0..capacity + 25 {
        pipeline.ingest(&muscle(i as u8, i as f32)).unwrap();
    }

    let snapshot = pipeline.history_snapshot();
    assert_eq!(snapshot.dim(), (MUSCLE_CHANNEL_COUNT, capacity));
    assert_eq!(snapshot[[0, 0]], 25.0);
    assert_eq!(snapshot[[0, capacity - 1]], (capacity + 24) as f32);
}

/// Full plumbing: synthetic wire frames through the stream into the pipeline.
#[tokio::test]
async fn test_synthetic_source_drives_pipeline_end_to_end() {
    let config = short_calibration_config();
    let source = SyntheticByteSource::new(SyntheticConfig {
        sample_rate_hz: 2000,
        motion_interval: 10,
        seed: Some(11),
        ..SyntheticConfig::default()
    });
    let mut stream = SampleStream::new(
        source,
        &StreamConfig {
            read_timeout_ms: 50,
            idle_sleep_ms: 1,
        },
    );
    let mut pipeline = SignalPipeline::new(&config);
    let stop = stream.stop_handle();

    while pipeline.muscle_samples() < 50 {
        let sample = stream
            .next_sample()
            .await
            .expect("synthetic source never fails")
            .expect("stream not stopped");
        pipeline.ingest(&sample).unwrap();
    }
    stop.stop();

    assert!(pipeline.motion_samples() >= 4);
    assert!(pipeline.last_motion().is_some());
    assert_eq!(pipeline.history_snapshot().dim().0, MUSCLE_CHANNEL_COUNT);
    assert!(pipeline.quality().calibration_progress() > 0.0);

    let stats = stream.stats();
    assert_eq!(stats.decode_errors, 0);
    assert_eq!(stats.bytes_discarded, 0);
    assert!(stats.frames_decoded >= 54);
}
