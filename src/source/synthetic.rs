// src/source/synthetic.rs
//! Closed-form waveform generator standing in for the real sensor
//!
//! Produces the same sample types as the decode path: 8 muscle channels as
//! phase-shifted sinusoids with Gaussian noise, plus occasional motion
//! samples. The [`SyntheticByteSource`] adapter encodes the samples into real
//! wire frames at the nominal rate, driving the whole pipeline end to end
//! without hardware.

use crate::acquisition::{ByteSource, SourceIoError};
use crate::protocol::{
    encode_motion_frame, encode_muscle_frame, MotionSample, MuscleSample, ACCEL_SCALE_MSS,
    GYRO_SCALE_RADS, MOTION_WORD_COUNT, MUSCLE_CHANNEL_COUNT,
};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the synthetic waveform.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyntheticConfig {
    /// Frame rate in Hz.
    pub sample_rate_hz: u32,
    /// Sinusoid frequency in Hz.
    pub frequency_hz: f32,
    /// Sinusoid amplitude in microvolts.
    pub amplitude_uv: f32,
    /// Standard deviation of the additive Gaussian noise in microvolts.
    pub noise_level_uv: f32,
    /// Emit one motion frame every this many muscle frames.
    pub motion_interval: u32,
    /// Seed for deterministic output; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 200,
            frequency_hz: 10.0,
            amplitude_uv: 150.0,
            noise_level_uv: 25.0,
            motion_interval: 20,
            seed: None,
        }
    }
}

/// Generator of typed samples from closed-form waveforms.
#[derive(Debug)]
pub struct SyntheticSignal {
    config: SyntheticConfig,
    rng: StdRng,
    phase_offsets: [f32; MUSCLE_CHANNEL_COUNT],
    sequence: u8,
    tick: u64,
    amplitude_uv: f32,
}

impl SyntheticSignal {
    /// Create a generator; each channel gets a random phase offset so the
    /// channels are visibly distinct on a plot.
    pub fn new(config: SyntheticConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut phase_offsets = [0.0f32; MUSCLE_CHANNEL_COUNT];
        for offset in &mut phase_offsets {
            *offset = rng.gen::<f32>() * std::f32::consts::PI;
        }
        let amplitude_uv = config.amplitude_uv;
        Self {
            config,
            rng,
            phase_offsets,
            sequence: 0,
            tick: 0,
            amplitude_uv,
        }
    }

    /// Override the sinusoid amplitude, e.g. to simulate a contraction.
    pub fn set_amplitude(&mut self, amplitude_uv: f32) {
        self.amplitude_uv = amplitude_uv;
    }

    /// Next synthetic muscle sample; the sequence number wraps at 255.
    pub fn next_muscle_sample(&mut self) -> MuscleSample {
        let t = self.tick as f32 / self.config.sample_rate_hz as f32;
        let omega = 2.0 * std::f32::consts::PI * self.config.frequency_hz;

        let mut channels_uv = Vec::with_capacity(MUSCLE_CHANNEL_COUNT);
        for channel in 0..MUSCLE_CHANNEL_COUNT {
            let base = (omega * t + self.phase_offsets[channel]).sin() * self.amplitude_uv;
            let noise = self.gaussian() * self.config.noise_level_uv;
            channels_uv.push(base + noise);
        }

        let sample = MuscleSample {
            sequence: self.sequence,
            channels_uv,
        };
        self.sequence = self.sequence.wrapping_add(1);
        self.tick += 1;
        sample
    }

    /// Next synthetic motion sample, derived from the same words the byte
    /// source puts on the wire.
    pub fn next_motion_sample(&mut self) -> MotionSample {
        let (sequence, words) = self.next_motion_frame();
        let mut gyro_rads = [0.0f32; 3];
        let mut accel_mss = [0.0f32; 3];
        for axis in 0..3 {
            gyro_rads[axis] = f32::from(words[axis]) * GYRO_SCALE_RADS;
            accel_mss[axis] = f32::from(words[3 + axis]) * ACCEL_SCALE_MSS;
        }
        MotionSample {
            sequence,
            gyro_rads,
            accel_mss,
            remainder: words[6..].to_vec(),
        }
    }

    /// Sequence number plus raw words for one motion frame, advancing the
    /// shared sequence counter.
    pub fn next_motion_frame(&mut self) -> (u8, [i16; MOTION_WORD_COUNT]) {
        let words = self.next_motion_words();
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        (sequence, words)
    }

    /// Raw 16-bit motion words: gyro within about +/-1.5 rad/s, acceleration
    /// within about +/-0.5 m/s^2, remainder zeroed.
    fn next_motion_words(&mut self) -> [i16; MOTION_WORD_COUNT] {
        let mut words = [0i16; MOTION_WORD_COUNT];
        let gyro_span = (1.5 / GYRO_SCALE_RADS) as i16;
        let accel_span = (0.5 / ACCEL_SCALE_MSS) as i16;
        for word in &mut words[..3] {
            *word = self.rng.gen_range(-gyro_span..=gyro_span);
        }
        for word in &mut words[3..6] {
            *word = self.rng.gen_range(-accel_span..=accel_span);
        }
        words
    }

    // Box-Muller transform for Gaussian noise.
    fn gaussian(&mut self) -> f32 {
        let u1: f32 = 1.0 - self.rng.gen::<f32>(); // avoid ln(0)
        let u2: f32 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
    }
}

/// [`ByteSource`] that encodes the synthetic signal into real wire frames,
/// paced at the configured sample rate.
pub struct SyntheticByteSource {
    signal: SyntheticSignal,
    period: Duration,
    motion_interval: u32,
    frames_emitted: u32,
}

impl SyntheticByteSource {
    /// Wrap a fresh generator built from `config`.
    pub fn new(config: SyntheticConfig) -> Self {
        let period = Duration::from_secs_f64(1.0 / f64::from(config.sample_rate_hz.max(1)));
        let motion_interval = config.motion_interval.max(1);
        Self {
            signal: SyntheticSignal::new(config),
            period,
            motion_interval,
            frames_emitted: 0,
        }
    }

    /// Mutable access to the generator, e.g. to change amplitude mid-run.
    pub fn signal_mut(&mut self) -> &mut SyntheticSignal {
        &mut self.signal
    }
}

#[async_trait]
impl ByteSource for SyntheticByteSource {
    async fn read_available(&mut self, _timeout: Duration) -> Result<Vec<u8>, SourceIoError> {
        tokio::time::sleep(self.period).await;

        let muscle = self.signal.next_muscle_sample();
        let mut channels = [0i32; MUSCLE_CHANNEL_COUNT];
        for (slot, value) in channels.iter_mut().zip(&muscle.channels_uv) {
            *slot = value.round() as i32;
        }
        let mut bytes = encode_muscle_frame(muscle.sequence, &channels).to_vec();

        self.frames_emitted = self.frames_emitted.wrapping_add(1);
        if self.frames_emitted % self.motion_interval == 0 {
            let (sequence, words) = self.signal.next_motion_frame();
            bytes.extend_from_slice(&encode_motion_frame(sequence, &words));
        }

        Ok(bytes)
    }
}
