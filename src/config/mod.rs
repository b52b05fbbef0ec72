// src/config/mod.rs
//! Pipeline configuration with serde defaults and validation

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors: invalid values or unreadable files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field is outside its valid range.
    #[error("invalid configuration: {field}: {reason}")]
    InvalidValue {
        /// Offending field name.
        field: &'static str,
        /// Human-readable constraint that was violated.
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Complete configuration for the acquisition pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Number of muscle channels (matches the wire format's 8 by default).
    #[serde(default = "defaults::channel_count")]
    pub channel_count: usize,

    /// Nominal frame rate of the sensor in Hz.
    #[serde(default = "defaults::sample_rate_hz")]
    pub sample_rate_hz: u32,

    /// Length of the rolling display window in seconds.
    #[serde(default = "defaults::window_seconds")]
    pub window_seconds: f32,

    /// Quality classifier settings.
    #[serde(default)]
    pub quality: QualityConfig,

    /// Stream read-loop settings.
    #[serde(default)]
    pub stream: StreamConfig,
}

/// Settings for the adaptive quality classifier.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QualityConfig {
    /// Samples per channel spent establishing baseline and noise floor
    /// (500 is about 2.5 s at the nominal 200 Hz rate).
    #[serde(default = "defaults::calibration_samples")]
    pub calibration_samples: u32,

    /// Leading calibration samples excluded from the noise-floor average
    /// while the baseline converges.
    #[serde(default = "defaults::settle_samples")]
    pub settle_samples: u32,

    /// Samples between automatic recalibrations when all channels are idle
    /// (6000 is about 30 s at 200 Hz).
    #[serde(default = "defaults::recalibration_interval_samples")]
    pub recalibration_interval_samples: u32,

    /// Lower clamp on the calibrated noise floor in microvolts; keeps a
    /// near-silent channel from becoming oversensitive.
    #[serde(default = "defaults::noise_floor_min_uv")]
    pub noise_floor_min_uv: f32,
}

/// Settings for the byte-stream read loop.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamConfig {
    /// Upper bound on one blocking read; also bounds cancellation latency.
    #[serde(default = "defaults::read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Sleep between polls when no bytes arrived, so the loop never
    /// monopolizes the scheduler.
    #[serde(default = "defaults::idle_sleep_ms")]
    pub idle_sleep_ms: u64,
}

mod defaults {
    pub fn channel_count() -> usize {
        crate::protocol::MUSCLE_CHANNEL_COUNT
    }
    pub fn sample_rate_hz() -> u32 {
        200
    }
    pub fn window_seconds() -> f32 {
        1.0
    }
    pub fn calibration_samples() -> u32 {
        500
    }
    pub fn settle_samples() -> u32 {
        50
    }
    pub fn recalibration_interval_samples() -> u32 {
        6000
    }
    pub fn noise_floor_min_uv() -> f32 {
        100.0
    }
    pub fn read_timeout_ms() -> u64 {
        1000
    }
    pub fn idle_sleep_ms() -> u64 {
        10
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_count: defaults::channel_count(),
            sample_rate_hz: defaults::sample_rate_hz(),
            window_seconds: defaults::window_seconds(),
            quality: QualityConfig::default(),
            stream: StreamConfig::default(),
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            calibration_samples: defaults::calibration_samples(),
            settle_samples: defaults::settle_samples(),
            recalibration_interval_samples: defaults::recalibration_interval_samples(),
            noise_floor_min_uv: defaults::noise_floor_min_uv(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: defaults::read_timeout_ms(),
            idle_sleep_ms: defaults::idle_sleep_ms(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field against its valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_count == 0 || self.channel_count > 32 {
            return Err(ConfigError::InvalidValue {
                field: "channel_count",
                reason: format!("must be 1..=32, got {}", self.channel_count),
            });
        }
        if self.sample_rate_hz == 0 || self.sample_rate_hz > 10_000 {
            return Err(ConfigError::InvalidValue {
                field: "sample_rate_hz",
                reason: format!("must be 1..=10000, got {}", self.sample_rate_hz),
            });
        }
        if !self.window_seconds.is_finite() || self.window_seconds <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "window_seconds",
                reason: format!("must be positive, got {}", self.window_seconds),
            });
        }
        if self.history_capacity() == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window_seconds",
                reason: "window shorter than one sample period".to_string(),
            });
        }
        self.quality.validate()?;
        self.stream.validate()?;
        Ok(())
    }

    /// Rolling-buffer capacity implied by the sample rate and window length.
    pub fn history_capacity(&self) -> usize {
        (self.sample_rate_hz as f32 * self.window_seconds) as usize
    }
}

impl QualityConfig {
    /// Check classifier settings for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.calibration_samples <= self.settle_samples {
            return Err(ConfigError::InvalidValue {
                field: "calibration_samples",
                reason: format!(
                    "must exceed settle_samples ({}), got {}",
                    self.settle_samples, self.calibration_samples
                ),
            });
        }
        if self.recalibration_interval_samples == 0 {
            return Err(ConfigError::InvalidValue {
                field: "recalibration_interval_samples",
                reason: "must be non-zero".to_string(),
            });
        }
        if !self.noise_floor_min_uv.is_finite() || self.noise_floor_min_uv <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "noise_floor_min_uv",
                reason: format!("must be positive, got {}", self.noise_floor_min_uv),
            });
        }
        Ok(())
    }
}

impl StreamConfig {
    /// Check read-loop timings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.read_timeout_ms == 0 || self.read_timeout_ms > 60_000 {
            return Err(ConfigError::InvalidValue {
                field: "read_timeout_ms",
                reason: format!("must be 1..=60000, got {}", self.read_timeout_ms),
            });
        }
        if self.idle_sleep_ms == 0 || self.idle_sleep_ms > 1_000 {
            return Err(ConfigError::InvalidValue {
                field: "idle_sleep_ms",
                reason: format!("must be 1..=1000, got {}", self.idle_sleep_ms),
            });
        }
        Ok(())
    }

    /// Read timeout as a [`Duration`].
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Idle sleep as a [`Duration`].
    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }
}
