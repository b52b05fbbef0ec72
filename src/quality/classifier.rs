// src/quality/classifier.rs
//! Hysteresis-based quality levels over an adaptive baseline
//!
//! Each channel starts in a calibration phase that establishes a resting
//! baseline and a noise floor, then classifies the live deviation from that
//! baseline into one of five levels. Thresholds are multiples of the noise
//! floor; rising transitions are damped to one level per sample while falling
//! transitions are immediate, so a transient spike never reads as a sustained
//! strong signal but a released contraction drops to idle at once.

use crate::config::QualityConfig;

/// Fast smoothing factor used while the baseline is being established.
const CALIBRATION_ALPHA: f32 = 0.1;

/// Baseline smoothing factors in steady state, keyed by how far the live
/// value sits from the baseline. A quiet channel tracks drift quickly; a
/// strongly active one barely moves the baseline at all, so a sustained
/// contraction cannot drag the baseline toward itself.
const ALPHA_NEAR: f32 = 0.02;
const ALPHA_MODERATE: f32 = 0.002;
const ALPHA_FAR: f32 = 0.0001;

/// Deviation bands (in noise-floor multiples) selecting the baseline alpha.
const NEAR_BAND: f32 = 2.0;
const MODERATE_BAND: f32 = 5.0;

/// Rising thresholds: deviation needed to climb out of level N, in
/// noise-floor multiples.
const RISE_MULTIPLES: [f32; 4] = [2.0, 4.0, 7.0, 12.0];

/// Hold thresholds: minimum deviation to remain at level N. Each sits below
/// the corresponding rising threshold except at the bottom boundary, which
/// has no gap.
const HOLD_MULTIPLES: [f32; 4] = [2.0, 3.5, 6.5, 11.0];

/// Weights of baseline deviation vs. sample-to-sample change in the
/// calibration activity measure.
const ACTIVITY_DEVIATION_WEIGHT: f32 = 0.7;
const ACTIVITY_CHANGE_WEIGHT: f32 = 0.3;

/// Discrete signal-quality level for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QualityLevel {
    /// No signal above the noise floor (also reported during calibration).
    Idle,
    /// Barely above the noise floor.
    Weak,
    /// Clear signal.
    Good,
    /// Strong signal.
    Strong,
    /// Maximum level.
    Optimal,
}

impl QualityLevel {
    /// Numeric rank 0..=4.
    pub fn rank(self) -> u8 {
        match self {
            QualityLevel::Idle => 0,
            QualityLevel::Weak => 1,
            QualityLevel::Good => 2,
            QualityLevel::Strong => 3,
            QualityLevel::Optimal => 4,
        }
    }

    fn step_up(self) -> QualityLevel {
        match self {
            QualityLevel::Idle => QualityLevel::Weak,
            QualityLevel::Weak => QualityLevel::Good,
            QualityLevel::Good => QualityLevel::Strong,
            QualityLevel::Strong | QualityLevel::Optimal => QualityLevel::Optimal,
        }
    }

    fn step_down(self) -> QualityLevel {
        match self {
            QualityLevel::Idle | QualityLevel::Weak => QualityLevel::Idle,
            QualityLevel::Good => QualityLevel::Weak,
            QualityLevel::Strong => QualityLevel::Good,
            QualityLevel::Optimal => QualityLevel::Strong,
        }
    }
}

impl std::fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            QualityLevel::Idle => "idle",
            QualityLevel::Weak => "weak",
            QualityLevel::Good => "good",
            QualityLevel::Strong => "strong",
            QualityLevel::Optimal => "optimal",
        };
        write!(f, "{}", name)
    }
}

/// Per-channel phase: a channel is either still measuring its noise floor or
/// actively classifying. A quality level only exists in the active phase, so
/// "reporting a level while calibrating" is unrepresentable.
#[derive(Debug, Clone)]
enum ChannelPhase {
    Calibrating { samples_seen: u32, activity_sum: f32 },
    Active { level: QualityLevel },
}

#[derive(Debug, Clone)]
struct ChannelState {
    phase: ChannelPhase,
    baseline: f32,
    noise_floor: f32,
    last_value: f32,
}

impl ChannelState {
    fn new() -> Self {
        Self {
            phase: ChannelPhase::Calibrating {
                samples_seen: 0,
                activity_sum: 0.0,
            },
            baseline: 0.0,
            noise_floor: 0.0,
            last_value: 0.0,
        }
    }

    fn is_active(&self) -> bool {
        matches!(self.phase, ChannelPhase::Active { .. })
    }

    fn is_idle(&self) -> bool {
        matches!(
            self.phase,
            ChannelPhase::Active {
                level: QualityLevel::Idle
            }
        )
    }
}

/// Adaptive signal-quality classifier for a fixed set of channels.
///
/// Single-mutator: feed every decoded sample through [`observe`] from one
/// context; the state is not designed for concurrent mutation.
///
/// [`observe`]: QualityClassifier::observe
#[derive(Debug, Clone)]
pub struct QualityClassifier {
    config: QualityConfig,
    channels: Vec<ChannelState>,
    /// Per-channel observations since the last (re)calibration completed.
    observations: u64,
    recalibrations: u64,
}

impl QualityClassifier {
    /// Create a classifier for `channel_count` channels, all calibrating.
    ///
    /// # Panics
    ///
    /// Panics if `channel_count` is zero; it comes from validated
    /// configuration.
    pub fn new(config: QualityConfig, channel_count: usize) -> Self {
        assert!(channel_count > 0, "channel count must be non-zero");
        Self {
            config,
            channels: vec![ChannelState::new(); channel_count],
            observations: 0,
            recalibrations: 0,
        }
    }

    /// Feed one raw channel value and get the channel's current level.
    ///
    /// Returns [`QualityLevel::Idle`] while the channel is calibrating.
    ///
    /// # Panics
    ///
    /// Panics if `channel` is out of range for the configured channel count.
    pub fn observe(&mut self, channel: usize, value: f32) -> QualityLevel {
        let settle = self.config.settle_samples;
        let calibration = self.config.calibration_samples;
        let floor_min = self.config.noise_floor_min_uv;
        let state = &mut self.channels[channel];

        let level = match state.phase {
            ChannelPhase::Calibrating {
                samples_seen,
                activity_sum,
            } => {
                // Fast smoothing while converging on the resting value.
                state.baseline =
                    CALIBRATION_ALPHA * value + (1.0 - CALIBRATION_ALPHA) * state.baseline;

                let samples_seen = samples_seen + 1;
                let mut activity_sum = activity_sum;
                if samples_seen > settle {
                    let deviation = (value - state.baseline).abs();
                    let change = (value - state.last_value).abs();
                    activity_sum += ACTIVITY_DEVIATION_WEIGHT * deviation
                        + ACTIVITY_CHANGE_WEIGHT * change;
                }

                if samples_seen >= calibration {
                    state.noise_floor = activity_sum / (calibration - settle) as f32;
                    state.phase = ChannelPhase::Active {
                        level: QualityLevel::Idle,
                    };
                    tracing::debug!(
                        channel,
                        baseline = state.baseline,
                        noise_floor = state.noise_floor,
                        "channel calibration complete"
                    );
                } else {
                    state.phase = ChannelPhase::Calibrating {
                        samples_seen,
                        activity_sum,
                    };
                }

                QualityLevel::Idle
            }
            ChannelPhase::Active { level } => {
                let floor = state.noise_floor.max(floor_min);
                let deviation = (value - state.baseline).abs();

                // The baseline keeps tracking drift, but more slowly the
                // further the signal sits from it.
                let alpha = if deviation < NEAR_BAND * floor {
                    ALPHA_NEAR
                } else if deviation < MODERATE_BAND * floor {
                    ALPHA_MODERATE
                } else {
                    ALPHA_FAR
                };
                state.baseline = alpha * value + (1.0 - alpha) * state.baseline;

                let next = transition(level, deviation, floor);
                state.phase = ChannelPhase::Active { level: next };
                next
            }
        };
        state.last_value = value;

        if self.channels.iter().all(ChannelState::is_active) {
            self.observations += 1;
            self.maybe_recalibrate();
        } else {
            // The recalibration clock starts once the last channel finishes
            // calibrating.
            self.observations = 0;
        }

        level
    }

    /// Whether any channel is still in its calibration phase.
    pub fn calibrating(&self) -> bool {
        self.channels.iter().any(|c| !c.is_active())
    }

    /// Mean calibration progress across channels, 0.0 to 1.0.
    pub fn calibration_progress(&self) -> f32 {
        let total: f32 = self
            .channels
            .iter()
            .map(|c| match c.phase {
                ChannelPhase::Calibrating { samples_seen, .. } => {
                    samples_seen as f32 / self.config.calibration_samples as f32
                }
                ChannelPhase::Active { .. } => 1.0,
            })
            .sum();
        total / self.channels.len() as f32
    }

    /// Current level of one channel (Idle while calibrating).
    pub fn level(&self, channel: usize) -> QualityLevel {
        match self.channels[channel].phase {
            ChannelPhase::Active { level } => level,
            ChannelPhase::Calibrating { .. } => QualityLevel::Idle,
        }
    }

    /// Current levels of all channels.
    pub fn levels(&self) -> Vec<QualityLevel> {
        (0..self.channels.len()).map(|c| self.level(c)).collect()
    }

    /// Baseline estimate for one channel.
    pub fn baseline(&self, channel: usize) -> f32 {
        self.channels[channel].baseline
    }

    /// Clamped noise floor for one channel; `None` while calibrating.
    pub fn noise_floor(&self, channel: usize) -> Option<f32> {
        let state = &self.channels[channel];
        state
            .is_active()
            .then(|| state.noise_floor.max(self.config.noise_floor_min_uv))
    }

    /// Number of automatic recalibrations performed so far.
    pub fn recalibrations(&self) -> u64 {
        self.recalibrations
    }

    /// Configured channel count.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Force a return to the calibration phase on every channel.
    ///
    /// The converged baseline is kept so calibration restarts from a good
    /// estimate; the noise floor is re-measured from scratch.
    pub fn recalibrate(&mut self) {
        for state in &mut self.channels {
            state.phase = ChannelPhase::Calibrating {
                samples_seen: 0,
                activity_sum: 0.0,
            };
        }
        self.observations = 0;
    }

    fn maybe_recalibrate(&mut self) {
        let interval =
            u64::from(self.config.recalibration_interval_samples) * self.channels.len() as u64;
        if self.observations < interval {
            return;
        }
        // Never recalibrate while any channel carries a real signal; that
        // would fold the signal into the baseline.
        if !self.channels.iter().all(ChannelState::is_idle) {
            return;
        }
        tracing::info!("all channels idle, recalibrating noise floors");
        self.recalibrate();
        self.recalibrations += 1;
    }
}

/// Apply one classification step: fall freely, rise one level at most.
fn transition(current: QualityLevel, deviation: f32, floor: f32) -> QualityLevel {
    let mut level = current;
    while level > QualityLevel::Idle
        && deviation < HOLD_MULTIPLES[level.rank() as usize - 1] * floor
    {
        level = level.step_down();
    }
    if level < QualityLevel::Optimal && deviation >= RISE_MULTIPLES[level.rank() as usize] * floor {
        level = level.step_up();
    }
    level
}
