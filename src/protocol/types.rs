// src/protocol/types.rs
//! Core types for the WL-EMG frame format and decoded samples

/// Byte sequence that prefixes every frame on the wire.
pub const FRAME_MARKER: [u8; 3] = [0xD2, 0xD2, 0xD2];

/// Total length of one frame in bytes: marker + type + sequence + payload.
pub const FRAME_LENGTH: usize = 29;

/// Payload length in bytes (everything after the 5-byte header).
pub const PAYLOAD_LENGTH: usize = 24;

/// Type byte identifying a muscle-activity frame.
pub const FRAME_TYPE_MUSCLE: u8 = 0xAA;

/// Type byte identifying a motion-sensor frame.
pub const FRAME_TYPE_MOTION: u8 = 0xBB;

/// Number of muscle channels carried by one frame (24-byte payload, 3 bytes each).
pub const MUSCLE_CHANNEL_COUNT: usize = 8;

/// Number of 16-bit words carried by one motion frame.
pub const MOTION_WORD_COUNT: usize = 12;

/// Angular-rate scale in rad/s per LSB of the 16-bit gyroscope words.
pub const GYRO_SCALE_RADS: f32 = 0.0012;

/// Linear-acceleration scale in m/s^2 per LSB of the 16-bit accelerometer words.
pub const ACCEL_SCALE_MSS: f32 = 0.000_597_8;

/// One marker-aligned, fixed-length frame sliced out of the raw byte stream.
///
/// Ephemeral: produced by [`crate::protocol::FrameSynchronizer`] and consumed
/// immediately by [`crate::protocol::decode_frame`], never stored.
pub type RawFrame = [u8; FRAME_LENGTH];

/// One decoded sample across all muscle channels.
///
/// Channel values are in microvolts, taken directly from the 24-bit
/// big-endian two's-complement payload groups.
#[derive(Debug, Clone, PartialEq)]
pub struct MuscleSample {
    /// Frame sequence number; wraps from 255 back to 0.
    pub sequence: u8,
    /// Per-channel readings in microvolts.
    pub channels_uv: Vec<f32>,
}

/// One decoded motion-sensor sample.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionSample {
    /// Frame sequence number; wraps from 255 back to 0.
    pub sequence: u8,
    /// Angular rate per axis in rad/s.
    pub gyro_rads: [f32; 3],
    /// Linear acceleration per axis in m/s^2.
    pub accel_mss: [f32; 3],
    /// Trailing 16-bit words carried by the frame but not otherwise interpreted.
    pub remainder: Vec<i16>,
}

/// Decoded frame content, tagged by the frame's type byte.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    /// Muscle-activity frame (`0xAA`).
    Muscle(MuscleSample),
    /// Motion-sensor frame (`0xBB`).
    Motion(MotionSample),
}

impl Sample {
    /// Sequence number of the underlying frame.
    pub fn sequence(&self) -> u8 {
        match self {
            Sample::Muscle(s) => s.sequence,
            Sample::Motion(s) => s.sequence,
        }
    }

    /// Borrow the muscle sample, if this is one.
    pub fn as_muscle(&self) -> Option<&MuscleSample> {
        match self {
            Sample::Muscle(s) => Some(s),
            Sample::Motion(_) => None,
        }
    }

    /// Borrow the motion sample, if this is one.
    pub fn as_motion(&self) -> Option<&MotionSample> {
        match self {
            Sample::Motion(s) => Some(s),
            Sample::Muscle(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout_constants() {
        assert_eq!(FRAME_LENGTH, FRAME_MARKER.len() + 1 + 1 + PAYLOAD_LENGTH);
        assert_eq!(PAYLOAD_LENGTH, MUSCLE_CHANNEL_COUNT * 3);
        assert_eq!(PAYLOAD_LENGTH, MOTION_WORD_COUNT * 2);
    }

    #[test]
    fn test_sample_accessors() {
        let muscle = Sample::Muscle(MuscleSample {
            sequence: 7,
            channels_uv: vec![0.0; MUSCLE_CHANNEL_COUNT],
        });
        assert_eq!(muscle.sequence(), 7);
        assert!(muscle.as_muscle().is_some());
        assert!(muscle.as_motion().is_none());

        let motion = Sample::Motion(MotionSample {
            sequence: 255,
            gyro_rads: [0.0; 3],
            accel_mss: [0.0; 3],
            remainder: vec![0; 6],
        });
        assert_eq!(motion.sequence(), 255);
        assert!(motion.as_motion().is_some());
        assert!(motion.as_muscle().is_none());
    }
}
