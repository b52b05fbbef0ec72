// src/protocol/decoder.rs
//! Frame payload decoding for muscle and motion packets
//!
//! Payload integers are big-endian two's-complement at mixed bit widths.
//! The 24-bit muscle width is not a native integer type, so sign recovery is
//! done generically: accumulate most-significant-first, then subtract
//! `2^bits` when the sign bit is set.

use crate::protocol::types::{
    MotionSample, MuscleSample, Sample, ACCEL_SCALE_MSS, FRAME_LENGTH, FRAME_MARKER,
    FRAME_TYPE_MOTION, FRAME_TYPE_MUSCLE, GYRO_SCALE_RADS, MOTION_WORD_COUNT,
    MUSCLE_CHANNEL_COUNT, RawFrame,
};
use thiserror::Error;

/// Reasons a frame cannot be decoded.
///
/// Decode failures are never fatal to the stream: the offending frame is
/// dropped and scanning continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Frame is not exactly [`FRAME_LENGTH`] bytes.
    #[error("expected {FRAME_LENGTH}-byte frame, got {actual} bytes")]
    WrongLength {
        /// Length of the rejected input.
        actual: usize,
    },

    /// Frame does not begin with [`FRAME_MARKER`].
    #[error("frame missing marker {FRAME_MARKER:02X?}, got {actual:02X?}")]
    BadMarker {
        /// The first three bytes of the rejected frame.
        actual: [u8; 3],
    },

    /// Type byte is neither muscle nor motion.
    #[error("unknown frame type 0x{0:02X}")]
    UnknownType(u8),
}

/// Combine big-endian bytes into a signed integer of the given bit width.
///
/// Exact for any width up to 31 bits, including the non-native 24-bit case.
fn combine_signed(bytes: &[u8], bits: u32) -> i32 {
    debug_assert_eq!(bytes.len() * 8, bits as usize);
    let mut value: u32 = 0;
    for &byte in bytes {
        value = (value << 8) | u32::from(byte);
    }
    let sign_bit = 1u32 << (bits - 1);
    if value & sign_bit != 0 {
        (i64::from(value) - (1i64 << bits)) as i32
    } else {
        value as i32
    }
}

/// Decode one marker-aligned frame into a typed sample.
///
/// Accepts a slice so callers holding unverified buffers can use it too;
/// frames coming from the synchronizer always satisfy the length and marker
/// checks.
pub fn decode_frame(frame: &[u8]) -> Result<Sample, DecodeError> {
    if frame.len() != FRAME_LENGTH {
        return Err(DecodeError::WrongLength {
            actual: frame.len(),
        });
    }
    if frame[..3] != FRAME_MARKER {
        return Err(DecodeError::BadMarker {
            actual: [frame[0], frame[1], frame[2]],
        });
    }

    let frame_type = frame[3];
    let sequence = frame[4];
    let payload = &frame[5..];

    match frame_type {
        FRAME_TYPE_MUSCLE => {
            let channels_uv = payload
                .chunks_exact(3)
                .map(|group| combine_signed(group, 24) as f32)
                .collect();
            Ok(Sample::Muscle(MuscleSample {
                sequence,
                channels_uv,
            }))
        }
        FRAME_TYPE_MOTION => {
            let words: Vec<i16> = payload
                .chunks_exact(2)
                .map(|group| combine_signed(group, 16) as i16)
                .collect();

            let mut gyro_rads = [0.0f32; 3];
            let mut accel_mss = [0.0f32; 3];
            for axis in 0..3 {
                gyro_rads[axis] = f32::from(words[axis]) * GYRO_SCALE_RADS;
                accel_mss[axis] = f32::from(words[3 + axis]) * ACCEL_SCALE_MSS;
            }

            Ok(Sample::Motion(MotionSample {
                sequence,
                gyro_rads,
                accel_mss,
                remainder: words[6..].to_vec(),
            }))
        }
        other => Err(DecodeError::UnknownType(other)),
    }
}

/// Encode a muscle sample into its 29-byte wire frame.
///
/// Channel values are whole microvolts; each is truncated to its low 24 bits,
/// which round-trips any value representable by the wire format.
pub fn encode_muscle_frame(sequence: u8, channels_uv: &[i32; MUSCLE_CHANNEL_COUNT]) -> RawFrame {
    let mut frame = [0u8; FRAME_LENGTH];
    frame[..3].copy_from_slice(&FRAME_MARKER);
    frame[3] = FRAME_TYPE_MUSCLE;
    frame[4] = sequence;
    for (channel, &value) in channels_uv.iter().enumerate() {
        let offset = 5 + channel * 3;
        let raw = value as u32;
        frame[offset] = (raw >> 16) as u8;
        frame[offset + 1] = (raw >> 8) as u8;
        frame[offset + 2] = raw as u8;
    }
    frame
}

/// Encode raw 16-bit motion words into their 29-byte wire frame.
///
/// The first three words are gyroscope axes, the next three accelerometer
/// axes, the rest pass through as the remainder list.
pub fn encode_motion_frame(sequence: u8, words: &[i16; MOTION_WORD_COUNT]) -> RawFrame {
    let mut frame = [0u8; FRAME_LENGTH];
    frame[..3].copy_from_slice(&FRAME_MARKER);
    frame[3] = FRAME_TYPE_MOTION;
    frame[4] = sequence;
    for (index, &word) in words.iter().enumerate() {
        let offset = 5 + index * 2;
        let raw = word as u16;
        frame[offset] = (raw >> 8) as u8;
        frame[offset + 1] = raw as u8;
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_signed_24_bit_extremes() {
        assert_eq!(combine_signed(&[0x80, 0x00, 0x00], 24), -8_388_608);
        assert_eq!(combine_signed(&[0x7F, 0xFF, 0xFF], 24), 8_388_607);
        assert_eq!(combine_signed(&[0xFF, 0xFF, 0xFF], 24), -1);
        assert_eq!(combine_signed(&[0x00, 0x00, 0x00], 24), 0);
    }

    #[test]
    fn test_combine_signed_16_bit_extremes() {
        assert_eq!(combine_signed(&[0x80, 0x00], 16), -32_768);
        assert_eq!(combine_signed(&[0x7F, 0xFF], 16), 32_767);
        assert_eq!(combine_signed(&[0xFF, 0xFE], 16), -2);
    }

    #[test]
    fn test_muscle_round_trip() {
        let channels = [8_388_607, -8_388_608, 0, 1, -1, 1234, -1234, 42];
        let frame = encode_muscle_frame(9, &channels);

        let sample = match decode_frame(&frame).unwrap() {
            Sample::Muscle(s) => s,
            other => panic!("expected muscle sample, got {:?}", other),
        };
        assert_eq!(sample.sequence, 9);
        let expected: Vec<f32> = channels.iter().map(|&v| v as f32).collect();
        assert_eq!(sample.channels_uv, expected);
    }

    #[test]
    fn test_motion_round_trip() {
        let words = [100, -100, 32_767, -32_768, 0, 1, 7, -7, 99, -99, 3, -3];
        let frame = encode_motion_frame(200, &words);

        let sample = match decode_frame(&frame).unwrap() {
            Sample::Motion(s) => s,
            other => panic!("expected motion sample, got {:?}", other),
        };
        assert_eq!(sample.sequence, 200);
        for axis in 0..3 {
            assert_eq!(sample.gyro_rads[axis], f32::from(words[axis]) * GYRO_SCALE_RADS);
            assert_eq!(
                sample.accel_mss[axis],
                f32::from(words[3 + axis]) * ACCEL_SCALE_MSS
            );
        }
        assert_eq!(sample.remainder, &words[6..]);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let err = decode_frame(&[0xD2; 28]).unwrap_err();
        assert_eq!(err, DecodeError::WrongLength { actual: 28 });
    }

    #[test]
    fn test_bad_marker_rejected() {
        let mut frame = encode_muscle_frame(0, &[0; MUSCLE_CHANNEL_COUNT]);
        frame[1] = 0x00;
        let err = decode_frame(&frame).unwrap_err();
        assert_eq!(
            err,
            DecodeError::BadMarker {
                actual: [0xD2, 0x00, 0xD2]
            }
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        let mut frame = encode_muscle_frame(0, &[0; MUSCLE_CHANNEL_COUNT]);
        frame[3] = 0xCC;
        let err = decode_frame(&frame).unwrap_err();
        assert_eq!(err, DecodeError::UnknownType(0xCC));
    }

    #[test]
    fn test_sequence_wraps_without_discontinuity() {
        let before = encode_muscle_frame(255, &[0; MUSCLE_CHANNEL_COUNT]);
        let after = encode_muscle_frame(0, &[0; MUSCLE_CHANNEL_COUNT]);

        assert_eq!(decode_frame(&before).unwrap().sequence(), 255);
        assert_eq!(decode_frame(&after).unwrap().sequence(), 0);
        // Wraparound is ordinary data, not an error.
        assert_eq!(decode_frame(&after).unwrap().sequence(), 255u8.wrapping_add(1));
    }
}
