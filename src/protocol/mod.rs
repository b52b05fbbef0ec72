// src/protocol/mod.rs
//! WL-EMG wire protocol: frame synchronization and packet decoding

pub mod decoder;
pub mod framing;
pub mod types;

pub use decoder::{decode_frame, encode_motion_frame, encode_muscle_frame, DecodeError};
pub use framing::FrameSynchronizer;
pub use types::*;
