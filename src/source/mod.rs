// src/source/mod.rs
//! Synthetic signal sources for development and testing without hardware

pub mod synthetic;

pub use synthetic::{SyntheticByteSource, SyntheticConfig, SyntheticSignal};
