// src/quality/mod.rs
//! Adaptive per-channel signal-quality classification

pub mod classifier;

pub use classifier::{QualityClassifier, QualityLevel};
