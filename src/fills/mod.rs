// Fill Detection Engine - Finds drum fills by scoring windows against the groove
// Window features -> rolling baseline -> candidate flags -> merged segments

pub mod config;
pub mod detector;
pub mod features;
pub mod types;

pub use config::{FillConfig, FillError, Thresholds};
pub use detector::{analyze_windows, detect_fills, merge_candidate_windows};
pub use types::{
    AnalysisWindow, FeatureVector, FillScores, FillSegment, GROOVE_DIMENSIONS,
    GROOVE_NOISE_FLOORS,
};
