// Fill Detection Config - Window sizes, baseline length and thresholds
// Validated once at the start of every detection run

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chart::Difficulty;
use crate::drums::LaneMap;
use crate::groove::{WindowEdgePolicy, BEATS_PER_MEASURE};

#[derive(Debug, Error)]
pub enum FillError {
    #[error("No drums track at {difficulty:?} difficulty")]
    DrumTrackNotFound { difficulty: Difficulty },

    #[error("Invalid fill config: {0}")]
    InvalidConfig(String),
}

/// Scores above which a window becomes a fill candidate (any one suffices)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Note density z-score against the rolling baseline
    pub density_z: f64,

    /// Mahalanobis distance of the window against recent history
    pub groove_distance: f64,

    /// Increase in tom ratio over the baseline ratio
    pub tom_ratio_jump: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            density_z: 2.0,
            groove_distance: 4.0,
            tom_ratio_jump: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillConfig {
    /// Copied onto every emitted segment
    pub song_id: String,

    pub difficulty: Difficulty,

    /// Note value used to snap ticks before analysis (16 = sixteenths)
    pub quant_div: u32,

    pub window_beats: f64,
    pub stride_beats: f64,

    /// Measures of prior windows forming the groove baseline
    pub lookback_bars: u32,

    /// Candidate windows this close (in beats) merge into one segment
    pub merge_gap_beats: f64,

    pub min_beats: f64,
    pub max_beats: f64,

    /// Same-lane hits needed for a burst
    pub burst_min_hits: usize,

    /// Time span the burst hits must fit in
    pub burst_ms: f64,

    /// Prior windows required before any window can be a candidate
    pub min_baseline_windows: usize,

    /// Diagonal loading added to the history covariance
    pub regularization: f64,

    pub edge_policy: WindowEdgePolicy,
    pub lane_map: LaneMap,
    pub thresholds: Thresholds,
}

impl Default for FillConfig {
    fn default() -> Self {
        FillConfig {
            song_id: String::new(),
            difficulty: Difficulty::Expert,
            quant_div: 32,
            window_beats: 2.0,
            stride_beats: 1.0,
            lookback_bars: 4,
            merge_gap_beats: 1.0,
            min_beats: 1.0,
            max_beats: 8.0,
            burst_min_hits: 6,
            burst_ms: 400.0,
            min_baseline_windows: 4,
            regularization: 1e-3,
            edge_policy: WindowEdgePolicy::Drop,
            lane_map: LaneMap::pro_drums(),
            thresholds: Thresholds::default(),
        }
    }
}

fn positive(name: &str, value: f64) -> Result<(), FillError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FillError::InvalidConfig(format!(
            "{name} must be a positive number, got {value}"
        )))
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), FillError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FillError::InvalidConfig(format!(
            "{name} must not be negative, got {value}"
        )))
    }
}

impl FillConfig {
    /// Load from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, FillError> {
        let config: FillConfig =
            serde_json::from_str(json).map_err(|e| FillError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FillError> {
        if self.quant_div == 0 {
            return Err(FillError::InvalidConfig("quant_div must be at least 1".into()));
        }
        positive("window_beats", self.window_beats)?;
        positive("stride_beats", self.stride_beats)?;
        positive("burst_ms", self.burst_ms)?;
        positive("regularization", self.regularization)?;
        non_negative("merge_gap_beats", self.merge_gap_beats)?;
        non_negative("min_beats", self.min_beats)?;
        positive("max_beats", self.max_beats)?;

        if self.min_beats > self.max_beats {
            return Err(FillError::InvalidConfig(format!(
                "min_beats ({}) exceeds max_beats ({})",
                self.min_beats, self.max_beats
            )));
        }
        if self.lookback_bars == 0 {
            return Err(FillError::InvalidConfig("lookback_bars must be at least 1".into()));
        }
        if self.burst_min_hits < 2 {
            return Err(FillError::InvalidConfig("burst_min_hits must be at least 2".into()));
        }
        if self.min_baseline_windows == 0 {
            return Err(FillError::InvalidConfig(
                "min_baseline_windows must be at least 1".into(),
            ));
        }
        if self.min_baseline_windows > self.lookback_windows() {
            return Err(FillError::InvalidConfig(format!(
                "min_baseline_windows ({}) exceeds the {} windows in the lookback",
                self.min_baseline_windows,
                self.lookback_windows()
            )));
        }

        positive("thresholds.density_z", self.thresholds.density_z)?;
        positive("thresholds.groove_distance", self.thresholds.groove_distance)?;
        positive("thresholds.tom_ratio_jump", self.thresholds.tom_ratio_jump)?;

        Ok(())
    }

    /// Number of prior windows covered by `lookback_bars`
    pub fn lookback_windows(&self) -> usize {
        let beats = self.lookback_bars.saturating_mul(BEATS_PER_MEASURE) as f64;
        ((beats / self.stride_beats).round() as usize).max(1)
    }
}
