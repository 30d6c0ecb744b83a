// Fill detection types
// Per-window features, analysis windows and merged fill segments

use serde::{Deserialize, Serialize};

use crate::chart::NoteEvent;

/// Number of features compared by the groove distance
pub const GROOVE_DIMENSIONS: usize = 8;

/// Smallest meaningful change of each groove component, in its own units
///
/// Order matches [`FeatureVector::groove_components`]: notes per beat, tom
/// ratio, IOI spread in beats, novelty, then the four flags.
pub const GROOVE_NOISE_FLOORS: [f64; GROOVE_DIMENSIONS] = [0.5, 0.1, 0.1, 0.25, 0.5, 0.5, 0.5, 0.5];

/// Features of one analysis window
///
/// Baseline-relative values (z-scores, jumps, dropouts, novelty, groove
/// distance) are zero until enough prior windows exist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureVector {
    /// Notes per beat
    pub density: f64,

    /// Density z-score against prior windows
    pub density_z: f64,

    /// Toms over all classified hits
    pub tom_ratio: f64,

    /// Tom ratio minus the baseline tom ratio
    pub tom_ratio_jump: f64,

    /// Baseline had hats, this window has none
    pub hat_dropout: bool,

    /// Baseline had kicks, this window has none
    pub kick_drop: bool,

    /// Standard deviation of inter-onset intervals, in beats
    pub ioi_std: f64,
    pub ioi_std_z: f64,

    /// Distance between this window's voice bigrams and the baseline's, in [0, 1]
    pub ngram_novelty: f64,

    /// Enough same-lane hits inside the burst time span
    pub same_pad_burst: bool,

    /// A cymbal lands on the downbeat following the window
    pub crash_resolve: bool,

    /// Mahalanobis distance against the recent window history
    pub groove_distance: f64,
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

impl FeatureVector {
    /// Components compared by the groove distance
    pub fn groove_components(&self) -> [f64; GROOVE_DIMENSIONS] {
        [
            self.density,
            self.tom_ratio,
            self.ioi_std,
            self.ngram_novelty,
            flag(self.hat_dropout),
            flag(self.kick_drop),
            flag(self.same_pad_burst),
            flag(self.crash_resolve),
        ]
    }
}

/// A slice of the drum track scored against its groove baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisWindow {
    pub start_tick: u32,
    /// Exclusive
    pub end_tick: u32,
    pub start_ms: f64,
    pub end_ms: f64,

    /// Notes whose quantized tick falls inside the window
    pub notes: Vec<NoteEvent>,

    pub features: FeatureVector,
    pub is_candidate: bool,
}

/// Strongest feature values across the windows of one segment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillScores {
    pub density_z: f64,
    pub groove_distance: f64,
    pub tom_ratio_jump: f64,
    pub ioi_std_z: f64,
    pub ngram_novelty: f64,
    pub hat_dropout: bool,
    pub kick_drop: bool,
    pub same_pad_burst: bool,
    pub crash_resolve: bool,
}

impl FillScores {
    /// Fold one window's features into the running maxima
    pub fn absorb(&mut self, features: &FeatureVector) {
        self.density_z = self.density_z.max(features.density_z);
        self.groove_distance = self.groove_distance.max(features.groove_distance);
        self.tom_ratio_jump = self.tom_ratio_jump.max(features.tom_ratio_jump);
        self.ioi_std_z = self.ioi_std_z.max(features.ioi_std_z);
        self.ngram_novelty = self.ngram_novelty.max(features.ngram_novelty);
        self.hat_dropout |= features.hat_dropout;
        self.kick_drop |= features.kick_drop;
        self.same_pad_burst |= features.same_pad_burst;
        self.crash_resolve |= features.crash_resolve;
    }
}

/// A detected drum fill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillSegment {
    pub song_id: String,
    pub start_tick: u32,
    /// Exclusive
    pub end_tick: u32,
    pub start_ms: f64,
    pub end_ms: f64,

    /// Candidate windows merged into this segment
    pub window_count: usize,

    pub scores: FillScores,
}

impl FillSegment {
    pub fn duration_ms(&self) -> f64 {
        self.end_ms - self.start_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_take_maxima() {
        let mut scores = FillScores::default();
        scores.absorb(&FeatureVector {
            density_z: 3.0,
            groove_distance: 1.0,
            hat_dropout: true,
            ..FeatureVector::default()
        });
        scores.absorb(&FeatureVector {
            density_z: 1.0,
            groove_distance: 6.5,
            ..FeatureVector::default()
        });

        assert_eq!(scores.density_z, 3.0);
        assert_eq!(scores.groove_distance, 6.5);
        assert!(scores.hat_dropout);
        assert!(!scores.kick_drop);
    }

    #[test]
    fn test_groove_components_encode_flags() {
        let features = FeatureVector {
            density: 4.0,
            same_pad_burst: true,
            ..FeatureVector::default()
        };
        let components = features.groove_components();
        assert_eq!(components[0], 4.0);
        assert_eq!(components[6], 1.0);
        assert_eq!(components[7], 0.0);
    }
}
