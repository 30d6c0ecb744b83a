// Fill Detector - Sliding-window groove anomaly detection on a drums track
// Windows are scored left to right against a causal baseline of prior windows

use crate::chart::{Instrument, ParsedChart};
use crate::groove::{get_window_boundaries, TempoMap};
use crate::stats::{
    add_variance_floor, column_means, covariance_matrix, invert_matrix, mahalanobis_distance,
    regularize_covariance, rolling_mean, rolling_std_dev, z_score, Matrix,
};

use super::config::{FillConfig, FillError};
use super::features::{
    ngram_novelty, notes_in_range, profile_window, voice_notes, ProfileSettings, WindowProfile,
    BIGRAM_BINS,
};
use super::types::{
    AnalysisWindow, FeatureVector, FillScores, FillSegment, GROOVE_NOISE_FLOORS,
};

/// Detect drum fills in the configured difficulty's drums track
pub fn detect_fills(chart: &ParsedChart, config: &FillConfig) -> Result<Vec<FillSegment>, FillError> {
    let windows = analyze_windows(chart, config)?;
    let segments = merge_candidate_windows(&windows, chart.resolution, config);

    log::info!(
        "Detected {} fill(s) in {} windows for song '{}'",
        segments.len(),
        windows.len(),
        config.song_id
    );

    Ok(segments)
}

/// Score every analysis window of the drums track
pub fn analyze_windows(
    chart: &ParsedChart,
    config: &FillConfig,
) -> Result<Vec<AnalysisWindow>, FillError> {
    let track = chart
        .track(Instrument::Drums, config.difficulty)
        .ok_or(FillError::DrumTrackNotFound {
            difficulty: config.difficulty,
        })?;
    config.validate()?;

    let resolution = chart.resolution.max(1);
    let voiced = voice_notes(
        &track.note_event_groups,
        resolution,
        config.quant_div,
        &config.lane_map,
    );
    let (Some(first), Some(last)) = (voiced.first(), voiced.last()) else {
        return Ok(Vec::new());
    };

    // Beat-aligned range covering every quantized note
    let start = first.tick / resolution * resolution;
    let end = (last.tick + 1).div_ceil(resolution) * resolution;
    let bounds = get_window_boundaries(
        start,
        end,
        config.window_beats,
        config.stride_beats,
        resolution,
        config.edge_policy,
    );
    log::debug!(
        "Analyzing {} windows over ticks {}..{} ({} notes)",
        bounds.len(),
        start,
        end,
        voiced.len()
    );

    let tempo_map = TempoMap::new(resolution, &chart.tempos);
    let settings = ProfileSettings {
        resolution,
        quant_div: config.quant_div,
        burst_min_hits: config.burst_min_hits,
        burst_ms: config.burst_ms,
    };

    let profiles: Vec<WindowProfile> = bounds
        .iter()
        .map(|&(s, e)| {
            profile_window(notes_in_range(&voiced, s, e), &voiced, (s, e), settings)
        })
        .collect();

    let lookback = config.lookback_windows();
    let densities: Vec<f64> = profiles.iter().map(|p| p.density).collect();
    let iois: Vec<f64> = profiles.iter().map(|p| p.ioi_std).collect();
    let tom_ratios: Vec<f64> = profiles.iter().map(|p| p.counts.tom_ratio()).collect();
    let hats: Vec<f64> = profiles.iter().map(|p| p.counts.hat as f64).collect();
    let kicks: Vec<f64> = profiles.iter().map(|p| p.counts.kick as f64).collect();

    let density_mean = rolling_mean(&densities, lookback);
    let density_std = rolling_std_dev(&densities, lookback);
    let ioi_mean = rolling_mean(&iois, lookback);
    let ioi_std = rolling_std_dev(&iois, lookback);
    let tom_mean = rolling_mean(&tom_ratios, lookback);
    let hat_mean = rolling_mean(&hats, lookback);
    let kick_mean = rolling_mean(&kicks, lookback);

    let mut windows: Vec<AnalysisWindow> = Vec::with_capacity(bounds.len());

    for (i, (&(s, e), profile)) in bounds.iter().zip(&profiles).enumerate() {
        let history_start = i.saturating_sub(lookback);
        let history_len = i - history_start;

        let mut features = FeatureVector {
            density: profile.density,
            tom_ratio: tom_ratios[i],
            ioi_std: profile.ioi_std,
            same_pad_burst: profile.same_pad_burst,
            crash_resolve: profile.crash_resolve,
            ..FeatureVector::default()
        };

        let baseline_ready = history_len >= config.min_baseline_windows;
        if baseline_ready {
            // Rolling statistics at i - 1 cover exactly the prior windows
            let b = i - 1;
            // A perfectly steady baseline has zero spread; floor it at the noise level
            features.density_z = z_score(
                profile.density,
                density_mean[b],
                density_std[b].max(GROOVE_NOISE_FLOORS[0]),
            );
            features.ioi_std_z = z_score(
                profile.ioi_std,
                ioi_mean[b],
                ioi_std[b].max(GROOVE_NOISE_FLOORS[2]),
            );
            features.tom_ratio_jump = tom_ratios[i] - tom_mean[b];
            features.hat_dropout = hat_mean[b] >= 1.0 && profile.counts.hat == 0;
            features.kick_drop = kick_mean[b] >= 1.0 && profile.counts.kick == 0;

            let mut baseline_bigrams = [0.0; BIGRAM_BINS];
            for prior in &profiles[history_start..i] {
                for (sum, count) in baseline_bigrams.iter_mut().zip(&prior.bigrams) {
                    *sum += count;
                }
            }
            features.ngram_novelty = ngram_novelty(&profile.bigrams, &baseline_bigrams);

            let history: Matrix = windows[history_start..i]
                .iter()
                .map(|w| w.features.groove_components().to_vec())
                .collect();
            features.groove_distance = groove_distance(&features, &history, config.regularization);
        }

        let thresholds = &config.thresholds;
        let is_candidate = baseline_ready
            && (features.density_z > thresholds.density_z
                || features.groove_distance > thresholds.groove_distance
                || features.tom_ratio_jump > thresholds.tom_ratio_jump);

        windows.push(AnalysisWindow {
            start_tick: s,
            end_tick: e,
            start_ms: tempo_map.tick_to_ms(s as f64),
            end_ms: tempo_map.tick_to_ms(e as f64),
            notes: notes_in_range(&voiced, s, e)
                .iter()
                .map(|n| track.note_event_groups[n.source].clone())
                .collect(),
            features,
            is_candidate,
        });
    }

    Ok(windows)
}

/// Mahalanobis distance of a window's features from its history
///
/// Each component's variance is floored at its noise level, so deviations are
/// measured in units of the larger of the observed spread and that floor.
fn groove_distance(features: &FeatureVector, history: &[Vec<f64>], regularization: f64) -> f64 {
    let means = column_means(history);
    let floored = add_variance_floor(&covariance_matrix(history), &GROOVE_NOISE_FLOORS);
    let covariance = regularize_covariance(&floored, regularization);
    match invert_matrix(&covariance) {
        Some(inverse) => mahalanobis_distance(&features.groove_components(), &means, &inverse),
        None => {
            log::warn!("Groove covariance is singular; skipping distance");
            0.0
        }
    }
}

/// Merge runs of candidate windows into fill segments
///
/// Candidates closer than `merge_gap_beats` join one span. Spans shorter
/// than `min_beats` or longer than `max_beats` are discarded.
pub fn merge_candidate_windows(
    windows: &[AnalysisWindow],
    resolution: u32,
    config: &FillConfig,
) -> Vec<FillSegment> {
    let resolution = resolution.max(1) as f64;
    let gap_ticks = config.merge_gap_beats * resolution;

    let mut candidates: Vec<&AnalysisWindow> = windows.iter().filter(|w| w.is_candidate).collect();
    candidates.sort_by_key(|w| (w.start_tick, w.end_tick));

    let mut runs: Vec<Vec<&AnalysisWindow>> = Vec::new();
    for window in candidates {
        if let Some(run) = runs.last_mut() {
            if (window.start_tick as f64) <= run_end(run) as f64 + gap_ticks {
                run.push(window);
                continue;
            }
        }
        runs.push(vec![window]);
    }

    runs.into_iter()
        .filter_map(|run| {
            let first = run.first()?;
            let last_end = run.iter().max_by_key(|w| w.end_tick)?;
            let beats = (last_end.end_tick - first.start_tick) as f64 / resolution;
            if beats < config.min_beats || beats > config.max_beats {
                log::debug!(
                    "Discarding {beats:.2}-beat span at tick {}",
                    first.start_tick
                );
                return None;
            }

            let mut scores = FillScores::default();
            for window in &run {
                scores.absorb(&window.features);
            }

            Some(FillSegment {
                song_id: config.song_id.clone(),
                start_tick: first.start_tick,
                end_tick: last_end.end_tick,
                start_ms: first.start_ms,
                end_ms: last_end.end_ms,
                window_count: run.len(),
                scores,
            })
        })
        .collect()
}

fn run_end(run: &[&AnalysisWindow]) -> u32 {
    run.iter().map(|w| w.end_tick).max().unwrap_or(0)
}
