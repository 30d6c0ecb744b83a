// Window Features - Baseline-independent measurements of one window
// Baseline-relative scores are derived from these in the detector

use std::collections::HashMap;

use crate::chart::NoteEvent;
use crate::drums::{map_note_to_voice, DrumVoice, LaneMap, VoiceCounts};
use crate::groove::{next_downbeat, quantize_tick, quantize_unit};
use crate::stats::standard_deviation;

/// Voices per bigram axis
const VOICE_COUNT: usize = 6;

/// Size of the flattened voice bigram histogram
pub const BIGRAM_BINS: usize = VOICE_COUNT * VOICE_COUNT;

/// A drum note snapped to the grid with its voice resolved
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoicedNote {
    /// Quantized tick
    pub tick: u32,
    /// Unquantized start time
    pub ms_time: f64,
    pub lane: u8,
    pub voice: DrumVoice,
    /// Index into the source note list
    pub source: usize,
}

/// Quantize and classify notes, ordered by (tick, voice)
pub fn voice_notes(
    notes: &[NoteEvent],
    resolution: u32,
    quant_div: u32,
    lane_map: &LaneMap,
) -> Vec<VoicedNote> {
    let mut voiced: Vec<VoicedNote> = notes
        .iter()
        .enumerate()
        .map(|(source, note)| VoicedNote {
            tick: quantize_tick(note.tick, resolution, quant_div),
            ms_time: note.ms_time,
            lane: note.note_type,
            voice: map_note_to_voice(note, lane_map),
            source,
        })
        .collect();
    voiced.sort_by_key(|n| (n.tick, n.voice.index(), n.lane));
    voiced
}

/// Notes with a quantized tick inside `[start, end)`
pub fn notes_in_range(notes: &[VoicedNote], start: u32, end: u32) -> &[VoicedNote] {
    let lo = notes.partition_point(|n| n.tick < start);
    let hi = notes.partition_point(|n| n.tick < end);
    &notes[lo..hi]
}

/// Measurements of a window that need no baseline
#[derive(Debug, Clone, PartialEq)]
pub struct WindowProfile {
    pub density: f64,
    pub counts: VoiceCounts,
    pub ioi_std: f64,
    /// Voice bigram counts, `from * 6 + to`
    pub bigrams: [f64; BIGRAM_BINS],
    pub same_pad_burst: bool,
    pub crash_resolve: bool,
}

/// Settings the profile needs from the detection config
#[derive(Debug, Clone, Copy)]
pub struct ProfileSettings {
    pub resolution: u32,
    pub quant_div: u32,
    pub burst_min_hits: usize,
    pub burst_ms: f64,
}

pub fn profile_window(
    window: &[VoicedNote],
    track: &[VoicedNote],
    bounds: (u32, u32),
    settings: ProfileSettings,
) -> WindowProfile {
    let (start, end) = bounds;
    let beats = (end.saturating_sub(start)) as f64 / settings.resolution.max(1) as f64;
    let density = if beats > 0.0 {
        window.len() as f64 / beats
    } else {
        0.0
    };

    let mut counts = VoiceCounts::default();
    for note in window {
        counts.add(note.voice);
    }

    WindowProfile {
        density,
        counts,
        ioi_std: inter_onset_std(window, settings.resolution),
        bigrams: voice_bigrams(window),
        same_pad_burst: has_same_pad_burst(window, settings.burst_min_hits, settings.burst_ms),
        crash_resolve: resolves_on_crash(track, end, settings.resolution, settings.quant_div),
    }
}

/// Standard deviation of the gaps between distinct onsets, in beats
///
/// Measured on the tick grid so a tempo change does not alter the spread.
fn inter_onset_std(window: &[VoicedNote], resolution: u32) -> f64 {
    let mut onsets: Vec<u32> = window.iter().map(|n| n.tick).collect();
    onsets.dedup();
    if onsets.len() < 2 {
        return 0.0;
    }

    let intervals: Vec<f64> = onsets
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) as f64 / resolution.max(1) as f64)
        .collect();
    standard_deviation(&intervals)
}

fn voice_bigrams(window: &[VoicedNote]) -> [f64; BIGRAM_BINS] {
    let mut bigrams = [0.0; BIGRAM_BINS];
    for pair in window.windows(2) {
        bigrams[pair[0].voice.index() * VOICE_COUNT + pair[1].voice.index()] += 1.0;
    }
    bigrams
}

/// At least `min_hits` hits on one lane within `burst_ms`
fn has_same_pad_burst(window: &[VoicedNote], min_hits: usize, burst_ms: f64) -> bool {
    if min_hits == 0 || window.len() < min_hits {
        return false;
    }

    let mut by_lane: HashMap<u8, Vec<f64>> = HashMap::new();
    for note in window {
        by_lane.entry(note.lane).or_default().push(note.ms_time);
    }

    by_lane.values_mut().any(|times| {
        times.sort_by(|a, b| a.total_cmp(b));
        times
            .windows(min_hits)
            .any(|run| run[min_hits - 1] - run[0] <= burst_ms)
    })
}

/// A cymbal (not a hat) lands on the first downbeat after the window
///
/// The downbeat must be within one beat of the window end; the hit may sit
/// up to one quantize unit away from it.
fn resolves_on_crash(track: &[VoicedNote], end: u32, resolution: u32, quant_div: u32) -> bool {
    let downbeat = next_downbeat(end, resolution);
    if downbeat - end > resolution {
        return false;
    }

    let tolerance = quantize_unit(resolution, quant_div).round() as u32;
    let lo = downbeat.saturating_sub(tolerance);
    let hi = downbeat.saturating_add(tolerance).saturating_add(1);
    notes_in_range(track, lo, hi)
        .iter()
        .any(|n| n.voice == DrumVoice::Cymbal)
}

/// Normalize a histogram to sum to 1, or None when it is empty
fn distribution(histogram: &[f64]) -> Option<Vec<f64>> {
    let total: f64 = histogram.iter().sum();
    if total > 0.0 {
        Some(histogram.iter().map(|v| v / total).collect())
    } else {
        None
    }
}

/// Half the L1 distance between two bigram distributions, in [0, 1]
///
/// Two empty histograms are identical; one empty histogram is maximally novel.
pub fn ngram_novelty(window: &[f64], baseline: &[f64]) -> f64 {
    match (distribution(window), distribution(baseline)) {
        (None, None) => 0.0,
        (Some(_), None) | (None, Some(_)) => 1.0,
        (Some(p), Some(q)) => 0.5 * p.iter().zip(&q).map(|(a, b)| (a - b).abs()).sum::<f64>(),
    }
}
