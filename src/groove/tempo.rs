// Tempo Map - Tick to millisecond integration over tempo segments
// Time is piecewise-linear in ticks: each segment runs at a constant BPM

use serde::{Deserialize, Serialize};

use crate::chart::types::{TempoEvent, DEFAULT_BPM};

/// Resolved tempo map with cumulative millisecond positions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempoMap {
    /// Ticks per quarter note
    pub resolution: u32,

    /// Tempo segments ordered by tick; the first always starts at tick 0
    pub tempos: Vec<TempoEvent>,
}

impl TempoMap {
    /// Build a tempo map from raw tempo events
    ///
    /// Events are sorted by tick, later duplicates at the same tick win, and a
    /// default 120 BPM segment is inserted at tick 0 when the chart provides
    /// none there. Non-positive BPM values are dropped.
    pub fn new(resolution: u32, tempos: &[TempoEvent]) -> Self {
        let mut sorted: Vec<TempoEvent> = tempos
            .iter()
            .filter(|t| t.bpm.is_finite() && t.bpm > 0.0)
            .cloned()
            .collect();
        sorted.sort_by_key(|t| t.tick);

        let mut deduped: Vec<TempoEvent> = Vec::with_capacity(sorted.len() + 1);
        for tempo in sorted {
            match deduped.last_mut() {
                Some(last) if last.tick == tempo.tick => *last = tempo,
                _ => deduped.push(tempo),
            }
        }

        if deduped.first().map(|t| t.tick) != Some(0) {
            deduped.insert(
                0,
                TempoEvent {
                    tick: 0,
                    bpm: DEFAULT_BPM,
                    ms_time: 0.0,
                },
            );
        }

        let resolution = resolution.max(1);
        let mut ms = 0.0;
        for i in 0..deduped.len() {
            if i > 0 {
                let prev = &deduped[i - 1];
                ms += ticks_to_ms_at(deduped[i].tick - prev.tick, prev.bpm, resolution);
            }
            deduped[i].ms_time = ms;
        }

        TempoMap {
            resolution,
            tempos: deduped,
        }
    }

    /// Index of the tempo segment containing `tick`
    fn segment_for_tick(&self, tick: f64) -> usize {
        self.tempos
            .partition_point(|t| (t.tick as f64) <= tick)
            .saturating_sub(1)
    }

    fn segment_for_ms(&self, ms: f64) -> usize {
        self.tempos
            .partition_point(|t| t.ms_time <= ms)
            .saturating_sub(1)
    }

    /// Millisecond position of a (possibly fractional) tick
    pub fn tick_to_ms(&self, tick: f64) -> f64 {
        let segment = &self.tempos[self.segment_for_tick(tick)];
        let delta_ticks = tick - segment.tick as f64;
        segment.ms_time + delta_ticks * 60000.0 / (segment.bpm * self.resolution as f64)
    }

    /// Tick position (fractional) of a millisecond time
    pub fn ms_to_tick(&self, ms: f64) -> f64 {
        let segment = &self.tempos[self.segment_for_ms(ms)];
        let per_tick = ms_per_tick(segment.bpm, self.resolution);
        segment.tick as f64 + (ms - segment.ms_time) / per_tick
    }

    /// Duration in milliseconds of `length` ticks starting at `tick`
    ///
    /// Tempo changes inside the span stretch or compress the result.
    pub fn span_ms(&self, tick: u32, length: u32) -> f64 {
        let start = tick as f64;
        self.tick_to_ms(start + length as f64) - self.tick_to_ms(start)
    }

    /// Tempo in effect at `tick`
    pub fn bpm_at(&self, tick: u32) -> f64 {
        self.tempos[self.segment_for_tick(tick as f64)].bpm
    }
}

fn ms_per_tick(bpm: f64, resolution: u32) -> f64 {
    60000.0 / (bpm * resolution as f64)
}

fn ticks_to_ms_at(ticks: u32, bpm: f64, resolution: u32) -> f64 {
    ticks as f64 * 60000.0 / (bpm * resolution as f64)
}
