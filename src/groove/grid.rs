// Musical Grid - Tick/beat conversions, measure positions and analysis windows
// Measure helpers assume 4/4 time for downbeat and strong-beat classification

use serde::{Deserialize, Serialize};

/// Beats per measure assumed by the measure helpers (4/4 time)
pub const BEATS_PER_MEASURE: u32 = 4;

/// What to do with the final window when it would run past the range end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowEdgePolicy {
    /// Emit the window truncated at the range end
    Clip,

    /// Only emit windows that fit entirely inside the range
    #[default]
    Drop,
}

/// Convert ticks to (fractional) beats
pub fn tick_to_beat(tick: f64, resolution: u32) -> f64 {
    tick / resolution.max(1) as f64
}

/// Convert (fractional) beats to ticks
pub fn beat_to_tick(beat: f64, resolution: u32) -> f64 {
    beat * resolution.max(1) as f64
}

/// Length in whole ticks of a beat count, at least one tick
pub fn beats_to_ticks(beats: f64, resolution: u32) -> u32 {
    (beat_to_tick(beats, resolution).round() as u32).max(1)
}

fn ticks_per_measure(resolution: u32) -> u32 {
    resolution.max(1) * BEATS_PER_MEASURE
}

/// Measure number (0-indexed) containing `tick`
pub fn measure_of(tick: u32, resolution: u32) -> u32 {
    tick / ticks_per_measure(resolution)
}

/// Beat number within the measure (0-indexed)
pub fn beat_in_measure(tick: u32, resolution: u32) -> u32 {
    (tick % ticks_per_measure(resolution)) / resolution.max(1)
}

/// First beat of a measure
pub fn is_downbeat(tick: u32, resolution: u32) -> bool {
    tick % ticks_per_measure(resolution) == 0
}

/// Beats 1 and 3 of a 4/4 measure
pub fn is_strong_beat(tick: u32, resolution: u32) -> bool {
    tick % (resolution.max(1) * 2) == 0
}

/// First downbeat at or after `tick`
pub fn next_downbeat(tick: u32, resolution: u32) -> u32 {
    let measure = ticks_per_measure(resolution);
    tick.div_ceil(measure) * measure
}

/// Generate overlapping `[start, end)` windows covering `[start, end)`
///
/// Windows are `window_beats` long and advance by `stride_beats`. The final
/// window is handled according to `policy`: `Clip` truncates it at `end`,
/// `Drop` omits any window that would extend past `end`.
pub fn get_window_boundaries(
    start: u32,
    end: u32,
    window_beats: f64,
    stride_beats: f64,
    resolution: u32,
    policy: WindowEdgePolicy,
) -> Vec<(u32, u32)> {
    if end <= start || window_beats <= 0.0 || stride_beats <= 0.0 {
        return Vec::new();
    }

    let window = beats_to_ticks(window_beats, resolution);
    let stride = beats_to_ticks(stride_beats, resolution);

    let mut windows = Vec::new();
    let mut window_start = start;

    while window_start < end {
        let window_end = window_start.saturating_add(window);
        if window_end <= end {
            windows.push((window_start, window_end));
        } else {
            match policy {
                WindowEdgePolicy::Clip => windows.push((window_start, end)),
                // Every later window would also overrun the end
                WindowEdgePolicy::Drop => break,
            }
        }
        window_start = window_start.saturating_add(stride);
    }

    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_beat_conversion() {
        assert_eq!(tick_to_beat(384.0, 192), 2.0);
        assert_eq!(beat_to_tick(1.5, 192), 288.0);
        assert_eq!(beats_to_ticks(0.0001, 192), 1);
    }

    #[test]
    fn test_measure_helpers() {
        let res = 192;
        assert_eq!(measure_of(768, res), 1);
        assert_eq!(beat_in_measure(768 + 192 * 3, res), 3);
        assert!(is_downbeat(1536, res));
        assert!(!is_downbeat(1536 + 192, res));
        assert!(is_strong_beat(384, res));
        assert!(!is_strong_beat(192, res));
    }

    #[test]
    fn test_next_downbeat() {
        assert_eq!(next_downbeat(0, 192), 0);
        assert_eq!(next_downbeat(1, 192), 768);
        assert_eq!(next_downbeat(768, 192), 768);
        assert_eq!(next_downbeat(769, 192), 1536);
    }

    #[test]
    fn test_windows_drop_policy() {
        // 10 beats, 4-beat windows every 2 beats
        let windows = get_window_boundaries(0, 1920, 4.0, 2.0, 192, WindowEdgePolicy::Drop);
        assert_eq!(windows, vec![(0, 768), (384, 1152), (768, 1536), (1152, 1920)]);
    }

    #[test]
    fn test_windows_clip_policy() {
        let windows = get_window_boundaries(0, 1920, 4.0, 2.0, 192, WindowEdgePolicy::Clip);
        assert_eq!(windows.len(), 5);
        assert_eq!(windows[4], (1536, 1920));
        assert!(windows.iter().all(|&(s, e)| s < e && e <= 1920));
    }

    #[test]
    fn test_windows_cover_range() {
        let windows = get_window_boundaries(192, 1152, 2.0, 1.0, 192, WindowEdgePolicy::Clip);
        assert_eq!(windows.first().map(|w| w.0), Some(192));
        assert_eq!(windows.last().map(|w| w.1), Some(1152));
    }

    #[test]
    fn test_windows_empty_range() {
        assert!(get_window_boundaries(100, 100, 4.0, 1.0, 192, WindowEdgePolicy::Clip).is_empty());
        assert!(get_window_boundaries(0, 100, 4.0, 1.0, 192, WindowEdgePolicy::Drop).is_empty());
    }
}
