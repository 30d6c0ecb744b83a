// Groove Engine - Tempo map, grid and quantization
// Musical timing utilities over chart ticks

pub mod tempo;
pub mod grid;
pub mod quantize;

pub use tempo::TempoMap;
pub use grid::{
    beat_in_measure, beat_to_tick, beats_to_ticks, get_window_boundaries, is_downbeat,
    is_strong_beat, measure_of, next_downbeat, tick_to_beat, WindowEdgePolicy, BEATS_PER_MEASURE,
};
pub use quantize::{quantize_tick, quantize_unit, snap_delta};
