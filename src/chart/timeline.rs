// Timeline - Converges both grammars onto tick-ordered, millisecond-stamped notes
// Runs once at the end of every parse

use crate::groove::TempoMap;

use super::types::ParsedChart;

/// Sort every track and stamp millisecond times from the tempo map
///
/// Tempo events are normalized (sorted, deduplicated, default tick-0 tempo
/// inserted) and written back so `chart.tempos` carries their `ms_time`.
pub fn apply_tempo_map(chart: &mut ParsedChart) {
    let tempo_map = TempoMap::new(chart.resolution, &chart.tempos);

    for track in &mut chart.track_data {
        track
            .note_event_groups
            .sort_by(|a, b| a.tick.cmp(&b.tick).then(a.note_type.cmp(&b.note_type)));

        for note in &mut track.note_event_groups {
            note.ms_time = tempo_map.tick_to_ms(note.tick as f64);
            note.ms_length = tempo_map.span_ms(note.tick, note.length);
        }
    }

    chart.track_data.retain(|t| !t.is_empty());
    chart
        .track_data
        .sort_by_key(|t| (t.instrument, t.difficulty));

    chart.time_signatures.sort_by_key(|ts| ts.tick);

    chart.sections.sort_by_key(|s| s.tick);
    for section in &mut chart.sections {
        section.ms_time = tempo_map.tick_to_ms(section.tick as f64);
    }

    chart.tempos = tempo_map.tempos;
}
