// MIDI Chart Parser - Reads `notes.mid` charts using the midly crate
// Named instrument tracks carry one note range per difficulty

use std::collections::HashMap;

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

use super::builder::{Modifier, PadDefault, TrackBuilder};
use super::error::ChartParseError;
use super::timeline::apply_tempo_map;
use super::types::{
    section_name_from_event, Difficulty, Instrument, NoteFlags, ParseIssue, ParsedChart,
    SectionEvent, TempoEvent, TimeSignatureEvent,
};

/// Track holding global song events (sections, practice markers)
const EVENTS_TRACK: &str = "EVENTS";

/// Text event that turns velocity 127/1 into accent/ghost flags
const ENABLE_DYNAMICS: &str = "[ENABLE_CHART_DYNAMICS]";

const STAR_POWER_KEY: u8 = 116;
const TAP_KEY: u8 = 104;
const EXPERT_PLUS_KICK_KEY: u8 = 95;

/// Tom markers for the yellow, blue and green lanes
const TOM_MARKER_KEYS: std::ops::RangeInclusive<u8> = 110..=112;

const ACCENT_VELOCITY: u8 = 127;
const GHOST_VELOCITY: u8 = 1;

/// A paired note-on/note-off
#[derive(Debug, Clone, Copy)]
struct RawNote {
    key: u8,
    start: u32,
    length: u32,
    velocity: u8,
}

/// Lowest key of a difficulty's note range
fn difficulty_base(instrument: Instrument, difficulty: Difficulty) -> u8 {
    let base = match difficulty {
        Difficulty::Easy => 60,
        Difficulty::Medium => 72,
        Difficulty::Hard => 84,
        Difficulty::Expert => 96,
    };
    if instrument.is_ghl() {
        base - 2
    } else {
        base
    }
}

/// Parse a MIDI chart into a timeline
pub fn parse_chart_midi(data: &[u8]) -> Result<ParsedChart, ChartParseError> {
    let smf = Smf::parse(data)?;

    let resolution = match smf.header.timing {
        Timing::Metrical(ticks) => ticks.as_int() as u32,
        Timing::Timecode(fps, subframes) => {
            return Err(ChartParseError::UnsupportedTiming(format!(
                "{fps:?} fps with {subframes} subframes"
            )))
        }
    };
    if resolution == 0 {
        return Err(ChartParseError::ZeroResolution);
    }

    let mut chart = ParsedChart::empty(resolution);

    for (index, track) in smf.tracks.iter().enumerate() {
        collect_sync_events(&mut chart, track);

        let Some(name) = track_name(track) else {
            continue;
        };

        if name.eq_ignore_ascii_case(EVENTS_TRACK) {
            collect_sections(&mut chart, track);
            continue;
        }

        let Some(instrument) = Instrument::from_midi_track_name(&name) else {
            log::debug!("Skipping MIDI track {index} ({name})");
            continue;
        };

        let (notes, unclosed, dynamics) = pair_notes(track);
        if unclosed > 0 {
            chart.parse_issues.push(ParseIssue::new(
                index,
                format!("{unclosed} note(s) in {name} were never released"),
            ));
        }

        for difficulty in Difficulty::all() {
            let builder = if instrument == Instrument::Drums {
                build_drum_track(&notes, difficulty, dynamics)
            } else {
                build_fret_track(&notes, instrument, difficulty, resolution)
            };
            let pad_default = PadDefault::Cymbal;
            chart.track_data.push(builder.finish(pad_default));
        }
    }

    apply_tempo_map(&mut chart);
    Ok(chart)
}

fn track_name(track: &[TrackEvent]) -> Option<String> {
    track.iter().find_map(|event| match event.kind {
        TrackEventKind::Meta(MetaMessage::TrackName(bytes)) => {
            Some(String::from_utf8_lossy(bytes).trim().to_string())
        }
        _ => None,
    })
}

/// Iterate events with absolute tick positions
fn absolute_events<'a, 'b>(
    track: &'b [TrackEvent<'a>],
) -> impl Iterator<Item = (u32, &'b TrackEvent<'a>)> + 'b {
    let mut tick = 0u32;
    track.iter().map(move |event| {
        tick = tick.saturating_add(event.delta.as_int());
        (tick, event)
    })
}

fn collect_sync_events(chart: &mut ParsedChart, track: &[TrackEvent]) {
    for (tick, event) in absolute_events(track) {
        match event.kind {
            TrackEventKind::Meta(MetaMessage::Tempo(us_per_quarter)) => {
                let us = us_per_quarter.as_int();
                if us > 0 {
                    chart.tempos.push(TempoEvent {
                        tick,
                        bpm: 60_000_000.0 / us as f64,
                        ms_time: 0.0,
                    });
                }
            }
            TrackEventKind::Meta(MetaMessage::TimeSignature(numerator, denominator_pow, _, _)) => {
                chart.time_signatures.push(TimeSignatureEvent {
                    tick,
                    numerator: numerator as u32,
                    denominator: 1u32.checked_shl(denominator_pow as u32).unwrap_or(4),
                });
            }
            _ => {}
        }
    }
}

fn collect_sections(chart: &mut ParsedChart, track: &[TrackEvent]) {
    for (tick, event) in absolute_events(track) {
        let text = match event.kind {
            TrackEventKind::Meta(MetaMessage::Text(bytes))
            | TrackEventKind::Meta(MetaMessage::Marker(bytes)) => String::from_utf8_lossy(bytes),
            _ => continue,
        };
        if let Some(name) = section_name_from_event(&text) {
            chart.sections.push(SectionEvent {
                tick,
                ms_time: 0.0,
                name,
            });
        }
    }
}

/// Pair note-on/note-off events per key
///
/// Returns the paired notes, the number of notes never released, and
/// whether the track enables chart dynamics.
fn pair_notes(track: &[TrackEvent]) -> (Vec<RawNote>, usize, bool) {
    let mut open: HashMap<u8, (u32, u8)> = HashMap::new();
    let mut notes = Vec::new();
    let mut dynamics = false;

    for (tick, event) in absolute_events(track) {
        match event.kind {
            TrackEventKind::Midi { message, .. } => {
                let (key, velocity, is_on) = match message {
                    MidiMessage::NoteOn { key, vel } => (key.as_int(), vel.as_int(), vel.as_int() > 0),
                    MidiMessage::NoteOff { key, vel } => (key.as_int(), vel.as_int(), false),
                    _ => continue,
                };

                // A re-trigger closes the previous note on the same key
                if let Some((start, vel)) = open.remove(&key) {
                    notes.push(RawNote {
                        key,
                        start,
                        length: tick - start,
                        velocity: vel,
                    });
                }
                if is_on {
                    open.insert(key, (tick, velocity));
                }
            }
            TrackEventKind::Meta(MetaMessage::Text(bytes)) => {
                if String::from_utf8_lossy(bytes).trim() == ENABLE_DYNAMICS {
                    dynamics = true;
                }
            }
            _ => {}
        }
    }

    let unclosed = open.len();
    for (key, (start, velocity)) in open {
        notes.push(RawNote {
            key,
            start,
            length: 0,
            velocity,
        });
    }

    notes.sort_by_key(|n| (n.start, n.key));
    (notes, unclosed, dynamics)
}

fn build_drum_track(notes: &[RawNote], difficulty: Difficulty, dynamics: bool) -> TrackBuilder {
    let base = difficulty_base(Instrument::Drums, difficulty);
    let mut builder = TrackBuilder::new(Instrument::Drums, difficulty);

    for note in notes {
        match note.key {
            key if (base..=base + 5).contains(&key) => {
                let lane = key - base;
                let mut flags = NoteFlags::empty();
                if dynamics && lane > 0 {
                    if note.velocity == ACCENT_VELOCITY {
                        flags |= NoteFlags::ACCENT;
                    } else if note.velocity == GHOST_VELOCITY {
                        flags |= NoteFlags::GHOST;
                    }
                }
                builder.add_note(note.start, 0, lane, flags);
            }
            EXPERT_PLUS_KICK_KEY if difficulty == Difficulty::Expert => {
                builder.add_note(note.start, 0, 0, NoteFlags::DOUBLE_KICK);
            }
            key if TOM_MARKER_KEYS.contains(&key) => {
                // 110 yellow, 111 blue, 112 green
                builder.add_range_modifier(note.start, note.length, Modifier::Tom(key - 108));
            }
            STAR_POWER_KEY => {
                builder.add_range_modifier(note.start, note.length, Modifier::StarPower);
            }
            _ => {}
        }
    }

    builder
}

fn build_fret_track(
    notes: &[RawNote],
    instrument: Instrument,
    difficulty: Difficulty,
    resolution: u32,
) -> TrackBuilder {
    let base = difficulty_base(instrument, difficulty);
    let mut builder = TrackBuilder::new(instrument, difficulty);

    // Sustains shorter than a third of a beat are plain notes
    let sustain_cutoff = resolution / 3;

    // GHL open is key offset 0, then white 1-3 and black 1-3
    const GHL_LANES: [u8; 7] = [7, 0, 1, 2, 3, 4, 8];
    let (lane_count, forced_offset) = if instrument.is_ghl() { (7, 7) } else { (5, 5) };

    for note in notes {
        let length = if note.length < sustain_cutoff { 0 } else { note.length };

        if note.key >= base && note.key < base + lane_count {
            let offset = note.key - base;
            let (lane, flags) = if instrument.is_ghl() {
                let lane = GHL_LANES[offset as usize];
                let flags = if lane == 7 { NoteFlags::OPEN } else { NoteFlags::empty() };
                (lane, flags)
            } else {
                (offset, NoteFlags::empty())
            };
            builder.add_note(note.start, length, lane, flags);
        } else if note.key == base + forced_offset {
            builder.add_range_modifier(note.start, note.length, Modifier::Forced);
        } else if note.key == TAP_KEY {
            builder.add_range_modifier(note.start, note.length, Modifier::Tap);
        } else if note.key == STAR_POWER_KEY {
            builder.add_range_modifier(note.start, note.length, Modifier::StarPower);
        }
    }

    builder
}
