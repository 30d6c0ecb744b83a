// Track Builder - Collects raw notes and range modifiers for one track
// Both grammars express flags as separate marker events; they are folded in here

use super::types::{Difficulty, Instrument, NoteEvent, NoteFlags, TrackData};

/// Marker that modifies notes inside its tick range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// Pro drums cymbal marker for a lane
    Cymbal(u8),
    /// Pro drums tom marker for a lane
    Tom(u8),
    Accent(u8),
    Ghost(u8),
    Forced,
    Tap,
    StarPower,
}

/// Which drum pad type yellow/blue/green lanes use without a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadDefault {
    Tom,
    Cymbal,
}

/// Drum lanes that can be either a tom or a cymbal
const PRO_DRUM_LANES: std::ops::RangeInclusive<u8> = 2..=4;

#[derive(Debug)]
pub struct TrackBuilder {
    instrument: Instrument,
    difficulty: Difficulty,
    notes: Vec<NoteEvent>,

    /// (start tick, end tick exclusive, modifier)
    modifiers: Vec<(u32, u32, Modifier)>,
}

impl TrackBuilder {
    pub fn new(instrument: Instrument, difficulty: Difficulty) -> Self {
        TrackBuilder {
            instrument,
            difficulty,
            notes: Vec::new(),
            modifiers: Vec::new(),
        }
    }

    pub fn add_note(&mut self, tick: u32, length: u32, lane: u8, flags: NoteFlags) {
        self.notes.push(NoteEvent::new(tick, length, lane, flags));
    }

    /// Modifier active on notes starting at exactly `tick`
    pub fn add_point_modifier(&mut self, tick: u32, modifier: Modifier) {
        self.modifiers.push((tick, tick.saturating_add(1), modifier));
    }

    /// Modifier active on notes starting in `[start, start + length)`
    ///
    /// Zero-length ranges still cover the note at `start`.
    pub fn add_range_modifier(&mut self, start: u32, length: u32, modifier: Modifier) {
        let end = start.saturating_add(length.max(1));
        self.modifiers.push((start, end, modifier));
    }

    /// Fold modifiers into note flags and produce the finished track
    pub fn finish(self, pad_default: PadDefault) -> TrackData {
        let is_drums = self.instrument == Instrument::Drums;
        let mut notes = self.notes;

        for note in &mut notes {
            let mut cymbal_marker = false;
            let mut tom_marker = false;

            for &(start, end, modifier) in &self.modifiers {
                if note.tick < start || note.tick >= end {
                    continue;
                }
                match modifier {
                    Modifier::Cymbal(lane) if lane == note.note_type => cymbal_marker = true,
                    Modifier::Tom(lane) if lane == note.note_type => tom_marker = true,
                    Modifier::Accent(lane) if lane == note.note_type => {
                        note.flags |= NoteFlags::ACCENT
                    }
                    Modifier::Ghost(lane) if lane == note.note_type => {
                        note.flags |= NoteFlags::GHOST
                    }
                    Modifier::Forced => note.flags |= NoteFlags::FORCED,
                    Modifier::Tap => note.flags |= NoteFlags::TAP,
                    Modifier::StarPower => note.flags |= NoteFlags::STAR_POWER,
                    _ => {}
                }
            }

            if is_drums && PRO_DRUM_LANES.contains(&note.note_type) {
                let cymbal = match pad_default {
                    PadDefault::Tom => cymbal_marker,
                    PadDefault::Cymbal => !tom_marker,
                };
                note.flags |= if cymbal { NoteFlags::CYMBAL } else { NoteFlags::TOM };
            }
        }

        TrackData {
            instrument: self.instrument,
            difficulty: self.difficulty,
            note_event_groups: notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cymbal_marker_on_tom_default() {
        let mut builder = TrackBuilder::new(Instrument::Drums, Difficulty::Expert);
        builder.add_note(0, 0, 2, NoteFlags::empty());
        builder.add_note(0, 0, 3, NoteFlags::empty());
        builder.add_point_modifier(0, Modifier::Cymbal(2));

        let track = builder.finish(PadDefault::Tom);
        assert!(track.note_event_groups[0].flags.contains(NoteFlags::CYMBAL));
        assert!(track.note_event_groups[1].flags.contains(NoteFlags::TOM));
    }

    #[test]
    fn test_tom_range_on_cymbal_default() {
        let mut builder = TrackBuilder::new(Instrument::Drums, Difficulty::Expert);
        builder.add_note(100, 0, 4, NoteFlags::empty());
        builder.add_note(500, 0, 4, NoteFlags::empty());
        builder.add_range_modifier(0, 200, Modifier::Tom(4));

        let track = builder.finish(PadDefault::Cymbal);
        assert!(track.note_event_groups[0].flags.contains(NoteFlags::TOM));
        assert!(track.note_event_groups[1].flags.contains(NoteFlags::CYMBAL));
    }

    #[test]
    fn test_star_power_and_forced_apply_to_all_lanes() {
        let mut builder = TrackBuilder::new(Instrument::Guitar, Difficulty::Hard);
        builder.add_note(10, 0, 0, NoteFlags::empty());
        builder.add_note(10, 0, 3, NoteFlags::empty());
        builder.add_point_modifier(10, Modifier::Forced);
        builder.add_range_modifier(0, 50, Modifier::StarPower);

        let track = builder.finish(PadDefault::Tom);
        for note in &track.note_event_groups {
            assert!(note.flags.contains(NoteFlags::FORCED | NoteFlags::STAR_POWER));
            assert!(!note.flags.contains(NoteFlags::TOM));
        }
    }
}
