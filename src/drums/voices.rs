// Drum Voices - Maps chart lanes to semantic drum voices
// Lane maps are plain data so each game's convention can be passed in

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chart::{NoteEvent, NoteFlags};

/// General MIDI percussion note numbers
pub const MIDI_KICK: u8 = 36; // C1
pub const MIDI_SNARE: u8 = 38; // D1
pub const MIDI_CLOSED_HIHAT: u8 = 42; // F#1
pub const MIDI_OPEN_HIHAT: u8 = 46; // A#1
pub const MIDI_CRASH: u8 = 49; // C#2
pub const MIDI_RIDE: u8 = 51; // D#2

/// Semantic drum voice of a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrumVoice {
    Kick,
    Snare,
    Hat,
    Tom,
    Cymbal,
    Unknown,
}

impl DrumVoice {
    /// Stable index used for histograms
    pub fn index(&self) -> usize {
        match self {
            DrumVoice::Kick => 0,
            DrumVoice::Snare => 1,
            DrumVoice::Hat => 2,
            DrumVoice::Tom => 3,
            DrumVoice::Cymbal => 4,
            DrumVoice::Unknown => 5,
        }
    }
}

/// Voice assignment for one lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneRule {
    /// Voice for a plain (or tom-flagged) note
    pub voice: DrumVoice,

    /// Voice when the note carries the cymbal flag, if the lane has one
    #[serde(default)]
    pub cymbal_voice: Option<DrumVoice>,
}

impl LaneRule {
    pub fn fixed(voice: DrumVoice) -> Self {
        LaneRule {
            voice,
            cymbal_voice: None,
        }
    }

    pub fn pad(voice: DrumVoice, cymbal_voice: DrumVoice) -> Self {
        LaneRule {
            voice,
            cymbal_voice: Some(cymbal_voice),
        }
    }
}

/// Lane number to voice table for one game's drum convention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneMap {
    pub name: String,
    pub lanes: BTreeMap<u8, LaneRule>,
}

impl Default for LaneMap {
    fn default() -> Self {
        LaneMap::pro_drums()
    }
}

impl LaneMap {
    /// Four-lane pro drums: yellow/blue/green pads split into tom or cymbal
    pub fn pro_drums() -> Self {
        let lanes = BTreeMap::from([
            (0, LaneRule::fixed(DrumVoice::Kick)),
            (1, LaneRule::fixed(DrumVoice::Snare)),
            (2, LaneRule::pad(DrumVoice::Tom, DrumVoice::Hat)),
            (3, LaneRule::pad(DrumVoice::Tom, DrumVoice::Cymbal)),
            (4, LaneRule::pad(DrumVoice::Tom, DrumVoice::Cymbal)),
            (5, LaneRule::pad(DrumVoice::Tom, DrumVoice::Cymbal)),
        ]);
        LaneMap {
            name: "pro_drums".to_string(),
            lanes,
        }
    }

    /// Five-lane drums: fixed cymbal lanes on yellow and orange
    pub fn five_lane() -> Self {
        let lanes = BTreeMap::from([
            (0, LaneRule::fixed(DrumVoice::Kick)),
            (1, LaneRule::fixed(DrumVoice::Snare)),
            (2, LaneRule::fixed(DrumVoice::Hat)),
            (3, LaneRule::fixed(DrumVoice::Tom)),
            (4, LaneRule::fixed(DrumVoice::Cymbal)),
            (5, LaneRule::fixed(DrumVoice::Tom)),
        ]);
        LaneMap {
            name: "five_lane".to_string(),
            lanes,
        }
    }

    /// General MIDI percussion keys as lanes
    pub fn general_midi() -> Self {
        let mut lanes = BTreeMap::new();
        for key in [35, MIDI_KICK] {
            lanes.insert(key, LaneRule::fixed(DrumVoice::Kick));
        }
        for key in [37, MIDI_SNARE, 39, 40] {
            lanes.insert(key, LaneRule::fixed(DrumVoice::Snare));
        }
        for key in [MIDI_CLOSED_HIHAT, 44, MIDI_OPEN_HIHAT] {
            lanes.insert(key, LaneRule::fixed(DrumVoice::Hat));
        }
        for key in [41, 43, 45, 47, 48, 50] {
            lanes.insert(key, LaneRule::fixed(DrumVoice::Tom));
        }
        for key in [MIDI_CRASH, MIDI_RIDE, 52, 53, 55, 57, 59] {
            lanes.insert(key, LaneRule::fixed(DrumVoice::Cymbal));
        }
        LaneMap {
            name: "general_midi".to_string(),
            lanes,
        }
    }
}

/// Voice of a lane, given whether the note is flagged as a cymbal
pub fn map_lane_to_voice(lane: u8, cymbal: bool, map: &LaneMap) -> DrumVoice {
    match map.lanes.get(&lane) {
        Some(rule) if cymbal => rule.cymbal_voice.unwrap_or(rule.voice),
        Some(rule) => rule.voice,
        None => DrumVoice::Unknown,
    }
}

pub fn map_note_to_voice(note: &NoteEvent, map: &LaneMap) -> DrumVoice {
    map_lane_to_voice(note.note_type, note.flags.contains(NoteFlags::CYMBAL), map)
}

/// Notes grouped by voice, preserving tick order within each group
pub fn group_by_voice<'a>(
    notes: &'a [NoteEvent],
    map: &LaneMap,
) -> BTreeMap<DrumVoice, Vec<&'a NoteEvent>> {
    let mut groups: BTreeMap<DrumVoice, Vec<&NoteEvent>> = BTreeMap::new();
    for note in notes {
        groups.entry(map_note_to_voice(note, map)).or_default().push(note);
    }
    groups
}

/// Per-voice hit counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceCounts {
    pub kick: usize,
    pub snare: usize,
    pub hat: usize,
    pub tom: usize,
    pub cymbal: usize,
    pub unknown: usize,
}

impl VoiceCounts {
    pub fn add(&mut self, voice: DrumVoice) {
        match voice {
            DrumVoice::Kick => self.kick += 1,
            DrumVoice::Snare => self.snare += 1,
            DrumVoice::Hat => self.hat += 1,
            DrumVoice::Tom => self.tom += 1,
            DrumVoice::Cymbal => self.cymbal += 1,
            DrumVoice::Unknown => self.unknown += 1,
        }
    }

    pub fn get(&self, voice: DrumVoice) -> usize {
        match voice {
            DrumVoice::Kick => self.kick,
            DrumVoice::Snare => self.snare,
            DrumVoice::Hat => self.hat,
            DrumVoice::Tom => self.tom,
            DrumVoice::Cymbal => self.cymbal,
            DrumVoice::Unknown => self.unknown,
        }
    }

    /// Hits with a known voice
    pub fn classified(&self) -> usize {
        self.kick + self.snare + self.hat + self.tom + self.cymbal
    }

    pub fn total(&self) -> usize {
        self.classified() + self.unknown
    }

    /// Toms over all classified hits, 0 when nothing is classified
    pub fn tom_ratio(&self) -> f64 {
        match self.classified() {
            0 => 0.0,
            n => self.tom as f64 / n as f64,
        }
    }
}

pub fn count_voices(notes: &[NoteEvent], map: &LaneMap) -> VoiceCounts {
    let mut counts = VoiceCounts::default();
    for note in notes {
        counts.add(map_note_to_voice(note, map));
    }
    counts
}
