// Chart types - Unified note timeline shared by both chart grammars
// A ParsedChart is built once per parse call and read-only afterwards

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Ticks per quarter note assumed when a chart omits its resolution
pub const DEFAULT_RESOLUTION: u32 = 192;

/// Tempo assumed at tick 0 when a chart has no tempo events
pub const DEFAULT_BPM: f64 = 120.0;

/// Instrument a track belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Instrument {
    Guitar,
    GuitarCoop,
    Rhythm,
    Bass,
    Drums,
    Keys,
    GuitarGhl,
    BassGhl,
}

impl Instrument {
    /// Suffix used by text chart section names (`[Expert<suffix>]`)
    pub fn chart_suffix(&self) -> &'static str {
        match self {
            Instrument::Guitar => "Single",
            Instrument::GuitarCoop => "DoubleGuitar",
            Instrument::Rhythm => "DoubleRhythm",
            Instrument::Bass => "DoubleBass",
            Instrument::Drums => "Drums",
            Instrument::Keys => "Keyboard",
            Instrument::GuitarGhl => "GHLGuitar",
            Instrument::BassGhl => "GHLBass",
        }
    }

    /// Track name used by MIDI charts
    pub fn midi_track_name(&self) -> &'static str {
        match self {
            Instrument::Guitar => "PART GUITAR",
            Instrument::GuitarCoop => "PART GUITAR COOP",
            Instrument::Rhythm => "PART RHYTHM",
            Instrument::Bass => "PART BASS",
            Instrument::Drums => "PART DRUMS",
            Instrument::Keys => "PART KEYS",
            Instrument::GuitarGhl => "PART GUITAR GHL",
            Instrument::BassGhl => "PART BASS GHL",
        }
    }

    pub fn all() -> [Instrument; 8] {
        [
            Instrument::Guitar,
            Instrument::GuitarCoop,
            Instrument::Rhythm,
            Instrument::Bass,
            Instrument::Drums,
            Instrument::Keys,
            Instrument::GuitarGhl,
            Instrument::BassGhl,
        ]
    }

    pub fn from_midi_track_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::all()
            .into_iter()
            .find(|i| i.midi_track_name().eq_ignore_ascii_case(name))
    }

    pub fn is_ghl(&self) -> bool {
        matches!(self, Instrument::GuitarGhl | Instrument::BassGhl)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub fn all() -> [Difficulty; 4] {
        [
            Difficulty::Easy,
            Difficulty::Medium,
            Difficulty::Hard,
            Difficulty::Expert,
        ]
    }

    /// Prefix used by text chart section names
    pub fn chart_prefix(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::Expert => "Expert",
        }
    }
}

bitflags! {
    /// Per-note modifiers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct NoteFlags: u32 {
        const CYMBAL = 1 << 0;
        const TOM = 1 << 1;
        const DOUBLE_KICK = 1 << 2;
        const ACCENT = 1 << 3;
        const GHOST = 1 << 4;
        const STAR_POWER = 1 << 5;
        const FORCED = 1 << 6;
        const TAP = 1 << 7;
        const OPEN = 1 << 8;
    }
}

/// A single note with both tick and millisecond timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    pub tick: u32,

    /// Start time in milliseconds, derived from the tempo map
    pub ms_time: f64,

    /// Sustain length in ticks (0 for plain hits)
    pub length: u32,

    /// Sustain length in milliseconds, stretched by any mid-note tempo change
    pub ms_length: f64,

    /// Lane id in the source game's convention
    #[serde(rename = "type")]
    pub note_type: u8,

    pub flags: NoteFlags,
}

impl NoteEvent {
    /// Note with tick timing only; millisecond fields are filled by the timeline
    pub fn new(tick: u32, length: u32, note_type: u8, flags: NoteFlags) -> Self {
        NoteEvent {
            tick,
            ms_time: 0.0,
            length,
            ms_length: 0.0,
            note_type,
            flags,
        }
    }

    pub fn is_cymbal(&self) -> bool {
        self.flags.contains(NoteFlags::CYMBAL)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempoEvent {
    pub tick: u32,
    pub bpm: f64,

    /// Time of this tempo change in milliseconds
    pub ms_time: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSignatureEvent {
    pub tick: u32,
    pub numerator: u32,
    pub denominator: u32,
}

/// A named song section marker (verse, chorus, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionEvent {
    pub tick: u32,
    pub ms_time: f64,
    pub name: String,
}

/// All notes for one (instrument, difficulty) pair, ordered by tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackData {
    pub instrument: Instrument,
    pub difficulty: Difficulty,
    pub note_event_groups: Vec<NoteEvent>,
}

impl TrackData {
    pub fn new(instrument: Instrument, difficulty: Difficulty) -> Self {
        TrackData {
            instrument,
            difficulty,
            note_event_groups: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.note_event_groups.is_empty()
    }
}

/// Recoverable problem found while parsing a chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseIssue {
    /// 1-based source line for text charts, track index for MIDI charts
    pub location: usize,
    pub message: String,
}

impl ParseIssue {
    pub fn new(location: usize, message: impl Into<String>) -> Self {
        ParseIssue {
            location,
            message: message.into(),
        }
    }
}

/// Parsed chart: resolution, tempo map and per-track note timelines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedChart {
    /// Ticks per quarter note
    pub resolution: u32,
    pub tempos: Vec<TempoEvent>,
    pub time_signatures: Vec<TimeSignatureEvent>,
    pub sections: Vec<SectionEvent>,
    pub track_data: Vec<TrackData>,

    pub name: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub year: Option<String>,
    pub charter: Option<String>,

    /// Audio offset declared by the chart, in milliseconds
    pub chart_offset_ms: f64,

    pub parse_issues: Vec<ParseIssue>,
}

impl ParsedChart {
    /// Chart with no tempo, track or metadata content yet
    pub fn empty(resolution: u32) -> Self {
        ParsedChart {
            resolution,
            tempos: Vec::new(),
            time_signatures: Vec::new(),
            sections: Vec::new(),
            track_data: Vec::new(),
            name: None,
            artist: None,
            album: None,
            genre: None,
            year: None,
            charter: None,
            chart_offset_ms: 0.0,
            parse_issues: Vec::new(),
        }
    }

    pub fn track(&self, instrument: Instrument, difficulty: Difficulty) -> Option<&TrackData> {
        self.track_data
            .iter()
            .find(|t| t.instrument == instrument && t.difficulty == difficulty)
    }
}

/// Section name from a global event text such as `section Verse 1` or `[prc_chorus]`
pub fn section_name_from_event(text: &str) -> Option<String> {
    let text = text.trim().trim_start_matches('[').trim_end_matches(']').trim();
    let name = text
        .strip_prefix("section ")
        .or_else(|| text.strip_prefix("section_"))
        .or_else(|| text.strip_prefix("prc_"))?
        .trim();

    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
