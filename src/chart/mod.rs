// Chart Parser - Text `.chart` and MIDI charts into one timeline
// Both grammars share a track builder and the tempo-map timeline pass

pub mod builder;
pub mod error;
pub mod midi;
pub mod text;
pub mod timeline;
pub mod types;

pub use error::ChartParseError;
pub use midi::parse_chart_midi;
pub use text::parse_chart_text;
pub use types::{
    Difficulty, Instrument, NoteEvent, NoteFlags, ParseIssue, ParsedChart, SectionEvent,
    TempoEvent, TimeSignatureEvent, TrackData, DEFAULT_BPM, DEFAULT_RESOLUTION,
};

use serde::{Deserialize, Serialize};

/// Chart file grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartFormat {
    Chart,
    Midi,
}

impl ChartFormat {
    /// Grammar for a file extension (case-insensitive, without the dot)
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "chart" => Some(ChartFormat::Chart),
            "mid" | "midi" => Some(ChartFormat::Midi),
            _ => None,
        }
    }

    /// Grammar for a file name, from its extension
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, extension) = name.rsplit_once('.')?;
        Self::from_extension(extension)
    }
}

/// Parse chart bytes with the given grammar
pub fn parse_chart(data: &[u8], format: ChartFormat) -> Result<ParsedChart, ChartParseError> {
    let chart = match format {
        ChartFormat::Chart => parse_chart_text(data)?,
        ChartFormat::Midi => parse_chart_midi(data)?,
    };

    log::debug!(
        "Parsed {:?} chart: {} tracks, {} tempo events, {} issues",
        format,
        chart.track_data.len(),
        chart.tempos.len(),
        chart.parse_issues.len()
    );

    Ok(chart)
}
