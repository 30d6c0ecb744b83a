// Text Chart Parser - Line-oriented `.chart` grammar
// `[Section]` headers followed by `{ ... }` bodies of `key = value` lines

use std::collections::BTreeMap;

use encoding_rs::{Encoding, UTF_8};

use super::builder::{Modifier, PadDefault, TrackBuilder};
use super::error::ChartParseError;
use super::timeline::apply_tempo_map;
use super::types::{
    section_name_from_event, Difficulty, Instrument, NoteFlags, ParseIssue, ParsedChart,
    SectionEvent, TempoEvent, TimeSignatureEvent, DEFAULT_RESOLUTION,
};

/// Star power phrase id used by `S` events
const STAR_POWER_PHRASE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Song,
    SyncTrack,
    Events,
    Track(Instrument, Difficulty),
    /// Well-formed header for a section this parser does not read
    Ignored,
}

/// Parse a `.chart` file into a timeline
///
/// Malformed lines are skipped and recorded in `parse_issues`. Fails only
/// when the bytes are not text or contain no section at all.
pub fn parse_chart_text(data: &[u8]) -> Result<ParsedChart, ChartParseError> {
    let text = decode_text(data)?;

    let mut chart = ParsedChart::empty(DEFAULT_RESOLUTION);
    let mut resolution: Option<u32> = None;
    let mut section: Option<SectionKind> = None;
    let mut saw_section = false;
    let mut tracks: BTreeMap<(Instrument, Difficulty), TrackBuilder> = BTreeMap::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();

        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        if line.starts_with('[') {
            saw_section = true;
            section = Some(match parse_section_header(line) {
                Some(name) => section_kind(name),
                None => {
                    chart
                        .parse_issues
                        .push(ParseIssue::new(line_no, format!("Unparseable section header: {line}")));
                    SectionKind::Ignored
                }
            });
            continue;
        }

        match line {
            "{" => continue,
            "}" => {
                section = None;
                continue;
            }
            _ => {}
        }

        let Some(kind) = section else {
            chart
                .parse_issues
                .push(ParseIssue::new(line_no, "Line outside of any section"));
            continue;
        };

        if kind == SectionKind::Ignored {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            chart
                .parse_issues
                .push(ParseIssue::new(line_no, format!("Expected `key = value`: {line}")));
            continue;
        };
        let (key, value) = (key.trim(), value.trim());

        let result = match kind {
            SectionKind::Song => parse_song_line(&mut chart, &mut resolution, key, value),
            SectionKind::SyncTrack => parse_sync_line(&mut chart, key, value),
            SectionKind::Events => parse_event_line(&mut chart, key, value),
            SectionKind::Track(instrument, difficulty) => {
                let builder = tracks
                    .entry((instrument, difficulty))
                    .or_insert_with(|| TrackBuilder::new(instrument, difficulty));
                parse_track_line(builder, instrument, key, value)
            }
            SectionKind::Ignored => Ok(()),
        };

        if let Err(message) = result {
            chart.parse_issues.push(ParseIssue::new(line_no, message));
        }
    }

    if !saw_section {
        return Err(ChartParseError::NoSections);
    }

    chart.resolution = match resolution {
        Some(0) => return Err(ChartParseError::ZeroResolution),
        Some(r) => r,
        None => {
            chart.parse_issues.push(ParseIssue::new(
                0,
                format!("Missing resolution, assuming {DEFAULT_RESOLUTION}"),
            ));
            DEFAULT_RESOLUTION
        }
    };

    chart.track_data = tracks
        .into_values()
        .map(|builder| builder.finish(PadDefault::Tom))
        .collect();

    if !chart.parse_issues.is_empty() {
        log::warn!("Chart parsed with {} issue(s)", chart.parse_issues.len());
    }

    apply_tempo_map(&mut chart);
    Ok(chart)
}

/// Decode chart bytes using their BOM, defaulting to UTF-8
fn decode_text(data: &[u8]) -> Result<String, ChartParseError> {
    let (encoding, bom_len) = Encoding::for_bom(data).unwrap_or((UTF_8, 0));
    encoding
        .decode_without_bom_handling_and_without_replacement(&data[bom_len..])
        .map(|text| text.into_owned())
        .ok_or(ChartParseError::Encoding)
}

fn parse_section_header(line: &str) -> Option<&str> {
    let name = line.strip_prefix('[')?.strip_suffix(']')?.trim();
    if name.is_empty() || name.contains(['[', ']']) {
        None
    } else {
        Some(name)
    }
}

fn section_kind(name: &str) -> SectionKind {
    match name {
        "Song" => return SectionKind::Song,
        "SyncTrack" => return SectionKind::SyncTrack,
        "Events" => return SectionKind::Events,
        _ => {}
    }

    for difficulty in Difficulty::all() {
        let Some(suffix) = name.strip_prefix(difficulty.chart_prefix()) else {
            continue;
        };
        if let Some(instrument) = Instrument::all()
            .into_iter()
            .find(|i| i.chart_suffix() == suffix)
        {
            return SectionKind::Track(instrument, difficulty);
        }
    }

    log::debug!("Skipping unsupported chart section [{name}]");
    SectionKind::Ignored
}

/// Strip one pair of surrounding double quotes
fn unquote(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_tick(key: &str) -> Result<u32, String> {
    key.parse::<u32>()
        .map_err(|_| format!("Invalid tick `{key}`"))
}

fn parse_song_line(
    chart: &mut ParsedChart,
    resolution: &mut Option<u32>,
    key: &str,
    value: &str,
) -> Result<(), String> {
    match key.to_ascii_lowercase().as_str() {
        "resolution" => {
            let parsed = unquote(value)
                .parse::<u32>()
                .map_err(|_| format!("Invalid resolution `{value}`"))?;
            *resolution = Some(parsed);
        }
        "name" => chart.name = non_empty(unquote(value)),
        "artist" => chart.artist = non_empty(unquote(value)),
        "album" => chart.album = non_empty(unquote(value)),
        "genre" => chart.genre = non_empty(unquote(value)),
        "charter" => chart.charter = non_empty(unquote(value)),
        // Years are conventionally written as `", 2004"`
        "year" => chart.year = non_empty(unquote(value).trim_start_matches(',')),
        "offset" => {
            let seconds = unquote(value)
                .parse::<f64>()
                .map_err(|_| format!("Invalid offset `{value}`"))?;
            chart.chart_offset_ms = seconds * 1000.0;
        }
        _ => {}
    }
    Ok(())
}

fn parse_sync_line(chart: &mut ParsedChart, key: &str, value: &str) -> Result<(), String> {
    let tick = parse_tick(key)?;
    let mut parts = value.split_whitespace();

    match parts.next() {
        Some("B") => {
            let milli_bpm = parts
                .next()
                .and_then(|v| v.parse::<u64>().ok())
                .ok_or_else(|| format!("Invalid tempo event `{value}`"))?;
            chart.tempos.push(TempoEvent {
                tick,
                bpm: milli_bpm as f64 / 1000.0,
                ms_time: 0.0,
            });
        }
        Some("TS") => {
            let numerator = parts
                .next()
                .and_then(|v| v.parse::<u32>().ok())
                .ok_or_else(|| format!("Invalid time signature `{value}`"))?;
            let exponent = match parts.next() {
                Some(v) => v
                    .parse::<u32>()
                    .map_err(|_| format!("Invalid time signature `{value}`"))?,
                None => 2,
            };
            let denominator = 1u32
                .checked_shl(exponent)
                .ok_or_else(|| format!("Invalid time signature `{value}`"))?;
            chart.time_signatures.push(TimeSignatureEvent {
                tick,
                numerator,
                denominator,
            });
        }
        // Anchors only matter to chart editors
        Some("A") => {}
        _ => return Err(format!("Unknown sync event `{value}`")),
    }
    Ok(())
}

fn parse_event_line(chart: &mut ParsedChart, key: &str, value: &str) -> Result<(), String> {
    let tick = parse_tick(key)?;
    let Some(text) = value.strip_prefix('E') else {
        return Err(format!("Unknown global event `{value}`"));
    };

    if let Some(name) = section_name_from_event(unquote(text)) {
        chart.sections.push(SectionEvent {
            tick,
            ms_time: 0.0,
            name,
        });
    }
    Ok(())
}

fn parse_track_line(
    builder: &mut TrackBuilder,
    instrument: Instrument,
    key: &str,
    value: &str,
) -> Result<(), String> {
    let tick = parse_tick(key)?;
    let mut parts = value.split_whitespace();
    let kind = parts.next();

    if kind == Some("E") {
        return Ok(());
    }

    let mut number = || parts.next().and_then(|v| v.parse::<u32>().ok());
    let (Some(id), Some(length)) = (number(), number()) else {
        return Err(format!("Invalid track event `{value}`"));
    };

    match kind {
        Some("N") if instrument == Instrument::Drums => add_drum_note(builder, tick, id, length),
        Some("N") => add_fret_note(builder, instrument, tick, id, length),
        Some("S") => {
            if id == STAR_POWER_PHRASE {
                builder.add_range_modifier(tick, length, Modifier::StarPower);
            }
            Ok(())
        }
        _ => Err(format!("Unknown track event `{value}`")),
    }
}

fn add_drum_note(builder: &mut TrackBuilder, tick: u32, id: u32, length: u32) -> Result<(), String> {
    match id {
        0..=5 => builder.add_note(tick, length, id as u8, NoteFlags::empty()),
        32 => builder.add_note(tick, length, 0, NoteFlags::DOUBLE_KICK),
        34..=38 => builder.add_point_modifier(tick, Modifier::Accent((id - 33) as u8)),
        40..=44 => builder.add_point_modifier(tick, Modifier::Ghost((id - 39) as u8)),
        66..=68 => builder.add_point_modifier(tick, Modifier::Cymbal((id - 64) as u8)),
        _ => return Err(format!("Unknown drum note type {id}")),
    }
    Ok(())
}

fn add_fret_note(
    builder: &mut TrackBuilder,
    instrument: Instrument,
    tick: u32,
    id: u32,
    length: u32,
) -> Result<(), String> {
    match id {
        0..=4 => builder.add_note(tick, length, id as u8, NoteFlags::empty()),
        8 if instrument.is_ghl() => builder.add_note(tick, length, 8, NoteFlags::empty()),
        5 => builder.add_point_modifier(tick, Modifier::Forced),
        6 => builder.add_point_modifier(tick, Modifier::Tap),
        7 => builder.add_note(tick, length, 7, NoteFlags::OPEN),
        _ => return Err(format!("Unknown note type {id}")),
    }
    Ok(())
}
