// Song Metadata - Typed view of song.ini's [song] section
// Issues are collected as data; a bad value never stops extraction

use serde::{Deserialize, Serialize};

use crate::chart::ParsedChart;

use super::ini::IniParseResult;

/// Problems found while reading song metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MetadataIssue {
    /// The folder has no song.ini
    NoMetadata,
    /// More than one `.ini` file in the folder
    MultipleIniFiles,
    /// song.ini has no [song] section
    InvalidIni,
    /// A line song.ini could not parse
    BadIniLine { line: usize, message: String },
    /// A value with the wrong type
    InvalidMetadata { key: String, value: String },
    /// A value every song is expected to have
    MissingValue { key: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongMetadata {
    pub name: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub year: Option<String>,
    pub charter: Option<String>,

    /// Song length in milliseconds
    pub song_length: Option<u64>,

    /// Audio delay in milliseconds
    pub delay: Option<i64>,

    pub preview_start_time: Option<u64>,

    /// Drums tracks carry tom/cymbal markers
    pub pro_drums: Option<bool>,
    pub five_lane_drums: Option<bool>,

    /// Drums difficulty rating, -1 when there is no drums part
    pub diff_drums: Option<i32>,
}

/// Values every song should provide
const REQUIRED_KEYS: [&str; 6] = ["name", "artist", "album", "genre", "year", "charter"];

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn text_value(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl SongMetadata {
    /// Extract metadata from a parsed song.ini
    pub fn from_ini(ini: &IniParseResult) -> (Self, Vec<MetadataIssue>) {
        let mut issues: Vec<MetadataIssue> = ini
            .errors
            .iter()
            .map(|e| MetadataIssue::BadIniLine {
                line: e.line,
                message: e.message.clone(),
            })
            .collect();

        let mut metadata = SongMetadata::default();
        let Some(song) = ini.section("song") else {
            issues.push(MetadataIssue::InvalidIni);
            return (metadata, issues);
        };

        for (key, value) in song {
            let invalid = || MetadataIssue::InvalidMetadata {
                key: key.clone(),
                value: value.clone(),
            };

            match key.as_str() {
                "name" => metadata.name = text_value(value),
                "artist" => metadata.artist = text_value(value),
                "album" => metadata.album = text_value(value),
                "genre" => metadata.genre = text_value(value),
                "year" => metadata.year = text_value(value.trim_start_matches(',')),
                "charter" | "frets" => {
                    if metadata.charter.is_none() || key == "charter" {
                        metadata.charter = text_value(value);
                    }
                }
                "song_length" => match value.parse() {
                    Ok(ms) => metadata.song_length = Some(ms),
                    Err(_) => issues.push(invalid()),
                },
                "delay" => match value.parse() {
                    Ok(ms) => metadata.delay = Some(ms),
                    Err(_) => issues.push(invalid()),
                },
                "preview_start_time" => match value.parse() {
                    Ok(ms) => metadata.preview_start_time = Some(ms),
                    Err(_) => issues.push(invalid()),
                },
                "pro_drums" => match parse_bool(value) {
                    Some(flag) => metadata.pro_drums = Some(flag),
                    None => issues.push(invalid()),
                },
                "five_lane_drums" => match parse_bool(value) {
                    Some(flag) => metadata.five_lane_drums = Some(flag),
                    None => issues.push(invalid()),
                },
                "diff_drums" => match value.parse() {
                    Ok(level) => metadata.diff_drums = Some(level),
                    Err(_) => issues.push(invalid()),
                },
                _ => {}
            }
        }

        (metadata, issues)
    }

    /// Fill values song.ini left out from the chart's own [Song] block
    pub fn fill_from_chart(&mut self, chart: &ParsedChart) {
        let pairs = [
            (&mut self.name, &chart.name),
            (&mut self.artist, &chart.artist),
            (&mut self.album, &chart.album),
            (&mut self.genre, &chart.genre),
            (&mut self.year, &chart.year),
            (&mut self.charter, &chart.charter),
        ];
        for (target, source) in pairs {
            if target.is_none() {
                target.clone_from(source);
            }
        }
        if self.delay.is_none() && chart.chart_offset_ms != 0.0 {
            self.delay = Some(chart.chart_offset_ms.round() as i64);
        }
    }

    fn value(&self, key: &str) -> Option<&String> {
        match key {
            "name" => self.name.as_ref(),
            "artist" => self.artist.as_ref(),
            "album" => self.album.as_ref(),
            "genre" => self.genre.as_ref(),
            "year" => self.year.as_ref(),
            "charter" => self.charter.as_ref(),
            _ => None,
        }
    }

    /// `MissingValue` for each required value still absent
    pub fn missing_values(&self) -> Vec<MetadataIssue> {
        REQUIRED_KEYS
            .iter()
            .filter(|key| self.value(key).is_none())
            .map(|key| MetadataIssue::MissingValue {
                key: key.to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::parse_config;

    const SONG_INI: &[u8] = b"[song]
name = Through the Fire
artist = Band
album = Album
genre = Metal
year = 2006
charter = Someone
song_length = 441000
delay = -20
pro_drums = True
diff_drums = 6
";

    #[test]
    fn test_full_metadata() {
        let (metadata, issues) = SongMetadata::from_ini(&parse_config(SONG_INI));
        assert!(issues.is_empty());
        assert_eq!(metadata.name.as_deref(), Some("Through the Fire"));
        assert_eq!(metadata.song_length, Some(441000));
        assert_eq!(metadata.delay, Some(-20));
        assert_eq!(metadata.pro_drums, Some(true));
        assert_eq!(metadata.diff_drums, Some(6));
        assert!(metadata.missing_values().is_empty());
    }

    #[test]
    fn test_invalid_values_reported() {
        let ini = parse_config(b"[song]\nname = x\nsong_length = long\npro_drums = maybe\nbroken\n");
        let (metadata, issues) = SongMetadata::from_ini(&ini);

        assert_eq!(metadata.song_length, None);
        assert!(issues.contains(&MetadataIssue::InvalidMetadata {
            key: "song_length".into(),
            value: "long".into()
        }));
        assert!(issues.contains(&MetadataIssue::InvalidMetadata {
            key: "pro_drums".into(),
            value: "maybe".into()
        }));
        assert!(issues
            .iter()
            .any(|i| matches!(i, MetadataIssue::BadIniLine { line: 5, .. })));
    }

    #[test]
    fn test_missing_song_section() {
        let (_, issues) = SongMetadata::from_ini(&parse_config(b"[other]\nname = x\n"));
        assert_eq!(issues, vec![MetadataIssue::InvalidIni]);
    }

    #[test]
    fn test_fill_from_chart() {
        let mut chart = ParsedChart::empty(192);
        chart.name = Some("Chart Name".into());
        chart.charter = Some("Chart Charter".into());

        let mut metadata = SongMetadata {
            name: Some("Ini Name".into()),
            ..SongMetadata::default()
        };
        metadata.fill_from_chart(&chart);

        assert_eq!(metadata.name.as_deref(), Some("Ini Name"));
        assert_eq!(metadata.charter.as_deref(), Some("Chart Charter"));

        let missing = metadata.missing_values();
        assert_eq!(missing.len(), 4);
        assert_eq!(
            missing[0],
            MetadataIssue::MissingValue {
                key: "artist".into()
            }
        );
    }
}
