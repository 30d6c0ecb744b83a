// Chart Folder Scanner - Picks the notes file, hashes it, parses it
// Folder problems are returned as issues alongside a best-effort result

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use md5::{Digest, Md5};
use thiserror::Error;

use crate::chart::{parse_chart, ChartFormat, ParsedChart};
use crate::metadata::{parse_config, MetadataIssue, SongMetadata};

/// Notes file names in preference order
const PREFERRED_CHART_NAMES: [&str; 2] = ["notes.mid", "notes.chart"];

const SONG_INI: &str = "song.ini";

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One file of a chart folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl FolderFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        FolderFile {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Extension, lowercased, without the dot
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }
}

/// Structural problems with a chart folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FolderIssue {
    /// No chart-extension file at all
    NoChart,
    /// The chart used is not named notes.chart or notes.mid
    InvalidChart { file: String },
    /// More than one chart-extension file
    MultipleChart { files: Vec<String> },
    /// The chosen chart failed to parse
    BadChart { file: String, message: String },
}

/// Result of scanning one chart folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartScan {
    /// File the timeline was parsed from
    pub chart_file: Option<String>,

    /// Hex MD5 of the chosen chart's bytes
    pub chart_md5: Option<String>,

    pub notes_data: Option<ParsedChart>,
    pub metadata: SongMetadata,
    pub folder_issues: Vec<FolderIssue>,
    pub metadata_issues: Vec<MetadataIssue>,
}

/// Hex MD5 digest of data
pub fn calculate_md5(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Choose the notes file: a preferred name if present, else the first chart file
fn select_chart_file(files: &[FolderFile]) -> (Option<&FolderFile>, Vec<FolderIssue>) {
    let mut chart_files: Vec<&FolderFile> = files
        .iter()
        .filter(|f| ChartFormat::from_file_name(&f.name).is_some())
        .collect();
    chart_files.sort_by(|a, b| a.name.cmp(&b.name));

    let mut issues = Vec::new();
    if chart_files.is_empty() {
        issues.push(FolderIssue::NoChart);
        return (None, issues);
    }
    if chart_files.len() > 1 {
        issues.push(FolderIssue::MultipleChart {
            files: chart_files.iter().map(|f| f.name.clone()).collect(),
        });
    }

    let preferred = PREFERRED_CHART_NAMES.iter().find_map(|name| {
        chart_files
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .copied()
    });

    let chosen = match preferred {
        Some(file) => file,
        None => {
            let fallback = chart_files[0];
            issues.push(FolderIssue::InvalidChart {
                file: fallback.name.clone(),
            });
            fallback
        }
    };

    (Some(chosen), issues)
}

/// Read song.ini, reporting missing or duplicate ini files
fn read_metadata(files: &[FolderFile]) -> (SongMetadata, Vec<MetadataIssue>) {
    let ini_count = files
        .iter()
        .filter(|f| f.extension().as_deref() == Some("ini"))
        .count();

    let mut issues = Vec::new();
    if ini_count > 1 {
        issues.push(MetadataIssue::MultipleIniFiles);
    }

    match files.iter().find(|f| f.name.eq_ignore_ascii_case(SONG_INI)) {
        Some(file) => {
            let (metadata, ini_issues) = SongMetadata::from_ini(&parse_config(&file.data));
            issues.extend(ini_issues);
            (metadata, issues)
        }
        None => {
            issues.push(MetadataIssue::NoMetadata);
            (SongMetadata::default(), issues)
        }
    }
}

/// Scan a chart folder's files
///
/// Never fails: a missing or unparseable chart leaves `notes_data` empty and
/// records a folder issue.
pub fn scan_chart(files: &[FolderFile]) -> ChartScan {
    let (chart_file, mut folder_issues) = select_chart_file(files);
    let (mut metadata, mut metadata_issues) = read_metadata(files);

    let mut chart_md5 = None;
    let mut notes_data = None;

    if let Some(file) = chart_file {
        log::debug!("Using chart file {}", file.name);
        chart_md5 = Some(calculate_md5(&file.data));

        // Selection only yields files with a chart extension
        if let Some(format) = ChartFormat::from_file_name(&file.name) {
            match parse_chart(&file.data, format) {
                Ok(chart) => notes_data = Some(chart),
                Err(e) => {
                    log::warn!("Failed to parse {}: {}", file.name, e);
                    folder_issues.push(FolderIssue::BadChart {
                        file: file.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    if let Some(chart) = &notes_data {
        metadata.fill_from_chart(chart);
    }
    metadata_issues.extend(metadata.missing_values());

    ChartScan {
        chart_file: chart_file.map(|f| f.name.clone()),
        chart_md5,
        notes_data,
        metadata,
        folder_issues,
        metadata_issues,
    }
}

/// Read every regular file in `dir` (not recursive)
pub fn read_folder(dir: &Path) -> Result<Vec<FolderFile>, ScanError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        files.push(FolderFile::new(name, fs::read(entry.path())?));
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Scan a chart folder on disk
pub fn scan_chart_dir(dir: &Path) -> Result<ChartScan, ScanError> {
    Ok(scan_chart(&read_folder(dir)?))
}
