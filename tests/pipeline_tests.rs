// Integration tests for the chart folder pipeline
// Scan a folder on disk, detect fills and fingerprint its stems

use std::fmt::Write as _;
use std::fs;
use std::io::Cursor;

use chartfill::scan::FolderIssue;
use chartfill::{
    detect_fills, get_audio_fingerprint, scan_chart_dir, FillConfig, FingerprintConfig,
};

const RES: u32 = 192;

fn push_steady(lines: &mut Vec<(u32, &'static str)>, from_beat: u32, to_beat: u32) {
    for beat in from_beat..to_beat {
        let tick = beat * RES;
        lines.push((tick, "N 0 0"));
        lines.push((tick, "N 2 0"));
        lines.push((tick, "N 66 0"));
        lines.push((tick + RES / 2, "N 1 0"));
        lines.push((tick + RES / 2, "N 2 0"));
        lines.push((tick + RES / 2, "N 66 0"));
    }
}

/// Steady groove with a 32nd-note snare burst on beats 16-17
fn burst_chart() -> String {
    let mut notes = Vec::new();
    push_steady(&mut notes, 0, 16);
    for i in 0..16 {
        notes.push((16 * RES + i * RES / 8, "N 1 0"));
    }
    push_steady(&mut notes, 18, 26);

    let mut chart = String::new();
    writeln!(chart, "[Song]\n{{\n  Resolution = {RES}\n  Name = \"Burst\"\n}}").unwrap();
    writeln!(chart, "[SyncTrack]\n{{\n  0 = TS 4\n  0 = B 120000\n}}").unwrap();
    writeln!(chart, "[Events]\n{{\n  3072 = E \"section Fill\"\n}}").unwrap();
    writeln!(chart, "[ExpertDrums]\n{{").unwrap();
    for (tick, note) in notes {
        writeln!(chart, "  {tick} = {note}").unwrap();
    }
    writeln!(chart, "}}").unwrap();
    chart
}

fn sine_wav(secs: f32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 22050,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..(secs * 22050.0) as usize {
            let s = (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 22050.0).sin();
            let v = (s * 12000.0) as i16;
            writer.write_sample(v).unwrap();
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

const SONG_INI: &str = "[song]
name = Burst Song
artist = Someone
album = Somewhere
genre = Rock
year = 2009
charter = Tester
pro_drums = True
";

#[test]
fn test_scan_then_detect_fills() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("notes.chart"), burst_chart()).unwrap();
    fs::write(dir.path().join("song.ini"), SONG_INI).unwrap();

    let scan = scan_chart_dir(dir.path()).unwrap();
    assert!(scan.folder_issues.is_empty(), "{:?}", scan.folder_issues);
    assert!(scan.metadata_issues.is_empty(), "{:?}", scan.metadata_issues);
    assert_eq!(scan.metadata.name.as_deref(), Some("Burst Song"));
    assert_eq!(scan.chart_md5.as_ref().map(|h| h.len()), Some(32));

    let chart = scan.notes_data.unwrap();
    assert_eq!(chart.sections.len(), 1);
    assert!((chart.sections[0].ms_time - 8000.0).abs() < 1e-6);

    let config = FillConfig {
        song_id: "burst-song".to_string(),
        burst_min_hits: 16,
        burst_ms: 1000.0,
        ..FillConfig::default()
    };
    let fills = detect_fills(&chart, &config).unwrap();

    assert!(!fills.is_empty());
    let fill = fills
        .iter()
        .find(|f| f.start_tick <= 16 * RES && f.end_tick >= 18 * RES)
        .unwrap();
    assert!(fill.start_ms <= 8000.0 && fill.end_ms >= 9000.0);
    assert!(fill.scores.same_pad_burst);
    assert_eq!(fill.song_id, "burst-song");

    // Detection is deterministic
    assert_eq!(detect_fills(&chart, &config).unwrap(), fills);
}

#[test]
fn test_scan_results_serialize() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("notes.chart"), burst_chart()).unwrap();

    let scan = scan_chart_dir(dir.path()).unwrap();
    let json = serde_json::to_value(&scan).unwrap();
    assert_eq!(json["chartFile"], "notes.chart");
    assert_eq!(json["chartMd5"].as_str().map(str::len), Some(32));
    assert_eq!(json["metadataIssues"][0]["kind"], "noMetadata");
    assert!(json["notesData"].is_object());
}

#[test]
fn test_folder_fingerprint_with_shared_pool() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("notes.chart"), burst_chart()).unwrap();
    fs::write(dir.path().join("song.wav"), sine_wav(2.0)).unwrap();
    fs::write(dir.path().join("rhythm.ogg"), b"OggS broken").unwrap();

    let pool = FingerprintConfig { max_workers: 2 }.start_pool().unwrap();
    let files = chartfill::scan::read_folder(dir.path()).unwrap();

    let first = get_audio_fingerprint(&pool, &files);
    let second = get_audio_fingerprint(&pool, &files);
    pool.terminate();

    assert_eq!(first, second);
    assert!(!first.audio_hash.is_empty());
    assert_eq!(first.audio_length_ms, Some(2000));
    assert_eq!(first.errors.len(), 1);
    assert!(first.errors[0].starts_with("rhythm.ogg"));
}

#[test]
fn test_folder_without_chart() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("song.ini"), SONG_INI).unwrap();

    let scan = scan_chart_dir(dir.path()).unwrap();
    assert_eq!(scan.folder_issues, vec![FolderIssue::NoChart]);
    assert!(scan.notes_data.is_none());
}
