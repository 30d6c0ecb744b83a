// Chartfill - Rhythm-game chart parsing and drum fill detection
// Module declarations and public surface

pub mod audio;
pub mod chart;
pub mod drums;
pub mod fills;
pub mod groove;
pub mod metadata;
pub mod scan;
pub mod stats;

pub use audio::{get_audio_fingerprint, AudioFingerprint, FingerprintConfig, WorkerPool};
pub use chart::{parse_chart, ChartFormat, ChartParseError, ParsedChart};
pub use fills::{detect_fills, FillConfig, FillError, FillSegment};
pub use metadata::{parse_config, IniParseResult, SongMetadata};
pub use scan::{scan_chart, scan_chart_dir, ChartScan, FolderFile};
