// Chart parse errors - Structural failures that prevent building a timeline
// Line-level problems are recorded as ParseIssue values instead

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartParseError {
    #[error("Chart text is not valid UTF-8 or UTF-16")]
    Encoding,

    #[error("Chart contains no sections")]
    NoSections,

    #[error("Invalid MIDI data: {0}")]
    Midi(#[from] midly::Error),

    #[error("Unsupported MIDI timing: {0}")]
    UnsupportedTiming(String),

    #[error("Chart resolution must be positive")]
    ZeroResolution,

    #[error("Unsupported chart format: {0}")]
    UnsupportedFormat(String),
}
