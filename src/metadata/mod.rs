// Song Metadata - song.ini parsing and typed metadata extraction

pub mod ini;
pub mod song;

pub use ini::{parse_config, IniError, IniParseResult, IniSection, SectionKey};
pub use song::{MetadataIssue, SongMetadata};
