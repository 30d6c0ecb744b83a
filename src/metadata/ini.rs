// INI Parser - Key/value config grammar used by song.ini
// [section] headers, key = value lines, case-insensitive keys

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Section a key belongs to
///
/// Keys that appear before any header live under `NoSection`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SectionKey {
    NoSection,
    Named(String),
}

impl SectionKey {
    pub fn named(name: &str) -> Self {
        SectionKey::Named(name.trim().to_lowercase())
    }
}

/// A line that is neither a header nor a key/value pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IniError {
    /// 1-based line number
    pub line: usize,
    pub message: String,
}

pub type IniSection = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IniParseResult {
    pub object: BTreeMap<SectionKey, IniSection>,
    pub errors: Vec<IniError>,
}

impl IniParseResult {
    /// Look up a named section (case-insensitive)
    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.object.get(&SectionKey::named(name))
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?
            .get(&key.trim().to_lowercase())
            .map(String::as_str)
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with(';') || line.starts_with('#') || line.starts_with("//")
}

fn section_header(line: &str) -> Option<&str> {
    line.strip_prefix('[')?.strip_suffix(']')
}

/// Parse a key/value config file
///
/// Invalid UTF-8 is replaced rather than rejected; malformed lines are
/// reported in `errors` and skipped. Later duplicate keys win.
pub fn parse_config(data: &[u8]) -> IniParseResult {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);
    let text = String::from_utf8_lossy(data);

    let mut result = IniParseResult::default();
    let mut section = SectionKey::NoSection;

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || is_comment(line) {
            continue;
        }

        if let Some(name) = section_header(line) {
            section = SectionKey::named(name);
            result.object.entry(section.clone()).or_default();
            continue;
        }

        match line.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                result
                    .object
                    .entry(section.clone())
                    .or_default()
                    .insert(key.trim().to_lowercase(), value.trim().to_string());
            }
            Some(_) => result.errors.push(IniError {
                line: index + 1,
                message: format!("Missing key: {line}"),
            }),
            None => result.errors.push(IniError {
                line: index + 1,
                message: format!("Not a section header or key = value pair: {line}"),
            }),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_and_keys() {
        let result = parse_config(
            b"\xEF\xBB\xBF[Song]\nName = Test Song\nARTIST=Someone\n\n; comment\n[Other]\nkey = a = b\n",
        );

        assert!(result.errors.is_empty());
        assert_eq!(result.get("song", "name"), Some("Test Song"));
        assert_eq!(result.get("SONG", "Artist"), Some("Someone"));
        // Only the first '=' splits
        assert_eq!(result.get("other", "key"), Some("a = b"));
    }

    #[test]
    fn test_keys_before_header() {
        let result = parse_config(b"loose = 1\n[song]\nname = x\n");
        let loose = &result.object[&SectionKey::NoSection];
        assert_eq!(loose.get("loose").map(String::as_str), Some("1"));
        assert_eq!(result.object.len(), 2);
    }

    #[test]
    fn test_bad_lines_recorded() {
        let result = parse_config(b"[song]\nname = ok\njust words\n= orphan\r\nartist = fine\r\n");
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].line, 3);
        assert_eq!(result.errors[1].line, 4);
        assert_eq!(result.get("song", "artist"), Some("fine"));
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let result = parse_config(b"[song]\nname = first\nName = second\n");
        assert_eq!(result.get("song", "name"), Some("second"));
    }

    #[test]
    fn test_empty_section_present() {
        let result = parse_config(b"[song]\n");
        assert!(result.section("song").is_some_and(|s| s.is_empty()));
    }
}
