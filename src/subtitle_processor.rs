use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, WINDOWS_1252};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::SubtitleError;

// @module: SRT parsing and serialization

// @const: SRT timing line, tolerant of '.' separators and short millisecond fields
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})")
        .unwrap()
});

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    // @field: Sequence number, 1-based, kept from the source file
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Source text, possibly multi-line, possibly empty
    pub original: String,

    // @field: Translated text, empty until a run assigns it
    pub translated: String,
}

impl SubtitleEntry {
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, original: String) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            original,
            translated: String::new(),
        }
    }

    /// Start time in fractional seconds
    pub fn start_seconds(&self) -> f64 {
        self.start_time_ms as f64 / 1000.0
    }

    /// End time in fractional seconds
    pub fn end_seconds(&self) -> f64 {
        self.end_time_ms as f64 / 1000.0
    }

    /// Text to serialize: the translation when present, else the original
    pub fn display_text(&self) -> &str {
        if self.translated.is_empty() {
            &self.original
        } else {
            &self.translated
        }
    }

    /// Whether both entries share the same timing
    pub fn same_timing(&self, other: &SubtitleEntry) -> bool {
        self.start_time_ms == other.start_time_ms && self.end_time_ms == other.end_time_ms
    }

    /// Parse an SRT timestamp (`HH:MM:SS,mmm`) to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Option<u64> {
        let parts: Vec<&str> = timestamp.trim().split(&[':', ',', '.'][..]).collect();
        if parts.len() != 4 {
            return None;
        }
        to_millis(parts[0], parts[1], parts[2], parts[3])
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(
            f,
            "{} --> {}",
            Self::format_timestamp(self.start_time_ms),
            Self::format_timestamp(self.end_time_ms)
        )?;
        let text = self.display_text();
        if !text.is_empty() {
            writeln!(f, "{}", text)?;
        }
        writeln!(f)
    }
}

fn to_millis(h: &str, m: &str, s: &str, ms: &str) -> Option<u64> {
    let hours: u64 = h.parse().ok()?;
    let minutes: u64 = m.parse().ok()?;
    let seconds: u64 = s.parse().ok()?;
    if minutes >= 60 || seconds >= 60 || ms.is_empty() || ms.len() > 3 {
        return None;
    }
    // "5" is half a second, not five milliseconds
    let millis: u64 = format!("{:0<3}", ms).parse().ok()?;
    Some(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
}

fn parse_timing(line: &str) -> Option<(u64, u64)> {
    let caps = TIMESTAMP_REGEX.captures(line)?;
    let start = to_millis(&caps[1], &caps[2], &caps[3], &caps[4])?;
    let end = to_millis(&caps[5], &caps[6], &caps[7], &caps[8])?;
    Some((start, end))
}

/// Collection of subtitle entries loaded from one file
#[derive(Debug)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// List of subtitle entries, in file order
    pub entries: Vec<SubtitleEntry>,
}

impl SubtitleCollection {
    /// Load and parse a subtitle file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SubtitleError> {
        let path = path.as_ref();
        Ok(SubtitleCollection {
            source_file: path.to_path_buf(),
            entries: Self::load_entries(path)?,
        })
    }

    /// Write the collection to an SRT file
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<(), SubtitleError> {
        Self::save_entries(&self.entries, path)
    }

    /// Read, decode and parse the entries of an SRT file
    pub fn load_entries<P: AsRef<Path>>(path: P) -> Result<Vec<SubtitleEntry>, SubtitleError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| SubtitleError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let content = decode_subtitle_bytes(&bytes).map_err(|encoding| SubtitleError::Encoding {
            path: path.display().to_string(),
            encoding,
        })?;

        let entries = Self::parse_srt_string(&content);
        if entries.is_empty() {
            return Err(SubtitleError::Empty(path.display().to_string()));
        }
        debug!("Parsed {} subtitle entries from {}", entries.len(), path.display());
        Ok(entries)
    }

    /// Serialize entries to a file, creating the parent directory if needed
    pub fn save_entries<P: AsRef<Path>>(entries: &[SubtitleEntry], path: P) -> Result<(), SubtitleError> {
        let path = path.as_ref();
        let write_error = |source| SubtitleError::Write {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_error)?;
            }
        }

        fs::write(path, Self::to_srt_string(entries)).map_err(write_error)
    }

    /// Render entries as SRT text
    pub fn to_srt_string(entries: &[SubtitleEntry]) -> String {
        entries.iter().map(|e| e.to_string()).collect()
    }

    /// Parse SRT text into entries.
    ///
    /// A block starts at an index line followed by a timing line, or at a bare
    /// timing line. Blank separators may be missing or repeated. Blocks with no
    /// text are kept; file order and sequence numbers are preserved.
    pub fn parse_srt_string(content: &str) -> Vec<SubtitleEntry> {
        let lines: Vec<&str> = content.lines().collect();
        let mut entries: Vec<SubtitleEntry> = Vec::new();
        let mut current: Option<(SubtitleEntry, Vec<&str>)> = None;
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i].trim_end();
            let trimmed = line.trim();

            let header = if let Some((start, end)) = parse_timing(trimmed) {
                let seq = entries.len() + usize::from(current.is_some()) + 1;
                i += 1;
                Some((seq, start, end))
            } else if let (Ok(seq), Some(next)) = (trimmed.parse::<usize>(), lines.get(i + 1)) {
                match parse_timing(next.trim()) {
                    Some((start, end)) => {
                        i += 2;
                        Some((seq, start, end))
                    }
                    None => None,
                }
            } else {
                None
            };

            match header {
                Some((seq, start, end)) => {
                    if let Some(block) = current.take() {
                        entries.push(finish_block(block));
                    }
                    current = Some((SubtitleEntry::new(seq, start, end, String::new()), Vec::new()));
                }
                None => {
                    match current.as_mut() {
                        Some((_, text)) => text.push(line),
                        None if !trimmed.is_empty() => {
                            warn!("Ignoring text before the first subtitle block at line {}: {}", i + 1, trimmed)
                        }
                        None => {}
                    }
                    i += 1;
                }
            }
        }

        if let Some(block) = current.take() {
            entries.push(finish_block(block));
        }

        entries
    }

    /// Text lines of all entries, in order
    pub fn texts(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.original.clone()).collect()
    }
}

fn finish_block((mut entry, mut text): (SubtitleEntry, Vec<&str>)) -> SubtitleEntry {
    while text.last().is_some_and(|l| l.trim().is_empty()) {
        text.pop();
    }
    let leading = text.iter().take_while(|l| l.trim().is_empty()).count();
    entry.original = text[leading..].join("\n");
    entry
}

/// Decode raw subtitle bytes.
///
/// A BOM selects UTF-8 or UTF-16; otherwise valid UTF-8 is used as is and
/// anything else is read as Windows-1252. Returns the encoding name on a
/// malformed BOM-declared file.
pub fn decode_subtitle_bytes(bytes: &[u8]) -> Result<String, String> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        if had_errors {
            return Err(encoding.name().to_string());
        }
        return Ok(text.into_owned());
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(_) => {
            debug!("Input is not valid UTF-8, decoding as Windows-1252");
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            Ok(text.into_owned())
        }
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Collection")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Entries: {}", self.entries.len())?;
        Ok(())
    }
}
