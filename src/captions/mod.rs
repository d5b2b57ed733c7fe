use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub mod ass;
pub mod lrc;
pub mod srt;
pub mod vtt;

/// `[H:]MM:SS[,.]fff` as used by SRT, WebVTT and ASS
static CLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(\d+):)?(\d{1,2}):(\d{1,2})(?:[,.](\d{1,3}))?$").expect("valid clock regex")
});

static MARKUP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid markup regex"));

/// Errors produced while turning a subtitle file into a track
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptionError {
    /// The file violates its format's grammar
    #[error("line {line}: {reason}: `{content}`")]
    Parse {
        line: usize,
        content: String,
        reason: String,
    },

    /// The file is well formed but holds no caption entries
    #[error("no caption entries found")]
    EmptyTrack,
}

impl CaptionError {
    pub(crate) fn parse(line: usize, content: &str, reason: impl Into<String>) -> Self {
        CaptionError::Parse {
            line,
            content: content.trim().to_string(),
            reason: reason.into(),
        }
    }
}

/// Supported timed-caption formats
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    /// SubRip
    Srt,
    /// WebVTT
    Vtt,
    /// Advanced SubStation Alpha
    Ass,
    /// Lyric text
    Lrc,
}

impl SubtitleFormat {
    pub const ALL: [SubtitleFormat; 4] = [
        SubtitleFormat::Srt,
        SubtitleFormat::Vtt,
        SubtitleFormat::Ass,
        SubtitleFormat::Lrc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Vtt => "vtt",
            SubtitleFormat::Ass => "ass",
            SubtitleFormat::Lrc => "lrc",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "SubRip",
            SubtitleFormat::Vtt => "WebVTT",
            SubtitleFormat::Ass => "Advanced SubStation Alpha",
            SubtitleFormat::Lrc => "Lyric Text",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "srt" => Some(SubtitleFormat::Srt),
            "vtt" => Some(SubtitleFormat::Vtt),
            "ass" | "ssa" => Some(SubtitleFormat::Ass),
            "lrc" => Some(SubtitleFormat::Lrc),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timed subtitle unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionEntry {
    start: Duration,
    end: Duration,
    lines: Vec<String>,
}

impl CaptionEntry {
    /// Returns `None` when `end` precedes `start` or there is no text.
    pub fn new(start: Duration, end: Duration, lines: Vec<String>) -> Option<Self> {
        if end < start || lines.is_empty() {
            return None;
        }
        Some(Self { start, end, lines })
    }

    pub fn start(&self) -> Duration {
        self.start
    }

    pub fn end(&self) -> Duration {
        self.end
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Caption text with line breaks preserved
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Caption entries of one subtitle file, ordered by start time.
///
/// Entries with equal start times keep their file order. Overlapping entries
/// are allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleTrack {
    entries: Vec<CaptionEntry>,
}

impl SubtitleTrack {
    pub fn from_entries(mut entries: Vec<CaptionEntry>) -> Result<Self, CaptionError> {
        if entries.is_empty() {
            return Err(CaptionError::EmptyTrack);
        }
        entries.sort_by_key(|entry| entry.start);
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CaptionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CaptionEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a SubtitleTrack {
    type Item = &'a CaptionEntry;
    type IntoIter = std::slice::Iter<'a, CaptionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Parse subtitle file content in the given format
pub fn parse_track(content: &str, format: SubtitleFormat) -> Result<SubtitleTrack, CaptionError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    match format {
        SubtitleFormat::Srt => srt::parse(content),
        SubtitleFormat::Vtt => vtt::parse(content),
        SubtitleFormat::Ass => ass::parse(content),
        SubtitleFormat::Lrc => lrc::parse(content),
    }
}

/// Read a subtitle file, replacing invalid UTF-8 sequences
pub fn read_caption_file(path: &Path) -> std::io::Result<String> {
    let bytes = fs_err::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Parse a clock value such as `01:02:03,450`, `02:03.450` or `0:02:03.45`.
pub(crate) fn parse_clock(value: &str) -> Option<Duration> {
    let caps = CLOCK_REGEX.captures(value.trim())?;
    let hours: u64 = match caps.get(1) {
        Some(h) => h.as_str().parse().ok()?,
        None => 0,
    };
    let minutes: u64 = caps[2].parse().ok()?;
    let seconds: u64 = caps[3].parse().ok()?;
    if minutes >= 60 || seconds >= 60 {
        return None;
    }
    let millis = caps.get(4).map(|f| fraction_millis(f.as_str())).unwrap_or(0);

    let total = hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(1000)?
        .checked_add(millis)?;
    Some(Duration::from_millis(total))
}

/// Decimal fraction digits to milliseconds: `5` -> 500, `45` -> 450, `450` -> 450
pub(crate) fn fraction_millis(digits: &str) -> u64 {
    let value: u64 = digits.parse().unwrap_or(0);
    match digits.len() {
        1 => value * 100,
        2 => value * 10,
        _ => value,
    }
}

/// Parse `start --> end [cue settings]`
pub(crate) fn parse_time_range(
    line_no: usize,
    line: &str,
) -> Result<(Duration, Duration), CaptionError> {
    let (start_raw, rest) = line
        .split_once("-->")
        .ok_or_else(|| CaptionError::parse(line_no, line, "missing `-->` delimiter"))?;
    let end_raw = rest.split_whitespace().next().unwrap_or("");

    let start = parse_clock(start_raw).ok_or_else(|| {
        CaptionError::parse(line_no, line, format!("malformed timestamp `{}`", start_raw.trim()))
    })?;
    let end = parse_clock(end_raw).ok_or_else(|| {
        CaptionError::parse(line_no, line, format!("malformed timestamp `{}`", end_raw))
    })?;
    if end < start {
        return Err(CaptionError::parse(line_no, line, "end time precedes start time"));
    }

    Ok((start, end))
}

/// Split content into blank-line separated blocks of `(line number, line)`
pub(crate) fn blocks(content: &str) -> Vec<Vec<(usize, &str)>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push((idx + 1, line));
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

/// Strip HTML-like markup and decode the common entities
pub(crate) fn clean_markup(line: &str) -> String {
    MARKUP_REGEX
        .replace_all(line, "")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}
