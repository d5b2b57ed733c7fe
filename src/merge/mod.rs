use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::captions::{self, CaptionError, SubtitleFormat, SubtitleTrack};
use crate::config::MergeSettings;

pub mod directory;

pub use directory::records_from_directory;

/// Frames every section header
pub const SECTION_RULE: &str =
    "================================================================================";

/// First header line of every section starts with this
pub const VIDEO_PREFIX: &str = "VIDEO ";

const NO_SUBTITLES_MARKER: &str = "[no subtitles available]";

/// Where a video's subtitle track comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSource {
    /// A subtitle file on disk; its extension selects the parser
    File(PathBuf),
    /// The fetch completed but produced no subtitles
    Missing,
    /// The video was never fetched (fetch failure, cancellation)
    NotProcessed(String),
}

/// Metadata for one source video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Position in the channel listing, 1-based
    pub ordinal: usize,
    pub title: String,
    pub url: Option<String>,
    pub language: Option<String>,
    pub source: TrackSource,
}

impl VideoRecord {
    pub fn new(ordinal: usize, title: impl Into<String>, source: TrackSource) -> Self {
        Self {
            ordinal,
            title: title.into(),
            url: None,
            language: None,
            source,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Result of loading one record's track
#[derive(Debug, Clone, PartialEq)]
pub enum TrackOutcome {
    Parsed(SubtitleTrack),
    /// No file, or a file with no caption entries
    Missing,
    Invalid(CaptionError),
    Unreadable(String),
    UnsupportedFormat(String),
    NotProcessed(String),
}

impl TrackOutcome {
    /// Read and parse the track behind a source
    pub fn load(source: &TrackSource) -> Self {
        match source {
            TrackSource::Missing => TrackOutcome::Missing,
            TrackSource::NotProcessed(reason) => TrackOutcome::NotProcessed(reason.clone()),
            TrackSource::File(path) => Self::load_file(path),
        }
    }

    fn load_file(path: &Path) -> Self {
        let Some(format) = SubtitleFormat::from_path(path) else {
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_else(|| "no extension".to_string());
            return TrackOutcome::UnsupportedFormat(ext);
        };

        let content = match captions::read_caption_file(path) {
            Ok(content) => content,
            Err(e) => return TrackOutcome::Unreadable(e.to_string()),
        };

        Self::from_parse(captions::parse_track(&content, format))
    }

    pub fn from_parse(result: Result<SubtitleTrack, CaptionError>) -> Self {
        match result {
            Ok(track) => TrackOutcome::Parsed(track),
            Err(CaptionError::EmptyTrack) => TrackOutcome::Missing,
            Err(e) => TrackOutcome::Invalid(e),
        }
    }
}

/// Body of a merged section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SectionBody {
    Captions { lines: Vec<String> },
    NoSubtitles,
    Unavailable { cause: String, detail: String },
    NotProcessed { reason: String },
}

impl SectionBody {
    fn marker(&self) -> Option<String> {
        match self {
            SectionBody::Captions { .. } => None,
            SectionBody::NoSubtitles => Some(NO_SUBTITLES_MARKER.to_string()),
            SectionBody::Unavailable { cause, detail } => {
                Some(format!("[subtitle unavailable ({}): {}]", cause, detail))
            }
            SectionBody::NotProcessed { reason } => Some(format!("[not processed: {}]", reason)),
        }
    }
}

/// One video's part of the merged document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub ordinal: usize,
    pub title: String,
    pub language: Option<String>,
    pub url: Option<String>,
    pub body: SectionBody,
}

impl Section {
    fn header_lines(&self) -> Vec<String> {
        let mut header = vec![format!("{}{}: {}", VIDEO_PREFIX, self.ordinal, self.title)];
        if let Some(language) = &self.language {
            header.push(format!("LANGUAGE: {}", language));
        }
        if let Some(url) = &self.url {
            header.push(format!("URL: {}", url));
        }
        header
    }

    fn write_to(&self, out: &mut String) {
        out.push_str(SECTION_RULE);
        out.push('\n');
        for line in self.header_lines() {
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str(SECTION_RULE);
        out.push('\n');

        match (&self.body, self.body.marker()) {
            (SectionBody::Captions { lines }, _) => {
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
            }
            (_, Some(marker)) => {
                out.push_str(&marker);
                out.push('\n');
            }
            (_, None) => {}
        }
    }
}

/// Section counts by outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub sections: usize,
    pub with_captions: usize,
    pub without_subtitles: usize,
    pub unavailable: usize,
    pub not_processed: usize,
}

/// All sections of a job, in ordinal order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedDocument {
    pub sections: Vec<Section>,
}

impl MergedDocument {
    /// Plain-text rendering: sections separated by exactly one blank line
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (idx, section) in self.sections.iter().enumerate() {
            if idx > 0 {
                out.push('\n');
            }
            section.write_to(&mut out);
        }
        out
    }

    pub fn stats(&self) -> MergeStats {
        let mut stats = MergeStats {
            sections: self.sections.len(),
            ..MergeStats::default()
        };
        for section in &self.sections {
            match section.body {
                SectionBody::Captions { .. } => stats.with_captions += 1,
                SectionBody::NoSubtitles => stats.without_subtitles += 1,
                SectionBody::Unavailable { .. } => stats.unavailable += 1,
                SectionBody::NotProcessed { .. } => stats.not_processed += 1,
            }
        }
        stats
    }
}

impl fmt::Display for MergedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Rendering options for merged documents
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Prefix each caption line with its `[HH:MM:SS.mmm]` start time
    pub include_timestamps: bool,
    /// Show the video URL in section headers
    pub include_urls: bool,
    /// Drop a caption line identical to the one emitted just before it
    pub collapse_repeated_lines: bool,
}

impl From<&MergeSettings> for MergeOptions {
    fn from(settings: &MergeSettings) -> Self {
        Self {
            include_timestamps: settings.include_timestamps,
            include_urls: settings.include_urls,
            collapse_repeated_lines: settings.collapse_repeated_lines,
        }
    }
}

/// Stitches per-video tracks into one [`MergedDocument`]
pub struct MergeEngine {
    options: MergeOptions,
}

impl MergeEngine {
    pub fn new(options: MergeOptions) -> Self {
        Self { options }
    }

    /// Load every record's track from disk and merge them.
    ///
    /// A track that fails to load or parse only affects its own section.
    pub fn merge(&self, records: &[VideoRecord]) -> MergedDocument {
        let loaded = records
            .iter()
            .map(|record| (record, TrackOutcome::load(&record.source)))
            .collect();
        self.merge_loaded(loaded)
    }

    /// Merge already-loaded tracks. Sections are ordered by ordinal; records
    /// sharing an ordinal keep their input order.
    pub fn merge_loaded(&self, mut items: Vec<(&VideoRecord, TrackOutcome)>) -> MergedDocument {
        items.sort_by_key(|(record, _)| record.ordinal);

        let sections = items
            .into_iter()
            .map(|(record, outcome)| self.section(record, outcome))
            .collect();

        MergedDocument { sections }
    }

    fn section(&self, record: &VideoRecord, outcome: TrackOutcome) -> Section {
        let body = match outcome {
            TrackOutcome::Parsed(track) => SectionBody::Captions {
                lines: self.caption_lines(&track),
            },
            TrackOutcome::Missing => SectionBody::NoSubtitles,
            TrackOutcome::Invalid(e) => {
                tracing::warn!("Subtitle for video {} ({}) is corrupt: {}", record.ordinal, record.title, e);
                SectionBody::Unavailable {
                    cause: "parse error".to_string(),
                    detail: single_line(&e.to_string()),
                }
            }
            TrackOutcome::Unreadable(e) => {
                tracing::warn!("Subtitle for video {} ({}) is unreadable: {}", record.ordinal, record.title, e);
                SectionBody::Unavailable {
                    cause: "unreadable file".to_string(),
                    detail: single_line(&e),
                }
            }
            TrackOutcome::UnsupportedFormat(ext) => SectionBody::Unavailable {
                cause: "unsupported format".to_string(),
                detail: single_line(&ext),
            },
            TrackOutcome::NotProcessed(reason) => SectionBody::NotProcessed {
                reason: single_line(&reason),
            },
        };

        Section {
            ordinal: record.ordinal,
            title: header_text(&record.title),
            language: record.language.as_deref().map(single_line),
            url: record
                .url
                .as_deref()
                .filter(|_| self.options.include_urls)
                .map(single_line),
            body,
        }
    }

    fn caption_lines(&self, track: &SubtitleTrack) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();
        let mut previous: Option<&str> = None;

        for entry in track {
            for text in entry.lines() {
                let text = text.trim();
                // Bodies never hold blank lines; they delimit sections
                if text.is_empty() {
                    continue;
                }
                if self.options.collapse_repeated_lines && previous == Some(text) {
                    continue;
                }
                previous = Some(text);

                if self.options.include_timestamps {
                    lines.push(format!("[{}] {}", format_timestamp(entry.start()), text));
                } else {
                    lines.push(text.to_string());
                }
            }
        }

        lines
    }
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new(MergeOptions::default())
    }
}

/// A section recovered from rendered text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSection {
    pub header: Vec<String>,
    pub body: Vec<String>,
}

/// Re-split a rendered document into its sections
pub fn split_sections(text: &str) -> Vec<SplitSection> {
    let lines: Vec<&str> = text.lines().collect();
    let mut sections = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let opens_section = lines[i] == SECTION_RULE
            && lines.get(i + 1).is_some_and(|next| next.starts_with(VIDEO_PREFIX));
        if !opens_section {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        let mut header = Vec::new();
        while j < lines.len() && lines[j] != SECTION_RULE {
            header.push(lines[j].to_string());
            j += 1;
        }
        j += 1;

        let mut body = Vec::new();
        while j < lines.len() && !lines[j].is_empty() {
            body.push(lines[j].to_string());
            j += 1;
        }

        sections.push(SplitSection { header, body });
        i = j;
    }

    sections
}

/// `HH:MM:SS.mmm`
pub fn format_timestamp(at: Duration) -> String {
    let total_ms = at.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn header_text(title: &str) -> String {
    let title = single_line(title);
    if title.is_empty() {
        "Unknown".to_string()
    } else {
        title
    }
}
