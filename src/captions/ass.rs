//! Advanced SubStation Alpha (`.ass` / `.ssa`) parsing.

use super::{parse_clock, CaptionEntry, CaptionError, SubtitleTrack};

struct EventFormat {
    field_count: usize,
    start: usize,
    end: usize,
}

/// `Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text`, used
/// when the `[Events]` section has no `Format:` line
const DEFAULT_EVENT_FORMAT: EventFormat = EventFormat {
    field_count: 10,
    start: 1,
    end: 2,
};

impl EventFormat {
    fn from_fields<S: AsRef<str>>(fields: &[S]) -> Option<Self> {
        let position = |name: &str| {
            fields
                .iter()
                .position(|field| field.as_ref().trim().eq_ignore_ascii_case(name))
        };
        let text = position("text")?;
        // Text is always the last field; it is the only one allowed to hold commas
        if text != fields.len() - 1 {
            return None;
        }
        Some(Self {
            field_count: fields.len(),
            start: position("start")?,
            end: position("end")?,
        })
    }
}

/// Parse ASS/SSA content into a track built from its `Dialogue:` events.
pub fn parse(content: &str) -> Result<SubtitleTrack, CaptionError> {
    let mut format = DEFAULT_EVENT_FORMAT;
    let mut in_section = false;
    let mut in_events = false;
    let mut entries = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line.starts_with('[') && line.ends_with(']') {
            in_section = true;
            in_events = line.eq_ignore_ascii_case("[events]");
            continue;
        }
        if !in_section {
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            return Err(CaptionError::parse(line_no, line, "expected a `[Script Info]` or `[Events]` section"));
        }
        if !in_events {
            continue;
        }

        if let Some(fields) = line.strip_prefix("Format:") {
            let fields: Vec<&str> = fields.split(',').collect();
            format = EventFormat::from_fields(&fields).ok_or_else(|| {
                CaptionError::parse(line_no, line, "event format lacks Start, End or a trailing Text field")
            })?;
            continue;
        }

        let Some(body) = line.strip_prefix("Dialogue:") else {
            continue;
        };

        let fields: Vec<&str> = body.splitn(format.field_count, ',').collect();
        if fields.len() < format.field_count {
            return Err(CaptionError::parse(
                line_no,
                line,
                format!("expected {} comma-separated fields", format.field_count),
            ));
        }

        let start = parse_clock(fields[format.start]).ok_or_else(|| {
            CaptionError::parse(line_no, line, format!("malformed timestamp `{}`", fields[format.start].trim()))
        })?;
        let end = parse_clock(fields[format.end]).ok_or_else(|| {
            CaptionError::parse(line_no, line, format!("malformed timestamp `{}`", fields[format.end].trim()))
        })?;
        if end < start {
            return Err(CaptionError::parse(line_no, line, "end time precedes start time"));
        }

        let text = dialogue_text(fields[format.field_count - 1]);
        if let Some(entry) = CaptionEntry::new(start, end, text) {
            entries.push(entry);
        }
    }

    SubtitleTrack::from_entries(entries)
}

/// Drop `{...}` override blocks and expand the `\N`, `\n` and `\h` escapes
fn dialogue_text(raw: &str) -> Vec<String> {
    let mut plain = String::with_capacity(raw.len());
    let mut in_override = false;
    for ch in raw.chars() {
        match ch {
            '{' => in_override = true,
            '}' => in_override = false,
            _ if !in_override => plain.push(ch),
            _ => {}
        }
    }

    plain
        .replace("\\N", "\n")
        .replace("\\n", "\n")
        .replace("\\h", " ")
        .lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}
