//! Lyric text (`.lrc`) parsing.

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

use super::{fraction_millis, CaptionEntry, CaptionError, SubtitleTrack};

/// How long the final line stays up, since LRC only records start times
pub const LAST_LINE_DURATION: Duration = Duration::from_secs(5);

static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[([^\]]*)\]").expect("valid tag regex"));

static STAMP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+):(\d{1,2})(?:[.:](\d{1,3}))?$").expect("valid stamp regex"));

struct TimedLine {
    start_ms: i64,
    text: String,
}

/// Parse LRC content.
///
/// A line may carry several leading timestamps and yields one entry per stamp.
/// Each entry ends where the next one starts; the last one lasts
/// [`LAST_LINE_DURATION`]. Lines with a timestamp but no text only terminate
/// the previous entry. `[offset:ms]` shifts every stamp earlier by `ms`.
/// Any other non-blank line must start with a tag.
pub fn parse(content: &str) -> Result<SubtitleTrack, CaptionError> {
    let mut timed = Vec::new();
    let mut offset_ms: i64 = 0;

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        let mut rest = line;
        let mut stamps = Vec::new();

        if !line.is_empty() && !TAG_REGEX.is_match(line) {
            return Err(CaptionError::parse(line_no, line, "expected a `[mm:ss.xx]` timestamp or tag"));
        }

        while let Some(caps) = TAG_REGEX.captures(rest) {
            let tag = caps[1].trim();
            let consumed = caps[0].len();

            if tag.starts_with(|c: char| c.is_ascii_digit()) {
                let ms = parse_stamp(tag).ok_or_else(|| {
                    CaptionError::parse(line_no, line, format!("malformed timestamp `[{}]`", tag))
                })?;
                stamps.push(ms);
            } else if let Some((key, value)) = tag.split_once(':') {
                if key.trim().eq_ignore_ascii_case("offset") {
                    offset_ms = value.trim().parse().map_err(|_| {
                        CaptionError::parse(line_no, line, "malformed offset tag")
                    })?;
                }
            }
            rest = &rest[consumed..];
        }

        let text = rest.trim();
        for start_ms in stamps {
            timed.push(TimedLine {
                start_ms,
                text: text.to_string(),
            });
        }
    }

    for line in &mut timed {
        line.start_ms = line.start_ms.saturating_sub(offset_ms).max(0);
    }
    timed.sort_by_key(|line| line.start_ms);

    let mut entries = Vec::new();
    for (idx, line) in timed.iter().enumerate() {
        if line.text.is_empty() {
            continue;
        }
        let start = Duration::from_millis(line.start_ms as u64);
        let end = timed
            .get(idx + 1)
            .map(|next| Duration::from_millis(next.start_ms as u64))
            .unwrap_or(start + LAST_LINE_DURATION);
        if let Some(entry) = CaptionEntry::new(start, end, vec![line.text.clone()]) {
            entries.push(entry);
        }
    }

    SubtitleTrack::from_entries(entries)
}

/// `mm:ss`, `mm:ss.xx` or `mm:ss.xxx` to milliseconds
fn parse_stamp(tag: &str) -> Option<i64> {
    let caps = STAMP_REGEX.captures(tag)?;
    let minutes: i64 = caps[1].parse().ok()?;
    let seconds: i64 = caps[2].parse().ok()?;
    if seconds >= 60 {
        return None;
    }
    let millis = caps.get(3).map(|f| fraction_millis(f.as_str()) as i64).unwrap_or(0);
    minutes
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(1000)?
        .checked_add(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_lines() {
        let track = parse("[00:01.00]Hi\n[00:03.50]There\n").unwrap();

        assert_eq!(track.len(), 2);
        assert_eq!(track.entries()[0].start(), Duration::from_millis(1000));
        assert_eq!(track.entries()[0].end(), Duration::from_millis(3500));
        assert_eq!(track.entries()[0].text(), "Hi");
        assert_eq!(track.entries()[1].start(), Duration::from_millis(3500));
        assert_eq!(track.entries()[1].end(), Duration::from_millis(3500) + LAST_LINE_DURATION);
        assert_eq!(track.entries()[1].text(), "There");
    }

    #[test]
    fn test_metadata_and_repeated_stamps() {
        let lrc = "[ti:Song]\n[ar:Someone]\n[00:10.00][00:02.00]Chorus\n[00:05.00]\n";
        let track = parse(lrc).unwrap();

        assert_eq!(track.len(), 2);
        assert_eq!(track.entries()[0].start(), Duration::from_secs(2));
        assert_eq!(track.entries()[0].end(), Duration::from_secs(5));
        assert_eq!(track.entries()[1].start(), Duration::from_secs(10));
    }

    #[test]
    fn test_offset_shifts_earlier() {
        let track = parse("[offset:+500]\n[00:02.00]Late\n").unwrap();
        assert_eq!(track.entries()[0].start(), Duration::from_millis(1500));
    }

    #[test]
    fn test_malformed_stamp() {
        let err = parse("[00:01.00]ok\n[00:7x.00]bad\n").unwrap_err();
        assert!(matches!(err, CaptionError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_oversized_minutes_are_malformed() {
        let err = parse("[999999999999999999:00.00]x\n").unwrap_err();
        assert!(matches!(err, CaptionError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_untagged_text_is_malformed() {
        let err = parse("this is not lyric text\nat all\n").unwrap_err();
        assert!(matches!(err, CaptionError::Parse { line: 1, .. }));

        let err = parse("[00:01.00]fine\n\nstray line\n").unwrap_err();
        assert!(matches!(err, CaptionError::Parse { line: 3, .. }));
    }

    #[test]
    fn test_metadata_only_is_empty() {
        assert_eq!(parse("[ti:Nothing]\n"), Err(CaptionError::EmptyTrack));
    }
}
