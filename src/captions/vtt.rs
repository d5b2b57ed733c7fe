//! WebVTT (`.vtt`) parsing.

use super::{blocks, clean_markup, parse_time_range, CaptionEntry, CaptionError, SubtitleTrack};

/// Blocks that carry no cues
const SKIPPED_BLOCKS: [&str; 3] = ["NOTE", "STYLE", "REGION"];

/// Parse WebVTT content.
///
/// YouTube's auto-generated tracks carry word-level `<00:00:01.000>` and `<c>`
/// markup inside cue text; it is stripped along with any other tags.
pub fn parse(content: &str) -> Result<SubtitleTrack, CaptionError> {
    let mut blocks = blocks(content).into_iter();

    let header = blocks.next().ok_or(CaptionError::EmptyTrack)?;
    let (header_no, header_line) = header[0];
    if !is_header(header_line) {
        return Err(CaptionError::parse(header_no, header_line, "missing WEBVTT header"));
    }

    let mut entries = Vec::new();
    for block in blocks {
        let (first_no, first) = block[0];
        if SKIPPED_BLOCKS
            .iter()
            .any(|kind| first == *kind || first.starts_with(&format!("{kind} ")))
        {
            continue;
        }

        // An optional cue identifier precedes the timing line
        let timing_idx = if first.contains("-->") { 0 } else { 1 };
        let Some(&(timing_no, timing)) = block.get(timing_idx) else {
            return Err(CaptionError::parse(first_no, first, "cue without a time range"));
        };

        let (start, end) = parse_time_range(timing_no, timing)?;
        let text: Vec<String> = block[timing_idx + 1..]
            .iter()
            .map(|(_, line)| clean_markup(line))
            .filter(|line| !line.is_empty())
            .collect();

        if let Some(entry) = CaptionEntry::new(start, end, text) {
            entries.push(entry);
        }
    }

    SubtitleTrack::from_entries(entries)
}

/// `WEBVTT`, optionally followed by a space or tab and free text
fn is_header(line: &str) -> bool {
    match line.trim_start().strip_prefix("WEBVTT") {
        Some(rest) => rest.is_empty() || rest.starts_with([' ', '\t']),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_youtube_style() {
        let vtt = "WEBVTT\nKind: captions\nLanguage: en\n\n\
                   00:00:00.320 --> 00:00:02.750 align:start position:0%\n\
                   hello<00:00:00.800><c> there</c>\n\n\
                   NOTE this is a comment\n\n\
                   intro-2\n00:03.000 --> 00:04.000\nsecond cue\n";
        let track = parse(vtt).unwrap();

        assert_eq!(track.len(), 2);
        assert_eq!(track.entries()[0].start(), Duration::from_millis(320));
        assert_eq!(track.entries()[0].text(), "hello there");
        assert_eq!(track.entries()[1].start(), Duration::from_secs(3));
        assert_eq!(track.entries()[1].text(), "second cue");
    }

    #[test]
    fn test_missing_header() {
        let err = parse("00:00:01.000 --> 00:00:02.000\nhi\n").unwrap_err();
        assert!(matches!(err, CaptionError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_header_must_stand_alone() {
        let err = parse("WEBVTTX\n\n00:00:01.000 --> 00:00:02.000\nhi\n").unwrap_err();
        assert!(matches!(err, CaptionError::Parse { line: 1, .. }));

        assert_eq!(parse("WEBVTT - Title\n\n00:00:01.000 --> 00:00:02.000\nhi\n").unwrap().len(), 1);
        assert_eq!(parse("WEBVTT\tTitle\n\n00:00:01.000 --> 00:00:02.000\nhi\n").unwrap().len(), 1);
    }

    #[test]
    fn test_header_only_is_empty() {
        assert_eq!(parse("WEBVTT\n\n"), Err(CaptionError::EmptyTrack));
    }

    #[test]
    fn test_identifier_without_timing() {
        let err = parse("WEBVTT\n\ncue-1\nno timing here\n").unwrap_err();
        assert!(matches!(err, CaptionError::Parse { line: 4, .. }));
    }
}
