//! SubRip (`.srt`) parsing.

use super::{blocks, clean_markup, parse_time_range, CaptionEntry, CaptionError, SubtitleTrack};

/// Parse SubRip content.
///
/// Each block is a numeric index, a `HH:MM:SS,mmm --> HH:MM:SS,mmm` line and
/// one or more text lines. A missing index line is tolerated; anything else in
/// its place is a parse error. Cues whose text is empty are dropped.
pub fn parse(content: &str) -> Result<SubtitleTrack, CaptionError> {
    let mut entries = Vec::new();

    for block in blocks(content) {
        let mut lines = block.into_iter();
        let Some((first_no, first)) = lines.next() else {
            continue;
        };

        let (timing_no, timing) = if first.contains("-->") {
            (first_no, first)
        } else {
            if first.trim().parse::<u64>().is_err() {
                return Err(CaptionError::parse(first_no, first, "expected a numeric cue index"));
            }
            lines.next().ok_or_else(|| {
                CaptionError::parse(first_no, first, "cue index without a time range")
            })?
        };

        let (start, end) = parse_time_range(timing_no, timing)?;
        let text: Vec<String> = lines
            .map(|(_, line)| clean_markup(line))
            .filter(|line| !line.is_empty())
            .collect();

        if let Some(entry) = CaptionEntry::new(start, end, text) {
            entries.push(entry);
        }
    }

    SubtitleTrack::from_entries(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_two_entries() {
        let srt = "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:03,500 --> 00:00:04,000\nWorld\n";
        let track = parse(srt).unwrap();

        assert_eq!(track.len(), 2);
        assert_eq!(track.entries()[0].start(), Duration::from_millis(1000));
        assert_eq!(track.entries()[0].text(), "Hello");
        assert_eq!(track.entries()[1].start(), Duration::from_millis(3500));
        assert_eq!(track.entries()[1].end(), Duration::from_millis(4000));
        assert_eq!(track.entries()[1].text(), "World");
    }

    #[test]
    fn test_parse_multiline_and_crlf() {
        let srt = "1\r\n00:00:01,000 --> 00:00:02,000\r\n<i>first</i>\r\nsecond\r\n\r\n";
        let track = parse(srt).unwrap();
        assert_eq!(track.entries()[0].lines(), ["first", "second"]);
    }

    #[test]
    fn test_out_of_order_blocks_are_sorted() {
        let srt = "1\n00:00:05,000 --> 00:00:06,000\nlater\n\n2\n00:00:01,000 --> 00:00:02,000\nearlier\n";
        let track = parse(srt).unwrap();
        assert_eq!(track.entries()[0].text(), "earlier");
        assert_eq!(track.entries()[1].text(), "later");
    }

    #[test]
    fn test_malformed_timestamp_names_line() {
        let srt = "1\n00:00:01,000 --> 00:00:02,000\nfine\n\n2\n00:AA:01,000 --> 00:00:02,000\nbroken\n";
        match parse(srt) {
            Err(CaptionError::Parse { line, content, reason }) => {
                assert_eq!(line, 6);
                assert_eq!(content, "00:AA:01,000 --> 00:00:02,000");
                assert!(reason.contains("00:AA:01,000"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_block_is_error() {
        let err = parse("not a subtitle\nat all\n").unwrap_err();
        assert!(matches!(err, CaptionError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_blank_file_is_empty_track() {
        assert_eq!(parse("\n\n  \n"), Err(CaptionError::EmptyTrack));
    }
}
