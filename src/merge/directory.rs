//! Build merge records from a directory of already-downloaded subtitle files.

use anyhow::Context;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{TrackSource, VideoRecord};
use crate::captions::SubtitleFormat;
use crate::utils;
use crate::Result;

/// Collect every supported subtitle file under `dir`, recursively.
///
/// Files are ordered by path, which yields the ordinals. Names follow
/// `<title-or-id>.<lang>.<ext>`; the language suffix goes to
/// [`VideoRecord::language`] and, when the remaining stem is a YouTube video id,
/// the watch URL is filled in.
pub fn records_from_directory(dir: &Path) -> Result<Vec<VideoRecord>> {
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to scan {}", dir.display()))?;
        if entry.file_type().is_file() && SubtitleFormat::from_path(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    tracing::debug!("Found {} subtitle files under {}", files.len(), dir.display());

    let records = files
        .into_iter()
        .enumerate()
        .map(|(idx, path)| {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let (name, language) = utils::split_language_suffix(&stem);

            let mut record = VideoRecord::new(idx + 1, name, TrackSource::File(path.clone()));
            if let Some(language) = language {
                record = record.with_language(language);
            }
            if utils::is_youtube_video_id(name) {
                record = record.with_url(utils::watch_url(name));
            }
            record
        })
        .collect();

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs_err::create_dir_all(&nested).unwrap();
        fs_err::write(dir.path().join("dQw4w9WgXcQ.en.srt"), "").unwrap();
        fs_err::write(dir.path().join("My talk.vtt"), "").unwrap();
        fs_err::write(nested.join("song.lrc"), "").unwrap();
        fs_err::write(dir.path().join("notes.txt"), "").unwrap();
        fs_err::write(dir.path().join("Talk v2.final.srt"), "").unwrap();

        let records = records_from_directory(dir.path()).unwrap();
        assert_eq!(records.len(), 4);

        assert_eq!(records[0].ordinal, 1);
        assert_eq!(records[0].title, "My talk");
        assert_eq!(records[0].language, None);

        assert_eq!(records[1].title, "Talk v2.final");
        assert_eq!(records[1].language, None);

        assert_eq!(records[2].title, "dQw4w9WgXcQ");
        assert_eq!(records[2].language.as_deref(), Some("en"));
        assert_eq!(
            records[2].url.as_deref(),
            Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
        );

        assert_eq!(records[3].title, "song");
        assert_eq!(records[3].ordinal, 4);
    }

    #[test]
    fn test_missing_directory() {
        assert!(records_from_directory(Path::new("/definitely/not/here")).is_err());
    }
}
