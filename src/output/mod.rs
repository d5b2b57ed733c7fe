use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cli::OutputFormat;
use crate::merge::MergedDocument;
use crate::HarvestError;

/// Render a merged document in the requested format
pub fn render(document: &MergedDocument, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(document.render()),
        OutputFormat::Json => serde_json::to_string_pretty(document),
    }
}

/// Save a merged document to `path`.
///
/// The content goes to a temporary file in the destination directory first and
/// is renamed over `path` once fully written, so an interrupted or failed write
/// never leaves a truncated document behind.
pub fn save_to_file(
    document: &MergedDocument,
    path: &Path,
    format: OutputFormat,
) -> Result<(), HarvestError> {
    let content = render(document, format).map_err(|e| HarvestError::WriteFailure {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;

    write_atomic(path, content.as_bytes())
}

/// Print a merged document to console
pub fn print_to_console(document: &MergedDocument, format: OutputFormat) -> anyhow::Result<()> {
    let content = render(document, format)?;
    print!("{}", content);
    Ok(())
}

/// Replace `path` with `bytes` in one rename
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), HarvestError> {
    let fail = |source: std::io::Error| HarvestError::WriteFailure {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs_err::create_dir_all(&dir).map_err(fail)?;

    let mut temp = tempfile::Builder::new()
        .prefix(".subharvest-")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(fail)?;
    temp.write_all(bytes).map_err(fail)?;
    temp.as_file().sync_all().map_err(fail)?;
    temp.persist(path).map_err(|e| fail(e.error))?;

    tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{MergeEngine, TrackOutcome, TrackSource, VideoRecord};

    fn document() -> MergedDocument {
        let record = VideoRecord::new(1, "Only", TrackSource::Missing);
        MergeEngine::default().merge_loaded(vec![(&record, TrackOutcome::Missing)])
    }

    #[test]
    fn test_save_creates_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("all.txt");
        fs_err::create_dir_all(path.parent().unwrap()).unwrap();
        fs_err::write(&path, "stale content that is longer than the new document ".repeat(20)).unwrap();

        save_to_file(&document(), &path, OutputFormat::Text).unwrap();

        assert_eq!(fs_err::read_to_string(&path).unwrap(), document().render());
        let leftovers: Vec<_> = fs_err::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_save_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all.json");
        save_to_file(&document(), &path, OutputFormat::Json).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs_err::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["sections"][0]["title"], "Only");
        assert_eq!(value["sections"][0]["body"]["status"], "no_subtitles");
    }

    #[test]
    fn test_unwritable_destination_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where a directory is expected
        let blocker = dir.path().join("blocker");
        fs_err::write(&blocker, "").unwrap();
        let path = blocker.join("all.txt");

        let err = save_to_file(&document(), &path, OutputFormat::Text).unwrap_err();
        assert!(matches!(err, HarvestError::WriteFailure { .. }));
        assert!(!path.exists());
    }
}
