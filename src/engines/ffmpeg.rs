use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::FormatConverter;
use crate::captions::SubtitleFormat;
use crate::{HarvestError, Result};

/// Subtitle converter backed by the ffmpeg executable
pub struct FfmpegConverter {
    ffmpeg_path: String,
}

impl FfmpegConverter {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    /// `<stem>.<target>` next to the input
    pub fn target_path(input: &Path, target: SubtitleFormat) -> PathBuf {
        input.with_extension(target.as_str())
    }
}

#[async_trait]
impl FormatConverter for FfmpegConverter {
    async fn convert(&self, input: &Path, target: SubtitleFormat) -> Result<PathBuf> {
        let output_path = Self::target_path(input, target);
        if output_path == input {
            return Ok(output_path);
        }

        tracing::debug!("Converting {} -> {}", input.display(), output_path.display());

        let output = Command::new(&self.ffmpeg_path)
            .args(["-y", "-loglevel", "error", "-i"])
            .arg(input)
            .arg(&output_path)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to start {}", self.ffmpeg_path))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            // Don't leave a half-written conversion next to the source
            let _ = fs_err::remove_file(&output_path);
            return Err(HarvestError::ConversionFailed(format!(
                "{}: {}",
                input.display(),
                error.trim()
            ))
            .into());
        }

        fs_err::remove_file(input)?;
        Ok(output_path)
    }
}

impl Default for FfmpegConverter {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_path() {
        assert_eq!(
            FfmpegConverter::target_path(Path::new("out/abc.en.vtt"), SubtitleFormat::Srt),
            PathBuf::from("out/abc.en.srt")
        );
    }

    #[test]
    fn test_same_format_is_noop() {
        let converter = FfmpegConverter::new("definitely-not-ffmpeg");
        let input = Path::new("abc.en.srt");
        let output = tokio_test::block_on(converter.convert(input, SubtitleFormat::Srt)).unwrap();
        assert_eq!(output, input);
    }

    #[tokio::test]
    async fn test_missing_binary_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("abc.en.vtt");
        fs_err::write(&input, "WEBVTT\n").unwrap();

        let converter = FfmpegConverter::new("definitely-not-ffmpeg");
        assert!(converter.convert(&input, SubtitleFormat::Srt).await.is_err());
        assert!(input.exists());
    }
}
