use std::path::{Path, PathBuf};

use crate::captions::SubtitleFormat;
use crate::engines::{FetchRequest, FormatConverter, SubtitleFetcher, VideoEntry};

/// What happened to one video during the fetch stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoOutcome {
    /// Subtitle files on disk; empty when the video has none
    Fetched(Vec<PathBuf>),
    /// The fetch itself failed
    Failed(String),
}

/// Fetches and converts the subtitles of one video at a time
pub struct VideoWorker<'a> {
    pub fetcher: &'a dyn SubtitleFetcher,
    pub converter: Option<&'a dyn FormatConverter>,
    pub request: &'a FetchRequest,
    pub output_dir: &'a Path,
}

impl VideoWorker<'_> {
    /// Run fetch and conversion for `video`, tagged with its listing index
    pub async fn process(&self, index: usize, video: &VideoEntry) -> (usize, VideoOutcome) {
        let files = match self
            .fetcher
            .fetch_subtitles(video, self.request, self.output_dir)
            .await
        {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!("Fetching subtitles for {} failed: {:#}", video.id, e);
                return (index, VideoOutcome::Failed(format!("{:#}", e)));
            }
        };

        if files.is_empty() {
            tracing::info!("No subtitles found for {} ({})", video.id, video.title);
        }

        let mut converted = Vec::with_capacity(files.len());
        for file in files {
            converted.push(self.convert(file).await);
        }
        (index, VideoOutcome::Fetched(converted))
    }

    /// Convert to the requested format; the original file is kept if that fails
    async fn convert(&self, file: PathBuf) -> PathBuf {
        let target = self.request.format;
        let Some(converter) = self.converter else {
            return file;
        };
        if SubtitleFormat::from_path(&file) == Some(target) {
            return file;
        }

        match converter.convert(&file, target).await {
            Ok(converted) => converted,
            Err(e) => {
                tracing::warn!(
                    "Keeping {} in its downloaded format: {:#}",
                    file.display(),
                    e
                );
                file
            }
        }
    }
}
