use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod ffmpeg;
pub mod ytdlp;

pub use ffmpeg::FfmpegConverter;
pub use ytdlp::YtDlpFetcher;

use crate::captions::SubtitleFormat;
use crate::Result;

/// One video from a channel or playlist listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoEntry {
    /// Platform video id, also the stem of downloaded subtitle files
    pub id: String,

    pub title: String,

    pub url: String,

    /// Position in the listing, 1-based
    pub ordinal: usize,
}

/// What to ask the fetching engine for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Language code, or `all`
    pub language: String,

    /// Preferred subtitle format
    pub format: SubtitleFormat,

    /// Accept auto-generated captions when no manual ones exist
    pub include_auto: bool,
}

/// External engine that lists videos and downloads their subtitle files
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubtitleFetcher: Send + Sync {
    /// Enumerate the videos behind a URL, in listing order
    async fn list_videos(&self, url: &str, is_channel: bool) -> Result<Vec<VideoEntry>>;

    /// Download one video's subtitles into `output_dir` and return the files produced
    async fn fetch_subtitles(
        &self,
        video: &VideoEntry,
        request: &FetchRequest,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>>;

    /// Get the name of this engine
    fn engine_name(&self) -> &'static str;
}

/// External engine that converts a subtitle file between formats
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FormatConverter: Send + Sync {
    /// Convert `input` and return the path of the converted file
    async fn convert(&self, input: &Path, target: SubtitleFormat) -> Result<PathBuf>;
}
