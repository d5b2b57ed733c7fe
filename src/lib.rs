//! subharvest - download YouTube subtitles with yt-dlp and merge them into one document
//!
//! The heavy lifting (listing channels, fetching captions, converting formats) is
//! delegated to the external `yt-dlp` and `ffmpeg` tools. This library owns the
//! caption parsers, the merge engine that stitches per-video tracks into a single
//! searchable text file, and the job pipeline that drives the external tools.

use std::path::PathBuf;

pub mod captions;
pub mod cli;
pub mod config;
pub mod download;
pub mod engines;
pub mod interactive;
pub mod merge;
pub mod output;
pub mod utils;

pub use captions::{CaptionEntry, CaptionError, SubtitleFormat, SubtitleTrack};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use download::{DownloadJob, DownloadPipeline, JobSummary};
pub use engines::{FormatConverter, SubtitleFetcher, VideoEntry};
pub use merge::{MergeEngine, MergeOptions, MergedDocument, TrackSource, VideoRecord};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to subtitle harvesting
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),

    #[error("Required tool not available: {0}")]
    DependencyMissing(String),

    #[error("Subtitle fetch failed: {0}")]
    FetchFailed(String),

    #[error("Subtitle conversion failed: {0}")]
    ConversionFailed(String),

    #[error("Failed to write {}: {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
