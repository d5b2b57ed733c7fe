use anyhow::{Context, Result};
use futures_util::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::captions::SubtitleFormat;
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::engines::{
    FetchRequest, FfmpegConverter, FormatConverter, SubtitleFetcher, VideoEntry, YtDlpFetcher,
};
use crate::merge::{MergeEngine, MergeOptions, MergeStats, TrackSource, VideoRecord};
use crate::output;
use crate::utils::{self, ToolReport};

pub mod worker;

use worker::{VideoOutcome, VideoWorker};

/// One download request, as collected from the command line or the menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub url: String,
    pub is_channel: bool,
    pub language: String,
    pub format: SubtitleFormat,
    pub include_auto: bool,
    /// Write the merged document after downloading
    pub merge: bool,
    /// Custom output directory; auto-named when `None`
    pub output_dir: Option<PathBuf>,
    /// Convert downloads into `format` with the conversion engine
    pub convert: bool,
}

impl DownloadJob {
    /// A job using the configured defaults
    pub fn new(url: impl Into<String>, is_channel: bool, config: &Config) -> Self {
        Self {
            url: url.into(),
            is_channel,
            language: config.download.default_language.clone(),
            format: config.download.default_format,
            include_auto: config.download.include_auto_generated,
            merge: true,
            output_dir: None,
            convert: true,
        }
    }
}

/// Where the merged document went and what it holds
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub path: PathBuf,
    pub stats: MergeStats,
}

/// Result of a finished (or cancelled) job
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub output_dir: PathBuf,
    pub videos: usize,
    pub subtitle_files: usize,
    pub failed_fetches: usize,
    pub merged: Option<MergeReport>,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl JobSummary {
    pub fn print(&self) {
        let rule = "=".repeat(60);
        let location = self
            .output_dir
            .canonicalize()
            .unwrap_or_else(|_| self.output_dir.clone());

        println!("\n{}", rule);
        if self.cancelled {
            println!("DOWNLOAD CANCELLED");
        } else {
            println!("DOWNLOAD COMPLETED");
        }
        println!("{}", rule);
        println!("SUMMARY:");
        println!("- Videos listed: {}", self.videos);
        println!("- Downloaded {} subtitle files", self.subtitle_files);
        if self.failed_fetches > 0 {
            println!("- Failed fetches: {}", self.failed_fetches);
        }
        println!("- Individual subtitle files location: {}", location.display());

        if let Some(merged) = &self.merged {
            let size = fs_err::metadata(&merged.path)
                .map(|m| utils::format_file_size(m.len()))
                .unwrap_or_else(|_| "unknown size".to_string());
            println!("- Merged {} sections into one document ({})", merged.stats.sections, size);
            println!(
                "    with captions: {}, without subtitles: {}, unavailable: {}, not processed: {}",
                merged.stats.with_captions,
                merged.stats.without_subtitles,
                merged.stats.unavailable,
                merged.stats.not_processed
            );
            println!("- Merged file location: {}", merged.path.display());
        }

        println!("- Elapsed: {}", utils::format_duration(self.elapsed.as_secs_f64()));
        println!("{}", rule);
    }
}

/// Drives the fetching engine, the conversion engine and the merge for one job
pub struct DownloadPipeline {
    config: Config,
    fetcher: Arc<dyn SubtitleFetcher>,
    converter: Option<Arc<dyn FormatConverter>>,
    show_progress: bool,
}

impl DownloadPipeline {
    pub fn new(
        config: Config,
        fetcher: Arc<dyn SubtitleFetcher>,
        converter: Option<Arc<dyn FormatConverter>>,
    ) -> Self {
        Self {
            config,
            fetcher,
            converter,
            show_progress: true,
        }
    }

    /// yt-dlp fetcher plus an ffmpeg converter when ffmpeg is available
    pub fn from_config(config: Config, tools: &ToolReport) -> Self {
        let fetcher = Arc::new(YtDlpFetcher::new(config.tools.yt_dlp_path.clone()));
        let converter: Option<Arc<dyn FormatConverter>> = if tools.ffmpeg {
            Some(Arc::new(FfmpegConverter::new(config.tools.ffmpeg_path.clone())))
        } else {
            tracing::warn!("ffmpeg is not available; subtitles stay in the format yt-dlp delivers");
            None
        };
        Self::new(config, fetcher, converter)
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Run a job; Ctrl-C cancels the fetch stage
    pub async fn run(&self, job: &DownloadJob) -> Result<JobSummary> {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        };
        self.run_until(job, ctrl_c).await
    }

    /// Run a job, stopping the fetch stage when `cancel` resolves
    pub async fn run_until<F>(&self, job: &DownloadJob, cancel: F) -> Result<JobSummary>
    where
        F: Future<Output = ()>,
    {
        let started = Instant::now();
        let timestamp = utils::timestamp_now();
        let output_dir = self.prepare_output_dir(job, &timestamp)?;
        tracing::info!("Saving subtitles to {}", output_dir.display());

        let listing_url = if job.is_channel {
            utils::channel_videos_url(&job.url)
        } else {
            job.url.clone()
        };
        let videos = self
            .fetcher
            .list_videos(&listing_url, job.is_channel)
            .await
            .with_context(|| format!("Failed to list videos for {}", listing_url))?;
        tracing::info!("Found {} videos via {}", videos.len(), self.fetcher.engine_name());

        let request = FetchRequest {
            language: job.language.clone(),
            format: job.format,
            include_auto: job.include_auto,
        };
        let (outcomes, cancelled) = self
            .fetch_all(&videos, &request, &output_dir, job.convert, cancel)
            .await;

        let subtitle_files = outcomes
            .iter()
            .flatten()
            .map(|outcome| match outcome {
                VideoOutcome::Fetched(files) => files.len(),
                VideoOutcome::Failed(_) => 0,
            })
            .sum();
        let failed_fetches = outcomes
            .iter()
            .flatten()
            .filter(|outcome| matches!(outcome, VideoOutcome::Failed(_)))
            .count();

        let merged = if !job.merge {
            None
        } else if cancelled && !self.config.merge.partial_merge_on_cancel {
            tracing::info!("Job cancelled; skipping the merged document");
            None
        } else if subtitle_files == 0 {
            tracing::info!("No subtitle files to merge");
            None
        } else {
            let records = build_records(&videos, &outcomes);
            Some(self.merge(&records, &output_dir, &timestamp)?)
        };

        Ok(JobSummary {
            output_dir,
            videos: videos.len(),
            subtitle_files,
            failed_fetches,
            merged,
            cancelled,
            elapsed: started.elapsed(),
        })
    }

    async fn fetch_all<F>(
        &self,
        videos: &[VideoEntry],
        request: &FetchRequest,
        output_dir: &Path,
        convert: bool,
        cancel: F,
    ) -> (Vec<Option<VideoOutcome>>, bool)
    where
        F: Future<Output = ()>,
    {
        let worker = VideoWorker {
            fetcher: self.fetcher.as_ref(),
            converter: if convert { self.converter.as_deref() } else { None },
            request,
            output_dir,
        };
        let worker = &worker;
        let progress = self.progress_bar(videos.len() as u64);
        let mut outcomes: Vec<Option<VideoOutcome>> = vec![None; videos.len()];

        let pending = stream::iter(videos.iter().enumerate())
            .map(move |(index, video)| worker.process(index, video))
            .buffer_unordered(self.config.download.max_concurrent_fetches.max(1));
        tokio::pin!(pending);
        tokio::pin!(cancel);

        let mut cancelled = false;
        loop {
            tokio::select! {
                biased;
                _ = &mut cancel => {
                    cancelled = true;
                    progress.abandon_with_message("cancelled");
                    tracing::warn!("Cancelled; in-flight downloads were stopped");
                    break;
                }
                next = pending.next() => match next {
                    Some((index, outcome)) => {
                        progress.set_message(videos[index].title.clone());
                        progress.inc(1);
                        outcomes[index] = Some(outcome);
                    }
                    None => {
                        progress.finish_with_message("done");
                        break;
                    }
                },
            }
        }

        (outcomes, cancelled)
    }

    fn merge(&self, records: &[VideoRecord], output_dir: &Path, timestamp: &str) -> Result<MergeReport> {
        let path = output_dir.join(format!("all_subtitles_{}.txt", timestamp));
        tracing::info!("Merging {} subtitle tracks into {}", records.len(), path.display());

        let engine = MergeEngine::new(MergeOptions::from(&self.config.merge));
        let document = engine.merge(records);
        output::save_to_file(&document, &path, OutputFormat::Text)?;

        Ok(MergeReport {
            path,
            stats: document.stats(),
        })
    }

    fn prepare_output_dir(&self, job: &DownloadJob, timestamp: &str) -> Result<PathBuf> {
        let root = self
            .config
            .download
            .output_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let dir = job.output_dir.clone().unwrap_or_else(|| {
            root.join(utils::output_dir_name(&job.url, job.is_channel, timestamp))
        });

        match fs_err::create_dir_all(&dir) {
            Ok(()) => Ok(dir),
            Err(e) => {
                let fallback = root.join(format!("subtitles_{}", timestamp));
                tracing::warn!("{}; trying alternate directory {}", e, fallback.display());
                fs_err::create_dir_all(&fallback).context("Failed to create output directory")?;
                Ok(fallback)
            }
        }
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new(len);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} videos {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█░"),
        );
        progress
    }
}

/// One record per subtitle file, in listing order. Videos without a file still
/// get a record so the merged document accounts for every listed video.
fn build_records(videos: &[VideoEntry], outcomes: &[Option<VideoOutcome>]) -> Vec<VideoRecord> {
    let mut records = Vec::new();

    for (video, outcome) in videos.iter().zip(outcomes) {
        let record = |source: TrackSource| {
            VideoRecord::new(video.ordinal, video.title.clone(), source).with_url(video.url.clone())
        };

        match outcome {
            None => records.push(record(TrackSource::NotProcessed("cancelled".to_string()))),
            Some(VideoOutcome::Failed(reason)) => records.push(record(TrackSource::NotProcessed(
                format!("fetch failed: {}", reason),
            ))),
            Some(VideoOutcome::Fetched(files)) if files.is_empty() => {
                records.push(record(TrackSource::Missing))
            }
            Some(VideoOutcome::Fetched(files)) => {
                for file in files {
                    let stem = file
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    let mut entry = record(TrackSource::File(file.clone()));
                    if let (_, Some(language)) = utils::split_language_suffix(&stem) {
                        entry = entry.with_language(language);
                    }
                    records.push(entry);
                }
            }
        }
    }

    records
}
