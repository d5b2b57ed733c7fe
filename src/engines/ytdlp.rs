use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{FetchRequest, SubtitleFetcher, VideoEntry};
use crate::captions::SubtitleFormat;
use crate::{utils, HarvestError, Result};

/// One line of `yt-dlp --flat-playlist --dump-json`
#[derive(Debug, Deserialize)]
struct ListingItem {
    id: String,
    title: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
    ie_key: Option<String>,
}

/// Subtitle fetcher backed by the yt-dlp executable
pub struct YtDlpFetcher {
    yt_dlp_path: String,
}

impl YtDlpFetcher {
    pub fn new(yt_dlp_path: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
        }
    }

    fn listing_args(url: &str, is_channel: bool) -> Vec<String> {
        let mut args = vec!["--flat-playlist".to_string(), "--dump-json".to_string()];
        if !is_channel {
            args.push("--no-playlist".to_string());
        }
        args.push(url.to_string());
        args
    }

    fn fetch_args(video: &VideoEntry, request: &FetchRequest, output_dir: &Path) -> Vec<String> {
        let mut args = vec!["--skip-download".to_string(), "--write-sub".to_string()];
        if request.include_auto {
            args.push("--write-auto-sub".to_string());
        }
        args.extend([
            "--sub-langs".to_string(),
            request.language.clone(),
            "--sub-format".to_string(),
            format!("{}/best", request.format.as_str()),
            "--no-playlist".to_string(),
            "--output".to_string(),
            output_dir.join("%(id)s.%(ext)s").to_string_lossy().into_owned(),
            video.url.clone(),
        ]);
        args
    }

    /// Parse the JSON-lines listing. Tab entries of a channel page are skipped.
    pub(crate) fn parse_listing(stdout: &str) -> Result<Vec<VideoEntry>> {
        let mut videos = Vec::new();

        for (idx, line) in stdout.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let item: ListingItem = serde_json::from_str(line)
                .with_context(|| format!("Unexpected yt-dlp listing output on line {}", idx + 1))?;

            if item.ie_key.as_deref() == Some("YoutubeTab") {
                tracing::debug!("Skipping channel tab entry {}", item.id);
                continue;
            }

            let url = item
                .webpage_url
                .or(item.url)
                .filter(|u| u.starts_with("http"))
                .unwrap_or_else(|| utils::watch_url(&item.id));

            videos.push(VideoEntry {
                title: item.title.unwrap_or_else(|| item.id.clone()),
                id: item.id,
                url,
                ordinal: videos.len() + 1,
            });
        }

        Ok(videos)
    }

    /// Subtitle files yt-dlp wrote for `video_id` (`<id>.<lang>.<ext>`)
    pub(crate) fn produced_files(video_id: &str, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let prefix = format!("{}.", video_id);
        let mut files = Vec::new();

        for entry in fs_err::read_dir(output_dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.starts_with(&prefix) || !path.is_file() {
                continue;
            }
            if SubtitleFormat::from_path(&path).is_some() {
                files.push(path);
            } else {
                tracing::debug!("Ignoring unsupported subtitle file {}", path.display());
            }
        }

        files.sort();
        Ok(files)
    }

    async fn run(&self, args: &[String]) -> Result<String> {
        tracing::debug!("Running {} {}", self.yt_dlp_path, args.join(" "));

        let output = Command::new(&self.yt_dlp_path)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to start {}", self.yt_dlp_path))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(HarvestError::FetchFailed(last_lines(&error, 3)).into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl SubtitleFetcher for YtDlpFetcher {
    async fn list_videos(&self, url: &str, is_channel: bool) -> Result<Vec<VideoEntry>> {
        tracing::debug!("Listing videos for: {}", url);
        let stdout = self.run(&Self::listing_args(url, is_channel)).await?;
        Self::parse_listing(&stdout)
    }

    async fn fetch_subtitles(
        &self,
        video: &VideoEntry,
        request: &FetchRequest,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        tracing::debug!("Fetching {} subtitles for {}", request.language, video.id);
        self.run(&Self::fetch_args(video, request, output_dir)).await?;
        Self::produced_files(&video.id, output_dir)
    }

    fn engine_name(&self) -> &'static str {
        "yt-dlp"
    }
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(count)..].join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video() -> VideoEntry {
        VideoEntry {
            id: "abc123def45".to_string(),
            title: "Title".to_string(),
            url: "https://www.youtube.com/watch?v=abc123def45".to_string(),
            ordinal: 1,
        }
    }

    #[test]
    fn test_parse_listing() {
        let stdout = concat!(
            r#"{"id": "tab1", "ie_key": "YoutubeTab", "url": "https://www.youtube.com/@x/shorts"}"#,
            "\n",
            r#"{"id": "aaaaaaaaaaa", "title": "First", "url": "https://www.youtube.com/watch?v=aaaaaaaaaaa"}"#,
            "\n\n",
            r#"{"id": "bbbbbbbbbbb", "title": null, "url": "bbbbbbbbbbb"}"#,
            "\n",
        );
        let videos = YtDlpFetcher::parse_listing(stdout).unwrap();

        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].ordinal, 1);
        assert_eq!(videos[0].title, "First");
        assert_eq!(videos[1].ordinal, 2);
        assert_eq!(videos[1].title, "bbbbbbbbbbb");
        assert_eq!(videos[1].url, "https://www.youtube.com/watch?v=bbbbbbbbbbb");
    }

    #[test]
    fn test_parse_listing_rejects_garbage() {
        assert!(YtDlpFetcher::parse_listing("ERROR: not json\n").is_err());
    }

    #[test]
    fn test_fetch_args() {
        let request = FetchRequest {
            language: "en".to_string(),
            format: SubtitleFormat::Vtt,
            include_auto: true,
        };
        let args = YtDlpFetcher::fetch_args(&video(), &request, Path::new("out"));

        assert_eq!(args[0], "--skip-download");
        assert!(args.contains(&"--write-auto-sub".to_string()));
        assert!(args.windows(2).any(|w| w == ["--sub-format", "vtt/best"]));
        assert!(args.windows(2).any(|w| w[0] == "--output" && w[1].ends_with("%(id)s.%(ext)s")));
        assert_eq!(args.last().unwrap(), &video().url);

        let manual_only = FetchRequest { include_auto: false, ..request };
        let args = YtDlpFetcher::fetch_args(&video(), &manual_only, Path::new("out"));
        assert!(!args.contains(&"--write-auto-sub".to_string()));
    }

    #[test]
    fn test_listing_args() {
        assert!(YtDlpFetcher::listing_args("u", false).contains(&"--no-playlist".to_string()));
        assert!(!YtDlpFetcher::listing_args("u", true).contains(&"--no-playlist".to_string()));
    }

    #[test]
    fn test_produced_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["abc123def45.en.vtt", "abc123def45.de.srt", "abc123def45.en.srv3", "other.en.vtt"] {
            fs_err::write(dir.path().join(name), "").unwrap();
        }

        let files = YtDlpFetcher::produced_files("abc123def45", dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["abc123def45.de.srt", "abc123def45.en.vtt"]);
    }

    #[test]
    fn test_last_lines() {
        assert_eq!(last_lines("a\n\nb\nc\nd\n", 2), "c | d");
    }
}
