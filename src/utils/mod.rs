use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::config::Config;
use crate::HarvestError;

static CLEAN_FILENAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/*?:"<>|]"#).expect("valid filename regex"));

/// BCP 47-style tag: 2-3 letter primary subtag, then script, region or
/// yt-dlp variants such as `en-US`, `zh-Hans` or `en-orig`
static LANGUAGE_CODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]{2,3}(?:[-_][A-Za-z0-9]{2,8})*$").expect("valid language regex")
});

const YOUTUBE_HOSTS: [&str; 5] = [
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
];

/// Validate a URL and return normalized version
pub fn validate_and_normalize_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url)
        .map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    Ok(parsed.to_string())
}

/// Validate that a URL points at YouTube
pub fn validate_youtube_url(url: &str) -> Result<String> {
    let normalized = validate_and_normalize_url(url.trim())?;
    let host = Url::parse(&normalized)?
        .host_str()
        .map(|h| h.to_lowercase())
        .unwrap_or_default();

    if !YOUTUBE_HOSTS.contains(&host.as_str()) {
        return Err(HarvestError::UnsupportedUrl(format!("{} is not a YouTube address", url.trim())).into());
    }

    Ok(normalized)
}

/// Channel URLs without a tab list the channel's tabs instead of its videos,
/// so `/videos` is appended to `/@name`, `/channel/ID`, `/c/name` and `/user/name`.
pub fn channel_videos_url(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let segments: Vec<String> = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();

    let is_bare_channel = match segments.as_slice() {
        [handle] => handle.starts_with('@'),
        [kind, _] => matches!(kind.as_str(), "channel" | "c" | "user"),
        _ => false,
    };
    if !is_bare_channel {
        return url.to_string();
    }

    parsed.set_path(&format!("/{}/videos", segments.join("/")));
    parsed.to_string()
}

/// Short name for a channel URL, used in directory names
pub fn channel_slug(url: &str) -> String {
    let last = url
        .trim_end_matches('/')
        .rsplit('/')
        .find(|seg| !seg.is_empty() && *seg != "videos")
        .unwrap_or("channel");
    let last = last.split(['?', '#']).next().unwrap_or(last);
    clean_filename(&last.replace('@', ""))
}

/// Make a name safe on both Windows and Unix file systems.
///
/// Reserved characters become `_`, whitespace runs collapse to one space and
/// the result is capped at 50 characters. Empty results become `Unknown`.
pub fn clean_filename(filename: &str) -> String {
    let replaced = CLEAN_FILENAME_REGEX.replace_all(filename, "_");
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let capped: String = collapsed.chars().take(50).collect();
    let cleaned = capped.trim();

    if cleaned.is_empty() {
        "Unknown".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Default job directory name: `subtitles_<channel_slug|video>_<timestamp>_<uuid8>`
pub fn output_dir_name(url: &str, is_channel: bool, timestamp: &str) -> String {
    let base = if is_channel {
        format!("channel_{}", channel_slug(url))
    } else {
        "video".to_string()
    };
    let random_suffix = uuid::Uuid::new_v4().to_string()[..8].to_string();

    format!("subtitles_{}_{}_{}", base, timestamp, random_suffix)
}

/// Local time as `YYYYmmdd_HHMMSS`
pub fn timestamp_now() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Split `name.lang` into `("name", Some("lang"))`
pub fn split_language_suffix(stem: &str) -> (&str, Option<&str>) {
    match stem.rsplit_once('.') {
        Some((name, lang)) if !name.is_empty() && is_language_code(lang) => (name, Some(lang)),
        _ => (stem, None),
    }
}

fn is_language_code(code: &str) -> bool {
    LANGUAGE_CODE_REGEX.is_match(code)
}

pub fn is_youtube_video_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Availability of the external tools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolReport {
    pub yt_dlp: bool,
    pub ffmpeg: bool,
}

impl ToolReport {
    /// Fail fast when the subtitle-fetching engine is absent
    pub fn require_fetcher(&self) -> std::result::Result<(), HarvestError> {
        if self.yt_dlp {
            Ok(())
        } else {
            Err(HarvestError::DependencyMissing(
                "yt-dlp was not found in PATH. Install it with `pip install yt-dlp` \
                 (https://github.com/yt-dlp/yt-dlp) or set tools.yt_dlp_path in the config file"
                    .to_string(),
            ))
        }
    }

    /// Installation hint for a missing ffmpeg, if any
    pub fn ffmpeg_hint(&self) -> Option<&'static str> {
        if self.ffmpeg {
            None
        } else if cfg!(windows) {
            Some("ffmpeg not found: download it from https://ffmpeg.org/download.html and add its bin folder to PATH")
        } else {
            Some("ffmpeg not found: install it with your package manager (apt install ffmpeg, dnf install ffmpeg, brew install ffmpeg)")
        }
    }
}

/// Check if the current environment has required tools
pub async fn check_dependencies(config: &Config) -> ToolReport {
    let report = ToolReport {
        yt_dlp: check_command_available(&config.tools.yt_dlp_path, "--version").await,
        ffmpeg: check_command_available(&config.tools.ffmpeg_path, "-version").await,
    };
    tracing::debug!("Tool check: {:?}", report);
    report
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str, version_flag: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg(version_flag)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1048576), "1.0 MB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30.0), "30s");
        assert_eq!(format_duration(90.0), "1m 30s");
        assert_eq!(format_duration(3661.0), "1h 1m 1s");
    }

    #[test]
    fn test_clean_filename() {
        assert_eq!(clean_filename("What? A <title>"), "What_ A _title_");
        assert_eq!(clean_filename("  lots   of\tspace "), "lots of space");
        assert_eq!(clean_filename("   "), "Unknown");
        assert_eq!(clean_filename(&"x".repeat(80)).len(), 50);
    }

    #[test]
    fn test_validate_youtube_url() {
        assert!(validate_youtube_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ").is_ok());
        assert!(validate_youtube_url(" https://youtu.be/dQw4w9WgXcQ ").is_ok());
        assert!(validate_youtube_url("https://example.com/watch?v=1").is_err());
        assert!(validate_youtube_url("ftp://youtube.com").is_err());
        assert!(validate_youtube_url("not-a-url").is_err());
    }

    #[test]
    fn test_channel_videos_url() {
        assert_eq!(
            channel_videos_url("https://www.youtube.com/@somebody"),
            "https://www.youtube.com/@somebody/videos"
        );
        assert_eq!(
            channel_videos_url("https://www.youtube.com/channel/UC123/"),
            "https://www.youtube.com/channel/UC123/videos"
        );
        assert_eq!(
            channel_videos_url("https://www.youtube.com/@somebody/shorts"),
            "https://www.youtube.com/@somebody/shorts"
        );
        assert_eq!(
            channel_videos_url("https://www.youtube.com/playlist?list=PL1"),
            "https://www.youtube.com/playlist?list=PL1"
        );
    }

    #[test]
    fn test_channel_slug() {
        assert_eq!(channel_slug("https://www.youtube.com/@somebody"), "somebody");
        assert_eq!(channel_slug("https://www.youtube.com/@somebody/videos"), "somebody");
        assert_eq!(channel_slug("https://www.youtube.com/c/Name?x=1"), "Name");
    }

    #[test]
    fn test_output_dir_name() {
        let name = output_dir_name("https://www.youtube.com/@chan", true, "20240101_120000");
        assert!(name.starts_with("subtitles_channel_chan_20240101_120000_"));
        assert_eq!(name.len(), "subtitles_channel_chan_20240101_120000_".len() + 8);
        assert!(output_dir_name("https://youtu.be/x", false, "t").starts_with("subtitles_video_t_"));
    }

    #[test]
    fn test_split_language_suffix() {
        assert_eq!(split_language_suffix("abc.en"), ("abc", Some("en")));
        assert_eq!(split_language_suffix("abc.zh-CN"), ("abc", Some("zh-CN")));
        assert_eq!(split_language_suffix("Mr. Smith"), ("Mr. Smith", None));
        assert_eq!(split_language_suffix("plain"), ("plain", None));
        assert_eq!(split_language_suffix("abc.en-orig"), ("abc", Some("en-orig")));
        assert_eq!(split_language_suffix("Talk v2.final"), ("Talk v2.final", None));
        assert_eq!(split_language_suffix("Talk.v2"), ("Talk.v2", None));
    }

    #[test]
    fn test_require_fetcher() {
        let report = ToolReport { yt_dlp: false, ffmpeg: true };
        assert!(matches!(report.require_fetcher(), Err(HarvestError::DependencyMissing(_))));
        assert!(report.ffmpeg_hint().is_none());
    }
}
