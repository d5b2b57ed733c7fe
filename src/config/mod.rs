use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::captions::SubtitleFormat;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// External tool locations
    pub tools: ToolsConfig,

    /// Download defaults
    pub download: DownloadConfig,

    /// Merged document settings
    pub merge: MergeSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// yt-dlp executable (name in PATH or absolute path)
    pub yt_dlp_path: String,

    /// ffmpeg executable (name in PATH or absolute path)
    pub ffmpeg_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Subtitle language code, or `all`
    pub default_language: String,

    /// Subtitle format to convert downloads into
    pub default_format: SubtitleFormat,

    /// Fall back to auto-generated captions
    pub include_auto_generated: bool,

    /// Videos fetched at the same time
    pub max_concurrent_fetches: usize,

    /// Parent directory for auto-named job directories
    pub output_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeSettings {
    /// Keep caption start times in the merged text
    pub include_timestamps: bool,

    /// Show video URLs in section headers
    pub include_urls: bool,

    /// Drop consecutive duplicate lines (auto-generated captions repeat them)
    pub collapse_repeated_lines: bool,

    /// Merge whatever finished when a job is cancelled
    pub partial_merge_on_cancel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tools: ToolsConfig {
                yt_dlp_path: "yt-dlp".to_string(),
                ffmpeg_path: "ffmpeg".to_string(),
            },
            download: DownloadConfig {
                default_language: "en".to_string(),
                default_format: SubtitleFormat::Srt,
                include_auto_generated: true,
                max_concurrent_fetches: 4,
                output_root: None,
            },
            merge: MergeSettings {
                include_timestamps: false,
                include_urls: true,
                collapse_repeated_lines: false,
                partial_merge_on_cancel: true,
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config = Self::from_yaml(&content)?;
            tracing::debug!("Loaded configuration from {}", config_path.display());
            Ok(config)
        } else {
            let config = Self::default();
            if let Err(e) = config.save().await {
                tracing::warn!("Could not write default configuration: {:#}", e);
            }
            Ok(config)
        }
    }

    /// Parse and validate YAML configuration
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("subharvest").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.tools.yt_dlp_path.trim().is_empty() {
            anyhow::bail!("tools.yt_dlp_path must not be empty");
        }

        if self.download.default_language.trim().is_empty() {
            anyhow::bail!("download.default_language must not be empty");
        }

        if self.download.max_concurrent_fetches == 0 {
            anyhow::bail!("download.max_concurrent_fetches must be at least 1");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  yt-dlp: {}", self.tools.yt_dlp_path);
        println!("  ffmpeg: {}", self.tools.ffmpeg_path);
        println!("  Default Language: {}", self.download.default_language);
        println!("  Default Format: {}", self.download.default_format);
        println!("  Include Auto-generated: {}", self.download.include_auto_generated);
        println!("  Concurrent Fetches: {}", self.download.max_concurrent_fetches);
        match &self.download.output_root {
            Some(root) => println!("  Output Root: {}", root.display()),
            None => println!("  Output Root: current directory"),
        }
        println!("  Merge Timestamps: {}", self.merge.include_timestamps);
        println!("  Merge URLs: {}", self.merge.include_urls);
        println!("  Collapse Repeated Lines: {}", self.merge.collapse_repeated_lines);
        println!("  Partial Merge on Cancel: {}", self.merge.partial_merge_on_cancel);
    }

    /// Point the user at the config file
    pub fn edit_instructions(&self) -> Result<()> {
        println!("Edit the configuration file to change these settings:");
        println!("  {}", Self::config_path()?.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips_through_yaml() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        let parsed = Config::from_yaml(&yaml).unwrap();

        assert_eq!(parsed.download.default_format, SubtitleFormat::Srt);
        assert_eq!(parsed.download.max_concurrent_fetches, 4);
        assert!(parsed.merge.partial_merge_on_cancel);
    }

    #[test]
    fn test_format_is_lowercase_in_yaml() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        assert!(yaml.contains("default_format: srt"));
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.download.max_concurrent_fetches = 0;
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_rejects_unknown_format() {
        let yaml = serde_yaml::to_string(&Config::default())
            .unwrap()
            .replace("default_format: srt", "default_format: ttml");
        assert!(Config::from_yaml(&yaml).is_err());
    }
}
