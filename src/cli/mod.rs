use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::captions::SubtitleFormat;

#[derive(Parser)]
#[command(
    name = "subharvest",
    about = "subharvest - Download YouTube subtitles with yt-dlp and merge them into one searchable file",
    version,
    long_about = "Downloads subtitles from a YouTube video or a whole channel using yt-dlp, converts them with ffmpeg, and merges a channel's subtitles into a single text document with one section per video. Run without a subcommand for the interactive menu."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive menu (default)
    Interactive,

    /// Download subtitles from a video or channel URL
    Download {
        /// YouTube video or channel URL
        #[arg(value_name = "URL")]
        url: String,

        /// Treat the URL as a channel and fetch every listed video
        #[arg(long)]
        channel: bool,

        /// Subtitle language code, or `all` (defaults to the configured language)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,

        /// Subtitle format (defaults to the configured format)
        #[arg(short, long, value_enum)]
        format: Option<SubtitleFormat>,

        /// Only download manually authored subtitles
        #[arg(long)]
        no_auto: bool,

        /// Keep individual files only; do not write the merged document
        #[arg(long)]
        no_merge: bool,

        /// Output directory (auto-named if not specified)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Keep subtitles in the format yt-dlp delivers them
        #[arg(long)]
        no_convert: bool,
    },

    /// Merge the subtitle files of a directory into one document
    Merge {
        /// Directory holding subtitle files (searched recursively)
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Keep caption start times in the merged text
        #[arg(long)]
        timestamps: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        output_format: OutputFormat,
    },

    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List supported subtitle formats
    Formats,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text sections
    Text,
    /// JSON with one object per section
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_download() {
        let cli = Cli::try_parse_from([
            "subharvest", "download", "https://www.youtube.com/@x", "--channel", "-l", "de", "-f", "vtt", "--no-auto",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Download { channel, language, format, no_auto, no_merge, .. }) => {
                assert!(channel);
                assert_eq!(language.as_deref(), Some("de"));
                assert_eq!(format, Some(SubtitleFormat::Vtt));
                assert!(no_auto);
                assert!(!no_merge);
            }
            _ => panic!("expected download command"),
        }
    }

    #[test]
    fn test_no_subcommand_means_interactive() {
        let cli = Cli::try_parse_from(["subharvest"]).unwrap();
        assert!(cli.command.is_none());
    }
}
