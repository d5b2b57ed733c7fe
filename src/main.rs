use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subharvest::cli::{Cli, Commands};
use subharvest::config::Config;
use subharvest::download::{DownloadJob, DownloadPipeline};
use subharvest::merge::{records_from_directory, MergeEngine, MergeOptions};
use subharvest::{interactive, output, utils, SubtitleFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for documents and summaries
    let default_filter = if cli.verbose { "subharvest=debug" } else { "subharvest=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load().await?;

    match cli.command.unwrap_or(Commands::Interactive) {
        Commands::Interactive => {
            interactive::run(config, cli.quiet).await?;
        }
        Commands::Download {
            url,
            channel,
            language,
            format,
            no_auto,
            no_merge,
            output_dir,
            no_convert,
        } => {
            let url = utils::validate_youtube_url(&url)?;

            let tools = utils::check_dependencies(&config).await;
            tools.require_fetcher()?;
            if let Some(hint) = tools.ffmpeg_hint() {
                tracing::warn!("{}", hint);
            }

            let mut job = DownloadJob::new(url, channel, &config);
            if let Some(language) = language {
                job.language = language;
            }
            if let Some(format) = format {
                job.format = format;
            }
            job.include_auto &= !no_auto;
            job.merge = !no_merge;
            job.output_dir = output_dir;
            job.convert = !no_convert;

            tracing::info!("Starting subtitle download for URL: {}", job.url);

            let pipeline = DownloadPipeline::from_config(config, &tools).with_progress(!cli.quiet);
            let summary = pipeline.run(&job).await?;
            summary.print();
        }
        Commands::Merge {
            dir,
            output,
            timestamps,
            output_format,
        } => {
            let records = records_from_directory(&dir)?;
            if records.is_empty() {
                anyhow::bail!("No subtitle files found under {}", dir.display());
            }

            let mut options = MergeOptions::from(&config.merge);
            options.include_timestamps |= timestamps;
            let document = MergeEngine::new(options).merge(&records);

            match output {
                Some(path) => {
                    output::save_to_file(&document, &path, output_format)?;
                    let stats = document.stats();
                    println!(
                        "Merged {} subtitle files into: {} ({} unreadable)",
                        stats.sections,
                        path.display(),
                        stats.unavailable
                    );
                }
                None => {
                    output::print_to_console(&document, output_format)?;
                }
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                config.edit_instructions()?;
            }
        }
        Commands::Formats => {
            println!("Supported subtitle formats:");
            for format in SubtitleFormat::ALL {
                println!("  • {} ({})", format.display_name(), format);
            }
        }
    }

    Ok(())
}
