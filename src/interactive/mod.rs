use anyhow::Result;
use console::{style, Term};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::captions::SubtitleFormat;
use crate::config::Config;
use crate::download::{DownloadJob, DownloadPipeline};
use crate::utils;

const INVALID_CHOICE: &str = "Invalid choice. Please try again.";

const LANGUAGES: [(&str, &str); 10] = [
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("zh-CN", "Chinese (Simplified)"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MainChoice {
    Download,
    About,
    Exit,
}

/// Outcome of the download questionnaire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPrompt {
    Ready(DownloadJob),
    Declined,
    EndOfInput,
}

/// Line-based prompt flow over any reader and writer.
///
/// Every question re-prompts on invalid input. End of input surfaces as `None`
/// from the individual questions and ends the menu.
pub struct Menu<R, W> {
    input: R,
    output: W,
    config: Config,
    term: Option<Term>,
}

impl<R: BufRead, W: Write> Menu<R, W> {
    pub fn new(input: R, output: W, config: Config) -> Self {
        Self {
            input,
            output,
            config,
            term: None,
        }
    }

    /// Clear the terminal before every screen
    pub fn with_terminal(mut self, term: Term) -> Self {
        self.term = Some(term);
        self
    }

    pub fn main_menu(&mut self) -> io::Result<MainChoice> {
        self.header()?;
        writeln!(self.output, "MAIN MENU:\n")?;
        writeln!(self.output, "1. Download YouTube Subtitles")?;
        writeln!(self.output, "2. About This Tool")?;
        writeln!(self.output, "3. Exit")?;

        Ok(match self.choose("Enter your choice (1-3): ", 1, 3)? {
            Some(1) => MainChoice::Download,
            Some(2) => MainChoice::About,
            _ => MainChoice::Exit,
        })
    }

    /// Ask everything a download needs, ending with a confirmation
    pub fn collect_job(&mut self) -> io::Result<JobPrompt> {
        macro_rules! answer {
            ($question:expr) => {
                match $question? {
                    Some(value) => value,
                    None => return Ok(JobPrompt::EndOfInput),
                }
            };
        }

        let url = answer!(self.ask_url());
        let is_channel = answer!(self.ask_channel());
        let language = answer!(self.ask_language());
        let format = answer!(self.ask_format());
        let include_auto = answer!(self.ask_auto());
        let merge = if is_channel {
            answer!(self.ask_merge())
        } else {
            true
        };
        let output_dir = answer!(self.ask_output_dir());

        let mut job = DownloadJob::new(url, is_channel, &self.config);
        job.language = language;
        job.format = format;
        job.include_auto = include_auto;
        job.merge = merge;
        job.output_dir = output_dir;

        self.print_confirmation(&job)?;
        match self.prompt("Start download? (y/n): ")? {
            Some(reply) if reply.eq_ignore_ascii_case("y") => Ok(JobPrompt::Ready(job)),
            Some(_) => Ok(JobPrompt::Declined),
            None => Ok(JobPrompt::EndOfInput),
        }
    }

    pub fn show_about(&mut self) -> io::Result<()> {
        self.header()?;
        writeln!(self.output, "ABOUT THIS TOOL:\n")?;
        writeln!(
            self.output,
            "Downloads subtitles from YouTube videos or entire channels with yt-dlp,\n\
             converts them with ffmpeg and merges a channel's subtitles into one\n\
             searchable text file with a header per video.\n"
        )?;
        writeln!(self.output, "Features:")?;
        writeln!(self.output, "- Single videos or entire channels")?;
        writeln!(self.output, "- Any subtitle language, in SRT, VTT, ASS or LRC")?;
        writeln!(self.output, "- Optional auto-generated subtitles")?;
        writeln!(self.output, "- One merged document per channel, written atomically")?;
        writeln!(self.output, "- Ctrl-C stops a running download and keeps what finished\n")?;
        self.pause("Press Enter to return to the main menu...")
    }

    pub fn pause(&mut self, message: &str) -> io::Result<()> {
        self.prompt(message).map(|_| ())
    }

    fn ask_url(&mut self) -> io::Result<Option<String>> {
        self.header()?;
        writeln!(self.output, "Enter the YouTube URL:")?;
        loop {
            let Some(url) = self.prompt("> ")? else {
                return Ok(None);
            };
            match utils::validate_youtube_url(&url) {
                Ok(normalized) => return Ok(Some(normalized)),
                Err(e) => writeln!(self.output, "{} Please enter a YouTube video or channel URL.", e)?,
            }
        }
    }

    fn ask_channel(&mut self) -> io::Result<Option<bool>> {
        writeln!(self.output, "\nIs this a channel or a video?")?;
        writeln!(self.output, "1. Channel (download subtitles from all videos)")?;
        writeln!(self.output, "2. Single video")?;
        Ok(self.choose("Enter your choice (1-2): ", 1, 2)?.map(|c| c == 1))
    }

    fn ask_language(&mut self) -> io::Result<Option<String>> {
        self.header()?;
        writeln!(self.output, "Select subtitle language:\n")?;
        for (index, (code, name)) in LANGUAGES.iter().enumerate() {
            writeln!(self.output, "{}. {} ({})", index + 1, name, code)?;
        }
        writeln!(self.output, "11. All available languages (all)")?;
        writeln!(self.output, "\n0. Custom language code")?;

        let choice = match self.choose("Enter your choice (1-11, or 0 for custom): ", 0, 11)? {
            Some(choice) => choice,
            None => return Ok(None),
        };
        match choice {
            0 => loop {
                let Some(code) = self.prompt("Enter custom language code (e.g., 'nl' for Dutch): ")? else {
                    return Ok(None);
                };
                if !code.is_empty() && !code.contains(char::is_whitespace) {
                    return Ok(Some(code));
                }
                writeln!(self.output, "{}", INVALID_CHOICE)?;
            },
            11 => Ok(Some("all".to_string())),
            n => Ok(Some(LANGUAGES[n - 1].0.to_string())),
        }
    }

    fn ask_format(&mut self) -> io::Result<Option<SubtitleFormat>> {
        self.header()?;
        writeln!(self.output, "Select subtitle format:\n")?;
        for (index, format) in SubtitleFormat::ALL.iter().enumerate() {
            writeln!(self.output, "{}. {} ({})", index + 1, format.display_name(), format)?;
        }
        Ok(self
            .choose("Enter your choice (1-4): ", 1, SubtitleFormat::ALL.len())?
            .map(|n| SubtitleFormat::ALL[n - 1]))
    }

    fn ask_auto(&mut self) -> io::Result<Option<bool>> {
        self.header()?;
        writeln!(self.output, "Include auto-generated subtitles?\n")?;
        writeln!(self.output, "1. Yes (recommended)")?;
        writeln!(self.output, "2. No (manual subtitles only)")?;
        Ok(self.choose("Enter your choice (1-2): ", 1, 2)?.map(|c| c == 1))
    }

    fn ask_merge(&mut self) -> io::Result<Option<bool>> {
        self.header()?;
        writeln!(self.output, "Merge all subtitles into a single text file?\n")?;
        writeln!(self.output, "1. Yes - Create one combined text file with all subtitles")?;
        writeln!(self.output, "2. No - Keep individual subtitle files only")?;
        Ok(self.choose("Enter your choice (1-2): ", 1, 2)?.map(|c| c == 1))
    }

    /// `Some(None)` means an auto-named directory
    fn ask_output_dir(&mut self) -> io::Result<Option<Option<PathBuf>>> {
        self.header()?;
        writeln!(self.output, "Where would you like to save the subtitles?\n")?;
        writeln!(self.output, "1. Use default directory (automatic naming)")?;
        writeln!(self.output, "2. Specify a custom directory")?;

        match self.choose("Enter your choice (1-2): ", 1, 2)? {
            None => Ok(None),
            Some(1) => Ok(Some(None)),
            Some(_) => loop {
                let Some(path) = self.prompt("Enter custom directory path: ")? else {
                    return Ok(None);
                };
                if !path.is_empty() {
                    return Ok(Some(Some(PathBuf::from(path))));
                }
                writeln!(self.output, "{}", INVALID_CHOICE)?;
            },
        }
    }

    fn print_confirmation(&mut self, job: &DownloadJob) -> io::Result<()> {
        self.header()?;
        writeln!(self.output, "DOWNLOAD CONFIRMATION:\n")?;
        writeln!(self.output, "URL: {}", job.url)?;
        writeln!(
            self.output,
            "Type: {}",
            if job.is_channel { "Channel" } else { "Single Video" }
        )?;
        writeln!(self.output, "Language: {}", job.language)?;
        writeln!(self.output, "Format: {}", job.format)?;
        writeln!(
            self.output,
            "Include auto-generated subtitles: {}",
            yes_no(job.include_auto)
        )?;
        if job.is_channel {
            writeln!(self.output, "Merge into single file: {}", yes_no(job.merge))?;
        }
        match &job.output_dir {
            Some(dir) => writeln!(self.output, "Output directory: {}\n", dir.display()),
            None => writeln!(self.output, "Output directory: Default (auto-named)\n"),
        }
    }

    /// Numbered choice in `min..=max`
    fn choose(&mut self, question: &str, min: usize, max: usize) -> io::Result<Option<usize>> {
        loop {
            let Some(reply) = self.prompt(question)? else {
                return Ok(None);
            };
            match reply.parse::<usize>() {
                Ok(n) if (min..=max).contains(&n) => return Ok(Some(n)),
                _ => writeln!(self.output, "{}", INVALID_CHOICE)?,
            }
        }
    }

    fn prompt(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn header(&mut self) -> io::Result<()> {
        if let Some(term) = &self.term {
            term.clear_screen()?;
        }
        let rule = "=".repeat(80);
        writeln!(self.output, "{}", rule)?;
        writeln!(
            self.output,
            "{}",
            style("               YOUTUBE SUBTITLE DOWNLOADER - INTERACTIVE MODE").bold()
        )?;
        writeln!(self.output, "{}\n", rule)
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Run the menu on the process's terminal until the user exits
pub async fn run(config: Config, quiet: bool) -> Result<()> {
    let tools = utils::check_dependencies(&config).await;
    tools.require_fetcher()?;
    if let Some(hint) = tools.ffmpeg_hint() {
        tracing::warn!("{}", hint);
    }

    let stdin = io::stdin();
    let term = Term::stdout();
    let mut menu = Menu::new(stdin.lock(), io::stdout(), config.clone());
    if term.is_term() {
        menu = menu.with_terminal(term);
    }

    loop {
        match menu.main_menu()? {
            MainChoice::Exit => {
                println!("\nThank you for using subharvest!");
                return Ok(());
            }
            MainChoice::About => menu.show_about()?,
            MainChoice::Download => match menu.collect_job()? {
                JobPrompt::EndOfInput => return Ok(()),
                JobPrompt::Declined => continue,
                JobPrompt::Ready(job) => {
                    let pipeline = DownloadPipeline::from_config(config.clone(), &tools).with_progress(!quiet);
                    match pipeline.run(&job).await {
                        Ok(summary) => summary.print(),
                        Err(e) => eprintln!("{} {:#}", style("Error:").red().bold(), e),
                    }
                    menu.pause("\nPress Enter to continue...")?;
                }
            },
        }
    }
}
