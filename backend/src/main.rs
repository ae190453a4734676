//! yt-mini - terminal front-end for the download core
//!
//! Drives the same library a GUI would: builds a batch from the command line,
//! streams status and progress to the terminal and cancels on Ctrl-C.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use yt_mini::config::{self, AppPaths, Settings};
use yt_mini::download::{
    self, BatchOutcome, BatchRunner, Container, DownloadOptions, DownloadReporter, Mode,
    StatusLevel,
};
use yt_mini::history::HistoryStore;
use yt_mini::tools;

#[derive(Parser)]
#[command(name = "yt-mini", version, about = "Download videos and audio with yt-dlp")]
struct Cli {
    /// Directory holding config.txt, history.json and debug.log
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Also print debug logs to the terminal
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download one or more URLs, one after another
    Download(DownloadArgs),

    /// Show or edit the download history
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },

    /// Show or edit settings
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Look for yt-dlp and ffmpeg on this machine
    Detect {
        /// Store the detected paths in the config file
        #[arg(long)]
        save: bool,
    },

    /// Update yt-dlp in place
    Update,

    /// Delete config, history and log files
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args)]
struct DownloadArgs {
    urls: Vec<String>,

    /// Text file with one URL per line
    #[arg(short, long)]
    batch_file: Option<PathBuf>,

    /// Extract audio instead of downloading video
    #[arg(short, long)]
    audio: bool,

    /// Download the whole playlist into its own folder
    #[arg(short, long)]
    playlist: bool,

    /// Fetch English and original-language subtitles
    #[arg(short, long)]
    subs: bool,

    /// Custom output filename template
    #[arg(short, long)]
    template: Option<String>,

    /// 144, 240, 360, 720, 1440, 2k, 4k or best
    #[arg(short, long, default_value = "720")]
    quality: String,

    /// Container preference, "MP4 (H264)" or "WebM (VP9)"
    #[arg(long, default_value = "MP4 (H264)")]
    format: String,

    /// Audio codec and quality, e.g. "Opus - High Quality"
    #[arg(long, default_value = "MP3 - High Quality")]
    audio_format: String,

    #[arg(long)]
    artist: Option<String>,

    #[arg(long)]
    album: Option<String>,

    /// Output folder (defaults to the configured download path)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log the yt-dlp command line and save it to last_command.txt
    #[arg(long)]
    debug: bool,
}

#[derive(Subcommand)]
enum HistoryAction {
    List,
    /// Forget one entry (the file stays on disk)
    Remove { path: String },
    /// Forget all entries (files stay on disk)
    Clear,
    /// Open a downloaded file
    Open { path: PathBuf },
    /// Open the folder containing a downloaded file
    Reveal { path: PathBuf },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    Set { key: String, value: String },
    ToggleTheme,
}

/// Prints runner callbacks to the terminal
struct TerminalReporter;

impl DownloadReporter for TerminalReporter {
    fn status(&self, text: &str, level: StatusLevel) {
        match level {
            StatusLevel::Error | StatusLevel::Warning => eprintln!("\n{}", text),
            _ => println!("{}", text),
        }
    }

    fn progress(&self, percent: f64) {
        let filled = (percent / 5.0).round() as usize;
        let mut out = std::io::stdout();
        let _ = write!(
            out,
            "\r[{}{}] {:5.1}%",
            "#".repeat(filled),
            " ".repeat(20 - filled.min(20)),
            percent
        );
        let _ = out.flush();
    }

    fn history_changed(&self) {
        println!();
    }

    fn finished(&self, outcome: &BatchOutcome) {
        println!("\n{}", outcome.message());
    }
}

fn init_logging(paths: &AppPaths, verbose: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = paths
        .ensure_root()
        .ok()
        .and_then(|_| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(paths.log_file())
                .ok()
        })
        .map(|file| {
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Arc::new(file))
                .with_filter(env_filter)
        });

    let terminal_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let terminal_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(terminal_level);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(terminal_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let paths = cli.data_dir.map(AppPaths::new).unwrap_or_default();

    init_logging(&paths, cli.verbose);
    info!("Starting yt-mini v{}", env!("CARGO_PKG_VERSION"));

    let mut settings = config::load_or_default(&paths);
    let history = HistoryStore::new(paths.history_file());

    match cli.command {
        Commands::Download(args) => return download(args, &paths, &settings, history).await,
        Commands::History { action } => {
            run_history(action.unwrap_or(HistoryAction::List), &history)?
        }
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => {
                print!("{}", settings.render());
                if !settings.tools_configured() {
                    eprintln!(
                        "Warning: yt-dlp or ffmpeg is not configured (run `yt-mini detect --save`)"
                    );
                }
            }
            ConfigAction::Set { key, value } => {
                settings.set(&key, value.trim())?;
                config::save(&paths, &settings)?;
            }
            ConfigAction::ToggleTheme => {
                settings.theme = settings.theme.toggled();
                config::save(&paths, &settings)?;
                println!("theme={}", settings.theme);
            }
        },
        Commands::Detect { save } => detect(save, &paths, &mut settings)?,
        Commands::Update => {
            tools::update_ytdlp(&PathBuf::from(&settings.ytdlp_path))
                .await
                .context("yt-dlp update failed")?;
            println!("yt-dlp update command sent.");
        }
        Commands::Reset { yes } => {
            if !yes {
                bail!("refusing to delete settings and history without --yes");
            }
            config::factory_reset(&paths)?;
            println!("Settings and history removed.");
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn download(
    args: DownloadArgs,
    paths: &AppPaths,
    settings: &Settings,
    history: HistoryStore,
) -> Result<ExitCode> {
    let mut urls: Vec<String> = args
        .urls
        .iter()
        .filter(|u| !u.trim().is_empty())
        .map(|u| download::normalize_url(u))
        .collect();
    if let Some(file) = &args.batch_file {
        let batch = download::read_batch_file(file)
            .with_context(|| format!("reading batch file {:?}", file))?;
        println!("Loaded {} URLs", batch.len());
        urls.extend(batch);
    }

    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    let options = DownloadOptions {
        mode: if args.audio { Mode::Audio } else { Mode::Video },
        playlist: args.playlist,
        subtitles: args.subs,
        custom_template: args.template.as_deref().and_then(non_empty),
        quality: args.quality,
        container: Container::from_label(&args.format),
        audio_format: args.audio_format,
        artist: args.artist.as_deref().and_then(non_empty),
        album: args.album.as_deref().and_then(non_empty),
        ytdlp_path: PathBuf::from(&settings.ytdlp_path),
        ffmpeg_path: non_empty(&settings.ffmpeg_path).map(PathBuf::from),
        output_dir: args.output.unwrap_or_else(|| settings.download_path.clone()),
        debug: args.debug,
    };

    let runner = BatchRunner::with_command_log(history, paths.last_command_file());
    let handle = runner.spawn(urls, options, Arc::new(TerminalReporter));

    let canceller = runner.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if canceller.cancel() {
                eprintln!("\nCancelling current download...");
            } else {
                std::process::exit(130);
            }
        }
    });

    let outcome = handle.await.context("download task panicked")??;
    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_history(action: HistoryAction, history: &HistoryStore) -> Result<()> {
    match action {
        HistoryAction::List => {
            let entries = history.load();
            if entries.is_empty() {
                println!("No recent downloads.");
            }
            for entry in entries {
                println!(
                    "{}  [{} | {}]\n    {}",
                    entry.title, entry.duration, entry.size, entry.path
                );
            }
        }
        HistoryAction::Remove { path } => {
            if !history.remove(&path)? {
                bail!("no history entry for {}", path);
            }
        }
        HistoryAction::Clear => history.clear()?,
        HistoryAction::Open { path } => tools::open_file(&path)?,
        HistoryAction::Reveal { path } => tools::reveal(&path)?,
    }
    Ok(())
}

fn detect(save: bool, paths: &AppPaths, settings: &mut Settings) -> Result<()> {
    let ytdlp = tools::detect_ytdlp();
    match &ytdlp {
        Some(path) => println!("yt-dlp: {}", path.display()),
        None => println!("yt-dlp: not found"),
    }

    let ffmpeg_paths = tools::detect_ffmpeg();
    for path in &ffmpeg_paths {
        println!("ffmpeg candidate: {}", path.display());
    }
    let ffmpeg = tools::preferred_ffmpeg(&ffmpeg_paths);
    match ffmpeg {
        Some(path) => println!("ffmpeg: {}", path.display()),
        None => println!("ffmpeg: not found"),
    }

    if save {
        if let Some(path) = ytdlp {
            settings.ytdlp_path = path.to_string_lossy().into_owned();
        }
        if let Some(path) = ffmpeg {
            settings.ffmpeg_path = path.to_string_lossy().into_owned();
        }
        config::save(paths, settings)?;
        info!("Saved detected tool paths");
    }

    Ok(())
}
