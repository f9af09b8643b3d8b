//! Binary entrypoint for the panorama slideshow.
//!
//! Runs the playback controller headless: commands come from stdin and the
//! render surfaces are reported through the log.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use panorama_slideshow::catalog::MediaCatalog;
use panorama_slideshow::config::{
    DEFAULT_SETTINGS_FILE, SettingsProvider, ViewerSettings, YamlSettingsFile,
};
use panorama_slideshow::headless;
use panorama_slideshow::tasks::{controller::PlaybackController, input};
use tokio::io::{BufReader, stdin};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// Panorama slideshow
#[derive(Debug, Parser)]
#[command(name = "panorama-slideshow", about = "360° image and video slideshow")]
struct Cli {
    /// Path to YAML settings file (created with defaults when missing)
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,

    /// Override the media directory
    #[arg(long, value_name = "DIR")]
    media_dir: Option<PathBuf>,

    /// Print the catalog and exit
    #[arg(long)]
    list: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("panorama_slideshow={level}").parse()?);
    fmt().with_env_filter(filter).with_target(true).compact().init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    let result = runtime.block_on(run(cli));
    // A stdin read may still be parked on a blocking thread; don't wait for it.
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}

async fn run(cli: Cli) -> Result<()> {
    let store = YamlSettingsFile::new(&cli.settings);
    let mut settings = store
        .load(ViewerSettings::default())
        .with_context(|| format!("loading settings from {}", cli.settings.display()))?;
    if let Some(dir) = cli.media_dir {
        settings.media_dir = dir;
    }
    let media_dir = store.resolve(&settings.media_dir);
    let catalog = MediaCatalog::scan_dir(&media_dir, &settings);

    if cli.list {
        let catalog = catalog?;
        for entry in catalog.iter() {
            println!("{:?}\t{}", entry.kind(), entry.path().display());
        }
        return Ok(());
    }

    match &catalog {
        Ok(catalog) => info!(count = catalog.len(), dir = %media_dir.display(), "catalog ready"),
        Err(err) => warn!(error = %err, "catalog unavailable"),
    }

    let cancel = CancellationToken::new();
    let (input_tx, input_rx) = mpsc::channel(16);
    // Headless mode has no video source to report back.
    let (_video_tx, video_rx) = mpsc::channel(16);

    // Ctrl-C → cancel
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("ctrl-c received; shutting down");
                cancel.cancel();
            }
        });
    }

    let input_task = tokio::spawn(input::run(
        BufReader::new(stdin()),
        input_tx,
        cancel.clone(),
    ));

    let controller = PlaybackController::new(settings, catalog, headless::collaborators());
    controller.run(input_rx, video_rx, cancel.clone()).await?;

    cancel.cancel();
    input_task.abort();
    info!("slideshow stopped");
    Ok(())
}
