//! Command-line front-end: `run` scrapes one channel to a file, `serve` starts the web UI.

use crate::config::{API_KEY_ENV, ApiKey, ScraperConfig};
use crate::error::ScrapeError;
use crate::export::{default_file_name, export_to_path};
use crate::pipeline::{Progress, Scraper};
use crate::quota::DEFAULT_DAILY_BUDGET;
use crate::web::{self, AppState};
use clap::{Args, Parser, Subcommand};
use eyre::Context;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Export every video of a YouTube channel, with transcripts, to CSV
#[derive(Debug, Parser)]
#[command(name = "youtube-scraper", version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scrape one channel into a CSV file
    Run(RunArgs),
    /// Serve the web UI
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:5000")]
        bind: SocketAddr,
    },
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Channel URL (`/channel/`, `/@handle`, `/c/`, `/user/`), `@handle`, or channel id
    pub channel: String,

    /// YouTube Data API v3 key
    #[arg(long, env = API_KEY_ENV, hide_env_values = true, value_parser = parse_api_key)]
    pub api_key: ApiKey,

    /// Where to write the CSV [default: youtube_channel_<id>_<timestamp>.csv]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Preferred transcript language; repeat to add fallbacks
    #[arg(long = "language", value_name = "CODE", default_value = "en")]
    pub languages: Vec<String>,

    /// Quota units this run may spend
    #[arg(long, default_value_t = DEFAULT_DAILY_BUDGET)]
    pub quota_budget: u64,
}

fn parse_api_key(s: &str) -> Result<ApiKey, String> {
    ApiKey::new(s).ok_or_else(|| "the API key must not be empty".to_string())
}

/// Scrapes the channel and writes its CSV.
///
/// A channel without videos produces no file.
pub async fn run(args: RunArgs) -> eyre::Result<()> {
    run_with_config(args, ScraperConfig::from_env()).await
}

/// Like [`run`], on top of an explicit base configuration.
///
/// The arguments' languages and quota budget take precedence over `base`.
pub async fn run_with_config(args: RunArgs, base: ScraperConfig) -> eyre::Result<()> {
    let config = ScraperConfig {
        languages: args.languages,
        quota_budget: args.quota_budget,
        ..base
    };
    let scraper = Scraper::from_config(args.api_key, &config).context("set up HTTP clients")?;

    let scrape = scraper
        .scrape(&args.channel, log_progress)
        .await
        .wrap_err_with(|| format!("scrape {}", args.channel))?;

    if scrape.records.is_empty() {
        tracing::warn!(channel_id = %scrape.channel.id, "no videos found; not writing a CSV");
        return Ok(());
    }

    let path = args
        .output
        .unwrap_or_else(|| default_file_name(&scrape.channel.id));
    let rows = export_to_path(&path, &scrape.records)
        .await
        .wrap_err_with(|| format!("write {}", path.display()))?;
    let with_transcript = scrape
        .records
        .iter()
        .filter(|r| r.transcript.is_available())
        .count();
    tracing::info!(
        path = %path.display(),
        rows,
        with_transcript,
        "exported {}",
        scrape.channel.title
    );
    Ok(())
}

fn log_progress(progress: Progress) {
    match progress {
        Progress::Resolved { channel_id, title } => {
            tracing::info!(%channel_id, "found channel {title}");
        }
        Progress::Listing { found } => tracing::info!(found, "listing videos"),
        Progress::Listed { total } => tracing::info!(total, "fetching video details"),
        Progress::Video {
            index,
            total,
            title,
            transcript_available,
        } => {
            tracing::info!(transcript_available, "[{index}/{total}] {title}");
        }
    }
}

/// Binds `addr` and serves the web UI until the listener fails.
pub async fn serve(addr: SocketAddr) -> eyre::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("bind to {addr}"))?;
    web::serve(listener, Arc::new(AppState::from_env())).await
}

/// Exit code clap uses for usage errors, such as a missing API key.
pub const EXIT_USAGE: u8 = 2;
pub const EXIT_RESOLUTION: u8 = 3;
pub const EXIT_AUTH: u8 = 4;
pub const EXIT_QUOTA: u8 = 5;
pub const EXIT_EXPORT: u8 = 6;

/// Maps a failed run onto the process exit code for its failure kind.
///
/// Every kind gets a code of its own; [`EXIT_USAGE`] stays clap's.
pub fn exit_code(report: &eyre::Report) -> ExitCode {
    ExitCode::from(exit_status(report))
}

fn exit_status(report: &eyre::Report) -> u8 {
    let kind = report
        .chain()
        .find_map(|e| e.downcast_ref::<ScrapeError>());
    match kind {
        Some(ScrapeError::Resolution(_)) => EXIT_RESOLUTION,
        Some(ScrapeError::Auth(_)) => EXIT_AUTH,
        Some(ScrapeError::QuotaExceeded(_)) => EXIT_QUOTA,
        Some(ScrapeError::Export(_)) => EXIT_EXPORT,
        _ => 1,
    }
}
