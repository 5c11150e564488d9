//! wishlist-dl - download every album on a wishlist.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use wishlist_dl::{AlbumOutcome, AlbumStatus, Config, Event, Pipeline, RunSummary, load_links};

/// Bulk album downloader.
///
/// Downloads the albums given as arguments, or every album linked from a saved
/// wishlist page when no links are given.
#[derive(Parser)]
#[command(name = "wishlist-dl", version, about = "Bulk album downloader")]
struct Cli {
    /// Album page links (overrides the wishlist snapshot).
    links: Vec<String>,

    /// Directory holding the `wishlist/` collection folder.
    #[arg(long, env = "WISHLIST_DL_ROOT", default_value = ".")]
    root: PathBuf,

    /// Saved wishlist page to read links from.
    #[arg(long, env = "WISHLIST_DL_SNAPSHOT", default_value = "wishlist.html")]
    wishlist: PathBuf,

    /// Maximum album pages fetched at once.
    #[arg(long)]
    fetch_limit: Option<usize>,

    /// Maximum albums downloading at once.
    #[arg(long)]
    album_limit: Option<usize>,

    /// Maximum track streams open at once, across all albums.
    #[arg(long)]
    track_limit: Option<usize>,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> (Config, Vec<String>) {
        let mut config = Config::default();
        config.output.root_dir = self.root;
        config.input.wishlist_file = self.wishlist;
        if let Some(limit) = self.fetch_limit {
            config.concurrency.max_concurrent_fetches = limit;
        }
        if let Some(limit) = self.album_limit {
            config.concurrency.max_concurrent_albums = limit;
        }
        if let Some(limit) = self.track_limit {
            config.concurrency.max_concurrent_tracks = limit;
        }
        (config, self.links)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "wishlist_dl=debug"
    } else {
        "wishlist_dl=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let (config, args) = cli.into_config();
    let links = load_links(args, &config.input)
        .await
        .context("Failed to load album links")?;
    let pipeline = Pipeline::new(config).context("Invalid configuration")?;

    let mut events = pipeline.subscribe();
    let renderer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(line) = render(&event) {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Progress output fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let result = pipeline.run(links).await;
    drop(pipeline);
    renderer.await.ok();

    result.context("Run could not start")?;
    Ok(())
}

/// Progress line for one event, if it has one
fn render(event: &Event) -> Option<String> {
    match event {
        Event::RunStarted { total } => Some(format!(
            "\nProcessing {total} album(s)...\n*************\n*"
        )),
        Event::Fetching { index, total, link } => {
            Some(format!("Scanning: ({index}/{total}) {link}"))
        }
        Event::AlbumStarted {
            folder_name,
            tracks,
            ..
        } => Some(format!("* {folder_name} ({tracks} tracks)")),
        Event::TrackFailed {
            folder_name,
            filename,
            error,
        } => Some(format!("  ! {folder_name}/{filename}: {error}")),
        Event::AlbumFinished(outcome) => Some(render_outcome(outcome)),
        Event::RunFinished(summary) => Some(render_summary(summary)),
    }
}

fn render_outcome(outcome: &AlbumOutcome) -> String {
    let name = outcome.display_name();
    match outcome.status {
        AlbumStatus::Completed if outcome.report.failed > 0 => format!(
            "* {name} ✓ ({} of {} tracks failed)",
            outcome.report.failed, outcome.tracks_total
        ),
        AlbumStatus::Completed => format!("* {name} ✓"),
        AlbumStatus::MetadataMissing => format!("* {name} ⨯"),
        AlbumStatus::AlreadyDone => format!("* {name} O"),
        AlbumStatus::FetchFailed | AlbumStatus::ExtractFailed | AlbumStatus::PlanFailed => {
            format!(
                "* {name} {}: {}",
                outcome.status,
                outcome.error.as_deref().unwrap_or("unknown error")
            )
        }
    }
}

fn render_summary(summary: &RunSummary) -> String {
    format!(
        "*\n*************\nProcessing complete! {} downloaded, {} already done, {} missing, {} failed ({} tracks, {} track failures)",
        summary.completed,
        summary.already_done,
        summary.missing,
        summary.fetch_failed + summary.extract_failed + summary.plan_failed,
        summary.tracks_downloaded,
        summary.tracks_failed
    )
}
