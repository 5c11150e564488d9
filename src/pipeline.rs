//! Pipeline orchestration. Drives every link from fetch to terminal state.
//!
//! Each link runs as its own task through these phases:
//!
//! ```text
//! Queued -> Fetching -> Extracting -> Planning -> Downloading -> Completed
//!              |            |            |
//!         FetchFailed  ExtractFailed  AlreadyDone / PlanFailed
//!                      MetadataMissing
//! ```
//!
//! Scheduling is event driven: a task blocks on the fetch semaphore, then (if it got a
//! plan) on the album semaphore, and every released permit wakes the next waiter. The
//! run ends when every task has returned its [`AlbumOutcome`].

use std::sync::Arc;

use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::download::Downloader;
use crate::error::{Error, Result};
use crate::extract::{extract, parse_track_list};
use crate::fetch::Fetcher;
use crate::planner::{OutputPlanner, PlanResult};
use crate::source::{HttpSource, ReqwestSource};
use crate::types::{AlbumJob, AlbumOutcome, AlbumStatus, Event, RunSummary, TrackListing};

/// Capacity of the progress event channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Shared handles for a single album task, cloned into each spawned task.
#[derive(Clone)]
struct AlbumTaskContext {
    fetcher: Fetcher,
    planner: Arc<OutputPlanner>,
    downloader: Downloader,
    album_limit: Arc<Semaphore>,
    event_tx: broadcast::Sender<Event>,
}

/// End-to-end runner for one wishlist
///
/// Owns the three concurrency limiters (page fetches, albums downloading, track
/// streams) for the lifetime of the run; nothing is global.
pub struct Pipeline {
    config: Arc<Config>,
    ctx: AlbumTaskContext,
}

impl Pipeline {
    /// Build a pipeline talking to the network through `reqwest`
    pub fn new(config: Config) -> Result<Self> {
        let source = Arc::new(ReqwestSource::new(&config.http)?);
        Self::with_source(config, source)
    }

    /// Build a pipeline on top of any [`HttpSource`]
    pub fn with_source(config: Config, source: Arc<dyn HttpSource>) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let limits = &config.concurrency;
        let ctx = AlbumTaskContext {
            fetcher: Fetcher::new(Arc::clone(&source), limits.max_concurrent_fetches),
            planner: Arc::new(OutputPlanner::new(config.collection_root())),
            downloader: Downloader::new(
                Arc::clone(&source),
                limits.max_concurrent_tracks,
                event_tx.clone(),
            ),
            album_limit: Arc::new(Semaphore::new(limits.max_concurrent_albums)),
            event_tx,
        };

        Ok(Self {
            config: Arc::new(config),
            ctx,
        })
    }

    /// Subscribe to progress events
    ///
    /// Subscribe before calling [`run`](Self::run) to see the start banner.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.ctx.event_tx.subscribe()
    }

    /// Configuration this pipeline was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process every link and return the run totals
    ///
    /// Only failing to create the collection root is an error; every per-album
    /// failure is recorded in the summary instead.
    pub async fn run(&self, links: Vec<String>) -> Result<RunSummary> {
        let root = self.ctx.planner.root().to_path_buf();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create collection directory '{}': {}",
                    root.display(),
                    e
                ),
            ))
        })?;

        let total = links.len();
        let mut summary = RunSummary {
            total,
            ..Default::default()
        };
        info!(total, root = %root.display(), "Run started");
        self.ctx.event_tx.send(Event::RunStarted { total }).ok();

        let mut tasks = JoinSet::new();
        for (i, link) in links.into_iter().enumerate() {
            let ctx = self.ctx.clone();
            tasks.spawn(async move {
                let index = i + 1;
                let outcome = process_album(&ctx, index, total, link).await;
                ctx.event_tx
                    .send(Event::AlbumFinished(outcome.clone()))
                    .ok();
                outcome
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => summary.record(&outcome),
                Err(e) => error!(error = %e, "Album task panicked"),
            }
        }

        info!(
            completed = summary.completed,
            already_done = summary.already_done,
            missing = summary.missing,
            fetch_failed = summary.fetch_failed,
            extract_failed = summary.extract_failed,
            plan_failed = summary.plan_failed,
            tracks_downloaded = summary.tracks_downloaded,
            tracks_failed = summary.tracks_failed,
            "Run finished"
        );
        self.ctx.event_tx.send(Event::RunFinished(summary)).ok();
        Ok(summary)
    }
}

/// Run one link through fetch, extraction, planning, and download
async fn process_album(
    ctx: &AlbumTaskContext,
    index: usize,
    total: usize,
    link: String,
) -> AlbumOutcome {
    let announce = || {
        ctx.event_tx
            .send(Event::Fetching {
                index,
                total,
                link: link.clone(),
            })
            .ok();
    };

    let page = match ctx.fetcher.fetch_with(&link, announce).await {
        Ok(page) => page,
        Err(e) => {
            let mut outcome = AlbumOutcome::new(index, &link, AlbumStatus::FetchFailed);
            outcome.error = Some(e.to_string());
            return outcome;
        }
    };

    let metadata = extract(&page);
    drop(page);
    let mut outcome = AlbumOutcome::new(index, &link, AlbumStatus::MetadataMissing);
    outcome.folder_name = Some(metadata.folder_name.clone());

    let tracks = match &metadata.track_listing {
        TrackListing::Missing => {
            info!(link = %link, album = %metadata.folder_name, "No track list on page");
            return outcome;
        }
        TrackListing::Found(fragment) => match parse_track_list(fragment) {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!(
                    link = %link,
                    album = %metadata.folder_name,
                    code = e.error_code(),
                    error = %e,
                    "Track list could not be decoded"
                );
                outcome.status = AlbumStatus::ExtractFailed;
                outcome.error = Some(e.to_string());
                return outcome;
            }
        },
    };
    outcome.tracks_total = tracks.len();

    let (destination, tracks) = match ctx.planner.plan(&metadata, tracks).await {
        Ok(PlanResult::Ready {
            destination,
            tracks,
        }) => (destination, tracks),
        Ok(PlanResult::AlreadyDone(destination)) => {
            info!(album = %metadata.folder_name, path = %destination.display(), "Already downloaded, skipping");
            outcome.status = AlbumStatus::AlreadyDone;
            return outcome;
        }
        Ok(PlanResult::Missing) => return outcome,
        Err(e) => {
            warn!(album = %metadata.folder_name, error = %e, "Planning failed");
            outcome.status = AlbumStatus::PlanFailed;
            outcome.error = Some(e.to_string());
            return outcome;
        }
    };

    let _album_permit = match ctx.album_limit.acquire().await {
        Ok(permit) => permit,
        Err(e) => {
            outcome.status = AlbumStatus::PlanFailed;
            outcome.error = Some(e.to_string());
            return outcome;
        }
    };

    if let Err(e) = ctx.planner.create_destination(&destination).await {
        warn!(path = %destination.display(), error = %e, "Failed to create album folder");
        outcome.status = AlbumStatus::PlanFailed;
        outcome.error = Some(e.to_string());
        return outcome;
    }

    ctx.event_tx
        .send(Event::AlbumStarted {
            index,
            folder_name: metadata.folder_name.clone(),
            tracks: tracks.len(),
        })
        .ok();

    let job = AlbumJob {
        link,
        metadata,
        destination,
        tracks,
    };
    outcome.report = ctx.downloader.download_album(&job).await;
    outcome.status = AlbumStatus::Completed;
    outcome
}
