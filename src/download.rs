//! Album download phase: playlist manifest and bounded parallel track streams.

use std::path::Path;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::{Semaphore, broadcast};
use tracing::{debug, info, warn};

use crate::error::StreamError;
use crate::source::HttpSource;
use crate::types::{AlbumJob, AlbumReport, Event, TrackSpec};
use crate::utils::partial_path;

/// Downloads the tracks of planned albums
///
/// The track semaphore is shared by every album in flight, so the cap bounds the
/// total number of open streams rather than the streams of one album.
#[derive(Clone)]
pub struct Downloader {
    source: Arc<dyn HttpSource>,
    track_limit: Arc<Semaphore>,
    event_tx: broadcast::Sender<Event>,
}

impl Downloader {
    /// Create a downloader allowing at most `track_limit` concurrent track streams
    pub fn new(
        source: Arc<dyn HttpSource>,
        track_limit: usize,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            source,
            track_limit: Arc::new(Semaphore::new(track_limit)),
            event_tx,
        }
    }

    /// Download every track of `job` into its destination folder
    ///
    /// Writes the playlist manifest first, then streams all tracks. Returns once every
    /// track has either been written or abandoned; a failed track is logged, reported
    /// as [`Event::TrackFailed`], and counted, but never stops its siblings.
    pub async fn download_album(&self, job: &AlbumJob) -> AlbumReport {
        let album = job.metadata.folder_name.as_str();
        let mut report = AlbumReport {
            manifest_written: self.write_manifest(job).await,
            ..Default::default()
        };

        let results = futures::future::join_all(
            job.tracks
                .iter()
                .map(|track| self.download_track(&job.destination, track)),
        )
        .await;

        for (track, result) in job.tracks.iter().zip(results) {
            match result {
                Ok(bytes) => {
                    report.downloaded += 1;
                    report.bytes += bytes;
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        album = %album,
                        track = %track.filename,
                        code = e.error_code(),
                        error = %e,
                        "Track download failed"
                    );
                    self.event_tx
                        .send(Event::TrackFailed {
                            folder_name: album.to_string(),
                            filename: track.filename.clone(),
                            error: e.to_string(),
                        })
                        .ok();
                }
            }
        }

        info!(
            album = %album,
            downloaded = report.downloaded,
            failed = report.failed,
            bytes = report.bytes,
            "Album download finished"
        );
        report
    }

    /// Write `<folder name>.m3u` listing the full plan
    async fn write_manifest(&self, job: &AlbumJob) -> bool {
        let path = job.manifest_path();
        match tokio::fs::write(&path, job.manifest_contents()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to write playlist manifest");
                false
            }
        }
    }

    /// Stream one track into `<destination>/<filename>`
    ///
    /// Bytes go to `<filename>.part` first and are renamed into place on success, so a
    /// track file only ever exists complete. The partial file is removed on failure.
    async fn download_track(
        &self,
        destination: &Path,
        track: &TrackSpec,
    ) -> Result<u64, StreamError> {
        let _permit = self
            .track_limit
            .acquire()
            .await
            .map_err(|_| StreamError::Transport {
                url: track.url.clone(),
                message: "track limiter closed".to_string(),
            })?;

        let final_path = destination.join(&track.filename);
        let part_path = partial_path(&final_path);
        debug!(track = %track.filename, url = %track.url, "Streaming track");

        let result = self.stream_into(&track.url, &part_path).await;
        let result = match result {
            Ok(bytes) => tokio::fs::rename(&part_path, &final_path)
                .await
                .map(|()| bytes)
                .map_err(|source| StreamError::Write {
                    path: final_path.clone(),
                    source,
                }),
            Err(e) => Err(e),
        };

        if result.is_err() {
            // Best effort; the file may never have been created
            let _ = tokio::fs::remove_file(&part_path).await;
        }
        result
    }

    async fn stream_into(&self, url: &str, part_path: &Path) -> Result<u64, StreamError> {
        let write_err = |source: std::io::Error| StreamError::Write {
            path: part_path.to_path_buf(),
            source,
        };

        let mut file = tokio::fs::File::create(part_path).await.map_err(write_err)?;
        let bytes = self.source.stream_to(url, part_path, &mut file).await?;
        file.flush().await.map_err(write_err)?;
        file.sync_all().await.map_err(write_err)?;
        Ok(bytes)
    }
}
