//! Output planning: destination paths and the idempotency gate.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::types::{AlbumMetadata, TrackSpec};

/// Outcome of planning one album
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlanResult {
    /// Destination is free; create it with
    /// [`create_destination`](OutputPlanner::create_destination) and download `tracks`
    Ready {
        /// Album folder to create
        destination: PathBuf,
        /// Tracks to download, in page order
        tracks: Vec<TrackSpec>,
    },
    /// Destination already exists, or another album in this run claimed it
    AlreadyDone(PathBuf),
    /// Page had no track list; nothing was checked
    Missing,
}

/// Maps album metadata to folders under the collection root
///
/// Holds the set of destinations claimed during the current run so that two albums
/// resolving to the same folder never write into it concurrently. Claims are
/// compared case-insensitively.
pub struct OutputPlanner {
    root: PathBuf,
    claimed: Mutex<HashSet<String>>,
}

impl OutputPlanner {
    /// Create a planner for albums under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            claimed: Mutex::new(HashSet::new()),
        }
    }

    /// Collection root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `root / folder_name`
    pub fn destination_for(&self, metadata: &AlbumMetadata) -> PathBuf {
        self.root.join(&metadata.folder_name)
    }

    /// Decide whether an album still needs downloading
    ///
    /// Performs no filesystem mutation. An I/O error while checking existence is
    /// returned so the caller can abandon the album.
    pub async fn plan(
        &self,
        metadata: &AlbumMetadata,
        tracks: Vec<TrackSpec>,
    ) -> std::io::Result<PlanResult> {
        if metadata.is_missing() {
            return Ok(PlanResult::Missing);
        }

        let destination = self.destination_for(metadata);
        if !self.claim(&metadata.folder_name) {
            debug!(album = %metadata.folder_name, "Destination already claimed in this run");
            return Ok(PlanResult::AlreadyDone(destination));
        }

        if tokio::fs::try_exists(&destination).await? {
            return Ok(PlanResult::AlreadyDone(destination));
        }

        Ok(PlanResult::Ready {
            destination,
            tracks,
        })
    }

    /// Create a planned album folder
    ///
    /// Uses `create_dir`, not `create_dir_all`: the collection root already exists and
    /// a folder appearing between planning and creation is reported as an error
    /// instead of being written into.
    pub async fn create_destination(&self, destination: &Path) -> std::io::Result<()> {
        tokio::fs::create_dir(destination).await
    }

    fn claim(&self, folder_name: &str) -> bool {
        let mut claimed = match self.claimed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        claimed.insert(folder_name.to_lowercase())
    }
}
