//! Core types for wishlist-dl

use std::path::PathBuf;

/// Sentinel used for any field the page did not contain
pub const MISSING: &str = "Missing";

/// Raw track-list fragment as found in an album page
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackListing {
    /// The page carried no track-list fragment; nothing downstream may run
    Missing,
    /// Undecoded fragment text (expected to be a JSON array)
    Found(String),
}

/// Metadata pulled out of one album page
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlbumMetadata {
    /// Artist name, or [`MISSING`]
    pub artist: String,
    /// Album title, or [`MISSING`]
    pub title: String,
    /// `"{artist} - {title}"` with illegal filename characters stripped
    pub folder_name: String,
    /// Embedded track list
    pub track_listing: TrackListing,
}

impl AlbumMetadata {
    /// Whether the page had no track list
    pub fn is_missing(&self) -> bool {
        self.track_listing == TrackListing::Missing
    }
}

/// One downloadable track
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackSpec {
    /// Sanitized `<title>.mp3`, unique within its album
    pub filename: String,
    /// Stream URL
    pub url: String,
}

/// A fully planned album, ready for the download phase
///
/// The track list is fixed once the job is built; the downloader only reads it.
#[derive(Clone, Debug)]
pub struct AlbumJob {
    /// Album page this job came from
    pub link: String,
    /// Extracted metadata
    pub metadata: AlbumMetadata,
    /// Album folder (created before the job is handed to the downloader)
    pub destination: PathBuf,
    /// Tracks in page order
    pub tracks: Vec<TrackSpec>,
}

impl AlbumJob {
    /// Path of the playlist manifest: `<destination>/<folder name>.m3u`
    pub fn manifest_path(&self) -> PathBuf {
        self.destination
            .join(format!("{}.m3u", self.metadata.folder_name))
    }

    /// Manifest body: track filenames joined by newlines, in plan order
    pub fn manifest_contents(&self) -> String {
        self.tracks
            .iter()
            .map(|t| t.filename.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Terminal state of one album in a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AlbumStatus {
    /// Page could not be fetched
    FetchFailed,
    /// Track list was present but undecodable
    ExtractFailed,
    /// Page had no track list
    MetadataMissing,
    /// Destination existence check or directory creation failed
    PlanFailed,
    /// Destination already existed (or was claimed earlier in this run)
    AlreadyDone,
    /// Every track reached a terminal state
    Completed,
}

impl AlbumStatus {
    /// Short lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            AlbumStatus::FetchFailed => "fetch_failed",
            AlbumStatus::ExtractFailed => "extract_failed",
            AlbumStatus::MetadataMissing => "missing",
            AlbumStatus::PlanFailed => "plan_failed",
            AlbumStatus::AlreadyDone => "already_done",
            AlbumStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for AlbumStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-album result of the download phase
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AlbumReport {
    /// Tracks written to disk
    pub downloaded: usize,
    /// Tracks abandoned after a stream or write error
    pub failed: usize,
    /// Bytes written across all successful tracks
    pub bytes: u64,
    /// Whether the playlist manifest was written
    pub manifest_written: bool,
}

/// What happened to one input link
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlbumOutcome {
    /// 1-based position in the input list
    pub index: usize,
    /// Album page
    pub link: String,
    /// Folder name, once extraction got that far
    pub folder_name: Option<String>,
    /// Terminal state
    pub status: AlbumStatus,
    /// Planned tracks
    pub tracks_total: usize,
    /// Download-phase results (zeroed unless `status` is `Completed`)
    pub report: AlbumReport,
    /// Error message for failed states
    pub error: Option<String>,
}

impl AlbumOutcome {
    pub(crate) fn new(index: usize, link: &str, status: AlbumStatus) -> Self {
        Self {
            index,
            link: link.to_string(),
            folder_name: None,
            status,
            tracks_total: 0,
            report: AlbumReport::default(),
            error: None,
        }
    }

    /// Name to show for this album: folder name if known, otherwise the link
    pub fn display_name(&self) -> &str {
        self.folder_name.as_deref().unwrap_or(&self.link)
    }
}

/// Totals for a whole run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Input links
    pub total: usize,
    /// Albums whose tracks were all attempted
    pub completed: usize,
    /// Albums skipped because their folder already existed
    pub already_done: usize,
    /// Pages without a track list
    pub missing: usize,
    /// Pages that could not be fetched
    pub fetch_failed: usize,
    /// Pages with an undecodable track list
    pub extract_failed: usize,
    /// Albums abandoned during planning
    pub plan_failed: usize,
    /// Tracks written
    pub tracks_downloaded: usize,
    /// Tracks abandoned
    pub tracks_failed: usize,
}

impl RunSummary {
    /// Fold one album outcome into the totals
    pub fn record(&mut self, outcome: &AlbumOutcome) {
        match outcome.status {
            AlbumStatus::FetchFailed => self.fetch_failed += 1,
            AlbumStatus::ExtractFailed => self.extract_failed += 1,
            AlbumStatus::MetadataMissing => self.missing += 1,
            AlbumStatus::PlanFailed => self.plan_failed += 1,
            AlbumStatus::AlreadyDone => self.already_done += 1,
            AlbumStatus::Completed => self.completed += 1,
        }
        self.tracks_downloaded += outcome.report.downloaded;
        self.tracks_failed += outcome.report.failed;
    }

    /// Albums that reached any terminal state
    pub fn finished(&self) -> usize {
        self.completed
            + self.already_done
            + self.missing
            + self.fetch_failed
            + self.extract_failed
            + self.plan_failed
    }
}

/// Progress events broadcast during a run
///
/// Subscribe with [`Pipeline::subscribe`](crate::Pipeline::subscribe). Events are
/// informational; dropping them does not affect the run.
#[derive(Clone, Debug)]
pub enum Event {
    /// Run accepted its link list
    RunStarted {
        /// Number of links
        total: usize,
    },

    /// Album page request is going out; sent once a fetch slot is held
    Fetching {
        /// 1-based input position
        index: usize,
        /// Number of links in the run
        total: usize,
        /// Album page
        link: String,
    },

    /// Album folder was created and track downloads are starting
    AlbumStarted {
        /// 1-based input position
        index: usize,
        /// Album folder name
        folder_name: String,
        /// Planned tracks
        tracks: usize,
    },

    /// One track was abandoned
    TrackFailed {
        /// Album folder name
        folder_name: String,
        /// Track filename
        filename: String,
        /// Error message
        error: String,
    },

    /// Album reached its terminal state
    AlbumFinished(AlbumOutcome),

    /// Every album reached a terminal state
    RunFinished(RunSummary),
}
