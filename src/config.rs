//! Configuration types for wishlist-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Where album folders are written
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Base directory (default: ".")
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Collection folder created under `root_dir` that holds one folder per album
    /// (default: "wishlist")
    #[serde(default = "default_collection_dir")]
    pub collection_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            collection_dir: default_collection_dir(),
        }
    }
}

/// Concurrency caps for the three pipeline phases
///
/// The caps are independent: a page fetch never waits on a track slot and vice versa.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Maximum album pages fetched at once (default: 2)
    #[serde(default = "default_max_fetches")]
    pub max_concurrent_fetches: usize,

    /// Maximum albums in the downloading state at once (default: 3)
    #[serde(default = "default_max_albums")]
    pub max_concurrent_albums: usize,

    /// Maximum track streams open at once, summed over all albums (default: 6)
    #[serde(default = "default_max_tracks")]
    pub max_concurrent_tracks: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_fetches(),
            max_concurrent_albums: default_max_albums(),
            max_concurrent_tracks: default_max_tracks(),
        }
    }
}

/// HTTP client settings shared by page fetches and track streams
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout for album pages (default: 30s)
    ///
    /// Track streams are not bounded by this timeout since files can be large;
    /// see `stream_idle_timeout`.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Longest a track stream may go without receiving data (default: 60s)
    #[serde(default = "default_stream_idle_timeout")]
    pub stream_idle_timeout: Duration,

    /// TCP/TLS connect timeout (default: 10s)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            stream_idle_timeout: default_stream_idle_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Where the link list comes from when no links are given explicitly
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputConfig {
    /// Saved wishlist page (default: "wishlist.html")
    #[serde(default = "default_wishlist_file")]
    pub wishlist_file: PathBuf,

    /// CSS class marking album anchors in the saved page (default: "fav-track-link")
    #[serde(default = "default_link_class")]
    pub link_class: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            wishlist_file: default_wishlist_file(),
            link_class: default_link_class(),
        }
    }
}

/// Main configuration for a wishlist run
///
/// Fields are organized into logical sub-configs:
/// - [`output`](OutputConfig): destination tree
/// - [`concurrency`](ConcurrencyConfig): fetch, album, and track caps
/// - [`http`](HttpConfig): client timeouts and identity
/// - [`input`](InputConfig): wishlist snapshot location
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Destination tree
    #[serde(default)]
    pub output: OutputConfig,

    /// Concurrency caps
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Wishlist snapshot input
    #[serde(default)]
    pub input: InputConfig,
}

impl Config {
    /// Directory holding one folder per album: `root_dir / collection_dir`
    pub fn collection_root(&self) -> PathBuf {
        self.output.root_dir.join(&self.output.collection_dir)
    }

    /// Reject settings the pipeline cannot run with
    ///
    /// A zero cap would make the corresponding semaphore block forever.
    pub fn validate(&self) -> Result<()> {
        let caps = [
            (
                "max_concurrent_fetches",
                self.concurrency.max_concurrent_fetches,
            ),
            (
                "max_concurrent_albums",
                self.concurrency.max_concurrent_albums,
            ),
            (
                "max_concurrent_tracks",
                self.concurrency.max_concurrent_tracks,
            ),
        ];
        for (key, value) in caps {
            if value == 0 {
                return Err(Error::Config {
                    message: format!("{key} must be at least 1"),
                    key: Some(key.to_string()),
                });
            }
        }

        if self.output.collection_dir.trim().is_empty() {
            return Err(Error::Config {
                message: "collection_dir must not be empty".to_string(),
                key: Some("collection_dir".to_string()),
            });
        }

        if self.http.stream_idle_timeout.is_zero() {
            return Err(Error::Config {
                message: "stream_idle_timeout must be greater than zero".to_string(),
                key: Some("stream_idle_timeout".to_string()),
            });
        }

        if self.input.link_class.trim().is_empty() {
            return Err(Error::Config {
                message: "link_class must not be empty".to_string(),
                key: Some("link_class".to_string()),
            });
        }

        Ok(())
    }
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_collection_dir() -> String {
    "wishlist".to_string()
}

fn default_max_fetches() -> usize {
    2
}

fn default_max_albums() -> usize {
    3
}

fn default_max_tracks() -> usize {
    6
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_stream_idle_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_user_agent() -> String {
    format!("wishlist-dl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_wishlist_file() -> PathBuf {
    PathBuf::from("wishlist.html")
}

fn default_link_class() -> String {
    "fav-track-link".to_string()
}
