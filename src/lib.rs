//! # wishlist-dl
//!
//! Bulk downloader for a wishlist of album pages.
//!
//! Every album page is fetched, its embedded artist, title and track list are
//! extracted, and the tracks are streamed into `<root>/wishlist/<Artist> - <Title>/`
//! together with an `.m3u` playlist. Albums whose folder already exists are skipped,
//! so a run can be repeated safely.
//!
//! Three independent limits bound the work in flight: page fetches, albums
//! downloading, and track streams (shared across all albums).
//!
//! ## Quick Start
//!
//! ```no_run
//! use wishlist_dl::{Config, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::new(Config::default())?;
//!
//!     let mut events = pipeline.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = pipeline
//!         .run(vec!["https://artist.example/album/first".to_string()])
//!         .await?;
//!     println!("{} albums completed", summary.completed);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Album download phase
pub mod download;
/// Error types
pub mod error;
/// Album page extraction
pub mod extract;
/// Bounded album page fetching
pub mod fetch;
/// Link list input
pub mod input;
/// Run orchestration
pub mod pipeline;
/// Destination planning and idempotency
pub mod planner;
/// HTTP access
pub mod source;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{ConcurrencyConfig, Config, HttpConfig, InputConfig, OutputConfig};
pub use error::{Error, ExtractError, FetchError, Result, StreamError};
pub use input::{load_links, parse_wishlist_links};
pub use pipeline::Pipeline;
pub use source::{HttpSource, ReqwestSource};
pub use types::{
    AlbumJob, AlbumMetadata, AlbumOutcome, AlbumReport, AlbumStatus, Event, RunSummary,
    TrackListing, TrackSpec,
};
