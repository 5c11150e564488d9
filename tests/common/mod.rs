//! Common test utilities for wishlist-dl integration tests

#[allow(dead_code)]
pub mod site;

pub use site::*;

use std::path::Path;

use wishlist_dl::{ConcurrencyConfig, Config, OutputConfig};

/// Config writing under `root` with the given fetch/album/track caps
pub fn test_config(root: &Path, fetches: usize, albums: usize, tracks: usize) -> Config {
    Config {
        output: OutputConfig {
            root_dir: root.to_path_buf(),
            collection_dir: "wishlist".to_string(),
        },
        concurrency: ConcurrencyConfig {
            max_concurrent_fetches: fetches,
            max_concurrent_albums: albums,
            max_concurrent_tracks: tracks,
        },
        ..Default::default()
    }
}
