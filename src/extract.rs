//! Album page extraction.
//!
//! Album pages embed their metadata as script text:
//!
//! ```text
//! artist: "Foo",
//! album_title: "Bar",
//! trackinfo: [{"title":"Intro","file":{"mp3-128":"https://..."}}, ...],
//! ```
//!
//! Each field is matched independently and falls back to the `"Missing"` sentinel.
//! The track list is decoded strictly as JSON; page text is never evaluated.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use crate::error::ExtractError;
use crate::types::{AlbumMetadata, MISSING, TrackListing, TrackSpec};
use crate::utils::{claim_unique_filename, sanitize_name};

/// Quality tier downloaded for each track
pub const STREAM_QUALITY: &str = "mp3-128";

/// Extension given to every downloaded track
pub const TRACK_EXTENSION: &str = "mp3";

// The patterns are literals; a failure here is a programming error caught by tests.
#[allow(clippy::expect_used)]
static ARTIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"artist: "(.*?)""#).expect("artist pattern compiles"));

#[allow(clippy::expect_used)]
static ALBUM_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"album_title: "(.*?)""#).expect("album title pattern compiles")
});

#[allow(clippy::expect_used)]
static TRACKINFO_RE: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"trackinfo: (\[.*\])")
        .case_insensitive(true)
        .build()
        .expect("trackinfo pattern compiles")
});

/// One entry of the embedded track array
#[derive(Debug, Deserialize)]
struct TrackDescriptor {
    #[serde(default)]
    title: Option<String>,
    /// Quality tier -> URL; `null` for tracks that cannot be streamed
    #[serde(default)]
    file: Option<HashMap<String, Option<String>>>,
}

impl TrackDescriptor {
    fn stream_url(&self) -> Option<&str> {
        self.file
            .as_ref()?
            .get(STREAM_QUALITY)?
            .as_deref()
            .filter(|url| !url.trim().is_empty())
    }
}

/// Pull artist, title, and the raw track-list fragment out of page text
///
/// Never fails: absent fields become `"Missing"`, an absent track list becomes
/// [`TrackListing::Missing`]. The folder name is derived either way so that
/// missing albums still have a stable name for reporting.
pub fn extract(page: &str) -> AlbumMetadata {
    let artist = capture(&ARTIST_RE, page)
        .map(unescape_js_string)
        .unwrap_or_else(|| MISSING.to_string());
    let title = capture(&ALBUM_TITLE_RE, page)
        .map(unescape_js_string)
        .unwrap_or_else(|| MISSING.to_string());
    let folder_name = sanitize_name(&format!("{artist} - {title}"));
    let track_listing = match capture(&TRACKINFO_RE, page) {
        Some(fragment) => TrackListing::Found(fragment.to_string()),
        None => TrackListing::Missing,
    };

    AlbumMetadata {
        artist,
        title,
        folder_name,
        track_listing,
    }
}

/// Decode a track-list fragment into the download plan
///
/// Entries without a usable [`STREAM_QUALITY`] URL are dropped silently. Filenames
/// are sanitized and made unique within the album, in page order.
pub fn parse_track_list(fragment: &str) -> Result<Vec<TrackSpec>, ExtractError> {
    let descriptors: Vec<TrackDescriptor> =
        serde_json::from_str(fragment).map_err(|e| ExtractError::Malformed {
            reason: e.to_string(),
        })?;

    let mut taken = HashSet::new();
    let tracks = descriptors
        .iter()
        .filter_map(|descriptor| {
            let url = descriptor.stream_url()?;
            let stem = sanitize_name(descriptor.title.as_deref().unwrap_or_default());
            Some(TrackSpec {
                filename: claim_unique_filename(&stem, TRACK_EXTENSION, &mut taken),
                url: url.to_string(),
            })
        })
        .collect();

    Ok(tracks)
}

fn capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Decode JS string escapes (`\u0026`, `\/`) when the capture is a valid JSON string body
fn unescape_js_string(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.to_string())
}
