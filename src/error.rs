//! Error types for wishlist-dl
//!
//! This module provides the error handling for the library:
//! - A crate-level [`Error`] for startup and configuration failures
//! - Per-item error types ([`FetchError`], [`ExtractError`], [`StreamError`]) that are
//!   recorded in album outcomes instead of aborting the run
//! - Machine-readable error codes for structured log fields

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for wishlist-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for wishlist-dl
///
/// Only startup failures (unreadable input, unusable output root, HTTP client
/// construction) are surfaced through this type to the invoker. Everything that
/// can go wrong for a single album is captured by the per-item types below.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_fetches")
        key: Option<String>,
    },

    /// Input link source could not be read
    #[error("cannot read input {path}: {reason}")]
    Input {
        /// The snapshot file that was requested
        path: PathBuf,
        /// Why it could not be used
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

}

/// Failure to retrieve the text of one album page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The link is not a usable absolute http(s) URL
    #[error("invalid link '{url}': {reason}")]
    InvalidUrl {
        /// The offending link
        url: String,
        /// Parser message
        reason: String,
    },

    /// Connection, TLS, or timeout failure
    #[error("request to {url} failed: {message}")]
    Transport {
        /// Requested URL
        url: String,
        /// Transport error message
        message: String,
    },

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status {
        /// Requested URL
        url: String,
        /// Response status code
        status: u16,
    },

    /// Response body could not be read as text
    #[error("failed to read body from {url}: {message}")]
    Body {
        /// Requested URL
        url: String,
        /// Decoder message
        message: String,
    },
}

/// Failure to decode the embedded track list of an album page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// Track fragment was present but is not a JSON array of track descriptors
    #[error("malformed track list: {reason}")]
    Malformed {
        /// Decoder message
        reason: String,
    },
}

/// Failure to stream one track to disk
#[derive(Debug, Error)]
pub enum StreamError {
    /// Connection, TLS, timeout, or mid-body transport failure
    #[error("stream from {url} failed: {message}")]
    Transport {
        /// Track URL
        url: String,
        /// Transport error message
        message: String,
    },

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status {
        /// Track URL
        url: String,
        /// Response status code
        status: u16,
    },

    /// Destination file could not be created, written, or renamed
    #[error("cannot write {path}: {source}")]
    Write {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Machine-readable error code, used as a structured log field
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Input { .. } => "input_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
        }
    }
}

impl FetchError {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            FetchError::InvalidUrl { .. } => "invalid_url",
            FetchError::Transport { .. } => "fetch_transport",
            FetchError::Status { .. } => "fetch_status",
            FetchError::Body { .. } => "fetch_body",
        }
    }
}

impl ExtractError {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            ExtractError::Malformed { .. } => "malformed_track_list",
        }
    }
}

impl StreamError {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            StreamError::Transport { .. } => "stream_transport",
            StreamError::Status { .. } => "stream_status",
            StreamError::Write { .. } => "stream_write",
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Every Error variant -> correct machine-readable error code
    // -----------------------------------------------------------------------

    fn all_error_variants() -> Vec<(Error, &'static str)> {
        vec![
            (
                Error::Config {
                    message: "bad value".into(),
                    key: Some("max_concurrent_fetches".into()),
                },
                "config_error",
            ),
            (
                Error::Input {
                    path: PathBuf::from("wishlist.html"),
                    reason: "not found".into(),
                },
                "input_error",
            ),
            (Error::Io(std::io::Error::other("disk")), "io_error"),
        ]
    }

    #[test]
    fn per_item_errors_have_distinct_codes() {
        let codes = [
            FetchError::InvalidUrl {
                url: "nope".into(),
                reason: "relative URL without a base".into(),
            }
            .error_code(),
            FetchError::Transport {
                url: "http://a".into(),
                message: "refused".into(),
            }
            .error_code(),
            FetchError::Status {
                url: "http://a".into(),
                status: 404,
            }
            .error_code(),
            FetchError::Body {
                url: "http://a".into(),
                message: "truncated".into(),
            }
            .error_code(),
            ExtractError::Malformed {
                reason: "expected value".into(),
            }
            .error_code(),
            StreamError::Transport {
                url: "http://a/t.mp3".into(),
                message: "stalled".into(),
            }
            .error_code(),
            StreamError::Status {
                url: "http://a/t.mp3".into(),
                status: 500,
            }
            .error_code(),
            StreamError::Write {
                path: PathBuf::from("/x/t.mp3"),
                source: std::io::Error::other("full"),
            }
            .error_code(),
        ];

        assert_eq!(
            codes,
            [
                "invalid_url",
                "fetch_transport",
                "fetch_status",
                "fetch_body",
                "malformed_track_list",
                "stream_transport",
                "stream_status",
                "stream_write",
            ]
        );
    }

    #[test]
    fn every_variant_maps_to_expected_error_code() {
        for (error, expected_code) in all_error_variants() {
            let actual_code = error.error_code();
            assert_eq!(
                actual_code, expected_code,
                "{error} returned error_code={actual_code}, expected {expected_code}"
            );
        }
    }

    #[test]
    fn fetch_status_message_includes_status_and_url() {
        let err = FetchError::Status {
            url: "https://band.example/album/x".into(),
            status: 503,
        };
        assert_eq!(err.to_string(), "HTTP 503 from https://band.example/album/x");
    }

    #[test]
    fn stream_write_error_exposes_io_source() {
        use std::error::Error as _;

        let err = StreamError::Write {
            path: PathBuf::from("/music/a.mp3"),
            source: std::io::Error::other("no space left"),
        };
        assert!(err.source().is_some(), "io error should be chained as source");
        assert!(err.to_string().contains("/music/a.mp3"));
    }
}
