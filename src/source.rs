//! HTTP access for album page text and track byte streams.
//!
//! [`HttpSource`] is the seam between the pipeline and the network so tests can
//! substitute instrumented sources. [`ReqwestSource`] is the production implementation.

use std::path::Path;

use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::HttpConfig;
use crate::error::{FetchError, Result, StreamError};

/// Abstraction over HTTP retrieval, enabling testability.
#[async_trait::async_trait]
pub trait HttpSource: Send + Sync {
    /// Retrieve the body of `url` as text
    async fn fetch_text(&self, url: &str) -> std::result::Result<String, FetchError>;

    /// Stream the body of `url` into `sink`, returning the number of bytes written
    ///
    /// `dest` is only used to label write errors. Implementations must write chunk by
    /// chunk rather than buffering the whole body.
    async fn stream_to(
        &self,
        url: &str,
        dest: &Path,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> std::result::Result<u64, StreamError>;
}

/// Production [`HttpSource`] backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestSource {
    client: reqwest::Client,
    request_timeout: std::time::Duration,
    stream_idle_timeout: std::time::Duration,
}

impl ReqwestSource {
    /// Build the client from HTTP settings
    ///
    /// Only the connect timeout is set on the client: track streams may legitimately
    /// take longer than `request_timeout`, which is applied to page fetches alone.
    /// Track streams are instead bounded by `stream_idle_timeout` between chunks.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            request_timeout: config.request_timeout,
            stream_idle_timeout: config.stream_idle_timeout,
        })
    }
}

fn transport_message(e: &reqwest::Error, timeout: std::time::Duration) -> String {
    if e.is_timeout() {
        format!("timed out (exceeded {} seconds)", timeout.as_secs())
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}

#[async_trait::async_trait]
impl HttpSource for ReqwestSource {
    async fn fetch_text(&self, url: &str) -> std::result::Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: transport_message(&e, self.request_timeout),
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response.text().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn stream_to(
        &self,
        url: &str,
        dest: &Path,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> std::result::Result<u64, StreamError> {
        let idle = self.stream_idle_timeout;
        let stalled = || StreamError::Transport {
            url: url.to_string(),
            message: format!("stalled (no data for {} seconds)", idle.as_secs_f32()),
        };

        let response = tokio::time::timeout(idle, self.client.get(url).send())
            .await
            .map_err(|_| stalled())?
            .map_err(|e| StreamError::Transport {
                url: url.to_string(),
                message: transport_message(&e, idle),
            })?;

        if !response.status().is_success() {
            return Err(StreamError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk_result) = tokio::time::timeout(idle, stream.next())
            .await
            .map_err(|_| stalled())?
        {
            let chunk = chunk_result.map_err(|e| StreamError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;
            sink.write_all(&chunk)
                .await
                .map_err(|source| StreamError::Write {
                    path: dest.to_path_buf(),
                    source,
                })?;
            written += chunk.len() as u64;
        }

        sink.flush().await.map_err(|source| StreamError::Write {
            path: dest.to_path_buf(),
            source,
        })?;

        Ok(written)
    }
}
