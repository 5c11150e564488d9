//! Album page fetcher with a bounded number of in-flight requests.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::source::HttpSource;

/// Fetches album pages through an [`HttpSource`], never exceeding `limit` requests at once
///
/// Every call to [`fetch`](Self::fetch) holds one permit of the fetch semaphore for the
/// duration of the request, so waiting callers start as soon as any request finishes.
#[derive(Clone)]
pub struct Fetcher {
    source: Arc<dyn HttpSource>,
    limit: Arc<Semaphore>,
}

impl Fetcher {
    /// Create a fetcher allowing at most `limit` concurrent requests
    pub fn new(source: Arc<dyn HttpSource>, limit: usize) -> Self {
        Self {
            source,
            limit: Arc::new(Semaphore::new(limit)),
        }
    }

    /// Fetch the text of one album page
    ///
    /// Links that are not absolute http(s) URLs fail without touching the network.
    /// Failures are returned, never retried.
    pub async fn fetch(&self, link: &str) -> Result<String, FetchError> {
        self.fetch_with(link, || {}).await
    }

    /// Like [`fetch`](Self::fetch), calling `on_start` once a fetch slot is held
    ///
    /// `on_start` runs immediately before the request goes out, never while the
    /// caller is still waiting for a slot, and not at all for invalid links.
    pub async fn fetch_with<F>(&self, link: &str, on_start: F) -> Result<String, FetchError>
    where
        F: FnOnce() + Send,
    {
        validate_link(link)?;

        let _permit = self
            .limit
            .acquire()
            .await
            .map_err(|_| FetchError::Transport {
                url: link.to_string(),
                message: "fetch limiter closed".to_string(),
            })?;

        on_start();
        debug!(link = %link, "Fetching album page");
        let result = self.source.fetch_text(link).await;
        if let Err(e) = &result {
            warn!(link = %link, code = e.error_code(), error = %e, "Album page fetch failed");
        }
        result
    }

    /// Fetch every link, returning results in input order
    ///
    /// One failure never affects the others.
    pub async fn fetch_all(&self, links: &[String]) -> Vec<Result<String, FetchError>> {
        futures::future::join_all(links.iter().map(|link| self.fetch(link))).await
    }
}

fn validate_link(link: &str) -> Result<(), FetchError> {
    let parsed = url::Url::parse(link).map_err(|e| FetchError::InvalidUrl {
        url: link.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(FetchError::InvalidUrl {
            url: link.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::io::AsyncWrite;

    use crate::error::StreamError;

    /// Source that records how many requests are outstanding at once
    #[derive(Default)]
    struct CountingSource {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl HttpSource for CountingSource {
        async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            // Vary latency so a chunked scheduler would visibly under-use the cap
            let delay = if url.ends_with('0') { 40 } else { 10 };
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if url.contains("broken") {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: 500,
                });
            }
            Ok(format!("page for {url}"))
        }

        async fn stream_to(
            &self,
            url: &str,
            _dest: &Path,
            _sink: &mut (dyn AsyncWrite + Unpin + Send),
        ) -> Result<u64, StreamError> {
            Err(StreamError::Transport {
                url: url.to_string(),
                message: "not used".to_string(),
            })
        }
    }

    fn links(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| format!("https://band{i}.example/album/{i}"))
            .collect()
    }

    #[tokio::test]
    async fn never_exceeds_fetch_cap() {
        let source = Arc::new(CountingSource::default());
        let fetcher = Fetcher::new(source.clone(), 2);

        let results = fetcher.fetch_all(&links(12)).await;

        assert_eq!(results.len(), 12);
        assert_eq!(source.calls.load(Ordering::SeqCst), 12);
        let max = source.max_in_flight.load(Ordering::SeqCst);
        assert!(max <= 2, "saw {max} concurrent fetches with a cap of 2");
        assert_eq!(max, 2, "cap should be fully used when work is queued");
    }

    #[tokio::test]
    async fn results_keep_input_order() {
        let fetcher = Fetcher::new(Arc::new(CountingSource::default()), 3);
        let input = links(5);

        let results = fetcher.fetch_all(&input).await;

        for (link, result) in input.iter().zip(results) {
            assert_eq!(result.unwrap(), format!("page for {link}"));
        }
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_siblings() {
        let source = Arc::new(CountingSource::default());
        let fetcher = Fetcher::new(source.clone(), 2);
        let input = vec![
            "https://a.example/album/1".to_string(),
            "https://broken.example/album/2".to_string(),
            "https://c.example/album/3".to_string(),
        ];

        let results = fetcher.fetch_all(&input).await;

        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(FetchError::Status { status: 500, .. })
        ));
        assert!(results[2].is_ok());
        assert_eq!(
            source.calls.load(Ordering::SeqCst),
            3,
            "failed fetch must not be retried"
        );
    }

    #[tokio::test]
    async fn start_callback_runs_only_once_a_slot_is_held() {
        let source = Arc::new(CountingSource::default());
        let fetcher = Fetcher::new(source.clone(), 1);
        let started = AtomicUsize::new(0);
        let busy_at_start = AtomicUsize::new(0);

        let input = links(4);
        futures::future::join_all(input.iter().map(|link| {
            fetcher.fetch_with(link, || {
                started.fetch_add(1, Ordering::SeqCst);
                busy_at_start.fetch_max(source.in_flight.load(Ordering::SeqCst), Ordering::SeqCst);
            })
        }))
        .await;

        assert_eq!(started.load(Ordering::SeqCst), 4);
        assert_eq!(
            busy_at_start.load(Ordering::SeqCst),
            0,
            "a request was still running when the next one was announced"
        );
    }

    #[tokio::test]
    async fn invalid_links_fail_without_network_call() {
        let source = Arc::new(CountingSource::default());
        let fetcher = Fetcher::new(source.clone(), 2);

        let relative = fetcher.fetch("album/foo").await.unwrap_err();
        let ftp = fetcher.fetch("ftp://files.example/foo").await.unwrap_err();

        assert!(matches!(relative, FetchError::InvalidUrl { .. }));
        assert!(matches!(ftp, FetchError::InvalidUrl { ref reason, .. } if reason.contains("ftp")));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }
}
