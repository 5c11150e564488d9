//! In-memory album site that records how much work is in flight

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use wishlist_dl::{FetchError, HttpSource, StreamError};

/// Tracks a current/peak pair of in-flight counters
#[derive(Default)]
pub struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    /// Highest value observed
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct TrackBody {
    bytes: Vec<u8>,
    broken: bool,
    delay: Duration,
}

/// Album pages and track bodies served from memory
///
/// Track URLs have the form `https://cdn.example/<album>/<n>` so streams can be
/// attributed to their album.
pub struct FakeSite {
    pages: HashMap<String, String>,
    tracks: HashMap<String, TrackBody>,
    page_delay: Duration,
    track_delay: Duration,

    pub page_calls: AtomicUsize,
    pub track_calls: AtomicUsize,
    pub pages_in_flight: Gauge,
    pub tracks_in_flight: Gauge,
    pub albums_streaming: Gauge,
    open_per_album: Mutex<HashMap<String, usize>>,
}

impl Default for FakeSite {
    fn default() -> Self {
        Self {
            pages: HashMap::new(),
            tracks: HashMap::new(),
            page_delay: Duration::from_millis(10),
            track_delay: Duration::from_millis(10),
            page_calls: AtomicUsize::new(0),
            track_calls: AtomicUsize::new(0),
            pages_in_flight: Gauge::default(),
            tracks_in_flight: Gauge::default(),
            albums_streaming: Gauge::default(),
            open_per_album: Mutex::new(HashMap::new()),
        }
    }
}

impl FakeSite {
    /// Page latency for every album page
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// Default latency for every track stream
    pub fn with_track_delay(mut self, delay: Duration) -> Self {
        self.track_delay = delay;
        self
    }

    /// Register an album page with one track per title; returns its link
    ///
    /// Track `n` (0-based) is served from `https://cdn.example/<slug>/<n>` with body
    /// `<slug>-<n>`.
    pub fn add_album(&mut self, slug: &str, artist: &str, title: &str, tracks: &[&str]) -> String {
        let link = format!("https://{slug}.example/album/{slug}");
        let entries: Vec<String> = tracks
            .iter()
            .enumerate()
            .map(|(n, track)| {
                let url = track_url(slug, n);
                self.tracks.insert(
                    url.clone(),
                    TrackBody {
                        bytes: format!("{slug}-{n}").into_bytes(),
                        broken: false,
                        delay: self.track_delay,
                    },
                );
                format!(r#"{{"title":"{track}","file":{{"mp3-128":"{url}"}}}}"#)
            })
            .collect();

        let page = format!(
            "<script>\nvar TralbumData = {{\n    artist: \"{artist}\",\n    album_title: \"{title}\",\n    trackinfo: [{}],\n}};\n</script>",
            entries.join(",")
        );
        self.pages.insert(link.clone(), page);
        link
    }

    /// Register a raw page body under `link`
    pub fn add_page(&mut self, link: &str, body: &str) {
        self.pages.insert(link.to_string(), body.to_string());
    }

    /// Make one track of an album fail mid-stream
    pub fn break_track(&mut self, slug: &str, n: usize) {
        if let Some(track) = self.tracks.get_mut(&track_url(slug, n)) {
            track.broken = true;
        }
    }

    /// Override one track's latency
    pub fn delay_track(&mut self, slug: &str, n: usize, delay: Duration) {
        if let Some(track) = self.tracks.get_mut(&track_url(slug, n)) {
            track.delay = delay;
        }
    }

    fn album_opened(&self, album: &str) {
        let mut open = self.open_per_album.lock().unwrap();
        let count = open.entry(album.to_string()).or_default();
        *count += 1;
        if *count == 1 {
            self.albums_streaming.enter();
        }
    }

    fn album_closed(&self, album: &str) {
        let mut open = self.open_per_album.lock().unwrap();
        if let Some(count) = open.get_mut(album) {
            *count -= 1;
            if *count == 0 {
                self.albums_streaming.leave();
            }
        }
    }
}

/// URL of track `n` of album `slug`
pub fn track_url(slug: &str, n: usize) -> String {
    format!("https://cdn.example/{slug}/{n}")
}

fn album_of(url: &str) -> String {
    url.trim_start_matches("https://cdn.example/")
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl HttpSource for FakeSite {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        self.pages_in_flight.enter();
        tokio::time::sleep(self.page_delay).await;
        self.pages_in_flight.leave();

        self.pages.get(url).cloned().ok_or(FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }

    async fn stream_to(
        &self,
        url: &str,
        _dest: &Path,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, StreamError> {
        self.track_calls.fetch_add(1, Ordering::SeqCst);
        let Some(track) = self.tracks.get(url) else {
            return Err(StreamError::Status {
                url: url.to_string(),
                status: 404,
            });
        };

        let album = album_of(url);
        self.album_opened(&album);
        self.tracks_in_flight.enter();

        // First byte lands before the delay so a broken stream leaves a partial file
        let (head, tail) = track.bytes.split_at(1);
        sink.write_all(head).await.unwrap();
        tokio::time::sleep(track.delay).await;

        let result = if track.broken {
            Err(StreamError::Transport {
                url: url.to_string(),
                message: "connection reset".to_string(),
            })
        } else {
            sink.write_all(tail).await.unwrap();
            Ok(track.bytes.len() as u64)
        };

        self.tracks_in_flight.leave();
        self.album_closed(&album);
        result
    }
}
