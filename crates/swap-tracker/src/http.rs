use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::*;

use crate::{errors::SwapTrackerError, traits::SwapTracker, types::SwapRecord};

/// Swap tracker reached over a small REST API.
///
/// `GET {url}/health` gates initialization, `GET {url}/swaps/{id}` looks up
/// a swap. Swap ids are opaque and sent as a single escaped path segment.
#[derive(Debug)]
pub struct HttpSwapTracker {
    url: Url,
    client: Client,
    ready: AtomicBool,
}

impl HttpSwapTracker {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, SwapTrackerError> {
        let url = Url::parse(url).map_err(|e| SwapTrackerError::InvalidUrl(format!("{url}: {e}")))?;
        if url.cannot_be_a_base() {
            return Err(SwapTrackerError::InvalidUrl(url.to_string()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url,
            client,
            ready: AtomicBool::new(false),
        })
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Base url with `segments` appended, each one escaped.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, SwapTrackerError> {
        let mut url = self.url.clone();
        url.path_segments_mut()
            .map_err(|_| SwapTrackerError::InvalidUrl(self.url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl SwapTracker for HttpSwapTracker {
    async fn init(&self) -> Result<(), SwapTrackerError> {
        let resp = self
            .client
            .get(self.endpoint(&["health"])?)
            .send()
            .await
            .map_err(|e| SwapTrackerError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SwapTrackerError::Unavailable(format!(
                "health check returned {}",
                resp.status()
            )));
        }

        self.ready.store(true, Ordering::Release);
        debug!(url = %self.url, "swap tracker ready");
        Ok(())
    }

    async fn swap_by_id(&self, swap_id: &str) -> Result<Option<SwapRecord>, SwapTrackerError> {
        if !self.is_ready() {
            return Err(SwapTrackerError::NotInitialized);
        }

        let resp = self
            .client
            .get(self.endpoint(&["swaps", swap_id])?)
            .send()
            .await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let body = resp.text().await?;
                let swap = serde_json::from_str(&body)
                    .map_err(|e| SwapTrackerError::Malformed(e.to_string()))?;
                Ok(Some(swap))
            }
            s => Err(SwapTrackerError::Status(s.as_u16())),
        }
    }

    async fn stop(&self) -> Result<(), SwapTrackerError> {
        if self.ready.swap(false, Ordering::AcqRel) {
            debug!(url = %self.url, "swap tracker stopped");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;

    const TXID: &str = "c3a4b2a8e0c9d2f0b8a7e6d5c4b3a29180f7e6d5c4b3a29180f7e6d5c4b3a291";

    /// Answers each connection with the next canned response and records the
    /// request path.
    async fn serve(responses: Vec<(u16, String)>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let paths = Arc::new(Mutex::new(Vec::new()));
        let seen = paths.clone();

        tokio::spawn(async move {
            for (code, body) in responses {
                let (mut sock, _) = listener.accept().await.unwrap();
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = sock.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                let head = String::from_utf8_lossy(&buf).to_string();
                if let Some(path) = head.split_whitespace().nth(1) {
                    seen.lock().unwrap().push(path.to_string());
                }
                let resp = format!(
                    "HTTP/1.1 {code} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                sock.write_all(resp.as_bytes()).await.unwrap();
                sock.shutdown().await.unwrap();
            }
        });

        (format!("http://{addr}/"), paths)
    }

    /// A tracker that passed its health check against `responses`, which
    /// follow the health answer.
    async fn ready_tracker(responses: Vec<(u16, String)>) -> (HttpSwapTracker, Arc<Mutex<Vec<String>>>) {
        let mut all = vec![(200, "ok".to_string())];
        all.extend(responses);
        let (url, paths) = serve(all).await;
        let tracker = HttpSwapTracker::new(&url, Duration::from_secs(5)).unwrap();
        tracker.init().await.unwrap();
        (tracker, paths)
    }

    #[tokio::test]
    async fn test_lookup_before_init() {
        let tracker = HttpSwapTracker::new("http://127.0.0.1:1/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            tracker.swap_by_id("swap-1").await,
            Err(SwapTrackerError::NotInitialized)
        );
    }

    #[tokio::test]
    async fn test_init_against_dead_host_fails() {
        let tracker = HttpSwapTracker::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        assert!(matches!(
            tracker.init().await,
            Err(SwapTrackerError::Unavailable(_))
        ));
        assert!(!tracker.is_ready());
        assert_eq!(tracker.stop().await, Ok(()));
    }

    #[tokio::test]
    async fn test_init_and_lookup() {
        let body = format!(r#"{{"id":"swap-1","state":2,"btc_tx_id":"{TXID}"}}"#);
        let (tracker, paths) = ready_tracker(vec![(200, body), (404, String::new())]).await;
        assert!(tracker.is_ready());

        let swap = tracker.swap_by_id("swap-1").await.unwrap().unwrap();
        assert_eq!(swap.source_tx_id(), Some(TXID.parse().unwrap()));
        assert_eq!(tracker.swap_by_id("swap-2").await, Ok(None));

        let paths = paths.lock().unwrap().clone();
        assert_eq!(paths, vec!["/health", "/swaps/swap-1", "/swaps/swap-2"]);
    }

    #[tokio::test]
    async fn test_lookup_failures() {
        let (tracker, _) = ready_tracker(vec![
            (503, "busy".to_string()),
            (200, "<html>not json</html>".to_string()),
        ])
        .await;

        assert_eq!(
            tracker.swap_by_id("swap-1").await,
            Err(SwapTrackerError::Status(503))
        );
        assert!(matches!(
            tracker.swap_by_id("swap-1").await,
            Err(SwapTrackerError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_swap_id_is_one_path_segment() {
        let (tracker, paths) = ready_tracker(vec![(404, String::new())]).await;

        assert_eq!(tracker.swap_by_id("a/b?c#d").await, Ok(None));
        let paths = paths.lock().unwrap().clone();
        assert_eq!(paths[1], "/swaps/a%2Fb%3Fc%23d");
    }

    #[test]
    fn test_rejects_bad_url() {
        assert!(matches!(
            HttpSwapTracker::new("not a url", Duration::from_secs(1)),
            Err(SwapTrackerError::InvalidUrl(_))
        ));
    }
}
