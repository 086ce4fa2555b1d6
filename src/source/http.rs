//! HTTP polling source.
//!
//! Issues one GET per tick against the perfmon daemon's endpoint.

use std::time::Duration;

use perfmon_types::PollPayload;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::{DataSource, SourceError};

/// Results buffered between the poller and the UI loop.
const RESULT_BUFFER: usize = 64;

/// A data source that polls an HTTP endpoint on a fixed period.
///
/// A background ticker fires every `interval` and spawns one request per
/// tick. Ticks do not wait for earlier requests, so slow responses overlap
/// and may complete out of order; the store's per-host timestamp check
/// keeps that from double counting. Dropping the source stops the ticker
/// but lets in-flight requests finish.
///
/// Must be created inside a tokio runtime.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use perfmon_dash::HttpSource;
///
/// # tokio_test::block_on(async {
/// let source = HttpSource::spawn(
///     "http://localhost:8888",
///     Duration::from_secs(1),
///     Duration::from_secs(5),
/// ).unwrap();
/// # });
/// ```
#[derive(Debug)]
pub struct HttpSource {
    receiver: mpsc::Receiver<Result<PollPayload, SourceError>>,
    description: String,
    ticker: JoinHandle<()>,
}

impl HttpSource {
    /// Start polling `url` every `interval`, giving each request `timeout`.
    pub fn spawn(url: &str, interval: Duration, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, url, interval))
    }

    /// Start polling with a preconfigured client.
    pub fn with_client(client: Client, url: &str, interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel(RESULT_BUFFER);
        let target = url.to_string();

        info!(url = %target, interval_ms = interval.as_millis() as u64, "starting HTTP poller");

        let ticker = tokio::spawn(async move {
            let mut ticks = tokio::time::interval(interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Burst);

            loop {
                ticks.tick().await;
                if tx.is_closed() {
                    break;
                }

                let client = client.clone();
                let url = target.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = fetch(&client, &url).await;
                    if let Err(ref e) = result {
                        debug!(url = %url, error = %e, "poll failed");
                    }
                    // Receiver gone means the dashboard is shutting down.
                    let _ = tx.send(result).await;
                });
            }
        });

        Self {
            receiver: rx,
            description: format!("http: {}", url),
            ticker,
        }
    }

    /// Fetch a single payload, for one-shot use outside the poll loop.
    pub async fn fetch_once(url: &str, timeout: Duration) -> Result<PollPayload, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        fetch(&client, url).await
    }
}

async fn fetch(client: &Client, url: &str) -> Result<PollPayload, SourceError> {
    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json, text/json")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(SourceError::Status(response.status().as_u16()));
    }

    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

impl DataSource for HttpSource {
    fn poll(&mut self) -> Result<Option<PollPayload>, SourceError> {
        match self.receiver.try_recv() {
            Ok(result) => result.map(Some),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                Err(SourceError::Closed("poller stopped".to_string()))
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl Drop for HttpSource {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const PAYLOAD: &str =
        r#"{"snapshots":[{"hname":"h1","time":"100","procs":[{"pname":"p1","cpu":"0.3"}]}]}"#;

    /// Serve `status` and `body` to every connection until the test ends.
    async fn serve(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let mut buf = [0u8; 2048];
                    let _ = socket.read(&mut buf).await;
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: text/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_fetch_once_decodes_payload() {
        let url = serve("200 OK", PAYLOAD).await;
        let payload = HttpSource::fetch_once(&url, Duration::from_secs(2)).await.unwrap();
        assert_eq!(payload.len(), 1);
        assert_eq!(payload.snapshots[0].hname, "h1");
    }

    #[tokio::test]
    async fn test_fetch_once_reports_parse_error() {
        let url = serve("200 OK", "<html>oops</html>").await;
        let err = HttpSource::fetch_once(&url, Duration::from_secs(2)).await.unwrap_err();
        assert!(err.is_parse());
    }

    #[tokio::test]
    async fn test_fetch_once_reports_status() {
        let url = serve("503 Service Unavailable", "").await;
        let err = HttpSource::fetch_once(&url, Duration::from_secs(2)).await.unwrap_err();
        assert_eq!(err, SourceError::Status(503));
    }

    #[tokio::test]
    async fn test_fetch_once_reports_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = HttpSource::fetch_once(&format!("http://{}", addr), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Transport(_) | SourceError::Timeout));
    }

    #[tokio::test]
    async fn test_poller_delivers_each_tick() {
        let url = serve("200 OK", PAYLOAD).await;
        let mut source = HttpSource::spawn(&url, Duration::from_millis(20), Duration::from_secs(2))
            .unwrap();
        assert_eq!(source.description(), format!("http: {}", url));

        tokio::time::sleep(Duration::from_millis(200)).await;

        let mut received = 0;
        while let Ok(Some(payload)) = source.poll() {
            assert_eq!(payload.len(), 1);
            received += 1;
        }
        assert!(received >= 2, "expected several polls, got {}", received);
    }

    #[tokio::test]
    async fn test_poller_keeps_going_after_errors() {
        let url = serve("500 Internal Server Error", "").await;
        let mut source = HttpSource::spawn(&url, Duration::from_millis(20), Duration::from_secs(2))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        let mut errors = 0;
        while let Err(e) = source.poll() {
            assert_eq!(e, SourceError::Status(500));
            errors += 1;
        }
        assert!(errors >= 2, "expected repeated failures, got {}", errors);
    }
}
