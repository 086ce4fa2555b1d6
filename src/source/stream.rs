//! Stream-based data source.
//!
//! Receives perfmon payloads as newline-delimited JSON from an async byte
//! stream, such as a TCP connection to a relay.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use perfmon_types::PollPayload;

use super::{DataSource, SourceError};

/// A data source that receives payloads from an async stream.
///
/// A background task reads one JSON payload per line. Lines that fail to
/// parse are reported through [`DataSource::poll`] and reading continues.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use perfmon_dash::StreamSource;
///
/// # tokio_test::block_on(async {
/// let data = b"{\"snapshots\":[]}\n";
/// let stream = Cursor::new(data.to_vec());
/// let source = StreamSource::spawn(stream, "example");
/// # });
/// ```
#[derive(Debug)]
pub struct StreamSource {
    receiver: mpsc::Receiver<Result<PollPayload, SourceError>>,
    description: String,
    disconnected: bool,
}

impl StreamSource {
    /// Spawn a background task that reads from the given async reader.
    pub fn spawn<R>(reader: R, description: &str) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Result<PollPayload, SourceError>>(16);

        tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line = String::new();

            loop {
                line.clear();
                let result = match reader.read_line(&mut line).await {
                    Ok(0) => {
                        let _ = tx
                            .send(Err(SourceError::Closed("connection closed".to_string())))
                            .await;
                        break;
                    }
                    Ok(_) if line.trim().is_empty() => continue,
                    Ok(_) => serde_json::from_str::<PollPayload>(line.trim()).map_err(Into::into),
                    Err(e) => {
                        let _ = tx.send(Err(SourceError::Transport(e.to_string()))).await;
                        break;
                    }
                };

                if tx.send(result).await.is_err() {
                    // Receiver dropped
                    break;
                }
            }
        });

        Self {
            receiver: rx,
            description: format!("stream: {}", description),
            disconnected: false,
        }
    }

    /// Create a StreamSource from a channel of raw JSON documents.
    pub fn from_bytes_channel(mut rx: mpsc::Receiver<Vec<u8>>, description: &str) -> Self {
        let (tx, payload_rx) = mpsc::channel::<Result<PollPayload, SourceError>>(16);

        tokio::spawn(async move {
            while let Some(bytes) = rx.recv().await {
                let result = serde_json::from_slice::<PollPayload>(&bytes).map_err(Into::into);
                if tx.send(result).await.is_err() {
                    break;
                }
            }
        });

        Self {
            receiver: payload_rx,
            description: format!("stream: {}", description),
            disconnected: false,
        }
    }
}

impl DataSource for StreamSource {
    fn poll(&mut self) -> Result<Option<PollPayload>, SourceError> {
        match self.receiver.try_recv() {
            Ok(result) => result.map(Some),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                if self.disconnected {
                    Ok(None)
                } else {
                    self.disconnected = true;
                    Err(SourceError::Closed("stream disconnected".to_string()))
                }
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_json() -> &'static str {
        r#"{"snapshots":[{"hname":"h1","time":100,"procs":[{"pname":"p1","cpu":0.3}]}]}"#
    }

    async fn settle() {
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_stream_source_spawn() {
        let data = format!("{}\n", sample_json());
        let mut source = StreamSource::spawn(Cursor::new(data), "test");

        settle().await;

        let payload = source.poll().unwrap().unwrap();
        assert_eq!(payload.snapshots[0].hname, "h1");

        // EOF is reported once, then the source is quiet
        assert!(matches!(source.poll(), Err(SourceError::Closed(_))));
        assert!(matches!(source.poll(), Err(SourceError::Closed(_)) | Ok(None)));
    }

    #[tokio::test]
    async fn test_stream_source_multiple_payloads() {
        let data = format!("{}\n\n{}\n", sample_json(), sample_json());
        let mut source = StreamSource::spawn(Cursor::new(data), "test");

        settle().await;

        assert!(source.poll().unwrap().is_some());
        assert!(source.poll().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stream_source_invalid_line_then_valid() {
        let data = format!("not valid json\n{}\n", sample_json());
        let mut source = StreamSource::spawn(Cursor::new(data), "test");

        settle().await;

        assert!(source.poll().unwrap_err().is_parse());
        assert!(source.poll().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stream_source_description() {
        let source = StreamSource::spawn(Cursor::new(""), "tcp://localhost:9090");
        assert_eq!(source.description(), "stream: tcp://localhost:9090");
    }

    #[tokio::test]
    async fn test_stream_source_from_bytes_channel() {
        let (tx, rx) = mpsc::channel::<Vec<u8>>(16);
        let mut source = StreamSource::from_bytes_channel(rx, "test-channel");

        tx.send(sample_json().as_bytes().to_vec()).await.unwrap();
        settle().await;

        let payload = source.poll().unwrap().unwrap();
        assert_eq!(payload.len(), 1);

        drop(tx);
        settle().await;
        assert!(matches!(source.poll(), Err(SourceError::Closed(_))));
        assert!(source.poll().unwrap().is_none());
    }
}
