use async_trait::async_trait;
use civiccore::feed_interface::{decode_feed_body, Record};
use civiccore::prelude::{FetchError, FetchResult, RemoteDataSource};
use std::time::Duration;

/// Fetches feeds from the operations-center HTTP API (or the simulator).
///
/// The request timeout lives here; the refresh layer imposes none.
pub struct HttpFeedSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFeedSource {
    pub fn new(base_url: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn feed_url(&self, feed_id: &str) -> String {
        format!("{}/feeds/{}", self.base_url, feed_id)
    }
}

#[async_trait]
impl RemoteDataSource for HttpFeedSource {
    async fn fetch(&self, feed_id: &str) -> FetchResult<Vec<Record>> {
        let response = self
            .client
            .get(self.feed_url(feed_id))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &body));
        }

        let body = response.bytes().await.map_err(transport_error)?;
        decode_feed_body(feed_id, &body)
    }
}

/// Bytes are decoded by `decode_feed_body`, so every reqwest failure here,
/// including a body cut short mid-stream, is a transport failure.
fn transport_error(err: reqwest::Error) -> FetchError {
    transport_failure(err.is_timeout(), err.to_string())
}

fn transport_failure(timeout: bool, detail: String) -> FetchError {
    if timeout {
        FetchError::Timeout(detail)
    } else {
        FetchError::NetworkUnreachable(detail)
    }
}

/// Maps a non-2xx HTTP status to a fetch failure.
pub fn status_error(status: u16, body: &str) -> FetchError {
    match status {
        408 | 504 => FetchError::Timeout(format!("HTTP {}", status)),
        _ => {
            let detail = body.trim();
            if detail.is_empty() {
                FetchError::ServerError(format!("HTTP {}", status))
            } else {
                FetchError::ServerError(format!("HTTP {}: {}", status, detail))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_failures() {
        assert_eq!(status_error(504, ""), FetchError::Timeout("HTTP 504".into()));
        assert_eq!(
            status_error(503, " {\"error\":\"busy\"} "),
            FetchError::ServerError("HTTP 503: {\"error\":\"busy\"}".into())
        );
        assert_eq!(status_error(404, "").kind(), "server-error");
    }

    #[test]
    fn transport_failures_map_by_kind() {
        assert_eq!(transport_failure(true, "t".into()).kind(), "timeout");
        assert_eq!(
            transport_failure(false, "connection reset while reading body".into()).kind(),
            "network-unreachable"
        );
    }

    #[tokio::test]
    async fn body_cut_short_is_network_unreachable() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 500\r\n\r\n{\"feed\":")
                .await;
            let _ = socket.shutdown().await;
        });

        let source =
            HttpFeedSource::new(&format!("http://{}", address), Duration::from_secs(5)).unwrap();
        let err = source.fetch("sirens").await.unwrap_err();
        assert_eq!(err.kind(), "network-unreachable");
    }

    #[tokio::test]
    async fn garbled_body_is_decode_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nnope!")
                .await;
        });

        let source =
            HttpFeedSource::new(&format!("http://{}", address), Duration::from_secs(5)).unwrap();
        let err = source.fetch("sirens").await.unwrap_err();
        assert_eq!(err.kind(), "decode-error");
    }

    #[test]
    fn feed_url_drops_trailing_slash() {
        let source = HttpFeedSource::new("http://127.0.0.1:9000/", Duration::from_secs(1)).unwrap();
        assert_eq!(source.feed_url("sirens"), "http://127.0.0.1:9000/feeds/sirens");
    }

    #[tokio::test]
    async fn refused_connection_is_network_unreachable() {
        let source = HttpFeedSource::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let err = source.fetch("sirens").await.unwrap_err();
        assert_eq!(err.kind(), "network-unreachable");
    }
}
