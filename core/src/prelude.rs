use crate::feed_interface::Record;
use async_trait::async_trait;

/// Reason a fetch cycle failed, as reported by a remote data source.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),
    #[error("server error: {0}")]
    ServerError(String),
    #[error("decode error: {0}")]
    DecodeError(String),
    #[error("timed out: {0}")]
    Timeout(String),
}

impl FetchError {
    /// Stable label used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::NetworkUnreachable(_) => "network-unreachable",
            FetchError::ServerError(_) => "server-error",
            FetchError::DecodeError(_) => "decode-error",
            FetchError::Timeout(_) => "timeout",
        }
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Collaborator that fetches the current records of a feed.
///
/// Timeouts, retries and authentication belong to the implementation; the
/// refresh layer never retries on its own.
#[async_trait]
pub trait RemoteDataSource: Send + Sync {
    async fn fetch(&self, feed_id: &str) -> FetchResult<Vec<Record>>;
}

/// Per-screen sink for refresh results.
///
/// Implementations must tolerate repeated identical calls, e.g. two
/// consecutive `on_loading_started` calls.
pub trait PresentationSurface {
    fn on_loading_started(&mut self);
    fn on_data_ready(&mut self, records: &[Record]);
    fn on_load_failed(&mut self, reason: &FetchError);
}
