use crate::feed::{ConfigEntry, FeedItem};
use crate::util::UrlValidationError;
use std::future::Future;
use thiserror::Error;

/// Errors from the remote procedure boundary.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// The server answered with a JSON-RPC fault
    #[error("Server error {code}: {message}")]
    Remote { code: i64, message: String },
    /// The server acknowledged the call with `false`
    #[error("Server rejected {0}")]
    Rejected(&'static str),
    /// Response body was not the expected JSON shape
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Configured server URL is unusable
    #[error("Invalid server URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),
}

impl RpcError {
    /// Transient errors worth retrying for read-only calls.
    pub(crate) fn is_retryable(&self) -> bool {
        match self {
            RpcError::Timeout | RpcError::Network(_) => true,
            RpcError::HttpStatus(status) => *status >= 500,
            RpcError::Remote { .. }
            | RpcError::Rejected(_)
            | RpcError::Decode(_)
            | RpcError::ResponseTooLarge
            | RpcError::InvalidUrl(_) => false,
        }
    }
}

/// Arguments of one `appendurl` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendRequest {
    /// Target name, always ending in `.nzb`.
    pub name: String,
    pub category: String,
    pub priority: i32,
    pub paused: bool,
    pub url: String,
}

/// Remote operations consumed by the feed view.
///
/// Futures are `Send` so calls can run in spawned tasks.
pub trait RemoteApi: Send + Sync {
    /// Triggers a refresh of every configured feed (`fetchfeeds`).
    fn fetch_feeds(&self) -> impl Future<Output = Result<(), RpcError>> + Send;

    /// Items of saved feed `id` (`viewfeed`).
    fn view_feed(&self, id: u32) -> impl Future<Output = Result<Vec<FeedItem>, RpcError>> + Send;

    /// Items of an unsaved feed definition (`previewfeed`).
    fn preview_feed(
        &self,
        name: &str,
        url: &str,
        filter: &str,
    ) -> impl Future<Output = Result<Vec<FeedItem>, RpcError>> + Send;

    /// Enqueues one item by URL (`appendurl`). `Ok(false)` means the server declined.
    fn append_url(
        &self,
        request: &AppendRequest,
    ) -> impl Future<Output = Result<bool, RpcError>> + Send;

    /// Full option set of the server (`config`).
    fn load_config(&self) -> impl Future<Output = Result<Vec<ConfigEntry>, RpcError>> + Send;
}
