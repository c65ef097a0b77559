//! Sequential enqueueing of a dispatch batch.
//!
//! Exactly one `appendurl` call is outstanding at any time. The server appends
//! each enqueued item to its download queue, so submission order is queue
//! order.

use crate::dispatch::queue::{DispatchJob, DispatchQueue};
use crate::rpc::{AppendRequest, RemoteApi, RpcError};
use thiserror::Error;
use tokio::sync::mpsc;

/// Category and priority every job of a session is enqueued with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DispatchDefaults {
    pub category: String,
    pub priority: i32,
}

impl DispatchDefaults {
    /// Builds defaults from raw option strings. An empty priority means 0.
    pub fn from_option_values(category: &str, priority: &str) -> Self {
        let priority = priority.trim();
        let priority = if priority.is_empty() {
            0
        } else {
            priority.parse().unwrap_or_else(|_| {
                tracing::warn!(priority, "Unparsable feed priority, using 0");
                0
            })
        };

        Self {
            category: category.to_string(),
            priority,
        }
    }
}

/// Successful batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Jobs in the order they were acknowledged.
    pub dispatched: Vec<DispatchJob>,
}

/// A batch halted at its first failing job.
#[derive(Debug, Error)]
#[error("Could not add {} to queue: {error}", .failed.name)]
pub struct DispatchFailure {
    pub failed: DispatchJob,
    #[source]
    pub error: RpcError,
    /// Jobs after `failed` that were never attempted.
    pub remaining: Vec<DispatchJob>,
    /// Jobs acknowledged before the failure.
    pub completed: usize,
}

impl DispatchFailure {
    /// Queue for a retry: the failed job first, then the untouched rest.
    pub fn into_retry_queue(self) -> DispatchQueue {
        DispatchQueue::headed_by(self.failed, self.remaining)
    }
}

/// Drains `queue` head to tail, one call at a time.
///
/// Sends `(completed, total)` on `progress_tx` after every acknowledged job.
/// A transport error or a `false` acknowledgement stops the batch.
pub async fn dispatch_sequential<R: RemoteApi>(
    remote: &R,
    mut queue: DispatchQueue,
    defaults: &DispatchDefaults,
    progress_tx: Option<mpsc::Sender<(usize, usize)>>,
) -> Result<DispatchReport, DispatchFailure> {
    let total = queue.len();
    let mut dispatched = Vec::with_capacity(total);

    while let Some(job) = queue.pop_front() {
        let request = AppendRequest {
            name: job.name.clone(),
            category: defaults.category.clone(),
            priority: defaults.priority,
            paused: false,
            url: job.url.clone(),
        };

        tracing::debug!(name = %job.name, index = dispatched.len(), total, "Enqueueing item");

        let outcome = match remote.append_url(&request).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(RpcError::Rejected("appendurl")),
            Err(e) => Err(e),
        };

        if let Err(error) = outcome {
            tracing::error!(name = %job.name, url = %job.url, error = %error, "Enqueue failed, halting batch");
            return Err(DispatchFailure {
                failed: job,
                error,
                remaining: queue.into_jobs().into(),
                completed: dispatched.len(),
            });
        }

        dispatched.push(job);

        if let Some(tx) = &progress_tx {
            if let Err(e) = tx.send((dispatched.len(), total)).await {
                tracing::warn!(error = %e, "Progress channel closed");
            }
        }
    }

    tracing::info!(count = dispatched.len(), "Batch enqueued");
    Ok(DispatchReport { dispatched })
}
