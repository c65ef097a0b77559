use crate::dialog::session::SessionToken;
use crate::dispatch::{DispatchFailure, DispatchReport};
use crate::feed::FeedItem;
use crate::rpc::RpcError;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub(crate) const LOAD_TASK: &str = "feed_load";
pub(crate) const DISPATCH_TASK: &str = "dispatch";
pub(crate) const TRANSMIT_TASK: &str = "transmit_delay";

/// Results of background work, delivered to [`super::FeedDialog::handle_event`].
///
/// Every variant carries the token of the session that spawned the work.
#[derive(Debug)]
pub enum DialogEvent {
    ItemsLoaded {
        token: SessionToken,
        result: Result<Vec<FeedItem>, RpcError>,
    },
    DispatchProgress {
        token: SessionToken,
        completed: usize,
        total: usize,
    },
    DispatchFinished {
        token: SessionToken,
        batch: u64,
        result: Result<DispatchReport, DispatchFailure>,
    },
    /// The transmit indicator delay of `batch` ran out.
    TransmitDelayElapsed { token: SessionToken, batch: u64 },
    /// A background task panicked.
    ///
    /// Fields:
    /// - `task`: Name of the task that panicked (e.g., "feed_load", "dispatch")
    /// - `error`: The panic message extracted from the panic payload
    TaskPanicked {
        token: SessionToken,
        task: &'static str,
        error: String,
    },
}

impl DialogEvent {
    pub fn token(&self) -> SessionToken {
        match self {
            DialogEvent::ItemsLoaded { token, .. }
            | DialogEvent::DispatchProgress { token, .. }
            | DialogEvent::DispatchFinished { token, .. }
            | DialogEvent::TransmitDelayElapsed { token, .. }
            | DialogEvent::TaskPanicked { token, .. } => *token,
        }
    }
}

/// Catches panics in async tasks, converting them to error messages.
async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            }
        })
}

/// Spawns `future` and sends the event it produces, or `TaskPanicked` if it panics.
pub(crate) fn spawn_guarded<F>(
    task: &'static str,
    token: SessionToken,
    tx: mpsc::Sender<DialogEvent>,
    future: F,
) -> JoinHandle<()>
where
    F: Future<Output = DialogEvent> + Send + 'static,
{
    tokio::spawn(async move {
        let event = match catch_task_panic(future).await {
            Ok(event) => event,
            Err(error) => {
                tracing::error!(task, token = %token, error = %error, "Background task panicked");
                DialogEvent::TaskPanicked { token, task, error }
            }
        };
        if let Err(e) = tx.send(event).await {
            tracing::warn!(task, error = %e, "Channel send failed (receiver dropped)");
        }
    })
}
