//! Feed view state machine.
//!
//! ```text
//! Closed ──show_modal──▶ Loading ──load ok──▶ Ready ──fetch──▶ Dispatching ──all ok──▶ Closed
//!                           │                  ▲ │                  │
//!                           └──load failed──▶ Closed          batch failed ──▶ Ready
//! ```
//!
//! `cancel` closes from any state. Every path into `Closed` resumes the host
//! refresh exactly once.

use crate::config::Config;
use crate::dialog::events::{spawn_guarded, DialogEvent, DISPATCH_TASK, LOAD_TASK, TRANSMIT_TASK};
use crate::dialog::session::{FeedSource, Session, SessionToken};
use crate::dispatch::{
    dispatch_sequential, DispatchError, DispatchFailure, DispatchQueue, DispatchReport,
};
use crate::feed::{find_duplicate_url, FeedItem, NamingMode, ProjectionContext, StatusFilter};
use crate::host::{DialogHost, Notice};
use crate::rpc::{RemoteApi, RpcError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Capacity of the event channel and of the per-batch progress channel.
const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogState {
    #[default]
    Closed,
    Loading,
    Ready,
    Dispatching,
}

impl fmt::Display for DialogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DialogState::Closed => "closed",
            DialogState::Loading => "loading",
            DialogState::Ready => "ready",
            DialogState::Dispatching => "dispatching",
        })
    }
}

/// Failure to bring a session from `Loading` to `Ready`.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not load feed: {0}")]
    Rpc(#[from] RpcError),

    /// Two items share one URL; selection by URL would be ambiguous.
    #[error("Feed contains duplicate item URL {0}")]
    DuplicateUrl(String),

    #[error("Feed load failed unexpectedly: {0}")]
    TaskPanicked(String),
}

/// Operation not allowed in the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialogError {
    #[error("Feed view is {0}")]
    NotReady(DialogState),

    #[error("No items selected")]
    EmptySelection,

    #[error("No failed batch to retry")]
    NothingToRetry,
}

impl From<DispatchError> for DialogError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::EmptySelection => DialogError::EmptySelection,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DialogSettings {
    pub page_size: usize,
    /// Delay before the transmit indicator shows during a dispatch.
    pub transmit_delay: Duration,
    pub time_zone_correction_hours: i32,
}

impl Default for DialogSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for DialogSettings {
    fn from(config: &Config) -> Self {
        Self {
            page_size: config.page_size.max(1),
            transmit_delay: Duration::from_millis(config.transmit_delay_ms),
            time_zone_correction_hours: config.time_zone_correction_hours,
        }
    }
}

/// Controller of the feed view/preview dialog.
///
/// Background work (load, dispatch, transmit timer) runs in spawned tasks
/// that report on the channel returned by [`FeedDialog::new`]. The owner
/// forwards every received event to [`FeedDialog::handle_event`], or lets
/// [`FeedDialog::settle`] do it.
pub struct FeedDialog<R: RemoteApi + 'static, H: DialogHost> {
    remote: Arc<R>,
    host: H,
    settings: DialogSettings,
    state: DialogState,
    session: Option<Session>,
    last_token: SessionToken,
    event_tx: mpsc::Sender<DialogEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl<R: RemoteApi + 'static, H: DialogHost> FeedDialog<R, H> {
    pub fn new(
        remote: Arc<R>,
        host: H,
        settings: DialogSettings,
    ) -> (Self, mpsc::Receiver<DialogEvent>) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let dialog = Self {
            remote,
            host,
            settings,
            state: DialogState::Closed,
            session: None,
            last_token: SessionToken::default(),
            event_tx,
            tasks: Vec::new(),
        };
        (dialog, event_rx)
    }

    pub fn state(&self) -> DialogState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Work is in flight and events are expected.
    pub fn is_busy(&self) -> bool {
        matches!(self.state, DialogState::Loading | DialogState::Dispatching)
    }

    /// Opens the view on `source` with a fresh session and starts the load.
    ///
    /// An already open view is closed first.
    pub fn show_modal(&mut self, source: FeedSource) -> SessionToken {
        if self.state != DialogState::Closed {
            tracing::debug!(state = %self.state, "Reopening feed view, closing current session");
            self.close();
        }

        self.host.pause_refresh();

        let token = self.last_token.next();
        self.last_token = token;
        let session = Session::new(token, &source);
        tracing::info!(token = %token, title = %session.title, "Opening feed view");

        self.host.set_title(&session.title);
        self.host.show_loading(true);
        self.session = Some(session);
        self.state = DialogState::Loading;

        let remote = Arc::clone(&self.remote);
        self.spawn(LOAD_TASK, token, async move {
            let result = match &source {
                FeedSource::Saved(def) => remote.view_feed(def.id).await,
                FeedSource::Preview(p) => remote.preview_feed(&p.name, &p.url, &p.filter).await,
            };
            DialogEvent::ItemsLoaded { token, result }
        });

        token
    }

    /// Applies one background result. Events from other sessions are dropped.
    pub fn handle_event(&mut self, event: DialogEvent) {
        let live = self.session.as_ref().map(Session::token);
        if live != Some(event.token()) {
            tracing::debug!(event_token = %event.token(), live = ?live.map(SessionToken::get), "Discarding stale dialog event");
            return;
        }

        match event {
            DialogEvent::ItemsLoaded { result, .. } => self.on_items_loaded(result),
            DialogEvent::DispatchProgress {
                completed, total, ..
            } => {
                if self.state == DialogState::Dispatching {
                    self.host.dispatch_progress(completed, total);
                }
            }
            DialogEvent::DispatchFinished { batch, result, .. } => {
                self.on_dispatch_finished(batch, result)
            }
            DialogEvent::TransmitDelayElapsed { batch, .. } => self.on_transmit_delay(batch),
            DialogEvent::TaskPanicked { task, error, .. } => self.on_task_panicked(task, error),
        }
    }

    /// Drives `events` until the view is neither loading nor dispatching.
    pub async fn settle(&mut self, events: &mut mpsc::Receiver<DialogEvent>) {
        while self.is_busy() {
            match events.recv().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }
    }

    pub fn set_filter(&mut self, filter: StatusFilter) -> Result<(), DialogError> {
        self.require_ready()?.filter = filter;
        self.refresh_projection();
        Ok(())
    }

    pub fn set_naming(&mut self, naming: NamingMode) -> Result<(), DialogError> {
        self.require_ready()?.naming = naming;
        self.refresh_projection();
        Ok(())
    }

    /// Enqueues the checked rows in item order.
    ///
    /// With nothing checked the operator is told to select items and the view
    /// stays ready.
    pub fn fetch(&mut self) -> Result<(), DialogError> {
        self.require_ready()?;
        let checked = self.host.checked_rows();
        let session = self.require_ready()?;

        match DispatchQueue::from_selection(session.items(), &checked) {
            Ok(queue) => {
                session.pending_retry = None;
                self.start_dispatch(queue);
                Ok(())
            }
            Err(err) => {
                tracing::debug!("Fetch requested with empty selection");
                self.host.notify(Notice::SelectItems);
                Err(err.into())
            }
        }
    }

    /// Re-dispatches the failed job of the last batch and everything after it.
    pub fn retry(&mut self) -> Result<(), DialogError> {
        let failure = self
            .require_ready()?
            .pending_retry
            .take()
            .ok_or(DialogError::NothingToRetry)?;
        tracing::info!(
            failed = %failure.failed.name,
            remaining = failure.remaining.len(),
            "Retrying halted batch"
        );
        self.start_dispatch(failure.into_retry_queue());
        Ok(())
    }

    /// Closes the view from any state. Outstanding work is abandoned.
    pub fn cancel(&mut self) {
        if self.state != DialogState::Closed {
            tracing::info!(state = %self.state, "Feed view cancelled");
            self.close();
        }
    }

    fn require_ready(&mut self) -> Result<&mut Session, DialogError> {
        match (self.state, self.session.as_mut()) {
            (DialogState::Ready, Some(session)) => Ok(session),
            (state, _) => Err(DialogError::NotReady(state)),
        }
    }

    fn spawn<F>(&mut self, task: &'static str, token: SessionToken, future: F)
    where
        F: std::future::Future<Output = DialogEvent> + Send + 'static,
    {
        self.tasks.retain(|handle| !handle.is_finished());
        let handle = spawn_guarded(task, token, self.event_tx.clone(), future);
        self.tasks.push(handle);
    }

    fn projection_context(&self) -> ProjectionContext {
        ProjectionContext::new(self.settings.time_zone_correction_hours)
    }

    /// Recomputes the projection and pushes it to the table on page 1.
    fn refresh_projection(&mut self) {
        let ctx = self.projection_context();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.reproject(&ctx);
        session.current_page = 1;

        if let Some(projection) = session.projection.as_ref() {
            let pager_visible = projection.pager_visible(self.settings.page_size);
            self.host.update_table(projection, pager_visible);
            self.host.set_current_page(1);
        }
    }

    fn on_items_loaded(&mut self, result: Result<Vec<FeedItem>, RpcError>) {
        if self.state != DialogState::Loading {
            tracing::debug!(state = %self.state, "Ignoring load result outside loading");
            return;
        }

        let items = match result {
            Ok(items) => items,
            Err(e) => return self.fail_load(LoadError::Rpc(e)),
        };
        if let Some(url) = find_duplicate_url(&items).map(str::to_owned) {
            return self.fail_load(LoadError::DuplicateUrl(url));
        }

        let count = items.len();
        if let Some(session) = self.session.as_mut() {
            session.items = Some(Arc::new(items));
        }
        self.state = DialogState::Ready;
        self.host.show_loading(false);
        self.refresh_projection();
        self.host.set_controls_enabled(true);

        let token = self.last_token;
        tracing::info!(token = %token, items = count, "Feed view ready");
    }

    fn fail_load(&mut self, err: LoadError) {
        tracing::error!(error = %err, "Feed load failed");
        self.close();
        self.host.alert("Error", &err.to_string());
    }

    fn start_dispatch(&mut self, queue: DispatchQueue) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.batch += 1;
        let batch = session.batch;
        let token = session.token;
        let defaults = session.defaults.clone();
        let total = queue.len();

        self.state = DialogState::Dispatching;
        self.host.set_controls_enabled(false);
        tracing::info!(token = %token, batch, jobs = total, "Dispatching selection");

        let delay = self.settings.transmit_delay;
        self.spawn(TRANSMIT_TASK, token, async move {
            tokio::time::sleep(delay).await;
            DialogEvent::TransmitDelayElapsed { token, batch }
        });

        let remote = Arc::clone(&self.remote);
        let event_tx = self.event_tx.clone();
        self.spawn(DISPATCH_TASK, token, async move {
            let (progress_tx, mut progress_rx) =
                mpsc::channel::<(usize, usize)>(EVENT_CHANNEL_CAPACITY);

            let forward = async {
                while let Some((completed, total)) = progress_rx.recv().await {
                    let event = DialogEvent::DispatchProgress {
                        token,
                        completed,
                        total,
                    };
                    if let Err(e) = event_tx.send(event).await {
                        tracing::warn!(error = %e, event = "DispatchProgress", "Channel send failed (receiver dropped)");
                        break;
                    }
                }
            };
            let run = dispatch_sequential(&*remote, queue, &defaults, Some(progress_tx));
            let (result, ()) = futures::join!(run, forward);

            DialogEvent::DispatchFinished {
                token,
                batch,
                result,
            }
        });
    }

    fn on_transmit_delay(&mut self, batch: u64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if self.state == DialogState::Dispatching && session.batch == batch {
            session.transmit_visible = true;
            self.host.set_transmit_visible(true);
        }
    }

    fn hide_transmit(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if session.transmit_visible {
                session.transmit_visible = false;
                self.host.set_transmit_visible(false);
            }
        }
    }

    fn on_dispatch_finished(&mut self, batch: u64, result: Result<DispatchReport, DispatchFailure>) {
        let current = self.session.as_ref().map(|s| s.batch);
        if self.state != DialogState::Dispatching || current != Some(batch) {
            tracing::debug!(batch, "Ignoring result of a superseded batch");
            return;
        }
        self.hide_transmit();

        match result {
            Ok(report) => {
                let count = report.dispatched.len();
                tracing::info!(count, "All selected items enqueued");
                self.close();
                self.host.notify(Notice::Fetched { count });
            }
            Err(failure) => {
                tracing::error!(
                    failed = %failure.failed.name,
                    completed = failure.completed,
                    remaining = failure.remaining.len(),
                    error = %failure.error,
                    "Dispatch halted"
                );
                let message = if failure.remaining.is_empty() {
                    failure.to_string()
                } else {
                    format!(
                        "{failure}\n{} more item(s) were not sent",
                        failure.remaining.len()
                    )
                };

                self.state = DialogState::Ready;
                self.host.set_controls_enabled(true);
                self.host.alert("Error", &message);
                if let Some(session) = self.session.as_mut() {
                    session.pending_retry = Some(failure);
                }
            }
        }
    }

    fn on_task_panicked(&mut self, task: &'static str, error: String) {
        match (self.state, task) {
            (DialogState::Loading, LOAD_TASK) => self.fail_load(LoadError::TaskPanicked(error)),
            (DialogState::Dispatching, DISPATCH_TASK) => {
                self.hide_transmit();
                self.state = DialogState::Ready;
                self.host.set_controls_enabled(true);
                self.host
                    .alert("Error", &format!("Dispatch failed unexpectedly: {error}"));
            }
            (state, task) => {
                tracing::warn!(task, state = %state, error = %error, "Ignoring panic of unrelated task");
            }
        }
    }

    /// Common exit into `Closed`.
    fn close(&mut self) {
        if self.state == DialogState::Closed {
            return;
        }
        for handle in self.tasks.drain(..) {
            handle.abort();
        }
        self.hide_transmit();
        self.host.show_loading(false);
        self.host.clear_table();
        self.session = None;
        self.state = DialogState::Closed;
        self.host.resume_refresh();
        tracing::info!(token = %self.last_token, "Feed view closed");
    }
}

impl<R: RemoteApi + 'static, H: DialogHost> Drop for FeedDialog<R, H> {
    fn drop(&mut self) {
        self.close();
    }
}
