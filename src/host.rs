//! Host application surface the feed view drives.
//!
//! The host owns the table widget, the dialog chrome and the background
//! refresher of the rest of the application. The controller only talks to it
//! through [`DialogHost`].

use crate::feed::Projection;
use crate::rpc::{RemoteApi, RpcError};
use std::collections::HashSet;
use std::fmt;

/// Short operator notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// `fetchfeeds` was accepted by the server.
    FetchAllStarted,
    /// A fetch was requested with nothing checked.
    SelectItems,
    /// A batch was enqueued completely.
    Fetched { count: usize },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::FetchAllStarted => f.write_str("Fetching all feeds"),
            Notice::SelectItems => f.write_str("Please select items first"),
            Notice::Fetched { count: 1 } => f.write_str("1 item added to queue"),
            Notice::Fetched { count } => write!(f, "{count} items added to queue"),
        }
    }
}

/// Chrome collaborators of the feed view.
///
/// Methods with a default body are cosmetic; a headless host can ignore them.
pub trait DialogHost {
    /// Suspends the host's periodic refresh while the view is open.
    fn pause_refresh(&mut self);

    /// Resumes the periodic refresh. Called exactly once per close.
    fn resume_refresh(&mut self);

    fn notify(&mut self, notice: Notice);

    /// Modal error message.
    fn alert(&mut self, title: &str, message: &str);

    /// Replaces the table contents with `projection`.
    fn update_table(&mut self, projection: &Projection, pager_visible: bool);

    /// Identities (item URLs) of the rows currently checked in the table.
    fn checked_rows(&self) -> HashSet<String>;

    /// Empties the table when the view closes.
    fn clear_table(&mut self) {}

    fn set_title(&mut self, _title: &str) {}

    fn show_loading(&mut self, _loading: bool) {}

    fn set_current_page(&mut self, _page: usize) {}

    fn set_controls_enabled(&mut self, _enabled: bool) {}

    fn set_transmit_visible(&mut self, _visible: bool) {}

    fn dispatch_progress(&mut self, _completed: usize, _total: usize) {}
}

/// Asks the server to refresh every configured feed.
///
/// Success is announced with [`Notice::FetchAllStarted`]; failure is alerted
/// and returned.
pub async fn fetch_all<R, H>(remote: &R, host: &mut H) -> Result<(), RpcError>
where
    R: RemoteApi,
    H: DialogHost + ?Sized,
{
    match remote.fetch_feeds().await {
        Ok(()) => {
            tracing::info!("Requested refresh of all feeds");
            host.notify(Notice::FetchAllStarted);
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "fetchfeeds failed");
            host.alert("Error", &format!("Could not fetch feeds: {e}"));
            Err(e)
        }
    }
}
