//! Integration tests for the feed view lifecycle.
//!
//! A scripted remote stands in for the server and a recording host captures
//! every chrome call, so the tests can assert on what the operator would see.

use nzbfeed::dialog::{
    DialogError, DialogEvent, DialogSettings, DialogState, FeedDialog, FeedSource, PreviewParams,
};
use nzbfeed::feed::{ConfigEntry, FeedDefinition, FeedItem, NamingMode, Projection, StatusFilter};
use nzbfeed::host::{DialogHost, Notice};
use nzbfeed::rpc::{AppendRequest, RemoteApi, RpcError};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Test doubles
// ============================================================================

fn item(url: &str, status: &str, filename: &str, title: &str) -> FeedItem {
    serde_json::from_value(json!({
        "URL": url,
        "Status": status,
        "Filename": filename,
        "Title": title,
        "Category": "",
        "Time": 0,
        "SizeMB": 0,
        "SizeLo": 0,
        "SizeHi": 0
    }))
    .unwrap()
}

#[derive(Default)]
struct ScriptedRemote {
    items: Vec<FeedItem>,
    load_error: bool,
    failing_urls: Mutex<HashSet<String>>,
    append_delay: Duration,
    appends: Mutex<Vec<AppendRequest>>,
    loads: Mutex<usize>,
}

impl ScriptedRemote {
    fn with_items(items: Vec<FeedItem>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    fn appended_urls(&self) -> Vec<String> {
        self.appends
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }

    fn load(&self) -> Result<Vec<FeedItem>, RpcError> {
        *self.loads.lock().unwrap() += 1;
        if self.load_error {
            return Err(RpcError::Remote {
                code: 3,
                message: "Invalid feed".to_string(),
            });
        }
        Ok(self.items.clone())
    }
}

impl RemoteApi for ScriptedRemote {
    async fn fetch_feeds(&self) -> Result<(), RpcError> {
        Ok(())
    }

    async fn view_feed(&self, _id: u32) -> Result<Vec<FeedItem>, RpcError> {
        self.load()
    }

    async fn preview_feed(
        &self,
        _name: &str,
        url: &str,
        _filter: &str,
    ) -> Result<Vec<FeedItem>, RpcError> {
        if url == "panic" {
            panic!("preview exploded");
        }
        self.load()
    }

    async fn append_url(&self, request: &AppendRequest) -> Result<bool, RpcError> {
        if !self.append_delay.is_zero() {
            tokio::time::sleep(self.append_delay).await;
        }
        if request.url == "explode" {
            panic!("append exploded");
        }
        self.appends.lock().unwrap().push(request.clone());
        if self.failing_urls.lock().unwrap().contains(&request.url) {
            return Err(RpcError::HttpStatus(500));
        }
        Ok(true)
    }

    async fn load_config(&self) -> Result<Vec<ConfigEntry>, RpcError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum HostCall {
    Pause,
    Resume,
    Notify(Notice),
    Alert(String),
    Table { rows: usize, pager: bool },
    Page(usize),
    Controls(bool),
    Transmit(bool),
    ClearTable,
}

/// Host whose call log outlives the dialog.
#[derive(Clone, Default)]
struct RecordingHost {
    log: Arc<Mutex<Vec<HostCall>>>,
    checked: Arc<Mutex<HashSet<String>>>,
    last_table: Arc<Mutex<Option<Projection>>>,
}

impl RecordingHost {
    fn calls(&self) -> Vec<HostCall> {
        self.log.lock().unwrap().clone()
    }

    fn count(&self, call: &HostCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    fn notices(&self) -> Vec<Notice> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::Notify(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    fn alerts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::Alert(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    fn check(&self, urls: &[&str]) {
        *self.checked.lock().unwrap() = urls.iter().map(|u| u.to_string()).collect();
    }

    fn table(&self) -> Projection {
        self.last_table.lock().unwrap().clone().unwrap()
    }

    fn push(&self, call: HostCall) {
        self.log.lock().unwrap().push(call);
    }
}

impl DialogHost for RecordingHost {
    fn pause_refresh(&mut self) {
        self.push(HostCall::Pause);
    }
    fn resume_refresh(&mut self) {
        self.push(HostCall::Resume);
    }
    fn notify(&mut self, notice: Notice) {
        self.push(HostCall::Notify(notice));
    }
    fn alert(&mut self, _title: &str, message: &str) {
        self.push(HostCall::Alert(message.to_string()));
    }
    fn update_table(&mut self, projection: &Projection, pager_visible: bool) {
        self.push(HostCall::Table {
            rows: projection.rows.len(),
            pager: pager_visible,
        });
        *self.last_table.lock().unwrap() = Some(projection.clone());
    }
    fn checked_rows(&self) -> HashSet<String> {
        self.checked.lock().unwrap().clone()
    }
    fn clear_table(&mut self) {
        self.push(HostCall::ClearTable);
    }
    fn set_current_page(&mut self, page: usize) {
        self.push(HostCall::Page(page));
    }
    fn set_controls_enabled(&mut self, enabled: bool) {
        self.push(HostCall::Controls(enabled));
    }
    fn set_transmit_visible(&mut self, visible: bool) {
        self.push(HostCall::Transmit(visible));
    }
}

fn saved_feed() -> FeedSource {
    FeedSource::Saved(FeedDefinition {
        id: 1,
        url: "https://indexer.example.com/rss".to_string(),
        name: "Indexer".to_string(),
        category: "TV".to_string(),
        priority: "5".to_string(),
    })
}

fn two_items() -> Vec<FeedItem> {
    vec![
        item("u1", "NEW", "a", "A"),
        item("u2", "FETCHED", "b", "B"),
    ]
}

fn open(
    remote: ScriptedRemote,
) -> (
    FeedDialog<ScriptedRemote, RecordingHost>,
    tokio::sync::mpsc::Receiver<DialogEvent>,
    Arc<ScriptedRemote>,
    RecordingHost,
) {
    let remote = Arc::new(remote);
    let host = RecordingHost::default();
    let (dialog, events) =
        FeedDialog::new(Arc::clone(&remote), host.clone(), DialogSettings::default());
    (dialog, events, remote, host)
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_view_select_dispatch_close() {
    let (mut dialog, mut events, remote, host) = open(ScriptedRemote::with_items(two_items()));

    dialog.show_modal(saved_feed());
    assert_eq!(dialog.state(), DialogState::Loading);
    dialog.settle(&mut events).await;
    assert_eq!(dialog.state(), DialogState::Ready);

    let table = host.table();
    assert_eq!(table.rows.len(), 2);
    assert_eq!((table.counts.new, table.counts.fetched, table.counts.backlog), (1, 1, 0));
    assert_eq!(dialog.session().unwrap().title(), "Indexer");

    host.check(&["u2"]);
    dialog.fetch().unwrap();
    assert_eq!(dialog.state(), DialogState::Dispatching);
    dialog.settle(&mut events).await;

    assert_eq!(dialog.state(), DialogState::Closed);
    assert_eq!(
        *remote.appends.lock().unwrap(),
        vec![AppendRequest {
            name: "b.nzb".to_string(),
            category: "TV".to_string(),
            priority: 5,
            paused: false,
            url: "u2".to_string(),
        }]
    );
    assert_eq!(host.notices(), vec![Notice::Fetched { count: 1 }]);
    assert_eq!(host.count(&HostCall::Pause), 1);
    assert_eq!(host.count(&HostCall::Resume), 1);
    assert_eq!(host.count(&HostCall::ClearTable), 1);
}

#[tokio::test]
async fn test_empty_selection_stays_ready() {
    let (mut dialog, mut events, remote, host) = open(ScriptedRemote::with_items(two_items()));

    dialog.show_modal(saved_feed());
    dialog.settle(&mut events).await;

    assert_eq!(dialog.fetch(), Err(DialogError::EmptySelection));
    assert_eq!(host.count(&HostCall::ClearTable), 0);
    assert_eq!(dialog.state(), DialogState::Ready);
    assert!(remote.appends.lock().unwrap().is_empty());
    assert_eq!(host.notices(), vec![Notice::SelectItems]);
    assert_eq!(host.count(&HostCall::Resume), 0);
}

#[tokio::test]
async fn test_dispatch_follows_item_order() {
    let items = vec![
        item("a", "NEW", "first", "First"),
        item("b", "NEW", "second", "Second"),
        item("c", "BACKLOG", "third.nzb", "Third"),
    ];
    let (mut dialog, mut events, remote, host) = open(ScriptedRemote::with_items(items));

    dialog.show_modal(saved_feed());
    dialog.settle(&mut events).await;
    host.check(&["c", "a"]);
    dialog.fetch().unwrap();
    dialog.settle(&mut events).await;

    assert_eq!(remote.appended_urls(), vec!["a", "c"]);
    let names: Vec<String> = remote
        .appends
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.name.clone())
        .collect();
    assert_eq!(names, vec!["first.nzb", "third.nzb"]);
}

#[tokio::test]
async fn test_dispatch_failure_halts_then_retry_completes() {
    let items = vec![
        item("a", "NEW", "a", "a"),
        item("b", "NEW", "b", "b"),
        item("c", "NEW", "c", "c"),
    ];
    let remote = ScriptedRemote::with_items(items);
    remote.failing_urls.lock().unwrap().insert("b".to_string());
    let (mut dialog, mut events, remote, host) = open(remote);

    dialog.show_modal(saved_feed());
    dialog.settle(&mut events).await;
    host.check(&["a", "b", "c"]);
    dialog.fetch().unwrap();
    dialog.settle(&mut events).await;

    // Halted at b; c never attempted
    assert_eq!(dialog.state(), DialogState::Ready);
    assert_eq!(remote.appended_urls(), vec!["a", "b"]);
    let failure = dialog.session().unwrap().pending_retry().unwrap();
    assert_eq!(failure.failed.url, "b");
    assert_eq!(failure.completed, 1);
    assert_eq!(failure.remaining.len(), 1);
    let last_controls = host
        .calls()
        .into_iter()
        .rev()
        .find(|c| matches!(c, HostCall::Controls(_)));
    assert_eq!(last_controls, Some(HostCall::Controls(true)));
    let alerts = host.alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("b.nzb"));
    assert_eq!(host.count(&HostCall::Resume), 0);

    remote.failing_urls.lock().unwrap().clear();
    dialog.retry().unwrap();
    dialog.settle(&mut events).await;

    assert_eq!(dialog.state(), DialogState::Closed);
    assert_eq!(remote.appended_urls(), vec!["a", "b", "b", "c"]);
    assert_eq!(host.notices(), vec![Notice::Fetched { count: 2 }]);
    assert_eq!(host.count(&HostCall::Resume), 1);
}

#[tokio::test]
async fn test_retry_without_failure_rejected() {
    let (mut dialog, mut events, _remote, _host) = open(ScriptedRemote::with_items(two_items()));
    dialog.show_modal(saved_feed());
    dialog.settle(&mut events).await;
    assert_eq!(dialog.retry(), Err(DialogError::NothingToRetry));
}

#[tokio::test]
async fn test_load_failure_closes_and_resumes_refresh() {
    let remote = ScriptedRemote {
        load_error: true,
        ..Default::default()
    };
    let (mut dialog, mut events, _remote, host) = open(remote);

    dialog.show_modal(saved_feed());
    dialog.settle(&mut events).await;

    assert_eq!(dialog.state(), DialogState::Closed);
    assert!(dialog.session().is_none());
    assert_eq!(host.count(&HostCall::Pause), 1);
    assert_eq!(host.count(&HostCall::Resume), 1);
    let alerts = host.alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("Invalid feed"));
}

#[tokio::test]
async fn test_duplicate_urls_rejected_at_load() {
    let items = vec![item("u1", "NEW", "a", "A"), item("u1", "BACKLOG", "b", "B")];
    let (mut dialog, mut events, _remote, host) = open(ScriptedRemote::with_items(items));

    dialog.show_modal(saved_feed());
    dialog.settle(&mut events).await;

    assert_eq!(dialog.state(), DialogState::Closed);
    assert!(host.alerts()[0].contains("duplicate"));
    assert_eq!(host.count(&HostCall::Resume), 1);
}

#[tokio::test]
async fn test_load_panic_closes_view() {
    let (mut dialog, mut events, _remote, host) = open(ScriptedRemote::default());

    dialog.show_modal(FeedSource::Preview(PreviewParams {
        url: "panic".to_string(),
        ..Default::default()
    }));
    dialog.settle(&mut events).await;

    assert_eq!(dialog.state(), DialogState::Closed);
    assert!(host.alerts()[0].contains("preview exploded"));
    assert_eq!(host.count(&HostCall::Resume), 1);
}

// ============================================================================
// Filtering
// ============================================================================

#[tokio::test]
async fn test_filter_and_naming_changes_reproject() {
    let items = vec![
        item("u1", "NEW", "a.file", "A"),
        item("u2", "FETCHED", "b", "b"),
        item("u3", "NEW", "c", "c"),
    ];
    let (mut dialog, mut events, _remote, host) = open(ScriptedRemote::with_items(items));

    dialog.show_modal(saved_feed());
    dialog.settle(&mut events).await;
    let initial = host.table();
    assert!(initial.names_differ);

    dialog.set_filter(StatusFilter::New).unwrap();
    let filtered = host.table();
    assert_eq!(filtered.ids().collect::<Vec<_>>(), vec!["u1", "u3"]);
    assert_eq!(filtered.counts, initial.counts);
    assert!(filtered.names_differ);

    dialog.set_naming(NamingMode::Filename).unwrap();
    let renamed = host.table();
    assert_eq!(renamed.rows.len(), 2);
    assert_eq!(renamed.rows[0].search, "NEW a.file   ");

    let session = dialog.session().unwrap();
    assert_eq!(session.filter(), StatusFilter::New);
    assert_eq!(session.naming(), NamingMode::Filename);
    assert_eq!(session.current_page(), 1);
    // Initial load plus one per change, each followed by a reset to page 1
    assert_eq!(host.count(&HostCall::Page(1)), 3);
}

#[tokio::test]
async fn test_pager_shown_only_past_one_page() {
    let items: Vec<FeedItem> = (0..101)
        .map(|i| item(&format!("u{i}"), if i == 0 { "BACKLOG" } else { "NEW" }, "f", "f"))
        .collect();
    let (mut dialog, mut events, _remote, host) = open(ScriptedRemote::with_items(items));

    dialog.show_modal(saved_feed());
    dialog.settle(&mut events).await;
    dialog.set_filter(StatusFilter::New).unwrap();

    let tables: Vec<HostCall> = host
        .calls()
        .into_iter()
        .filter(|c| matches!(c, HostCall::Table { .. }))
        .collect();
    assert_eq!(
        tables,
        vec![
            HostCall::Table { rows: 101, pager: true },
            HostCall::Table { rows: 100, pager: false },
        ]
    );
}

#[tokio::test]
async fn test_operations_rejected_while_loading() {
    let (mut dialog, mut events, _remote, host) = open(ScriptedRemote::with_items(two_items()));

    dialog.show_modal(saved_feed());
    host.check(&["u1"]);
    assert_eq!(
        dialog.set_filter(StatusFilter::New),
        Err(DialogError::NotReady(DialogState::Loading))
    );
    assert_eq!(dialog.fetch(), Err(DialogError::NotReady(DialogState::Loading)));
    assert!(host.notices().is_empty());
    dialog.settle(&mut events).await;
    assert_eq!(dialog.state(), DialogState::Ready);
}

// ============================================================================
// Sessions and cancellation
// ============================================================================

#[tokio::test]
async fn test_stale_load_result_discarded() {
    let (mut dialog, mut events, _remote, host) = open(ScriptedRemote::with_items(two_items()));

    let first = dialog.show_modal(saved_feed());
    let second = dialog.show_modal(FeedSource::Preview(PreviewParams::default()));
    assert_ne!(first, second);

    // A late answer for the first session must not populate the second
    dialog.handle_event(DialogEvent::ItemsLoaded {
        token: first,
        result: Ok(vec![item("stale", "NEW", "s", "s")]),
    });
    assert_eq!(dialog.state(), DialogState::Loading);

    dialog.settle(&mut events).await;
    let session = dialog.session().unwrap();
    assert_eq!(session.token(), second);
    assert_eq!(session.title(), "Feed Preview");
    assert_eq!(session.items().len(), 2);
    assert!(session.items().iter().all(|i| i.url != "stale"));

    // Reopen closed the first session: one resume, two pauses
    assert_eq!(host.count(&HostCall::Pause), 2);
    assert_eq!(host.count(&HostCall::Resume), 1);
}

#[tokio::test]
async fn test_reopen_starts_fresh_session() {
    let (mut dialog, mut events, _remote, _host) = open(ScriptedRemote::with_items(two_items()));

    dialog.show_modal(saved_feed());
    dialog.settle(&mut events).await;
    dialog.set_filter(StatusFilter::Fetched).unwrap();
    dialog.set_naming(NamingMode::Filename).unwrap();

    dialog.show_modal(saved_feed());
    dialog.settle(&mut events).await;
    let session = dialog.session().unwrap();
    assert_eq!(session.filter(), StatusFilter::All);
    assert_eq!(session.naming(), NamingMode::Title);
    assert_eq!(session.projection().unwrap().rows.len(), 2);
}

#[tokio::test]
async fn test_cancel_while_loading_ignores_late_result() {
    let (mut dialog, _events, _remote, host) = open(ScriptedRemote::with_items(two_items()));

    let token = dialog.show_modal(saved_feed());
    dialog.cancel();
    assert_eq!(dialog.state(), DialogState::Closed);

    dialog.handle_event(DialogEvent::ItemsLoaded {
        token,
        result: Ok(two_items()),
    });
    assert_eq!(dialog.state(), DialogState::Closed);
    assert!(!host.calls().iter().any(|c| matches!(c, HostCall::Table { .. })));
    assert_eq!(host.count(&HostCall::Resume), 1);

    // Cancelling a closed view does nothing
    dialog.cancel();
    assert_eq!(host.count(&HostCall::Resume), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_dispatching() {
    let remote = ScriptedRemote {
        items: two_items(),
        append_delay: Duration::from_secs(2),
        ..Default::default()
    };
    let (mut dialog, mut events, remote, host) = open(remote);

    dialog.show_modal(saved_feed());
    dialog.settle(&mut events).await;
    host.check(&["u1", "u2"]);
    dialog.fetch().unwrap();

    // u1 acknowledged, u2 still in flight
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(remote.appended_urls(), vec!["u1"]);
    dialog.cancel();
    assert_eq!(dialog.state(), DialogState::Closed);

    tokio::time::sleep(Duration::from_secs(10)).await;
    while let Ok(event) = events.try_recv() {
        dialog.handle_event(event);
    }

    assert_eq!(dialog.state(), DialogState::Closed);
    assert_eq!(remote.appended_urls(), vec!["u1"]);
    assert!(host.notices().is_empty());
    assert_eq!(host.count(&HostCall::Resume), 1);
    assert_eq!(host.count(&HostCall::ClearTable), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_panic_returns_to_ready() {
    let remote = ScriptedRemote {
        items: vec![item("u1", "NEW", "a", "A"), item("explode", "NEW", "x", "X")],
        append_delay: Duration::from_secs(2),
        ..Default::default()
    };
    let (mut dialog, mut events, remote, host) = open(remote);

    dialog.show_modal(saved_feed());
    dialog.settle(&mut events).await;
    host.check(&["u1", "explode"]);
    dialog.fetch().unwrap();
    dialog.settle(&mut events).await;

    assert_eq!(dialog.state(), DialogState::Ready);
    assert_eq!(remote.appended_urls(), vec!["u1"]);
    assert!(dialog.session().unwrap().pending_retry().is_none());

    let calls = host.calls();
    let last_controls = calls.iter().rev().find(|c| matches!(c, HostCall::Controls(_)));
    assert_eq!(last_controls, Some(&HostCall::Controls(true)));
    let transmit: Vec<&HostCall> = calls
        .iter()
        .filter(|c| matches!(c, HostCall::Transmit(_)))
        .collect();
    assert_eq!(transmit, vec![&HostCall::Transmit(true), &HostCall::Transmit(false)]);

    let alerts = host.alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("append exploded"));
    assert!(host.notices().is_empty());
    assert_eq!(host.count(&HostCall::Resume), 0);
    assert_eq!(dialog.retry(), Err(DialogError::NothingToRetry));
}

#[tokio::test]
async fn test_drop_resumes_refresh() {
    let host = RecordingHost::default();
    {
        let remote = Arc::new(ScriptedRemote::with_items(two_items()));
        let (mut dialog, _events) = FeedDialog::new(remote, host.clone(), DialogSettings::default());
        dialog.show_modal(saved_feed());
    }
    assert_eq!(host.count(&HostCall::Pause), 1);
    assert_eq!(host.count(&HostCall::Resume), 1);
}

// ============================================================================
// Transmit indicator
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_transmit_indicator_after_delay() {
    let remote = ScriptedRemote {
        items: two_items(),
        append_delay: Duration::from_secs(2),
        ..Default::default()
    };
    let (mut dialog, mut events, _remote, host) = open(remote);

    dialog.show_modal(saved_feed());
    dialog.settle(&mut events).await;
    host.check(&["u1"]);
    dialog.fetch().unwrap();
    dialog.settle(&mut events).await;

    assert_eq!(dialog.state(), DialogState::Closed);
    let transmit: Vec<HostCall> = host
        .calls()
        .into_iter()
        .filter(|c| matches!(c, HostCall::Transmit(_)))
        .collect();
    assert_eq!(transmit, vec![HostCall::Transmit(true), HostCall::Transmit(false)]);
}

#[tokio::test(start_paused = true)]
async fn test_fast_dispatch_never_shows_transmit() {
    let (mut dialog, mut events, remote, host) = open(ScriptedRemote::with_items(two_items()));

    dialog.show_modal(saved_feed());
    dialog.settle(&mut events).await;
    host.check(&["u1", "u2"]);
    dialog.fetch().unwrap();
    dialog.settle(&mut events).await;

    assert_eq!(dialog.state(), DialogState::Closed);
    assert!(!host.calls().iter().any(|c| matches!(c, HostCall::Transmit(_))));
    assert_eq!(*remote.loads.lock().unwrap(), 1);
}
