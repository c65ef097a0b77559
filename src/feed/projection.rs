//! Filter projection: items + status filter + naming mode → table rows.
//!
//! The projection is recomputed from scratch on every load, filter change and
//! naming change. It is cheap (one pass) and keeps no state of its own; the
//! only cross-call memory is the per-session [`NamesDifferLatch`].

use crate::feed::item::{FeedItem, FeedItemStatus};
use crate::util::{format_age, format_item_size, with_soft_breaks};
use chrono::{DateTime, Utc};
use std::cell::OnceCell;
use std::fmt;
use std::str::FromStr;

/// Rows per table page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

// ============================================================================
// Filter and naming mode
// ============================================================================

/// Status filter selected by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    New,
    Fetched,
    Backlog,
}

impl StatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "ALL",
            StatusFilter::New => "NEW",
            StatusFilter::Fetched => "FETCHED",
            StatusFilter::Backlog => "BACKLOG",
        }
    }

    /// Whether an item with `status` passes this filter.
    ///
    /// `Unknown` items are only visible under `All`.
    pub fn matches(self, status: FeedItemStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::New => status == FeedItemStatus::New,
            StatusFilter::Fetched => status == FeedItemStatus::Fetched,
            StatusFilter::Backlog => status == FeedItemStatus::Backlog,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ALL" => Ok(StatusFilter::All),
            "NEW" => Ok(StatusFilter::New),
            "FETCHED" => Ok(StatusFilter::Fetched),
            "BACKLOG" => Ok(StatusFilter::Backlog),
            other => Err(format!(
                "unknown status filter '{}' (expected all, new, fetched or backlog)",
                other.to_ascii_lowercase()
            )),
        }
    }
}

/// Which of the two item names is shown (and searched).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingMode {
    #[default]
    Title,
    Filename,
}

impl NamingMode {
    pub fn name_of(self, item: &FeedItem) -> &str {
        match self {
            NamingMode::Title => &item.title,
            NamingMode::Filename => &item.filename,
        }
    }

    /// Header of the name column.
    pub fn column_header(self) -> &'static str {
        match self {
            NamingMode::Title => "Title",
            NamingMode::Filename => "Filename",
        }
    }
}

// ============================================================================
// Projection output
// ============================================================================

/// Per-status totals over the full item set, independent of the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub new: usize,
    pub fetched: usize,
    pub backlog: usize,
}

impl StatusCounts {
    /// Total shown on the ALL badge. `Unknown` items are not counted.
    pub fn all(&self) -> usize {
        self.new + self.fetched + self.backlog
    }

    /// Badge value for a given filter.
    pub fn for_filter(&self, filter: StatusFilter) -> usize {
        match filter {
            StatusFilter::All => self.all(),
            StatusFilter::New => self.new,
            StatusFilter::Fetched => self.fetched,
            StatusFilter::Backlog => self.backlog,
        }
    }

    fn record(&mut self, status: FeedItemStatus) {
        match status {
            FeedItemStatus::New => self.new += 1,
            FeedItemStatus::Fetched => self.fetched += 1,
            FeedItemStatus::Backlog => self.backlog += 1,
            FeedItemStatus::Unknown => {}
        }
    }
}

/// One table row handed to the host's table widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRow {
    /// Row identity: the item URL.
    pub id: String,
    pub status_label: &'static str,
    /// Display name with soft breaks inserted.
    pub name: String,
    pub category: String,
    pub age: String,
    pub size: String,
    /// Text the widget's quick filter matches against (raw name, no breaks).
    pub search: String,
}

/// Inputs that affect formatting but not filtering.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionContext {
    pub now: DateTime<Utc>,
    pub time_zone_correction_hours: i32,
}

impl ProjectionContext {
    pub fn new(time_zone_correction_hours: i32) -> Self {
        Self {
            now: Utc::now(),
            time_zone_correction_hours,
        }
    }
}

/// Result of projecting an item set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub rows: Vec<FeedRow>,
    pub counts: StatusCounts,
    /// Some item's filename differs from its title; drives the naming toggle.
    pub names_differ: bool,
    pub filter: StatusFilter,
    pub naming: NamingMode,
}

impl Projection {
    /// Pager is only needed once the rows overflow one page.
    pub fn pager_visible(&self, page_size: usize) -> bool {
        self.rows.len() > page_size
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.id.as_str())
    }
}

// ============================================================================
// Projection
// ============================================================================

/// Projects `items` through `filter` and `naming`.
///
/// Counts and `names_differ` are taken over the full set before filtering,
/// so badges stay put when only the filter changes. Row order follows item
/// order.
pub fn project(
    items: &[FeedItem],
    filter: StatusFilter,
    naming: NamingMode,
    ctx: &ProjectionContext,
) -> Projection {
    let mut counts = StatusCounts::default();
    let mut names_differ = false;
    let mut rows = Vec::with_capacity(items.len());

    for item in items {
        counts.record(item.status);
        names_differ = names_differ || item.names_differ();

        if !filter.matches(item.status) {
            continue;
        }
        rows.push(build_row(item, naming, ctx));
    }

    Projection {
        rows,
        counts,
        names_differ,
        filter,
        naming,
    }
}

fn build_row(item: &FeedItem, naming: NamingMode, ctx: &ProjectionContext) -> FeedRow {
    let raw_name = naming.name_of(item);
    let age = format_age(item.time, ctx.time_zone_correction_hours, ctx.now);
    let size = if item.size_unknown() {
        String::new()
    } else {
        format_item_size(item.size_mb, item.size_bytes())
    };
    let status_label = item.status.as_str();
    let search = format!(
        "{} {} {} {} {}",
        status_label, raw_name, item.category, age, size
    );

    FeedRow {
        id: item.url.clone(),
        status_label,
        name: with_soft_breaks(raw_name).into_owned(),
        category: item.category.clone(),
        age,
        size,
        search,
    }
}

// ============================================================================
// Names-differ latch
// ============================================================================

/// Session-scoped memo of the `names_differ` flag.
///
/// The first projection of a session decides whether the naming toggle is
/// offered; later projections in the same session report that first answer
/// regardless of what they compute. A new session starts with a fresh latch.
#[derive(Debug, Default)]
pub struct NamesDifferLatch(OnceCell<bool>);

impl NamesDifferLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latches `computed` if nothing is latched yet, then returns the latched value.
    pub fn latch(&self, computed: bool) -> bool {
        *self.0.get_or_init(|| computed)
    }

    pub fn get(&self) -> Option<bool> {
        self.0.get().copied()
    }
}

/// [`project`] with `names_differ` routed through the session latch.
pub fn project_latched(
    items: &[FeedItem],
    filter: StatusFilter,
    naming: NamingMode,
    latch: &NamesDifferLatch,
    ctx: &ProjectionContext,
) -> Projection {
    let mut projection = project(items, filter, naming, ctx);
    projection.names_differ = latch.latch(projection.names_differ);
    projection
}
