use crate::dispatch::{DispatchDefaults, DispatchFailure};
use crate::feed::{
    project_latched, FeedDefinition, FeedItem, NamesDifferLatch, NamingMode, Projection,
    ProjectionContext, StatusFilter,
};
use std::fmt;
use std::sync::Arc;

/// Identity of one open/close cycle of the view.
///
/// Every background result carries the token of the session that started it;
/// results for any other token are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SessionToken(u64);

impl SessionToken {
    pub(crate) fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ad hoc feed definition shown without saving it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreviewParams {
    pub name: String,
    pub url: String,
    pub filter: String,
    pub category: String,
    pub priority: String,
}

/// What a session shows: a saved feed or a preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Saved(FeedDefinition),
    Preview(PreviewParams),
}

impl FeedSource {
    pub fn title(&self) -> String {
        match self {
            FeedSource::Saved(def) if !def.name.is_empty() => def.name.clone(),
            FeedSource::Saved(_) => "Feed".to_string(),
            FeedSource::Preview(p) if !p.name.is_empty() => p.name.clone(),
            FeedSource::Preview(_) => "Feed Preview".to_string(),
        }
    }

    pub fn defaults(&self) -> DispatchDefaults {
        match self {
            FeedSource::Saved(def) => DispatchDefaults::from_option_values(&def.category, &def.priority),
            FeedSource::Preview(p) => DispatchDefaults::from_option_values(&p.category, &p.priority),
        }
    }
}

/// Mutable state of one open view. Rebuilt from scratch on every open.
#[derive(Debug)]
pub struct Session {
    pub(crate) token: SessionToken,
    pub(crate) title: String,
    pub(crate) items: Option<Arc<Vec<FeedItem>>>,
    pub(crate) defaults: DispatchDefaults,
    pub(crate) filter: StatusFilter,
    pub(crate) naming: NamingMode,
    pub(crate) latch: NamesDifferLatch,
    pub(crate) projection: Option<Projection>,
    pub(crate) current_page: usize,
    /// Counter of dispatch batches started in this session.
    pub(crate) batch: u64,
    pub(crate) transmit_visible: bool,
    pub(crate) pending_retry: Option<DispatchFailure>,
}

impl Session {
    pub(crate) fn new(token: SessionToken, source: &FeedSource) -> Self {
        Self {
            token,
            title: source.title(),
            items: None,
            defaults: source.defaults(),
            filter: StatusFilter::default(),
            naming: NamingMode::default(),
            latch: NamesDifferLatch::new(),
            projection: None,
            current_page: 1,
            batch: 0,
            transmit_visible: false,
            pending_retry: None,
        }
    }

    pub(crate) fn reproject(&mut self, ctx: &ProjectionContext) {
        let Some(items) = self.items.as_deref() else {
            return;
        };
        self.projection = Some(project_latched(
            items,
            self.filter,
            self.naming,
            &self.latch,
            ctx,
        ));
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Loaded items, empty until the load completes.
    pub fn items(&self) -> &[FeedItem] {
        self.items.as_deref().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn defaults(&self) -> &DispatchDefaults {
        &self.defaults
    }

    pub fn filter(&self) -> StatusFilter {
        self.filter
    }

    pub fn naming(&self) -> NamingMode {
        self.naming
    }

    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn transmit_visible(&self) -> bool {
        self.transmit_visible
    }

    /// Failure of the last batch, kept until a retry or a new fetch.
    pub fn pending_retry(&self) -> Option<&DispatchFailure> {
        self.pending_retry.as_ref()
    }
}
