//! Feed item data model and its view projection.
//!
//! - [`item`] - [`FeedItem`] as delivered by `viewfeed` / `previewfeed`
//! - [`projection`] - pure filter/naming projection into table rows
//! - [`catalog`] - saved feed definitions read from the server options
//!
//! # Example
//!
//! ```ignore
//! use nzbfeed::feed::{project, NamingMode, ProjectionContext, StatusFilter};
//!
//! let projection = project(&items, StatusFilter::New, NamingMode::Title, &ProjectionContext::new(0));
//! println!("{} new of {}", projection.rows.len(), projection.counts.all());
//! ```

mod catalog;
mod item;
mod projection;

pub use catalog::{feed_definitions, menu_entries, ConfigEntry, FeedDefinition, FeedOptions};
pub use item::{find_duplicate_url, FeedItem, FeedItemStatus};
pub use projection::{
    project, project_latched, FeedRow, NamesDifferLatch, NamingMode, Projection,
    ProjectionContext, StatusCounts, StatusFilter, DEFAULT_PAGE_SIZE,
};

#[cfg(test)]
pub(crate) use item::test_item;
