//! Feed view and preview for an NZBGet-style download server.
//!
//! Loads the items of a saved or ad hoc feed over JSON-RPC, projects them
//! through a status filter into table rows, and enqueues a selection one
//! item at a time, in feed order.

pub mod config;
pub mod dialog;
pub mod dispatch;
pub mod feed;
pub mod host;
pub mod rpc;
pub mod util;
