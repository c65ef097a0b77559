//! Remote procedure boundary.
//!
//! - [`api`] - the [`RemoteApi`] trait consumed by the feed view, plus its error type
//! - [`client`] - [`JsonRpcClient`], the HTTP JSON-RPC implementation

mod api;
mod client;

pub use api::{AppendRequest, RemoteApi, RpcError};
pub use client::JsonRpcClient;
