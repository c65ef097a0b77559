//! Utility functions for common operations.
//!
//! This module provides reusable utilities for:
//!
//! - **URL validation**: shape checks for the server base URL and preview feed URLs
//! - **Text processing**: soft-break insertion, `.nzb` suffixing, control-char stripping
//! - **Formatting**: item age and size columns
//!
//! # Examples
//!
//! ```
//! use nzbfeed::util::{ensure_nzb_extension, validate_server_url};
//!
//! let url = validate_server_url("http://127.0.0.1:6789").unwrap();
//! assert_eq!(url.host_str(), Some("127.0.0.1"));
//!
//! assert_eq!(ensure_nzb_extension("Some.Release"), "Some.Release.nzb");
//! ```

mod format;
mod text;
mod url_validator;

pub use format::{format_age, format_item_size, format_size_mb};
pub use text::{ensure_nzb_extension, strip_control_chars, with_soft_breaks, SOFT_BREAK};
pub use url_validator::{validate_feed_url, validate_server_url, UrlValidationError};
