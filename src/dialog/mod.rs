//! Feed view/preview dialog controller.
//!
//! - [`FeedDialog`] - state machine from open to close
//! - [`Session`] - the per-open state, rebuilt on every [`FeedDialog::show_modal`]
//! - [`DialogEvent`] - results of background tasks, stamped with a [`SessionToken`]
//!
//! # Example
//!
//! ```ignore
//! let (mut dialog, mut events) = FeedDialog::new(remote, host, DialogSettings::default());
//! dialog.show_modal(FeedSource::Saved(definition));
//! dialog.settle(&mut events).await;
//! dialog.set_filter(StatusFilter::New)?;
//! dialog.fetch()?;
//! dialog.settle(&mut events).await;
//! ```

mod controller;
mod events;
mod session;

pub use controller::{DialogError, DialogSettings, DialogState, FeedDialog, LoadError};
pub use events::DialogEvent;
pub use session::{FeedSource, PreviewParams, Session, SessionToken};
