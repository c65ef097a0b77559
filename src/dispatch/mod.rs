//! Selection-to-queue conversion and sequential enqueueing.
//!
//! - [`queue`] - checked rows → ordered [`DispatchJob`]s
//! - [`dispatcher`] - single-flight `appendurl` loop with halt-on-failure

mod dispatcher;
mod queue;

pub use dispatcher::{dispatch_sequential, DispatchDefaults, DispatchFailure, DispatchReport};
pub use queue::{DispatchError, DispatchJob, DispatchQueue};
