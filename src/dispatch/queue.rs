use crate::feed::FeedItem;
use crate::util::ensure_nzb_extension;
use std::collections::{HashSet, VecDeque};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Fetch requested with no checked rows.
    #[error("No items selected")]
    EmptySelection,
}

/// One item waiting to be enqueued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchJob {
    pub url: String,
    /// Target name sent to the server, always with a `.nzb` suffix.
    pub name: String,
    pub title: String,
}

impl DispatchJob {
    pub fn from_item(item: &FeedItem) -> Self {
        Self {
            url: item.url.clone(),
            name: ensure_nzb_extension(&item.filename).into_owned(),
            title: item.title.clone(),
        }
    }
}

/// Ordered list of jobs for one dispatch batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchQueue {
    jobs: VecDeque<DispatchJob>,
}

impl DispatchQueue {
    /// Builds the queue from the checked row identities.
    ///
    /// Jobs follow the order of `items`, not the order of `checked` or of the
    /// table. Identities with no matching item are ignored.
    pub fn from_selection(
        items: &[FeedItem],
        checked: &HashSet<String>,
    ) -> Result<Self, DispatchError> {
        let jobs = items
            .iter()
            .filter(|item| checked.contains(&item.url))
            .map(DispatchJob::from_item)
            .collect();
        Self::from_jobs(jobs)
    }

    pub fn from_jobs(jobs: VecDeque<DispatchJob>) -> Result<Self, DispatchError> {
        if jobs.is_empty() {
            return Err(DispatchError::EmptySelection);
        }
        Ok(Self { jobs })
    }

    pub(crate) fn headed_by(head: DispatchJob, rest: Vec<DispatchJob>) -> Self {
        let mut jobs: VecDeque<DispatchJob> = rest.into();
        jobs.push_front(head);
        Self { jobs }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DispatchJob> {
        self.jobs.iter()
    }

    pub(crate) fn pop_front(&mut self) -> Option<DispatchJob> {
        self.jobs.pop_front()
    }

    pub(crate) fn into_jobs(self) -> VecDeque<DispatchJob> {
        self.jobs
    }
}
