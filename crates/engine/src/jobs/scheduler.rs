use std::collections::VecDeque;

use tracing::error;

use super::catalog::{CatalogError, JobCatalog, JobRepository};
use super::job::JobId;

/// Cyclic release queue. Ids are launched in `release_time` order and the
/// whole cycle restarts once the queue runs dry; delivered jobs come back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseScheduler {
    base_order: Vec<JobId>,
    pending_queue: VecDeque<JobId>,
}

impl ReleaseScheduler {
    pub fn from_catalog(catalog: &JobCatalog) -> Self {
        let mut scheduler = Self::default();
        if let Err(error) = scheduler.rebuild(catalog.all_ids(), catalog) {
            error!(error = %error, "scheduler_rebuild_failed");
        }
        scheduler
    }

    /// Stable sort of `ids` by release time. Fails without touching the
    /// current order if an id cannot be resolved.
    pub fn rebuild<R>(&mut self, ids: Vec<JobId>, repo: &R) -> Result<(), CatalogError>
    where
        R: JobRepository + ?Sized,
    {
        let mut keyed = Vec::with_capacity(ids.len());
        for id in ids {
            let release_time = repo.get(&id)?.release_time;
            keyed.push((release_time, id));
        }
        keyed.sort_by_key(|(release_time, _)| *release_time);
        *self = Self::with_base_order(keyed.into_iter().map(|(_, id)| id).collect());
        Ok(())
    }

    pub fn pop_next(&mut self) -> Option<JobId> {
        if self.pending_queue.is_empty() {
            self.pending_queue = self.base_order.iter().cloned().collect();
        }
        self.pending_queue.pop_front()
    }

    pub fn base_order(&self) -> &[JobId] {
        &self.base_order
    }

    pub fn pending_queue(&self) -> impl ExactSizeIterator<Item = &JobId> + '_ {
        self.pending_queue.iter()
    }

    /// Rebuilds from saved parts; `pending` must be a suffix of `base_order`.
    pub(crate) fn from_parts(base_order: Vec<JobId>, pending: Vec<JobId>) -> Result<Self, String> {
        if pending.len() > base_order.len() {
            return Err(format!(
                "pending queue has {} ids but base order only {}",
                pending.len(),
                base_order.len()
            ));
        }
        let offset = base_order.len() - pending.len();
        if base_order[offset..] != pending[..] {
            return Err("pending queue is not a suffix of the base order".to_string());
        }
        Ok(Self {
            base_order,
            pending_queue: pending.into(),
        })
    }

    fn with_base_order(base_order: Vec<JobId>) -> Self {
        Self {
            pending_queue: base_order.iter().cloned().collect(),
            base_order,
        }
    }
}
