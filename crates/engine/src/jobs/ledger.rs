use serde::{Deserialize, Serialize};

use super::catalog::{CatalogError, JobRepository};
use super::job::{Job, JobId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub job_id: JobId,
    pub accepted: bool,
    pub on_time: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOffer {
    pub job_id: JobId,
    pub expires_at: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InventoryOrder {
    #[default]
    Insertion,
    Deadline,
    Priority,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistorySummaryEntry {
    pub job: Job,
    pub accepted: bool,
    pub on_time: bool,
}

/// Offers, inventory and history for one session.
///
/// Every transition returns `false` instead of failing when the id is not in
/// the expected state; callers treat that as a stale event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    pending_offers: Vec<PendingOffer>,
    inventory: Vec<JobId>,
    current_job_id: Option<JobId>,
    history: Vec<HistoryEntry>,
}

impl Ledger {
    pub fn record_offer(&mut self, job_id: JobId, expires_at: f64) -> bool {
        if self.is_offered(&job_id) || self.in_inventory(&job_id) {
            return false;
        }
        self.pending_offers.push(PendingOffer { job_id, expires_at });
        true
    }

    pub fn accept(&mut self, job_id: &JobId) -> bool {
        if !self.take_offer(job_id) {
            return false;
        }
        self.inventory.push(job_id.clone());
        if self.current_job_id.is_none() {
            self.current_job_id = Some(job_id.clone());
        }
        true
    }

    pub fn expire(&mut self, job_id: &JobId) -> bool {
        if !self.take_offer(job_id) {
            return false;
        }
        self.history.push(HistoryEntry {
            job_id: job_id.clone(),
            accepted: false,
            on_time: false,
        });
        true
    }

    pub fn mark_delivered(&mut self, job_id: &JobId, on_time: bool) -> bool {
        let Some(index) = self.inventory.iter().position(|id| id == job_id) else {
            return false;
        };
        self.inventory.remove(index);
        self.history.push(HistoryEntry {
            job_id: job_id.clone(),
            accepted: true,
            on_time,
        });
        if self.current_job_id.as_ref() == Some(job_id) {
            self.current_job_id = self.inventory.first().cloned();
        }
        true
    }

    pub fn set_current(&mut self, job_id: Option<JobId>) -> bool {
        match job_id {
            None => {
                self.current_job_id = None;
                true
            }
            Some(id) if self.in_inventory(&id) => {
                self.current_job_id = Some(id);
                true
            }
            Some(_) => false,
        }
    }

    pub fn is_offered(&self, job_id: &JobId) -> bool {
        self.pending_offers.iter().any(|offer| &offer.job_id == job_id)
    }

    pub fn in_inventory(&self, job_id: &JobId) -> bool {
        self.inventory.contains(job_id)
    }

    pub fn offer_expiry(&self, job_id: &JobId) -> Option<f64> {
        self.pending_offers
            .iter()
            .find(|offer| &offer.job_id == job_id)
            .map(|offer| offer.expires_at)
    }

    pub fn pending_offers(&self) -> &[PendingOffer] {
        &self.pending_offers
    }

    pub fn pending_offer_ids(&self) -> Vec<JobId> {
        self.pending_offers
            .iter()
            .map(|offer| offer.job_id.clone())
            .collect()
    }

    pub fn inventory(&self) -> &[JobId] {
        &self.inventory
    }

    pub fn current_job_id(&self) -> Option<&JobId> {
        self.current_job_id.as_ref()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Sorted copy of the inventory; insertion order is never changed.
    pub fn inventory_view<R>(
        &self,
        repo: &R,
        order: InventoryOrder,
    ) -> Result<Vec<JobId>, CatalogError>
    where
        R: JobRepository + ?Sized,
    {
        let mut jobs = self
            .inventory
            .iter()
            .map(|id| repo.get(id))
            .collect::<Result<Vec<&Job>, _>>()?;
        match order {
            InventoryOrder::Insertion => {}
            InventoryOrder::Deadline => jobs.sort_by(|a, b| a.cmp_by_deadline(b)),
            InventoryOrder::Priority => jobs.sort_by(|a, b| a.cmp_by_priority(b)),
        }
        Ok(jobs.into_iter().map(|job| job.id.clone()).collect())
    }

    pub fn history_summary<R>(&self, repo: &R) -> Result<Vec<HistorySummaryEntry>, CatalogError>
    where
        R: JobRepository + ?Sized,
    {
        self.history
            .iter()
            .map(|entry| {
                Ok(HistorySummaryEntry {
                    job: repo.get(&entry.job_id)?.clone(),
                    accepted: entry.accepted,
                    on_time: entry.on_time,
                })
            })
            .collect()
    }

    fn take_offer(&mut self, job_id: &JobId) -> bool {
        let before = self.pending_offers.len();
        self.pending_offers.retain(|offer| &offer.job_id != job_id);
        self.pending_offers.len() != before
    }

    /// Rebuilds a ledger from saved parts, checking the partition invariants.
    pub(crate) fn from_parts(
        pending_offers: Vec<PendingOffer>,
        inventory: Vec<JobId>,
        current_job_id: Option<JobId>,
        history: Vec<HistoryEntry>,
    ) -> Result<Self, String> {
        for (index, offer) in pending_offers.iter().enumerate() {
            if pending_offers[..index]
                .iter()
                .any(|earlier| earlier.job_id == offer.job_id)
            {
                return Err(format!("job '{}' is offered twice", offer.job_id));
            }
            if inventory.contains(&offer.job_id) {
                return Err(format!(
                    "job '{}' is both offered and in inventory",
                    offer.job_id
                ));
            }
        }
        for (index, id) in inventory.iter().enumerate() {
            if inventory[..index].contains(id) {
                return Err(format!("job '{id}' appears twice in inventory"));
            }
        }
        if let Some(current) = &current_job_id {
            if !inventory.contains(current) {
                return Err(format!("current job '{current}' is not in inventory"));
            }
        }
        Ok(Self {
            pending_offers,
            inventory,
            current_job_id,
            history,
        })
    }
}
