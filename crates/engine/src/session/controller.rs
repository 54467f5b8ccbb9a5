use std::sync::Arc;

use tracing::{debug, error, info, trace};

use crate::jobs::{
    manhattan, CatalogError, GridPos, HistoryEntry, HistorySummaryEntry, InventoryOrder, Job,
    JobCatalog, JobId, JobRepository, Ledger, ReleaseScheduler,
};
use crate::persistence::{decode_state, LedgerRecord, RestoreError, SchedulerRecord, StateRecord};

use super::clock::Clock;
use super::config::JobLogicConfig;
use super::events::{JobEvent, JobEventCounts};
use super::markers::{world_to_cell, DropoffMarker, PickupMarker, WorldPos};
use super::reputation::Reputation;

enum AcceptOutcome {
    Accepted(JobEvent),
    OverCapacity,
    Stale,
    Unresolved,
}

/// Drives offers, acceptance and delivery once per simulation tick.
///
/// Owns the scheduler and ledger outright; the catalog is shared read-only.
#[derive(Debug, Clone)]
pub struct JobController {
    config: JobLogicConfig,
    catalog: Arc<JobCatalog>,
    scheduler: ReleaseScheduler,
    ledger: Ledger,
    clock: Clock,
    offer_emission_timer: f64,
    pickup_markers: Vec<PickupMarker>,
    dropoff_markers: Vec<DropoffMarker>,
    reputation: Reputation,
    event_counts: JobEventCounts,
}

impl JobController {
    pub fn new(catalog: Arc<JobCatalog>, config: JobLogicConfig) -> Self {
        Self {
            scheduler: ReleaseScheduler::from_catalog(&catalog),
            ledger: Ledger::default(),
            clock: Clock::default(),
            offer_emission_timer: config.initial_offer_timer_seconds,
            pickup_markers: Vec::new(),
            dropoff_markers: Vec::new(),
            reputation: Reputation::new(config.initial_reputation),
            event_counts: JobEventCounts::default(),
            catalog,
            config,
        }
    }

    /// Discards markers, timers and ledger state and rebuilds the scheduler
    /// from the current catalog.
    pub fn reset(&mut self) {
        *self = Self::new(Arc::clone(&self.catalog), self.config.clone());
        info!(job_count = self.catalog.len(), "job_session_reset");
    }

    pub fn replace_catalog(&mut self, catalog: Arc<JobCatalog>) {
        self.catalog = catalog;
        self.reset();
    }

    pub fn tick(&mut self, dt_seconds: f64, player: WorldPos) -> Vec<JobEvent> {
        let applied = self.clock.advance(dt_seconds);
        self.offer_emission_timer += applied;

        let mut events = Vec::new();
        self.launch_due_offers(&mut events);
        self.expire_stale_offers(&mut events);

        let player_cell = world_to_cell(player, self.config.tile_size);
        self.accept_nearby_offers(player_cell, &mut events);
        self.deliver_current_job(player_cell, &mut events);

        for event in &events {
            self.event_counts.record(event);
        }
        events
    }

    pub fn set_current_job(&mut self, job_id: Option<JobId>) -> bool {
        let requested = job_id.clone();
        let changed = self.ledger.set_current(job_id);
        if !changed {
            debug!(
                job_id = ?requested,
                transition = "set_current",
                "ledger_transition_ignored"
            );
        }
        changed
    }

    /// Sum of payouts over delivered jobs.
    pub fn money(&self) -> f64 {
        self.ledger
            .history()
            .iter()
            .filter(|entry| entry.accepted)
            .filter_map(|entry| self.resolve_logged(&entry.job_id))
            .map(|job| job.payout)
            .sum()
    }

    /// Sum of weights over the current inventory.
    pub fn weight(&self) -> f64 {
        self.ledger
            .inventory()
            .iter()
            .filter_map(|id| self.resolve_logged(id))
            .map(|job| job.weight)
            .sum()
    }

    pub fn reputation(&self) -> i32 {
        self.reputation.value()
    }

    pub fn elapsed_time(&self) -> f64 {
        self.clock.now()
    }

    pub fn offer_emission_timer(&self) -> f64 {
        self.offer_emission_timer
    }

    pub fn pickup_markers(&self) -> &[PickupMarker] {
        &self.pickup_markers
    }

    pub fn dropoff_markers(&self) -> &[DropoffMarker] {
        &self.dropoff_markers
    }

    pub fn inventory_jobs(&self) -> Vec<&Job> {
        self.ledger
            .inventory()
            .iter()
            .filter_map(|id| self.resolve_logged(id))
            .collect()
    }

    pub fn inventory_view(&self, order: InventoryOrder) -> Result<Vec<JobId>, CatalogError> {
        self.ledger.inventory_view(self.catalog.as_ref(), order)
    }

    pub fn current_job(&self) -> Option<&Job> {
        self.ledger
            .current_job_id()
            .and_then(|id| self.resolve_logged(id))
    }

    pub fn history(&self) -> &[HistoryEntry] {
        self.ledger.history()
    }

    pub fn history_summary(&self) -> Result<Vec<HistorySummaryEntry>, CatalogError> {
        self.ledger.history_summary(self.catalog.as_ref())
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn scheduler(&self) -> &ReleaseScheduler {
        &self.scheduler
    }

    pub fn catalog(&self) -> &Arc<JobCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &JobLogicConfig {
        &self.config
    }

    pub fn event_counts(&self) -> JobEventCounts {
        self.event_counts
    }

    pub fn save(&self) -> StateRecord {
        StateRecord {
            jobs: self.catalog.records(),
            scheduler: SchedulerRecord {
                base_order: self.scheduler.base_order().to_vec(),
                pending_queue: self.scheduler.pending_queue().cloned().collect(),
            },
            ledger: LedgerRecord {
                pending_offers: self.ledger.pending_offers().to_vec(),
                inventory: self.ledger.inventory().to_vec(),
                current_job_id: self.ledger.current_job_id().cloned(),
                history: self.ledger.history().to_vec(),
            },
            pickup_markers: self.pickup_markers.clone(),
            dropoff_markers: self.dropoff_markers.clone(),
            elapsed_time: self.clock.now(),
            offer_emission_timer: self.offer_emission_timer,
            reputation: self.reputation.value(),
        }
    }

    /// Replaces the whole session state. On error nothing is modified.
    pub fn restore(&mut self, record: StateRecord) -> Result<(), RestoreError> {
        let decoded = decode_state(record, &self.config)?;
        self.catalog = Arc::new(decoded.catalog);
        self.scheduler = decoded.scheduler;
        self.ledger = decoded.ledger;
        self.pickup_markers = decoded.pickup_markers;
        self.dropoff_markers = decoded.dropoff_markers;
        self.clock = Clock::at(decoded.elapsed_time);
        self.offer_emission_timer = decoded.offer_emission_timer;
        self.reputation = Reputation::new(decoded.reputation);
        self.event_counts = JobEventCounts::default();
        info!(
            elapsed_time = decoded.elapsed_time,
            job_count = self.catalog.len(),
            inventory = self.ledger.inventory().len(),
            "job_state_restored"
        );
        Ok(())
    }

    fn launch_due_offers(&mut self, events: &mut Vec<JobEvent>) {
        let interval = self.config.offer_interval_seconds;
        if interval.is_nan() || interval <= 0.0 {
            return;
        }
        let max_active = self.config.max_active_offers;
        // After a full cycle without a launch every id is stale until the
        // ledger changes; the backlog is dropped, keeping the fraction.
        let cycle_len = self.scheduler.base_order().len().max(1);
        let mut idle_pops = 0;
        while self.offer_emission_timer >= interval
            && self.pickup_markers.len() < max_active
            && self.dropoff_markers.len() < max_active
        {
            self.offer_emission_timer -= interval;
            let launched = match self.scheduler.pop_next() {
                Some(job_id) => self.launch_offer(job_id, events),
                None => false,
            };
            if launched {
                idle_pops = 0;
                continue;
            }
            idle_pops += 1;
            if idle_pops >= cycle_len {
                self.offer_emission_timer %= interval;
                break;
            }
        }
    }

    fn launch_offer(&mut self, job_id: JobId, events: &mut Vec<JobEvent>) -> bool {
        let cell = match self.catalog.get(&job_id) {
            Ok(job) => job.pickup,
            Err(error) => {
                error!(job_id = %job_id, error = %error, "offer_launch_unresolved");
                return false;
            }
        };
        let expires_at = self.clock.now() + self.config.offer_ttl_seconds;
        if !self.ledger.record_offer(job_id.clone(), expires_at) {
            debug!(
                job_id = %job_id,
                transition = "record_offer",
                "ledger_transition_ignored"
            );
            return false;
        }

        info!(
            job_id = %job_id,
            x = cell.x,
            y = cell.y,
            expires_at,
            "offer_launched"
        );
        self.pickup_markers.push(PickupMarker {
            job_id: job_id.clone(),
            cell,
            expires_at,
        });
        events.push(JobEvent::OfferLaunched {
            job_id,
            cell,
            expires_at,
        });
        true
    }

    fn expire_stale_offers(&mut self, events: &mut Vec<JobEvent>) {
        let clock = self.clock;
        let (expired, active): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pickup_markers)
            .into_iter()
            .partition(|marker| clock.has_reached(marker.expires_at));
        self.pickup_markers = active;

        for marker in expired {
            if !self.ledger.expire(&marker.job_id) {
                debug!(
                    job_id = %marker.job_id,
                    transition = "expire",
                    "ledger_transition_ignored"
                );
                continue;
            }
            self.reputation.lower(self.config.expiry_penalty);
            info!(
                job_id = %marker.job_id,
                reputation = self.reputation.value(),
                "offer_expired"
            );
            events.push(JobEvent::OfferExpired {
                job_id: marker.job_id,
                reputation: self.reputation.value(),
            });
        }
    }

    fn accept_nearby_offers(&mut self, player_cell: GridPos, events: &mut Vec<JobEvent>) {
        let radius = self.config.pickup_radius_cells;
        let markers = std::mem::take(&mut self.pickup_markers);
        let mut remaining = Vec::with_capacity(markers.len());

        for marker in markers {
            if manhattan(marker.cell, player_cell) > radius {
                remaining.push(marker);
                continue;
            }
            match self.try_accept(&marker) {
                AcceptOutcome::Accepted(event) => events.push(event),
                AcceptOutcome::OverCapacity | AcceptOutcome::Unresolved => remaining.push(marker),
                AcceptOutcome::Stale => {}
            }
        }
        self.pickup_markers = remaining;
    }

    fn try_accept(&mut self, marker: &PickupMarker) -> AcceptOutcome {
        let carried = self.weight();
        let (job_weight, dropoff) = match self.catalog.get(&marker.job_id) {
            Ok(job) => (job.weight, job.dropoff),
            Err(error) => {
                error!(job_id = %marker.job_id, error = %error, "offer_accept_unresolved");
                return AcceptOutcome::Unresolved;
            }
        };
        if carried + job_weight > self.config.weight_capacity {
            trace!(
                job_id = %marker.job_id,
                carried,
                job_weight,
                capacity = self.config.weight_capacity,
                "offer_accept_over_capacity"
            );
            return AcceptOutcome::OverCapacity;
        }
        if !self.ledger.accept(&marker.job_id) {
            debug!(
                job_id = %marker.job_id,
                transition = "accept",
                "ledger_transition_ignored"
            );
            return AcceptOutcome::Stale;
        }

        let due_at = self.clock.now() + self.config.delivery_window_seconds;
        self.dropoff_markers.push(DropoffMarker {
            job_id: marker.job_id.clone(),
            cell: dropoff,
            due_at,
        });
        info!(
            job_id = %marker.job_id,
            due_at,
            weight = carried + job_weight,
            "offer_accepted"
        );
        AcceptOutcome::Accepted(JobEvent::OfferAccepted {
            job_id: marker.job_id.clone(),
            dropoff,
            due_at,
        })
    }

    /// Only the current job's dropoff is checked; other inventory jobs wait
    /// until they are selected.
    fn deliver_current_job(&mut self, player_cell: GridPos, events: &mut Vec<JobEvent>) {
        let Some(current) = self.ledger.current_job_id().cloned() else {
            return;
        };
        let Some(index) = self
            .dropoff_markers
            .iter()
            .position(|marker| marker.job_id == current)
        else {
            return;
        };
        let marker = &self.dropoff_markers[index];
        if manhattan(marker.cell, player_cell) > self.config.dropoff_radius_cells {
            return;
        }
        let on_time = self.clock.now() <= marker.due_at;
        let payout = match self.catalog.get(&current) {
            Ok(job) => job.payout,
            Err(error) => {
                error!(job_id = %current, error = %error, "delivery_unresolved");
                return;
            }
        };

        self.dropoff_markers.remove(index);
        if !self.ledger.mark_delivered(&current, on_time) {
            debug!(
                job_id = %current,
                transition = "mark_delivered",
                "ledger_transition_ignored"
            );
            return;
        }
        if on_time {
            self.reputation.raise(self.config.on_time_reward);
        } else {
            self.reputation.lower(self.config.late_penalty);
        }
        info!(
            job_id = %current,
            on_time,
            payout,
            reputation = self.reputation.value(),
            "job_delivered"
        );
        events.push(JobEvent::JobDelivered {
            job_id: current,
            on_time,
            payout,
            reputation: self.reputation.value(),
        });
    }

    fn resolve_logged(&self, id: &JobId) -> Option<&Job> {
        match self.catalog.get(id) {
            Ok(job) => Some(job),
            Err(error) => {
                error!(job_id = %id, error = %error, "job_lookup_failed");
                None
            }
        }
    }
}
