use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::jobs::{
    CatalogError, HistoryEntry, JobCatalog, JobId, JobRecord, Ledger, PendingOffer,
    ReleaseScheduler,
};
use crate::session::{
    DropoffMarker, JobLogicConfig, PickupMarker, REPUTATION_MAX, REPUTATION_MIN,
};

use super::RestoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerRecord {
    pub base_order: Vec<JobId>,
    pub pending_queue: Vec<JobId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub pending_offers: Vec<PendingOffer>,
    pub inventory: Vec<JobId>,
    pub current_job_id: Option<JobId>,
    pub history: Vec<HistoryEntry>,
}

/// Everything needed to resume a job session exactly. Times are absolute
/// values on the session clock, never wall-clock timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub jobs: Vec<JobRecord>,
    pub scheduler: SchedulerRecord,
    pub ledger: LedgerRecord,
    pub pickup_markers: Vec<PickupMarker>,
    pub dropoff_markers: Vec<DropoffMarker>,
    pub elapsed_time: f64,
    pub offer_emission_timer: f64,
    pub reputation: i32,
}

pub(crate) struct DecodedState {
    pub catalog: JobCatalog,
    pub scheduler: ReleaseScheduler,
    pub ledger: Ledger,
    pub pickup_markers: Vec<PickupMarker>,
    pub dropoff_markers: Vec<DropoffMarker>,
    pub elapsed_time: f64,
    pub offer_emission_timer: f64,
    pub reputation: i32,
}

/// Validates a saved record and builds fresh session parts from it.
pub(crate) fn decode_state(
    record: StateRecord,
    config: &JobLogicConfig,
) -> Result<DecodedState, RestoreError> {
    let catalog = JobCatalog::from_records(&record.jobs).map_err(|error| match error {
        CatalogError::Validation { path, message } => RestoreError::Validation {
            path: format!("state.{path}"),
            message,
        },
        other => invalid("state.jobs", other.to_string()),
    })?;

    non_negative_time("state.elapsed_time", record.elapsed_time)?;
    non_negative_time("state.offer_emission_timer", record.offer_emission_timer)?;
    // The timer starts at the initial value and only grows with elapsed time.
    let timer_bound = record.elapsed_time
        + config.initial_offer_timer_seconds.max(0.0)
        + config.offer_interval_seconds.max(0.0);
    if record.offer_emission_timer > timer_bound {
        return Err(expected_actual(
            "state.offer_emission_timer",
            format!("at most {timer_bound} seconds"),
            record.offer_emission_timer,
        ));
    }
    if !(REPUTATION_MIN..=REPUTATION_MAX).contains(&record.reputation) {
        return Err(expected_actual(
            "state.reputation",
            format!("value in {REPUTATION_MIN}..={REPUTATION_MAX}"),
            record.reputation,
        ));
    }

    let scheduler = decode_scheduler(&catalog, record.scheduler)?;
    let ledger = decode_ledger(&catalog, record.ledger)?;
    check_pickup_markers(&ledger, &record.pickup_markers)?;
    check_dropoff_markers(&ledger, &record.dropoff_markers)?;

    Ok(DecodedState {
        catalog,
        scheduler,
        ledger,
        pickup_markers: record.pickup_markers,
        dropoff_markers: record.dropoff_markers,
        elapsed_time: record.elapsed_time,
        offer_emission_timer: record.offer_emission_timer,
        reputation: record.reputation,
    })
}

fn decode_scheduler(
    catalog: &JobCatalog,
    record: SchedulerRecord,
) -> Result<ReleaseScheduler, RestoreError> {
    let mut seen = HashSet::with_capacity(record.base_order.len());
    for (index, id) in record.base_order.iter().enumerate() {
        let path = format!("state.scheduler.base_order[{index}]");
        ensure_known(catalog, id, &path)?;
        if !seen.insert(id) {
            return Err(invalid(path, format!("job '{id}' appears twice")));
        }
    }
    if seen.len() != catalog.len() {
        return Err(expected_actual(
            "state.scheduler.base_order",
            format!("{} catalog ids", catalog.len()),
            seen.len(),
        ));
    }

    ReleaseScheduler::from_parts(record.base_order, record.pending_queue)
        .map_err(|message| invalid("state.scheduler.pending_queue", message))
}

fn decode_ledger(catalog: &JobCatalog, record: LedgerRecord) -> Result<Ledger, RestoreError> {
    for (index, offer) in record.pending_offers.iter().enumerate() {
        let path = format!("state.ledger.pending_offers[{index}]");
        ensure_known(catalog, &offer.job_id, &format!("{path}.job_id"))?;
        finite_time(&format!("{path}.expires_at"), offer.expires_at)?;
    }
    for (index, id) in record.inventory.iter().enumerate() {
        ensure_known(catalog, id, &format!("state.ledger.inventory[{index}]"))?;
    }
    for (index, entry) in record.history.iter().enumerate() {
        let path = format!("state.ledger.history[{index}]");
        ensure_known(catalog, &entry.job_id, &format!("{path}.job_id"))?;
        if entry.on_time && !entry.accepted {
            return Err(invalid(path, "on_time entry must also be accepted"));
        }
    }

    Ledger::from_parts(
        record.pending_offers,
        record.inventory,
        record.current_job_id,
        record.history,
    )
    .map_err(|message| invalid("state.ledger", message))
}

fn check_pickup_markers(ledger: &Ledger, markers: &[PickupMarker]) -> Result<(), RestoreError> {
    if markers.len() != ledger.pending_offers().len() {
        return Err(expected_actual(
            "state.pickup_markers",
            format!("{} markers (one per pending offer)", ledger.pending_offers().len()),
            markers.len(),
        ));
    }
    for (index, marker) in markers.iter().enumerate() {
        let path = format!("state.pickup_markers[{index}]");
        match ledger.offer_expiry(&marker.job_id) {
            Some(expires_at) if expires_at == marker.expires_at => {}
            Some(expires_at) => {
                return Err(expected_actual(
                    &format!("{path}.expires_at"),
                    expires_at,
                    marker.expires_at,
                ))
            }
            None => {
                return Err(invalid(
                    format!("{path}.job_id"),
                    format!("job '{}' has no pending offer", marker.job_id),
                ))
            }
        }
        if markers[..index]
            .iter()
            .any(|earlier| earlier.job_id == marker.job_id)
        {
            return Err(invalid(path, format!("duplicate marker for '{}'", marker.job_id)));
        }
    }
    Ok(())
}

fn check_dropoff_markers(ledger: &Ledger, markers: &[DropoffMarker]) -> Result<(), RestoreError> {
    if markers.len() != ledger.inventory().len() {
        return Err(expected_actual(
            "state.dropoff_markers",
            format!("{} markers (one per inventory job)", ledger.inventory().len()),
            markers.len(),
        ));
    }
    for (index, marker) in markers.iter().enumerate() {
        let path = format!("state.dropoff_markers[{index}]");
        if !ledger.in_inventory(&marker.job_id) {
            return Err(invalid(
                format!("{path}.job_id"),
                format!("job '{}' is not in inventory", marker.job_id),
            ));
        }
        if markers[..index]
            .iter()
            .any(|earlier| earlier.job_id == marker.job_id)
        {
            return Err(invalid(path, format!("duplicate marker for '{}'", marker.job_id)));
        }
        finite_time(&format!("{path}.due_at"), marker.due_at)?;
    }
    Ok(())
}

fn ensure_known(catalog: &JobCatalog, id: &JobId, path: &str) -> Result<(), RestoreError> {
    if catalog.contains(id) {
        Ok(())
    } else {
        Err(invalid(path, format!("unknown job '{id}'")))
    }
}

fn non_negative_time(path: &str, value: f64) -> Result<(), RestoreError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(expected_actual(path, "finite non-negative seconds", value))
    }
}

fn finite_time(path: &str, value: f64) -> Result<(), RestoreError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(expected_actual(path, "finite seconds", value))
    }
}

fn invalid(path: impl Into<String>, message: impl Into<String>) -> RestoreError {
    RestoreError::Validation {
        path: path.into(),
        message: message.into(),
    }
}

fn expected_actual(
    path: &str,
    expected: impl std::fmt::Display,
    actual: impl std::fmt::Display,
) -> RestoreError {
    invalid(path, format!("expected {expected}, got {actual}"))
}
