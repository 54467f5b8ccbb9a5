use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::CatalogError;

const DEADLINE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DEADLINE_FORMAT_FRACTIONAL: &str = "%Y-%m-%dT%H:%M:%S%.9f";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

pub fn manhattan(a: GridPos, b: GridPos) -> u32 {
    a.x.abs_diff(b.x) + a.y.abs_diff(b.y)
}

/// Wire shape of one job as delivered by the job feed and stored in saves.
///
/// Coordinates stay as plain vectors here so a malformed pair surfaces as a
/// catalog validation error instead of a parse error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub pickup: Vec<i32>,
    pub dropoff: Vec<i32>,
    pub payout: f64,
    pub deadline: String,
    pub weight: f64,
    pub priority: i32,
    pub release_time: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub pickup: GridPos,
    pub dropoff: GridPos,
    pub payout: f64,
    /// UTC-normalized, timezone-free.
    pub deadline: NaiveDateTime,
    pub weight: f64,
    /// Higher is more urgent.
    pub priority: i32,
    /// Seconds from session start.
    pub release_time: i64,
}

impl Job {
    pub fn from_record(record: &JobRecord, path: &str) -> Result<Self, CatalogError> {
        if record.id.trim().is_empty() {
            return Err(CatalogError::validation(
                format!("{path}.id"),
                "expected non-empty id",
            ));
        }
        let pickup = grid_pos_from_pair(&record.pickup, &format!("{path}.pickup"))?;
        let dropoff = grid_pos_from_pair(&record.dropoff, &format!("{path}.dropoff"))?;
        let payout = non_negative(record.payout, &format!("{path}.payout"))?;
        let weight = non_negative(record.weight, &format!("{path}.weight"))?;
        let deadline = parse_deadline(&record.deadline).ok_or_else(|| {
            CatalogError::validation(
                format!("{path}.deadline"),
                format!("unparseable ISO 8601 timestamp '{}'", record.deadline),
            )
        })?;

        Ok(Self {
            id: JobId::new(record.id.clone()),
            pickup,
            dropoff,
            payout,
            deadline,
            weight,
            priority: record.priority,
            release_time: record.release_time,
        })
    }

    pub fn to_record(&self) -> JobRecord {
        JobRecord {
            id: self.id.as_str().to_string(),
            pickup: vec![self.pickup.x, self.pickup.y],
            dropoff: vec![self.dropoff.x, self.dropoff.y],
            payout: self.payout,
            deadline: format_deadline(self.deadline),
            weight: self.weight,
            priority: self.priority,
            release_time: self.release_time,
        }
    }

    pub fn is_released(&self, game_seconds: f64) -> bool {
        game_seconds >= self.release_time as f64
    }

    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        now > self.deadline
    }

    /// Negative once the deadline has passed.
    pub fn seconds_to_deadline(&self, now: NaiveDateTime) -> f64 {
        let delta = self.deadline - now;
        delta.num_milliseconds() as f64 / 1000.0
    }

    /// Player to pickup to dropoff, in cells.
    pub fn approx_route_distance(&self, player_cell: GridPos) -> u32 {
        manhattan(player_cell, self.pickup) + manhattan(self.pickup, self.dropoff)
    }

    pub fn value_ratio(&self, player_cell: GridPos) -> f64 {
        let distance = self.approx_route_distance(player_cell).max(1);
        self.payout / distance as f64
    }

    /// Deadline ascending, then priority descending, then payout descending.
    pub fn cmp_by_deadline(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then_with(|| other.priority.cmp(&self.priority))
            .then_with(|| other.payout.total_cmp(&self.payout))
    }

    /// Priority descending, then deadline ascending.
    pub fn cmp_by_priority(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.deadline.cmp(&other.deadline))
    }
}

/// Accepts RFC 3339 (`Z` or `+HH:MM`), naive `YYYY-MM-DDTHH:MM:SS[.fff]`, or
/// a bare date. Offsets are folded into UTC and dropped.
pub fn parse_deadline(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(with_offset.with_timezone(&Utc).naive_utc());
    }
    if let Ok(naive) = trimmed.parse::<NaiveDateTime>() {
        return Some(naive);
    }
    trimmed
        .parse::<NaiveDate>()
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

pub fn format_deadline(deadline: NaiveDateTime) -> String {
    use chrono::Timelike;
    if deadline.nanosecond() == 0 {
        deadline.format(DEADLINE_FORMAT).to_string()
    } else {
        deadline.format(DEADLINE_FORMAT_FRACTIONAL).to_string()
    }
}

fn grid_pos_from_pair(pair: &[i32], path: &str) -> Result<GridPos, CatalogError> {
    match pair {
        [x, y] => Ok(GridPos::new(*x, *y)),
        other => Err(CatalogError::validation(
            path,
            format!("expected [x, y] pair, got {} values", other.len()),
        )),
    }
}

fn non_negative(value: f64, path: &str) -> Result<f64, CatalogError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(CatalogError::validation(
            path,
            format!("expected non-negative number, got {value}"),
        ))
    }
}

#[cfg(test)]
pub(crate) fn sample_record(id: &str, release_time: i64) -> JobRecord {
    JobRecord {
        id: id.to_string(),
        pickup: vec![2, 3],
        dropoff: vec![10, 4],
        payout: 100.0,
        deadline: "2025-09-01T12:01:00".to_string(),
        weight: 2.0,
        priority: 1,
        release_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_with_offset_is_normalized_to_utc() {
        let parsed = parse_deadline("2025-09-01T14:00:00+02:00").expect("parse");
        assert_eq!(format_deadline(parsed), "2025-09-01T12:00:00");
        let zulu = parse_deadline("2025-09-01T12:00:00Z").expect("parse zulu");
        assert_eq!(parsed, zulu);
    }

    #[test]
    fn deadline_accepts_naive_and_date_only_forms() {
        assert!(parse_deadline("2025-09-01T12:00:00").is_some());
        assert!(parse_deadline("2025-09-01T12:00:00.250").is_some());
        let midnight = parse_deadline("2025-09-01").expect("date only");
        assert_eq!(format_deadline(midnight), "2025-09-01T00:00:00");
        assert!(parse_deadline("tomorrow-ish").is_none());
    }

    #[test]
    fn record_round_trips_through_job() {
        let record = sample_record("J1", 0);
        let job = Job::from_record(&record, "jobs[0]").expect("valid");
        assert_eq!(job.pickup, GridPos::new(2, 3));
        assert_eq!(job.to_record(), record);
    }

    #[test]
    fn malformed_fields_report_their_path() {
        let mut record = sample_record("J1", 0);
        record.payout = -1.0;
        let err = Job::from_record(&record, "jobs[4]").expect_err("negative payout");
        assert!(err.to_string().contains("jobs[4].payout"), "{err}");

        let mut record = sample_record("J1", 0);
        record.dropoff = vec![1, 2, 3];
        let err = Job::from_record(&record, "jobs[0]").expect_err("bad pair");
        assert!(err.to_string().contains("jobs[0].dropoff"), "{err}");

        let mut record = sample_record("J1", 0);
        record.weight = f64::NAN;
        assert!(Job::from_record(&record, "jobs[0]").is_err());

        let mut record = sample_record("J1", 0);
        record.deadline = "soon".to_string();
        let err = Job::from_record(&record, "jobs[0]").expect_err("bad deadline");
        assert!(err.to_string().contains("deadline"), "{err}");
    }

    #[test]
    fn route_heuristics_use_manhattan_distance() {
        let job = Job::from_record(&sample_record("J1", 0), "jobs[0]").expect("valid");
        let player = GridPos::new(0, 0);
        assert_eq!(job.approx_route_distance(player), 5 + 9);
        assert!((job.value_ratio(player) - 100.0 / 14.0).abs() < 1e-9);
        assert!((job.value_ratio(job.pickup) - 100.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn deadline_checks_compare_against_now() {
        let job = Job::from_record(&sample_record("J1", 30), "jobs[0]").expect("valid");
        let before = parse_deadline("2025-09-01T12:00:00").expect("parse");
        let after = parse_deadline("2025-09-01T12:02:00").expect("parse");
        assert!(!job.is_overdue(before));
        assert!(job.is_overdue(after));
        assert!((job.seconds_to_deadline(before) - 60.0).abs() < 1e-9);
        assert!((job.seconds_to_deadline(after) + 60.0).abs() < 1e-9);
        assert!(!job.is_released(29.5));
        assert!(job.is_released(30.0));
    }

    #[test]
    fn orderings_break_ties_as_documented() {
        let base = Job::from_record(&sample_record("A", 0), "a").expect("valid");
        let mut urgent = base.clone();
        urgent.priority = 5;
        let mut richer = base.clone();
        richer.payout = 500.0;

        assert_eq!(urgent.cmp_by_deadline(&base), Ordering::Less);
        assert_eq!(richer.cmp_by_deadline(&base), Ordering::Less);
        assert_eq!(urgent.cmp_by_priority(&base), Ordering::Less);

        let mut later = base.clone();
        later.deadline = parse_deadline("2025-09-02T00:00:00").expect("parse");
        later.priority = 9;
        assert_eq!(base.cmp_by_deadline(&later), Ordering::Less);
        assert_eq!(later.cmp_by_priority(&base), Ordering::Less);
    }
}
