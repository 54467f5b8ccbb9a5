use crate::jobs::{GridPos, JobId};

#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    OfferLaunched {
        job_id: JobId,
        cell: GridPos,
        expires_at: f64,
    },
    OfferExpired {
        job_id: JobId,
        reputation: i32,
    },
    OfferAccepted {
        job_id: JobId,
        dropoff: GridPos,
        due_at: f64,
    },
    JobDelivered {
        job_id: JobId,
        on_time: bool,
        payout: f64,
        reputation: i32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEventKind {
    OfferLaunched,
    OfferExpired,
    OfferAccepted,
    JobDelivered,
}

impl JobEvent {
    pub fn kind(&self) -> JobEventKind {
        match self {
            Self::OfferLaunched { .. } => JobEventKind::OfferLaunched,
            Self::OfferExpired { .. } => JobEventKind::OfferExpired,
            Self::OfferAccepted { .. } => JobEventKind::OfferAccepted,
            Self::JobDelivered { .. } => JobEventKind::JobDelivered,
        }
    }

    pub fn job_id(&self) -> &JobId {
        match self {
            Self::OfferLaunched { job_id, .. }
            | Self::OfferExpired { job_id, .. }
            | Self::OfferAccepted { job_id, .. }
            | Self::JobDelivered { job_id, .. } => job_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobEventCounts {
    pub total: u32,
    pub offers_launched: u32,
    pub offers_expired: u32,
    pub offers_accepted: u32,
    pub delivered_on_time: u32,
    pub delivered_late: u32,
}

impl JobEventCounts {
    pub fn record(&mut self, event: &JobEvent) {
        self.total = self.total.saturating_add(1);
        match event.kind() {
            JobEventKind::OfferLaunched => {
                self.offers_launched = self.offers_launched.saturating_add(1)
            }
            JobEventKind::OfferExpired => {
                self.offers_expired = self.offers_expired.saturating_add(1)
            }
            JobEventKind::OfferAccepted => {
                self.offers_accepted = self.offers_accepted.saturating_add(1)
            }
            JobEventKind::JobDelivered
                if matches!(event, JobEvent::JobDelivered { on_time: true, .. }) =>
            {
                self.delivered_on_time = self.delivered_on_time.saturating_add(1)
            }
            JobEventKind::JobDelivered => {
                self.delivered_late = self.delivered_late.saturating_add(1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_follow_event_kinds() {
        let events = [
            JobEvent::OfferLaunched {
                job_id: JobId::from("A"),
                cell: GridPos::new(1, 1),
                expires_at: 17.0,
            },
            JobEvent::OfferAccepted {
                job_id: JobId::from("A"),
                dropoff: GridPos::new(4, 4),
                due_at: 12.0,
            },
            JobEvent::JobDelivered {
                job_id: JobId::from("A"),
                on_time: false,
                payout: 50.0,
                reputation: 60,
            },
            JobEvent::OfferExpired {
                job_id: JobId::from("B"),
                reputation: 55,
            },
        ];
        let mut counts = JobEventCounts::default();
        for event in &events {
            counts.record(event);
        }

        assert_eq!(events[2].kind(), JobEventKind::JobDelivered);
        assert_eq!(events[3].job_id(), &JobId::from("B"));
        assert_eq!(
            counts,
            JobEventCounts {
                total: 4,
                offers_launched: 1,
                offers_expired: 1,
                offers_accepted: 1,
                delivered_on_time: 0,
                delivered_late: 1,
            }
        );
    }
}
