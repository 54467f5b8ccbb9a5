mod clock;
mod config;
mod controller;
mod events;
mod markers;
mod reputation;
mod run;

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::jobs::{fetch_catalog, FeedError, JobCatalog, JobFeed};
use crate::persistence::{
    read_save_game, write_save_game, RestoreError, SaveError, SaveGame, SAVE_VERSION,
};

pub use clock::Clock;
pub use config::{JobLogicConfig, RunConfig};
pub use controller::JobController;
pub use events::{JobEvent, JobEventCounts, JobEventKind};
pub use markers::{cell_center, world_to_cell, DropoffMarker, PickupMarker, WorldPos};
pub use reputation::{Reputation, REPUTATION_MAX, REPUTATION_MIN};
pub use run::{format_mmss, score, RunOutcome, RunRecord, RunState};

/// One playable run: the job feed, the controller fed by it and the
/// game-over countdown.
pub struct JobSession<F: JobFeed> {
    feed: F,
    controller: JobController,
    run: RunState,
}

impl<F: JobFeed> JobSession<F> {
    /// Performs the initial fetch. A failing feed starts the session with an
    /// empty catalog.
    pub fn new(feed: F, config: JobLogicConfig, run_config: RunConfig) -> Self {
        let catalog = match fetch_catalog(&feed) {
            Ok(catalog) => catalog,
            Err(error) => {
                warn!(error = %error, fallback = "empty_catalog", "job_feed_fallback");
                JobCatalog::default()
            }
        };
        info!(job_count = catalog.len(), "job_session_started");
        Self {
            feed,
            controller: JobController::new(Arc::new(catalog), config),
            run: RunState::new(run_config),
        }
    }

    /// Restarts the run on the catalog already loaded.
    pub fn reset(&mut self) {
        self.controller.reset();
        self.run.reset();
    }

    /// Re-fetches the catalog and restarts the run on it. On error the
    /// previous catalog and the running state are kept.
    pub fn refetch(&mut self) -> Result<usize, FeedError> {
        match fetch_catalog(&self.feed) {
            Ok(catalog) => {
                let job_count = catalog.len();
                self.controller.replace_catalog(Arc::new(catalog));
                self.run.reset();
                Ok(job_count)
            }
            Err(error) => {
                warn!(
                    error = %error,
                    fallback = "previous_catalog",
                    job_count = self.controller.catalog().len(),
                    "job_feed_fallback"
                );
                Err(error)
            }
        }
    }

    /// Advances controller and countdown together. Nothing advances once the
    /// run is decided.
    pub fn tick(&mut self, dt_seconds: f64, player: WorldPos) -> Vec<JobEvent> {
        if self.run.outcome().is_decided() {
            return Vec::new();
        }
        let events = self.controller.tick(dt_seconds, player);
        self.run.update(
            dt_seconds,
            self.controller.money(),
            self.controller.reputation(),
        );
        events
    }

    pub fn controller(&self) -> &JobController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut JobController {
        &mut self.controller
    }

    pub fn run(&self) -> &RunState {
        &self.run
    }

    pub fn outcome(&self) -> RunOutcome {
        self.run.outcome()
    }

    pub fn score(&self) -> f64 {
        score(self.controller.money())
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    pub fn save(&self) -> SaveGame {
        SaveGame::new(self.run.to_record(), self.controller.save())
    }

    /// Replaces controller and run state together. On error neither changes.
    pub fn restore(&mut self, save: SaveGame) -> Result<(), RestoreError> {
        if save.save_version != SAVE_VERSION {
            return Err(RestoreError::Version {
                expected: SAVE_VERSION,
                actual: save.save_version,
            });
        }
        let remaining = save.run.remaining_seconds;
        if !remaining.is_finite() || remaining < 0.0 {
            return Err(RestoreError::Validation {
                path: "run.remaining_seconds".to_string(),
                message: format!("expected finite non-negative seconds, got {remaining}"),
            });
        }

        self.controller.restore(save.state)?;
        self.run = RunState::from_record(
            self.run.config().clone(),
            &save.run,
            self.controller.money(),
        );
        info!(
            outcome = ?self.run.outcome(),
            remaining_seconds = remaining,
            "session_restored"
        );
        Ok(())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), SaveError> {
        write_save_game(path, &self.save())
    }

    pub fn load_from_path(&mut self, path: &Path) -> Result<(), RestoreError> {
        let save = read_save_game(path)?;
        self.restore(save)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::jobs::{sample_record, JobRecord, StaticJobFeed};

    struct FlakyFeed {
        records: Vec<JobRecord>,
        failing: Cell<bool>,
    }

    impl JobFeed for FlakyFeed {
        fn fetch_jobs(&self) -> Result<Vec<JobRecord>, FeedError> {
            if self.failing.get() {
                Err(FeedError::Parse {
                    message: "feed offline".to_string(),
                })
            } else {
                Ok(self.records.clone())
            }
        }
    }

    fn cell(x: i32, y: i32) -> WorldPos {
        WorldPos::new(x as f64 * 25.0 + 12.5, y as f64 * 25.0 + 12.5)
    }

    fn session() -> JobSession<StaticJobFeed> {
        JobSession::new(
            StaticJobFeed::new(vec![sample_record("J1", 0)]),
            JobLogicConfig::default(),
            RunConfig {
                time_limit_seconds: 30.0,
                money_goal: 100.0,
                reputation_floor: 20,
            },
        )
    }

    #[test]
    fn failing_initial_fetch_starts_empty() {
        let feed = FlakyFeed {
            records: vec![sample_record("J1", 0)],
            failing: Cell::new(true),
        };
        let mut session = JobSession::new(feed, JobLogicConfig::default(), RunConfig::default());
        assert!(session.controller().catalog().is_empty());

        let events = session.tick(10.0, cell(2, 3));
        assert!(events.is_empty());
        assert_eq!(session.controller().offer_emission_timer(), 3.0);

        session.feed().failing.set(false);
        assert_eq!(session.refetch().expect("refetch"), 1);
        assert_eq!(session.controller().elapsed_time(), 0.0);
        assert_eq!(session.controller().catalog().len(), 1);
    }

    #[test]
    fn failed_refetch_keeps_previous_catalog_and_progress() {
        let feed = FlakyFeed {
            records: vec![sample_record("J1", 0)],
            failing: Cell::new(false),
        };
        let mut session = JobSession::new(feed, JobLogicConfig::default(), RunConfig::default());
        session.tick(2.0, cell(2, 3));
        assert_eq!(session.controller().ledger().inventory().len(), 1);

        session.feed().failing.set(true);
        assert!(session.refetch().is_err());
        assert_eq!(session.controller().catalog().len(), 1);
        assert_eq!(session.controller().elapsed_time(), 2.0);
        assert_eq!(session.controller().ledger().inventory().len(), 1);
    }

    #[test]
    fn delivering_to_goal_wins_and_freezes_the_session() {
        let mut session = session();
        session.tick(2.0, cell(2, 3));
        session.tick(0.5, cell(10, 4));

        assert_eq!(session.outcome(), RunOutcome::Won);
        assert_eq!(session.score(), 100.0);
        assert_eq!(session.run().final_score(), Some(100.0));

        let before = session.save();
        assert!(session.tick(5.0, cell(2, 3)).is_empty());
        assert_eq!(session.save(), before);
    }

    #[test]
    fn countdown_expiry_loses_the_run() {
        let mut session = session();
        for _ in 0..30 {
            session.tick(1.0, WorldPos::new(5000.0, 5000.0));
        }
        assert_eq!(session.outcome(), RunOutcome::LostTime);
        assert_eq!(session.run().remaining_seconds(), 0.0);
    }

    #[test]
    fn save_file_round_trip_restores_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("saves").join("run.json");

        let mut original = session();
        original.tick(2.0, cell(2, 3));
        original.tick(1.0, WorldPos::new(5000.0, 5000.0));
        original.save_to_path(&path).expect("save");

        let mut loaded = session();
        loaded.load_from_path(&path).expect("load");
        assert_eq!(loaded.save(), original.save());
        assert_eq!(loaded.run().remaining_seconds(), 27.0);
        assert_eq!(
            loaded.tick(1.0, cell(10, 4)),
            original.tick(1.0, cell(10, 4))
        );
    }

    #[test]
    fn rejected_save_leaves_session_untouched() {
        let mut session = session();
        session.tick(2.0, cell(2, 3));
        let before = session.save();

        let mut wrong_version = before.clone();
        wrong_version.save_version += 1;
        assert!(matches!(
            session.restore(wrong_version),
            Err(RestoreError::Version { .. })
        ));

        let mut bad_run = before.clone();
        bad_run.run.remaining_seconds = -1.0;
        assert!(matches!(
            session.restore(bad_run),
            Err(RestoreError::Validation { .. })
        ));

        let mut bad_state = before.clone();
        bad_state.state.reputation = 400;
        assert!(session.restore(bad_state).is_err());

        assert_eq!(session.save(), before);
    }
}
