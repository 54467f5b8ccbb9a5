use serde::{Deserialize, Serialize};
use tracing::info;

use super::config::RunConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    #[default]
    InProgress,
    Won,
    LostTime,
    LostReputation,
}

impl RunOutcome {
    pub fn is_decided(self) -> bool {
        self != Self::InProgress
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub remaining_seconds: f64,
    pub outcome: RunOutcome,
}

/// Countdown and game-over latch for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    config: RunConfig,
    remaining_seconds: f64,
    outcome: RunOutcome,
    final_score: Option<f64>,
}

impl RunState {
    pub fn new(config: RunConfig) -> Self {
        Self {
            remaining_seconds: config.time_limit_seconds.max(0.0),
            outcome: RunOutcome::InProgress,
            final_score: None,
            config,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    /// Counts down and decides the outcome. A decided run no longer changes.
    ///
    /// Reaching the money goal wins even when the countdown hits zero in
    /// the same update.
    pub fn update(&mut self, dt_seconds: f64, money: f64, reputation: i32) -> RunOutcome {
        if self.outcome.is_decided() {
            return self.outcome;
        }
        if dt_seconds.is_finite() && dt_seconds > 0.0 {
            self.remaining_seconds = (self.remaining_seconds - dt_seconds).max(0.0);
        }

        let outcome = if money >= self.config.money_goal {
            RunOutcome::Won
        } else if reputation < self.config.reputation_floor {
            RunOutcome::LostReputation
        } else if self.remaining_seconds <= 0.0 {
            RunOutcome::LostTime
        } else {
            RunOutcome::InProgress
        };

        if outcome.is_decided() {
            self.outcome = outcome;
            self.final_score = Some(money);
            info!(
                outcome = ?outcome,
                score = money,
                remaining_seconds = self.remaining_seconds,
                "run_decided"
            );
        }
        self.outcome
    }

    pub fn outcome(&self) -> RunOutcome {
        self.outcome
    }

    pub fn remaining_seconds(&self) -> f64 {
        self.remaining_seconds
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Money at the moment the run was decided.
    pub fn final_score(&self) -> Option<f64> {
        self.final_score
    }

    pub fn to_record(&self) -> RunRecord {
        RunRecord {
            remaining_seconds: self.remaining_seconds,
            outcome: self.outcome,
        }
    }

    pub(crate) fn from_record(config: RunConfig, record: &RunRecord, money: f64) -> Self {
        Self {
            remaining_seconds: record.remaining_seconds,
            outcome: record.outcome,
            final_score: record.outcome.is_decided().then_some(money),
            config,
        }
    }
}

/// Score of a run: the money earned.
pub fn score(money: f64) -> f64 {
    money
}

/// `MM:SS` countdown text, truncating partial seconds; negative or
/// non-finite input renders as `00:00`.
pub fn format_mmss(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", whole / 60, whole % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> RunState {
        RunState::new(RunConfig {
            time_limit_seconds: 10.0,
            money_goal: 500.0,
            reputation_floor: 20,
        })
    }

    #[test]
    fn counts_down_until_time_runs_out() {
        let mut state = run();
        assert_eq!(state.update(4.0, 0.0, 70), RunOutcome::InProgress);
        assert_eq!(state.remaining_seconds(), 6.0);
        assert_eq!(state.update(8.0, 120.0, 70), RunOutcome::LostTime);
        assert_eq!(state.remaining_seconds(), 0.0);
        assert_eq!(state.final_score(), Some(120.0));
    }

    #[test]
    fn outcome_latches_once_decided() {
        let mut state = run();
        assert_eq!(state.update(1.0, 0.0, 19), RunOutcome::LostReputation);
        assert_eq!(state.update(1.0, 900.0, 90), RunOutcome::LostReputation);
        assert_eq!(state.remaining_seconds(), 9.0);
    }

    #[test]
    fn reaching_the_goal_wins_over_expiring_clock() {
        let mut state = run();
        assert_eq!(state.update(10.0, 500.0, 10), RunOutcome::Won);
        assert_eq!(state.final_score(), Some(score(500.0)));
    }

    #[test]
    fn reset_restarts_the_countdown() {
        let mut state = run();
        state.update(20.0, 0.0, 70);
        state.reset();
        assert_eq!(state.outcome(), RunOutcome::InProgress);
        assert_eq!(state.remaining_seconds(), 10.0);
        assert_eq!(state.final_score(), None);
    }

    #[test]
    fn formats_countdown() {
        assert_eq!(format_mmss(600.0), "10:00");
        assert_eq!(format_mmss(59.9), "00:59");
        assert_eq!(format_mmss(0.5), "00:00");
        assert_eq!(format_mmss(61.0), "01:01");
        assert_eq!(format_mmss(-3.0), "00:00");
        assert_eq!(format_mmss(f64::NAN), "00:00");
    }
}
