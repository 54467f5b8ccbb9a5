use std::process::ExitCode;

use courier_engine::{
    cell_center, format_mmss, manhattan, world_to_cell, FileJobFeed, GridPos, JobController,
    JobEventCounts, JobFeed, JobSession, RunOutcome, SaveError, WorldPos,
};
use serde::Serialize;
use tracing::{debug, error, info};

use super::bootstrap::AppWiring;
use super::courier::{Courier, StaticWeather, WeatherEffect};

const SPAWN_CELL: (i32, i32) = (0, 0);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct RunSummary {
    pub(crate) outcome: RunOutcome,
    pub(crate) score: f64,
    pub(crate) reputation: i32,
    pub(crate) elapsed_seconds: f64,
    pub(crate) time_left: String,
    pub(crate) ticks: u32,
    pub(crate) offers_launched: u32,
    pub(crate) offers_expired: u32,
    pub(crate) offers_accepted: u32,
    pub(crate) delivered_on_time: u32,
    pub(crate) delivered_late: u32,
    pub(crate) final_stamina: f64,
    pub(crate) courier_exhausted: bool,
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let summary = match run_headless(&app) {
        Ok(summary) => summary,
        Err(err) => {
            error!(error = %err, "save_failed");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&summary) {
        Ok(text) => println!("{text}"),
        Err(err) => {
            error!(error = %err, "summary_encode_failed");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

/// Plays one run from the configured feed and writes the save file.
pub(crate) fn run_headless(app: &AppWiring) -> Result<RunSummary, SaveError> {
    let feed = FileJobFeed::new(app.config.jobs_file.clone());
    let mut session = JobSession::new(feed, app.job_config.clone(), app.run_config.clone());
    let tile_size = session.controller().config().tile_size;
    let spawn = cell_center(GridPos::new(SPAWN_CELL.0, SPAWN_CELL.1), tile_size);
    let mut courier = Courier::new(spawn);
    let weather = StaticWeather::clear();
    info!(
        weather = weather.condition(),
        speed_multiplier = weather.speed_multiplier(),
        "weather_applied"
    );

    let summary = simulate(
        &mut session,
        &mut courier,
        &weather,
        app.config.max_ticks,
        app.config.fixed_dt_seconds(),
    );
    session.save_to_path(&app.config.save_file)?;
    Ok(summary)
}

/// Runs fixed steps until the run is decided or the tick budget is spent.
pub(crate) fn simulate<F: JobFeed>(
    session: &mut JobSession<F>,
    courier: &mut Courier,
    weather: &dyn WeatherEffect,
    max_ticks: u32,
    dt_seconds: f64,
) -> RunSummary {
    let tile_size = session.controller().config().tile_size;
    let mut ticks = 0;
    while ticks < max_ticks && !session.outcome().is_decided() {
        let target = choose_target(session.controller(), courier.position);
        let carried = session.controller().weight();
        courier.advance(target, dt_seconds, carried, weather, tile_size);
        for event in session.tick(dt_seconds, courier.position) {
            debug!(tick = ticks, kind = ?event.kind(), job_id = %event.job_id(), "job_event");
        }
        ticks += 1;
    }

    let controller = session.controller();
    let counts: JobEventCounts = controller.event_counts();
    let summary = RunSummary {
        outcome: session.outcome(),
        score: session.score(),
        reputation: controller.reputation(),
        elapsed_seconds: controller.elapsed_time(),
        time_left: format_mmss(session.run().remaining_seconds()),
        ticks,
        offers_launched: counts.offers_launched,
        offers_expired: counts.offers_expired,
        offers_accepted: counts.offers_accepted,
        delivered_on_time: counts.delivered_on_time,
        delivered_late: counts.delivered_late,
        final_stamina: courier.stamina(),
        courier_exhausted: courier.is_exhausted(),
    };
    info!(
        outcome = ?summary.outcome,
        score = summary.score,
        reputation = summary.reputation,
        ticks,
        "simulation_finished"
    );
    summary
}

/// Heads for the current job's dropoff, else the nearest open pickup.
pub(crate) fn choose_target(controller: &JobController, position: WorldPos) -> Option<WorldPos> {
    let tile_size = controller.config().tile_size;
    if let Some(current) = controller.current_job() {
        return Some(cell_center(current.dropoff, tile_size));
    }

    let here = world_to_cell(position, tile_size);
    controller
        .pickup_markers()
        .iter()
        .min_by_key(|marker| manhattan(marker.cell, here))
        .map(|marker| cell_center(marker.cell, tile_size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::bootstrap::HeadlessConfig;
    use courier_engine::{
        read_save_game, JobCatalog, JobLogicConfig, JobRecord, RunConfig, StaticJobFeed,
    };
    use std::sync::Arc;

    fn job(id: &str, release_time: i64, pickup: [i32; 2], dropoff: [i32; 2]) -> JobRecord {
        JobRecord {
            id: id.to_string(),
            pickup: pickup.to_vec(),
            dropoff: dropoff.to_vec(),
            payout: 150.0,
            deadline: "2025-09-01T12:30:00".to_string(),
            weight: 1.0,
            priority: 0,
            release_time,
        }
    }

    fn session(records: Vec<JobRecord>, money_goal: f64) -> JobSession<StaticJobFeed> {
        JobSession::new(
            StaticJobFeed::new(records),
            JobLogicConfig::default(),
            RunConfig {
                time_limit_seconds: 120.0,
                money_goal,
                reputation_floor: 20,
            },
        )
    }

    #[test]
    fn target_prefers_current_dropoff_then_nearest_pickup() {
        let catalog = JobCatalog::from_records(&[
            job("near", 0, [1, 1], [8, 8]),
            job("far", 1, [9, 9], [0, 0]),
        ])
        .expect("catalog");
        let mut controller = JobController::new(Arc::new(catalog), JobLogicConfig::default());
        let origin = cell_center(GridPos::new(0, 0), 25.0);
        assert_eq!(choose_target(&controller, origin), None);

        controller.tick(2.0, WorldPos::new(5000.0, 5000.0));
        controller.tick(5.0, WorldPos::new(5000.0, 5000.0));
        assert_eq!(
            choose_target(&controller, origin),
            Some(cell_center(GridPos::new(1, 1), 25.0))
        );

        controller.tick(0.5, origin);
        assert_eq!(
            choose_target(&controller, origin),
            Some(cell_center(GridPos::new(8, 8), 25.0))
        );
    }

    #[test]
    fn automated_courier_delivers_and_wins() {
        let mut session = session(
            vec![
                job("A", 0, [2, 2], [6, 2]),
                job("B", 1, [4, 4], [4, 8]),
            ],
            300.0,
        );
        let mut courier = Courier::new(cell_center(GridPos::new(0, 0), 25.0));
        let summary = simulate(
            &mut session,
            &mut courier,
            &StaticWeather::clear(),
            60 * 120,
            1.0 / 60.0,
        );

        assert_eq!(summary.outcome, RunOutcome::Won);
        assert_eq!(summary.score, 300.0);
        assert_eq!(summary.delivered_on_time, 2);
        assert!(summary.ticks < 60 * 120);
    }

    #[test]
    fn headless_run_writes_a_loadable_save() {
        let dir = tempfile::tempdir().expect("tempdir");
        let jobs_file = dir.path().join("jobs.json");
        let feed = serde_json::json!({
            "data": [job("A", 0, [2, 2], [6, 2]), job("B", 1, [4, 4], [4, 8])]
        });
        std::fs::write(&jobs_file, feed.to_string()).expect("write feed");
        let save_file = dir.path().join("saves").join("last_run.json");
        let app = AppWiring {
            config: HeadlessConfig {
                target_tps: 20,
                max_ticks: 200,
                jobs_file,
                save_file: save_file.clone(),
            },
            job_config: JobLogicConfig::default(),
            run_config: RunConfig::default(),
        };

        let summary = run_headless(&app).expect("run");
        assert_eq!(summary.ticks, 200);
        assert_eq!(summary.offers_launched, 2);

        let save = read_save_game(&save_file).expect("read save");
        assert_eq!(save.state.jobs.len(), 2);
        assert_eq!(save.state.elapsed_time, summary.elapsed_seconds);
        assert_eq!(save.run.outcome, summary.outcome);
    }

    #[test]
    fn empty_feed_runs_out_the_tick_budget() {
        let mut session = session(Vec::new(), 300.0);
        let mut courier = Courier::new(WorldPos::default());
        let summary = simulate(
            &mut session,
            &mut courier,
            &StaticWeather::clear(),
            100,
            0.25,
        );

        assert_eq!(summary.outcome, RunOutcome::InProgress);
        assert_eq!(summary.ticks, 100);
        assert_eq!(summary.elapsed_seconds, 25.0);
        assert_eq!(summary.time_left, "01:35");
        assert_eq!(summary.offers_launched, 0);
    }
}
