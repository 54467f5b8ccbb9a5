use std::path::PathBuf;

use courier_engine::{resolve_app_paths, JobLogicConfig, RunConfig, StartupError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const JOBS_FILE_ENV_VAR: &str = "COURIER_JOBS_FILE";
const TICKS_ENV_VAR: &str = "COURIER_TICKS";
const TPS_ENV_VAR: &str = "COURIER_TPS";

const DEFAULT_TARGET_TPS: u32 = 60;
/// Ten minutes of game time at the default tick rate.
const DEFAULT_MAX_TICKS: u32 = 36_000;

#[derive(Debug, Clone)]
pub(crate) struct HeadlessConfig {
    pub(crate) target_tps: u32,
    pub(crate) max_ticks: u32,
    pub(crate) jobs_file: PathBuf,
    pub(crate) save_file: PathBuf,
}

impl HeadlessConfig {
    pub(crate) fn fixed_dt_seconds(&self) -> f64 {
        1.0 / f64::from(self.target_tps.max(1))
    }
}

pub(crate) struct AppWiring {
    pub(crate) config: HeadlessConfig,
    pub(crate) job_config: JobLogicConfig,
    pub(crate) run_config: RunConfig,
}

pub(crate) fn build_app() -> Result<AppWiring, StartupError> {
    init_tracing();
    info!("=== Courier Startup ===");

    let paths = resolve_app_paths()?;
    let jobs_file = std::env::var(JOBS_FILE_ENV_VAR)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| paths.default_jobs_file());
    let config = HeadlessConfig {
        target_tps: parse_positive_u32(TPS_ENV_VAR, read_env(TPS_ENV_VAR), DEFAULT_TARGET_TPS),
        max_ticks: parse_positive_u32(TICKS_ENV_VAR, read_env(TICKS_ENV_VAR), DEFAULT_MAX_TICKS),
        jobs_file,
        save_file: paths.default_save_file(),
    };
    info!(
        root = %paths.root.display(),
        jobs_file = %config.jobs_file.display(),
        target_tps = config.target_tps,
        max_ticks = config.max_ticks,
        "startup_config_resolved"
    );

    Ok(AppWiring {
        config,
        job_config: JobLogicConfig::default(),
        run_config: RunConfig::default(),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn read_env(var: &str) -> Option<String> {
    std::env::var(var).ok()
}

fn parse_positive_u32(var: &'static str, raw: Option<String>, default: u32) -> u32 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => value,
        _ => {
            warn!(var, value = %raw, default, "env_value_ignored");
            default
        }
    }
}
