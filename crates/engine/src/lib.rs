use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod jobs;
pub mod persistence;
pub mod session;

pub use jobs::{
    fetch_catalog, format_deadline, manhattan, parse_deadline, parse_job_feed_json, CatalogError,
    FeedError, FileJobFeed, GridPos, HistoryEntry, HistorySummaryEntry, InventoryOrder, Job,
    JobCatalog, JobFeed, JobId, JobRecord, JobRepository, Ledger, PendingOffer, ReleaseScheduler,
    StaticJobFeed,
};
pub use persistence::{
    parse_save_game_json, read_save_game, write_save_game, LedgerRecord, RestoreError, SaveError,
    SaveGame, SchedulerRecord, StateRecord, SAVE_VERSION,
};
pub use session::{
    cell_center, format_mmss, score, world_to_cell, Clock, DropoffMarker, JobController,
    JobEvent, JobEventCounts, JobEventKind, JobLogicConfig, JobSession, PickupMarker, Reputation,
    RunConfig, RunOutcome, RunRecord, RunState, WorldPos, REPUTATION_MAX, REPUTATION_MIN,
};

pub const ROOT_ENV_VAR: &str = "COURIER_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub data_dir: PathBuf,
    pub saves_dir: PathBuf,
}

impl AppPaths {
    pub fn default_jobs_file(&self) -> PathBuf {
        self.data_dir.join("jobs.json")
    }

    pub fn default_save_file(&self) -> PathBuf {
        self.saves_dir.join("last_run.json")
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create saves directory at {path}: {source}")]
    CreateSavesDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "COURIER_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or data/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or data/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/courier\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    app_paths_at(root)
}

fn app_paths_at(root: PathBuf) -> Result<AppPaths, StartupError> {
    let data_dir = root.join("data");
    let saves_dir = root.join("saves");

    fs::create_dir_all(&saves_dir).map_err(|source| StartupError::CreateSavesDir {
        path: saves_dir.clone(),
        source,
    })?;

    Ok(AppPaths {
        root,
        data_dir,
        saves_dir,
    })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => root_from_env(Path::new(&value)),
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;
            root_above(&exe_dir)
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn root_from_env(raw: &Path) -> Result<PathBuf, StartupError> {
    let normalized = normalize_path(raw);
    if is_repo_marker(&normalized) {
        Ok(normalized)
    } else {
        Err(StartupError::InvalidEnvRoot { path: normalized })
    }
}

fn root_above(start_dir: &Path) -> Result<PathBuf, StartupError> {
    start_dir
        .ancestors()
        .find(|candidate| is_repo_marker(candidate))
        .map(normalize_path)
        .ok_or_else(|| StartupError::RootNotFound {
            start_dir: normalize_path(start_dir),
            env_var: ROOT_ENV_VAR,
        })
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_data = path.join("data").is_dir();

    cargo_toml && (has_crates || has_data)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
