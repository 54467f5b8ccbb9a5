mod atomic_io;
mod save_file;
mod state;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use save_file::{
    parse_save_game_json, read_save_game, write_save_game, SaveGame, SAVE_VERSION,
};
pub use state::{LedgerRecord, SchedulerRecord, StateRecord};

pub(crate) use state::decode_state;

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("read save '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{message}")]
    Parse { message: String },
    #[error("validation failed at save_version: expected {expected}, got {actual}")]
    Version { expected: u32, actual: u32 },
    #[error("validation failed at {path}: {message}")]
    Validation { path: String, message: String },
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("encode save json: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },
    #[error("write save '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
