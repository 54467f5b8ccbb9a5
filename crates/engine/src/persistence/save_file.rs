use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::session::RunRecord;

use super::atomic_io::write_text_atomic;
use super::state::StateRecord;
use super::{RestoreError, SaveError};

pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveGame {
    pub save_version: u32,
    pub run: RunRecord,
    pub state: StateRecord,
}

impl SaveGame {
    pub fn new(run: RunRecord, state: StateRecord) -> Self {
        Self {
            save_version: SAVE_VERSION,
            run,
            state,
        }
    }
}

/// Parses a save and checks its version. Field-level state validation
/// happens on restore.
pub fn parse_save_game_json(raw: &str) -> Result<SaveGame, RestoreError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let save = match serde_path_to_error::deserialize::<_, SaveGame>(&mut deserializer) {
        Ok(save) => save,
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            let message = if path.is_empty() || path == "." {
                format!("parse save json: {source}")
            } else {
                format!("parse save json at {path}: {source}")
            };
            return Err(RestoreError::Parse { message });
        }
    };

    if save.save_version != SAVE_VERSION {
        return Err(RestoreError::Version {
            expected: SAVE_VERSION,
            actual: save.save_version,
        });
    }
    Ok(save)
}

pub fn write_save_game(path: &Path, save: &SaveGame) -> Result<(), SaveError> {
    let text =
        serde_json::to_string_pretty(save).map_err(|source| SaveError::Encode { source })?;
    write_text_atomic(path, &text).map_err(|source| SaveError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        path = %path.display(),
        elapsed_time = save.state.elapsed_time,
        "save_written"
    );
    Ok(())
}

pub fn read_save_game(path: &Path) -> Result<SaveGame, RestoreError> {
    let raw = fs::read_to_string(path).map_err(|source| RestoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_save_game_json(&raw)
}
