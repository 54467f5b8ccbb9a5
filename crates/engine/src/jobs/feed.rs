use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use super::catalog::{CatalogError, JobCatalog};
use super::job::JobRecord;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read job feed '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse job feed: {message}")]
    Parse { message: String },
    #[error(transparent)]
    Invalid(#[from] CatalogError),
}

/// Source of job records. Called once at startup and again on explicit refetch.
pub trait JobFeed {
    fn fetch_jobs(&self) -> Result<Vec<JobRecord>, FeedError>;
}

/// Reads a JSON file holding either a bare array of records or an object
/// with a `data` array.
#[derive(Debug, Clone)]
pub struct FileJobFeed {
    path: PathBuf,
}

impl FileJobFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl JobFeed for FileJobFeed {
    fn fetch_jobs(&self) -> Result<Vec<JobRecord>, FeedError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| FeedError::Read {
            path: self.path.clone(),
            source,
        })?;
        let records = parse_job_feed_json(&raw)?;
        info!(
            path = %self.path.display(),
            job_count = records.len(),
            "job_feed_read"
        );
        Ok(records)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticJobFeed {
    records: Vec<JobRecord>,
}

impl StaticJobFeed {
    pub fn new(records: Vec<JobRecord>) -> Self {
        Self { records }
    }
}

impl JobFeed for StaticJobFeed {
    fn fetch_jobs(&self) -> Result<Vec<JobRecord>, FeedError> {
        Ok(self.records.clone())
    }
}

pub fn parse_job_feed_json(raw: &str) -> Result<Vec<JobRecord>, FeedError> {
    let value: Value = serde_json::from_str(raw).map_err(|error| FeedError::Parse {
        message: error.to_string(),
    })?;
    let (prefix, list) = match value {
        Value::Array(_) => ("", value),
        Value::Object(mut map) => match map.remove("data") {
            Some(data) => ("data", data),
            None => {
                return Err(FeedError::Parse {
                    message: "expected an array of jobs or an object with a 'data' array"
                        .to_string(),
                })
            }
        },
        other => {
            return Err(FeedError::Parse {
                message: format!("expected an array of jobs, got {}", json_kind(&other)),
            })
        }
    };

    serde_path_to_error::deserialize::<_, Vec<JobRecord>>(list).map_err(|error| {
        let path = error.path().to_string();
        let source = error.into_inner();
        let location = match (prefix.is_empty(), path.is_empty() || path == ".") {
            (true, true) => String::new(),
            (true, false) => format!(" at {path}"),
            (false, true) => format!(" at {prefix}"),
            (false, false) => format!(" at {prefix}{path}"),
        };
        FeedError::Parse {
            message: format!("{source}{location}"),
        }
    })
}

/// Fetches and validates a whole catalog. Nothing is applied on error.
pub fn fetch_catalog(feed: &dyn JobFeed) -> Result<JobCatalog, FeedError> {
    let records = feed.fetch_jobs()?;
    Ok(JobCatalog::from_records(&records)?)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
