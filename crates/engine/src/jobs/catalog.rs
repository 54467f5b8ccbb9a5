use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

use super::job::{Job, JobId, JobRecord};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("validation failed at {path}: {message}")]
    Validation { path: String, message: String },
    #[error("job '{id}' is not in the catalog")]
    NotFound { id: JobId },
}

impl CatalogError {
    pub(crate) fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Read access to jobs by id. Everything outside the catalog holds ids only.
pub trait JobRepository {
    fn get(&self, id: &JobId) -> Result<&Job, CatalogError>;
    fn all_ids(&self) -> Vec<JobId>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobCatalog {
    jobs_by_id: HashMap<JobId, Job>,
    load_order: Vec<JobId>,
}

impl JobCatalog {
    pub fn from_records(records: &[JobRecord]) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        catalog.load(records)?;
        Ok(catalog)
    }

    /// Replaces the whole mapping. On error nothing changes.
    ///
    /// A repeated id keeps its first position in load order and the last
    /// record's attributes.
    pub fn load(&mut self, records: &[JobRecord]) -> Result<(), CatalogError> {
        let mut jobs_by_id = HashMap::with_capacity(records.len());
        let mut load_order = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let job = Job::from_record(record, &format!("jobs[{index}]"))?;
            let id = job.id.clone();
            if jobs_by_id.insert(id.clone(), job).is_some() {
                warn!(job_id = %id, index, "duplicate_job_id_last_wins");
            } else {
                load_order.push(id);
            }
        }

        self.jobs_by_id = jobs_by_id;
        self.load_order = load_order;
        Ok(())
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.jobs_by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.load_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.load_order.is_empty()
    }

    pub fn filter_ids(&self, mut predicate: impl FnMut(&Job) -> bool) -> Vec<JobId> {
        self.jobs_in_load_order()
            .filter(|job| predicate(job))
            .map(|job| job.id.clone())
            .collect()
    }

    pub fn jobs_in_load_order(&self) -> impl Iterator<Item = &Job> + '_ {
        self.load_order
            .iter()
            .filter_map(|id| self.jobs_by_id.get(id))
    }

    pub fn records(&self) -> Vec<JobRecord> {
        self.jobs_in_load_order().map(Job::to_record).collect()
    }
}

impl JobRepository for JobCatalog {
    fn get(&self, id: &JobId) -> Result<&Job, CatalogError> {
        self.jobs_by_id
            .get(id)
            .ok_or_else(|| CatalogError::NotFound { id: id.clone() })
    }

    fn all_ids(&self) -> Vec<JobId> {
        self.load_order.clone()
    }
}
