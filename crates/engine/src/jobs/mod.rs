mod catalog;
mod feed;
mod job;
mod ledger;
mod scheduler;

pub use catalog::{CatalogError, JobCatalog, JobRepository};
pub use feed::{fetch_catalog, parse_job_feed_json, FeedError, FileJobFeed, JobFeed, StaticJobFeed};
pub use job::{format_deadline, manhattan, parse_deadline, GridPos, Job, JobId, JobRecord};
pub use ledger::{HistoryEntry, HistorySummaryEntry, InventoryOrder, Ledger, PendingOffer};
pub use scheduler::ReleaseScheduler;

#[cfg(test)]
pub(crate) use job::sample_record;
