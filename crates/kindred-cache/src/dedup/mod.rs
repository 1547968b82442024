//! Notification deduplication module.

mod dedup_record;

pub use dedup_record::{DedupKey, DedupRecord};
