//! Snapshot: last-known queue lengths shared between scans (writers) and renders (readers).

pub mod aggregator;
pub mod exposition;

pub use aggregator::{MergePolicy, QueueKey, QueueSnapshot};
pub use exposition::{escape_label_value, render_entries, METRIC_HELP, METRIC_NAME};
