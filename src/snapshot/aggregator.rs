//! Snapshot Aggregator: merges scan reports into the shared queue map.

use std::collections::HashMap;
use std::str::FromStr;

use parking_lot::RwLock;

use crate::scan::ScanReport;
use crate::snapshot::exposition;
use crate::store::{DatabaseIndex, QueueName};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueKey {
    pub db: DatabaseIndex,
    pub queue: QueueName,
}

impl QueueKey {
    pub fn new(db: DatabaseIndex, queue: impl Into<QueueName>) -> Self {
        Self {
            db,
            queue: queue.into(),
        }
    }
}

// ========================================
// MERGE POLICY
// ========================================

/// How a cycle's results replace what the snapshot already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Zero every known queue, then write this cycle's measurements. Vanished queues and
    /// queues of failed databases report 0. A cycle whose discovery failed changes nothing.
    #[default]
    ZeroReset,
    /// Replace the snapshot with this cycle's measurements, but keep the last known values
    /// of databases that failed to scan (and everything when discovery failed).
    ReplaceOnly,
}

impl FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "zero-reset" => Ok(MergePolicy::ZeroReset),
            "replace-only" => Ok(MergePolicy::ReplaceOnly),
            other => Err(format!(
                "unknown merge policy '{}' (expected zero-reset or replace-only)",
                other
            )),
        }
    }
}

impl std::fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergePolicy::ZeroReset => write!(f, "zero-reset"),
            MergePolicy::ReplaceOnly => write!(f, "replace-only"),
        }
    }
}

// ========================================
// SNAPSHOT
// ========================================

pub struct QueueSnapshot {
    entries: RwLock<HashMap<QueueKey, u64>>,
    policy: MergePolicy,
}

impl QueueSnapshot {
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            policy,
        }
    }

    /// Applies one cycle. The write lock covers only the in-memory update.
    pub fn merge(&self, report: &ScanReport) {
        // an unreachable store is not an empty one
        if report.discovery_failed {
            return;
        }

        let fresh: Vec<(QueueKey, u64)> = report
            .measurements()
            .map(|(db, queue, len)| (QueueKey::new(db, queue), len))
            .collect();

        let mut entries = self.entries.write();
        match self.policy {
            MergePolicy::ZeroReset => {
                entries.values_mut().for_each(|len| *len = 0);
            }
            MergePolicy::ReplaceOnly => {
                entries.retain(|key, _| report.failed.contains(&key.db));
            }
        }
        entries.extend(fresh);
    }

    /// Exposition text of the current state, produced under the read lock.
    pub fn render(&self) -> String {
        let entries = self.entries.read();
        exposition::render_entries(entries.iter())
    }

    pub fn get(&self, db: DatabaseIndex, queue: impl AsRef<[u8]>) -> Option<u64> {
        self.entries.read().get(&QueueKey::new(db, queue.as_ref())).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for QueueSnapshot {
    fn default() -> Self {
        Self::new(MergePolicy::default())
    }
}
