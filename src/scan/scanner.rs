//! Scanner: runs one full scan cycle across every discovered database.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;

use crate::scan::{discover_databases, enumerate_keys, measure_lengths, KeyPatternSet};
use crate::store::{DatabaseIndex, QueueName, QueueStore, StoreError};

/// Database used for the keyspace query.
const DISCOVERY_DB: DatabaseIndex = 0;

#[derive(Debug, Clone, PartialEq)]
pub struct ScanFailure {
    pub op: &'static str,
    pub error: StoreError,
}

impl std::fmt::Display for ScanFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.op, self.error)
    }
}

// ========================================
// SCAN REPORT
// ========================================

/// Outcome of one cycle. A database is either in `measured` or in `failed`, never both.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub discovered: Vec<DatabaseIndex>,
    pub measured: BTreeMap<DatabaseIndex, HashMap<QueueName, u64>>,
    pub failed: BTreeSet<DatabaseIndex>,
    pub discovery_failed: bool,
    pub elapsed: Duration,
}

impl ScanReport {
    pub fn discovery_failure(elapsed: Duration) -> Self {
        Self {
            discovery_failed: true,
            elapsed,
            ..Self::default()
        }
    }

    /// Total measured queues across databases.
    pub fn queue_count(&self) -> usize {
        self.measured.values().map(HashMap::len).sum()
    }

    pub fn measurements(&self) -> impl Iterator<Item = (DatabaseIndex, &[u8], u64)> + '_ {
        self.measured.iter().flat_map(|(&db, queues)| {
            queues.iter().map(move |(name, &len)| (db, name.as_slice(), len))
        })
    }
}

// ========================================
// SCANNER
// ========================================

pub struct Scanner {
    store: Arc<dyn QueueStore>,
    patterns: KeyPatternSet,
}

impl Scanner {
    pub fn new(store: Arc<dyn QueueStore>, patterns: KeyPatternSet) -> Self {
        Self { store, patterns }
    }

    /// Discovery, then every database concurrently on its own session. Failures are logged
    /// and recorded in the report; nothing here returns an error.
    pub async fn run_cycle(&self) -> ScanReport {
        let started = Instant::now();

        let discovered = match self.discover().await {
            Ok(dbs) => dbs,
            Err(failure) => {
                tracing::error!(op = failure.op, error = %failure.error, "database discovery failed");
                return ScanReport::discovery_failure(started.elapsed());
            }
        };

        let scans = discovered
            .iter()
            .map(|&db| async move { (db, self.scan_database(db).await) });
        let results = join_all(scans).await;

        let mut report = ScanReport {
            discovered,
            ..ScanReport::default()
        };
        for (db, result) in results {
            match result {
                Ok(queues) => {
                    report.measured.insert(db, queues);
                }
                Err(failure) => {
                    tracing::warn!(db, op = failure.op, error = %failure.error, "database scan aborted");
                    report.failed.insert(db);
                }
            }
        }
        report.elapsed = started.elapsed();

        tracing::debug!(
            databases = report.discovered.len(),
            failed = report.failed.len(),
            queues = report.queue_count(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "scan cycle finished"
        );
        report
    }

    async fn discover(&self) -> Result<Vec<DatabaseIndex>, ScanFailure> {
        let mut session = self
            .store
            .open(DISCOVERY_DB)
            .await
            .map_err(|error| ScanFailure { op: "connect", error })?;
        let result = discover_databases(session.as_mut()).await;
        session.close().await;
        result.map_err(|error| ScanFailure { op: "info", error })
    }

    /// Enumerates and measures one database. All-or-nothing: any failure discards the
    /// database's measurements for this cycle.
    pub async fn scan_database(&self, db: DatabaseIndex) -> Result<HashMap<QueueName, u64>, ScanFailure> {
        let mut session = self
            .store
            .open(db)
            .await
            .map_err(|error| ScanFailure { op: "connect", error })?;

        let result = async {
            let keys = enumerate_keys(session.as_mut(), &self.patterns)
                .await
                .map_err(|error| ScanFailure { op: "keys", error })?;
            measure_lengths(session.as_mut(), keys)
                .await
                .map_err(|error| ScanFailure { op: "llen", error })
        }
        .await;

        session.close().await;
        result
    }
}
