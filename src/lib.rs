pub mod config;
pub mod scan;
pub mod server;
pub mod snapshot;
pub mod store;

use std::sync::Arc;

use crate::config::Config;
use crate::scan::{ScanReport, Scanner};
use crate::snapshot::QueueSnapshot;
use crate::store::{QueueStore, RedisStore};

// ========================================
// ENGINE
// ========================================

/// Application context handed to every request.
/// Cheap to clone (all fields are Arcs).
#[derive(Clone)]
pub struct ExporterEngine {
    pub config: Arc<Config>,
    pub scanner: Arc<Scanner>,
    pub snapshot: Arc<QueueSnapshot>,
}

impl ExporterEngine {
    /// Engine talking to the store at `config.store.addr`.
    pub fn new(config: Config) -> Self {
        let store = RedisStore::new(config.store.addr.clone(), config.store.timeout());
        Self::with_store(config, Arc::new(store))
    }

    pub fn with_store(config: Config, store: Arc<dyn QueueStore>) -> Self {
        let scanner = Scanner::new(store, config.scan.key_patterns.clone());
        let snapshot = QueueSnapshot::new(config.scan.merge_policy);
        Self {
            config: Arc::new(config),
            scanner: Arc::new(scanner),
            snapshot: Arc::new(snapshot),
        }
    }

    /// Runs one scan cycle and merges it into the snapshot.
    pub async fn refresh(&self) -> ScanReport {
        let report = self.scanner.run_cycle().await;
        self.snapshot.merge(&report);
        report
    }

    /// Refresh, then render the snapshot.
    pub async fn collect(&self) -> String {
        self.refresh().await;
        self.snapshot.render()
    }
}
