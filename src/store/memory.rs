//! In-memory store backend with the same session surface as the Redis client.
//!
//! Holds string and list values per logical database and supports fault injection,
//! so scan behaviour can be exercised without a live server.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::store::glob;
use crate::store::{DatabaseIndex, LengthOutcome, QueueName, QueueStore, StoreError, StoreSession};

#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    String(Bytes),
    List(VecDeque<Bytes>),
}

impl StoredValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            StoredValue::String(_) => "string",
            StoredValue::List(_) => "list",
        }
    }
}

/// Operations that can be forced to fail with [`StoreError::Unavailable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    Discovery,
    Open(DatabaseIndex),
    Keys(DatabaseIndex),
    Length(DatabaseIndex),
    /// Length queries on the database succeed this many times per session, then fail.
    LengthAfter(DatabaseIndex, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrongType;

#[derive(Default)]
struct MemoryState {
    databases: BTreeMap<DatabaseIndex, BTreeMap<QueueName, StoredValue>>,
    faults: HashSet<Fault>,
}

/// Cheap to clone; clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================
    // WRITES
    // ========================================

    /// Replaces `key` with a list holding `len` placeholder items. A zero length keeps an
    /// empty list in place rather than removing the key.
    pub fn set_list(&self, db: DatabaseIndex, key: impl AsRef<[u8]>, len: usize) {
        let items = (0..len).map(|i| Bytes::from(i.to_string())).collect();
        self.insert(db, key.as_ref(), StoredValue::List(items));
    }

    pub fn set_string(&self, db: DatabaseIndex, key: impl AsRef<[u8]>, value: impl Into<Bytes>) {
        self.insert(db, key.as_ref(), StoredValue::String(value.into()));
    }

    pub fn delete(&self, db: DatabaseIndex, key: impl AsRef<[u8]>) -> bool {
        let mut state = self.state.lock();
        let Some(keys) = state.databases.get_mut(&db) else {
            return false;
        };
        let removed = keys.remove(key.as_ref()).is_some();
        if keys.is_empty() {
            state.databases.remove(&db);
        }
        removed
    }

    fn insert(&self, db: DatabaseIndex, key: &[u8], value: StoredValue) {
        self.state
            .lock()
            .databases
            .entry(db)
            .or_default()
            .insert(key.to_vec(), value);
    }

    // ========================================
    // FAULTS
    // ========================================

    pub fn inject(&self, fault: Fault) {
        self.state.lock().faults.insert(fault);
    }

    pub fn heal_all(&self) {
        self.state.lock().faults.clear();
    }

    fn check(&self, fault: Fault) -> Result<(), StoreError> {
        if self.state.lock().faults.contains(&fault) {
            return Err(injected(fault));
        }
        Ok(())
    }

    /// Allowance left by a `LengthAfter` fault on `db`, if one is set.
    fn length_allowance(&self, db: DatabaseIndex) -> Option<usize> {
        self.state.lock().faults.iter().find_map(|fault| match *fault {
            Fault::LengthAfter(faulty, n) if faulty == db => Some(n),
            _ => None,
        })
    }

    // ========================================
    // READS (same answers the server gives)
    // ========================================

    /// Keyspace section in server format; databases without keys are not listed.
    pub fn info_keyspace(&self) -> String {
        let state = self.state.lock();
        let mut out = String::from("# Keyspace\r\n");
        for (db, keys) in state.databases.iter().filter(|(_, keys)| !keys.is_empty()) {
            out.push_str(&format!("db{}:keys={},expires=0,avg_ttl=0\r\n", db, keys.len()));
        }
        out
    }

    pub fn keys(&self, db: DatabaseIndex, pattern: &[u8]) -> Vec<QueueName> {
        let state = self.state.lock();
        state
            .databases
            .get(&db)
            .map(|keys| {
                keys.keys()
                    .filter(|key| glob::matches(pattern, key))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn type_of(&self, db: DatabaseIndex, key: &[u8]) -> &'static str {
        let state = self.state.lock();
        state
            .databases
            .get(&db)
            .and_then(|keys| keys.get(key))
            .map(StoredValue::type_name)
            .unwrap_or("none")
    }

    /// Missing keys report zero, as the server does.
    pub fn llen(&self, db: DatabaseIndex, key: &[u8]) -> Result<u64, WrongType> {
        let state = self.state.lock();
        match state.databases.get(&db).and_then(|keys| keys.get(key)) {
            Some(StoredValue::List(items)) => Ok(items.len() as u64),
            Some(StoredValue::String(_)) => Err(WrongType),
            None => Ok(0),
        }
    }
}

fn injected(fault: Fault) -> StoreError {
    StoreError::Unavailable(format!("injected fault: {:?}", fault))
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn open(&self, db: DatabaseIndex) -> Result<Box<dyn StoreSession>, StoreError> {
        self.check(Fault::Open(db))?;
        Ok(Box::new(MemorySession {
            store: self.clone(),
            db,
            lengths_served: 0,
        }))
    }
}

struct MemorySession {
    store: MemoryStore,
    db: DatabaseIndex,
    lengths_served: usize,
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn keyspace(&mut self) -> Result<String, StoreError> {
        self.store.check(Fault::Discovery)?;
        Ok(self.store.info_keyspace())
    }

    async fn keys(&mut self, pattern: &str) -> Result<Vec<QueueName>, StoreError> {
        self.store.check(Fault::Keys(self.db))?;
        Ok(self.store.keys(self.db, pattern.as_bytes()))
    }

    async fn list_length(&mut self, key: &[u8]) -> LengthOutcome {
        if let Err(err) = self.store.check(Fault::Length(self.db)) {
            return LengthOutcome::Failed(err);
        }
        if let Some(allowed) = self.store.length_allowance(self.db) {
            if self.lengths_served >= allowed {
                return LengthOutcome::Failed(injected(Fault::LengthAfter(self.db, allowed)));
            }
        }
        self.lengths_served += 1;

        if self.store.type_of(self.db, key) != "list" {
            return LengthOutcome::NotApplicable;
        }
        match self.store.llen(self.db, key) {
            Ok(len) => LengthOutcome::Measured(len),
            Err(WrongType) => LengthOutcome::NotApplicable,
        }
    }

    async fn close(self: Box<Self>) {}
}
