//! Request-scoped session store

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// Mutable string key/value store scoped to one request
///
/// Clones share the same entries. Any mutation flags the session as changed
/// so the transport knows it has to be written back.
#[derive(Debug, Clone, Default)]
pub struct Session {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
    changed: Arc<AtomicBool>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session seeded with existing entries, not flagged as changed
    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(entries.into_iter().collect())),
            changed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.lock().insert(key.into(), value.into());
        self.changed.store(true, Ordering::Release);
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        let removed = self.entries.lock().remove(key);
        if removed.is_some() {
            self.changed.store(true, Ordering::Release);
        }
        removed
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        if !entries.is_empty() {
            entries.clear();
            self.changed.store(true, Ordering::Release);
        }
    }

    pub fn has_changed(&self) -> bool {
        self.changed.load(Ordering::Acquire)
    }

    /// Snapshot of every entry
    pub fn as_map(&self) -> BTreeMap<String, String> {
        self.entries.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
