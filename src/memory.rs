//! Durable Key/Value Memory Store
//!
//! Foundation for all shared state: timestamped values keyed by string,
//! persisted as a single JSON document with atomic whole-file replace on
//! every write. One mutex guards the map and the persist together, so a
//! `remember` is always observed whole by any later `recall` and a
//! read-modify-write via [`MemoryStore::update`] cannot straddle a
//! concurrent writer.
//!
//! A corrupt or missing backing file at open is treated as an empty store,
//! never a fatal error.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A single stored value with its write timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub value: Value,
    pub stored_at: i64,
}

struct Inner {
    records: HashMap<String, MemoryRecord>,
    /// None means in-memory only (tests)
    path: Option<PathBuf>,
}

/// Shared durable store. Shared behind an `Arc` by every component.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Open or create a store backed by a JSON file.
    ///
    /// Unreadable or corrupt content starts fresh rather than failing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let records = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, MemoryRecord>>(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    warn!("Memory file {} is corrupt ({}); starting fresh", path.display(), e);
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        info!("Memory store opened: {} ({} keys)", path.display(), records.len());
        Ok(Self {
            inner: Mutex::new(Inner { records, path: Some(path) }),
        })
    }

    /// In-memory store with no backing file
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(Inner { records: HashMap::new(), path: None }),
        }
    }

    /// Store a value under a key, replacing any prior value whole.
    /// Persists synchronously before returning.
    pub fn remember(&self, key: &str, value: Value) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.records.insert(
            key.to_string(),
            MemoryRecord { value, stored_at: chrono::Utc::now().timestamp() },
        );
        Self::persist(&inner)
    }

    /// Read a value, returning the caller-supplied default if missing
    pub fn recall(&self, key: &str, default: Value) -> Value {
        let inner = self.inner.lock();
        inner
            .records
            .get(key)
            .map(|r| r.value.clone())
            .unwrap_or(default)
    }

    /// Read a value if present
    pub fn get(&self, key: &str) -> Option<Value> {
        let inner = self.inner.lock();
        inner.records.get(key).map(|r| r.value.clone())
    }

    /// Remove a key and persist
    pub fn forget(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.records.remove(key).is_some() {
            Self::persist(&inner)?;
        }
        Ok(())
    }

    /// Read-modify-write a key atomically under the store lock.
    ///
    /// The closure receives the current value (or `default` when absent)
    /// and mutates it in place; the result is stored and persisted before
    /// the lock is released. Appends and prunes both go through here so
    /// they can never interleave.
    pub fn update<F>(&self, key: &str, default: Value, f: F) -> Result<Value>
    where
        F: FnOnce(&mut Value),
    {
        let mut inner = self.inner.lock();
        let mut value = inner
            .records
            .get(key)
            .map(|r| r.value.clone())
            .unwrap_or(default);
        f(&mut value);
        inner.records.insert(
            key.to_string(),
            MemoryRecord { value: value.clone(), stored_at: chrono::Utc::now().timestamp() },
        );
        Self::persist(&inner)?;
        Ok(value)
    }

    /// Append an entry to the JSON array stored under `key`, dropping the
    /// oldest entries when the array exceeds `cap` (0 = unbounded).
    /// Returns the resulting length.
    pub fn append_capped(&self, key: &str, entry: Value, cap: usize) -> Result<usize> {
        let value = self.update(key, Value::Array(vec![]), |v| {
            if !v.is_array() {
                *v = Value::Array(vec![]);
            }
            if let Some(arr) = v.as_array_mut() {
                arr.push(entry);
                if cap > 0 && arr.len() > cap {
                    let drop = arr.len() - cap;
                    arr.drain(..drop);
                }
            }
        })?;
        Ok(value.as_array().map(|a| a.len()).unwrap_or(0))
    }

    /// Truncate the array under `key` to its most recent `cap` entries.
    /// Returns how many were discarded.
    pub fn truncate_to(&self, key: &str, cap: usize) -> Result<usize> {
        let mut pruned = 0;
        self.update(key, Value::Array(vec![]), |v| {
            if let Some(arr) = v.as_array_mut() {
                if arr.len() > cap {
                    pruned = arr.len() - cap;
                    arr.drain(..pruned);
                }
            }
        })?;
        if pruned > 0 {
            debug!("Truncated '{}' by {} entries", key, pruned);
        }
        Ok(pruned)
    }

    /// Length of the array under `key` (0 if absent or not an array)
    pub fn list_len(&self, key: &str) -> usize {
        let inner = self.inner.lock();
        inner
            .records
            .get(key)
            .and_then(|r| r.value.as_array().map(|a| a.len()))
            .unwrap_or(0)
    }

    /// Number of keys held
    pub fn key_count(&self) -> usize {
        self.inner.lock().records.len()
    }

    /// Serialize and atomically replace the backing file.
    /// Must be called with the lock held.
    fn persist(inner: &Inner) -> Result<()> {
        let path = match &inner.path {
            Some(p) => p,
            None => return Ok(()),
        };
        let bytes = serde_json::to_vec_pretty(&inner.records).context("serializing memory")?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &bytes)
            .with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }
}
