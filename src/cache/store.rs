//! Infallible read/write facade over a cache storage backend.

use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use super::entry::{CacheEntry, Envelope, EnvelopeRef};
use super::storage::CacheStorage;

/// Cache store shared by every binding of a session.
///
/// Reads and writes never fail: a backend error or an undecodable envelope
/// is logged and treated as a cache miss. Cloning is cheap and all clones
/// share the same backend and the same write lock.
#[derive(Clone)]
pub struct CacheStore {
  storage: Arc<dyn CacheStorage>,
  /// Prefix mixed into storage keys so different backends never share entries
  namespace: String,
  /// Held from reading the previous stamp until the write is published
  write_lock: Arc<Mutex<()>>,
}

impl CacheStore {
  /// Create a new store over the given storage backend.
  pub fn new(storage: impl CacheStorage + 'static) -> Self {
    Self {
      storage: Arc::new(storage),
      namespace: String::new(),
      write_lock: Arc::new(Mutex::new(())),
    }
  }

  /// Scope every key of this store to a namespace (usually the API base URL).
  pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
    self.namespace = namespace.into();
    self
  }

  /// Read the last-known-good entry for a resource key.
  pub fn read(&self, key: &str) -> Option<CacheEntry> {
    let raw = match self.storage.get(&self.storage_key(key)) {
      Ok(Some(raw)) => raw,
      Ok(None) => return None,
      Err(e) => {
        warn!(key, error = %e, "cache read failed, treating as miss");
        return None;
      }
    };

    match serde_json::from_str::<Envelope>(&raw) {
      Ok(envelope) => Some(CacheEntry {
        key: key.to_string(),
        payload: envelope.data,
        saved_at_epoch_ms: envelope.timestamp,
      }),
      Err(e) => {
        warn!(key, error = %e, "corrupt cache entry, treating as miss");
        None
      }
    }
  }

  /// Stamp and persist a payload, replacing any previous entry for the key.
  ///
  /// Returns the entry as it was stamped, even if persisting it failed.
  /// The stamp never goes backwards for a key, so a wall clock step does not
  /// make a newer payload look older than the one it replaced.
  pub fn write(&self, key: &str, payload: Value) -> CacheEntry {
    self.write_and(key, payload, |entry| entry)
  }

  /// Write like [`CacheStore::write`], then run `publish` on the stamped
  /// entry before any other writer can touch the store.
  ///
  /// Whatever `publish` hands on (a binding outcome) is therefore ordered
  /// exactly like the writes themselves. `publish` must not block.
  pub fn write_and<R>(
    &self,
    key: &str,
    payload: Value,
    publish: impl FnOnce(CacheEntry) -> R,
  ) -> R {
    let _guard = self
      .write_lock
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());

    let now = Utc::now().timestamp_millis();
    let saved_at_epoch_ms = match self.read(key) {
      Some(previous) => now.max(previous.saved_at_epoch_ms),
      None => now,
    };

    let envelope = EnvelopeRef {
      data: &payload,
      timestamp: saved_at_epoch_ms,
    };
    match serde_json::to_string(&envelope) {
      Ok(raw) => match self.storage.set(&self.storage_key(key), &raw) {
        Ok(()) => debug!(key, bytes = raw.len(), "cache entry written"),
        Err(e) => warn!(key, error = %e, "cache write failed"),
      },
      Err(e) => warn!(key, error = %e, "failed to encode cache entry"),
    }

    publish(CacheEntry {
      key: key.to_string(),
      payload,
      saved_at_epoch_ms,
    })
  }

  /// SHA256 hash for stable, fixed-length storage keys.
  fn storage_key(&self, key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.namespace.as_bytes());
    hasher.update(b":");
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStorage;
  use color_eyre::{eyre::eyre, Result};
  use serde_json::json;

  /// Backend whose every operation fails.
  struct BrokenStorage;

  impl CacheStorage for BrokenStorage {
    fn get(&self, _key: &str) -> Result<Option<String>> {
      Err(eyre!("disk on fire"))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
      Err(eyre!("quota exceeded"))
    }
  }

  #[test]
  fn test_read_missing_is_none() {
    let store = CacheStore::new(MemoryStorage::new());
    assert!(store.read("hosting").is_none());
  }

  #[test]
  fn test_write_then_read() {
    let store = CacheStore::new(MemoryStorage::new());
    let before = Utc::now().timestamp_millis();
    let written = store.write("hosting", json!({ "servers": ["a"] }));

    let read = store.read("hosting").unwrap();
    assert_eq!(read, written);
    assert_eq!(read.payload, json!({ "servers": ["a"] }));
    assert!(read.saved_at_epoch_ms >= before);
  }

  #[test]
  fn test_write_overwrites_without_merge() {
    let store = CacheStore::new(MemoryStorage::new());
    store.write("hosting", json!({ "stats": 1, "servers": ["a"] }));
    store.write("hosting", json!({ "servers": ["b"] }));
    assert_eq!(
      store.read("hosting").unwrap().payload,
      json!({ "servers": ["b"] })
    );
  }

  #[test]
  fn test_timestamp_never_goes_backwards() {
    let storage = MemoryStorage::new();
    let store = CacheStore::new(storage);
    let future = Utc::now().timestamp_millis() + 3_600_000;
    let raw = serde_json::to_string(&json!({ "data": [], "timestamp": future })).unwrap();
    store
      .storage
      .set(&store.storage_key("hosting"), &raw)
      .unwrap();

    let written = store.write("hosting", json!([1]));
    assert_eq!(written.saved_at_epoch_ms, future);
  }

  #[test]
  fn test_concurrent_writers_keep_latest_stamp() {
    let store = CacheStore::new(MemoryStorage::new());
    let handles: Vec<_> = (0..8)
      .map(|n| {
        let store = store.clone();
        std::thread::spawn(move || {
          (0..50)
            .map(|i| store.write("chats", json!([n, i])).saved_at_epoch_ms)
            .max()
            .unwrap()
        })
      })
      .collect();
    let newest = handles.into_iter().map(|h| h.join().unwrap()).max().unwrap();

    assert_eq!(store.read("chats").unwrap().saved_at_epoch_ms, newest);
  }

  #[test]
  fn test_corrupt_entry_is_a_miss() {
    let store = CacheStore::new(MemoryStorage::new());
    store
      .storage
      .set(&store.storage_key("hosting"), "{not json")
      .unwrap();
    assert!(store.read("hosting").is_none());

    // Valid JSON in the wrong shape is also a miss, never partial data
    store
      .storage
      .set(&store.storage_key("hosting"), r#"{"data": {"servers": []}}"#)
      .unwrap();
    assert!(store.read("hosting").is_none());
  }

  #[test]
  fn test_broken_backend_is_swallowed() {
    let store = CacheStore::new(BrokenStorage);
    assert!(store.read("hosting").is_none());
    let entry = store.write("hosting", json!({ "servers": [] }));
    assert_eq!(entry.payload, json!({ "servers": [] }));
  }

  #[test]
  fn test_namespaces_are_isolated() {
    let storage = Arc::new(MemoryStorage::new());
    let a = CacheStore {
      storage: storage.clone(),
      namespace: "https://a.example".to_string(),
      write_lock: Arc::new(Mutex::new(())),
    };
    let b = CacheStore {
      storage,
      namespace: "https://b.example".to_string(),
      write_lock: Arc::new(Mutex::new(())),
    };

    a.write("hosting", json!("from a"));
    assert!(b.read("hosting").is_none());
    assert_eq!(a.read("hosting").unwrap().payload, json!("from a"));
  }
}
