//! TTL Cache - Key/Value Store with Per-Entry Absolute Expiry
//!
//! Expiry is lazy: `get` treats an entry past its deadline as a miss.
//! `cleanup` purges expired entries to bound memory and is never needed
//! for correctness.
//!
//! Time is read from `tokio::time::Instant`, so tests can advance a
//! paused clock instead of sleeping.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;

/// Deadline used when `now + ttl` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// A stored value and the instant after which it is stale.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
  value: V,
  expires_at: Instant,
}

/// Concurrent TTL cache.
///
/// Writers replace whole entries under the write lock, so a reader sees
/// either the previous entry or the new one.
#[derive(Debug)]
pub struct TtlCache<K, V> {
  entries: RwLock<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> Default for TtlCache<K, V> {
  fn default() -> Self {
    Self {
      entries: RwLock::new(HashMap::new()),
    }
  }
}

impl<K, V> TtlCache<K, V>
where
  K: Eq + Hash,
  V: Clone,
{
  /// Create an empty cache.
  pub fn new() -> Self {
    Self::default()
  }

  /// Store `value` under `key`, expiring `ttl` from now.
  ///
  /// A TTL too large to represent is clamped to a deadline decades away.
  pub fn set(&self, key: K, value: V, ttl: Duration) {
    let now = Instant::now();
    let entry = CacheEntry {
      value,
      expires_at: now.checked_add(ttl).unwrap_or(now + FAR_FUTURE),
    };
    self.entries.write().insert(key, entry);
  }

  /// Fetch a live value. Expired and absent entries are both misses.
  pub fn get(&self, key: &K) -> Option<V> {
    let entries = self.entries.read();
    let entry = entries.get(key)?;
    if Instant::now() > entry.expires_at {
      return None;
    }
    Some(entry.value.clone())
  }

  /// Remove `key`. Removing an absent key is a no-op.
  pub fn delete(&self, key: &K) {
    self.entries.write().remove(key);
  }

  /// Purge every expired entry; returns how many were removed.
  pub fn cleanup(&self) -> usize {
    let now = Instant::now();
    let mut entries = self.entries.write();
    let before = entries.len();
    entries.retain(|_, entry| now <= entry.expires_at);
    before - entries.len()
  }

  /// Number of stored entries, including expired ones not yet purged.
  pub fn len(&self) -> usize {
    self.entries.read().len()
  }

  /// Whether nothing is stored.
  pub fn is_empty(&self) -> bool {
    self.entries.read().is_empty()
  }
}
