//! Deadline-ordered expiration index
//!
//! Maps expiry deadlines to the keys due at that instant so expired
//! entries can be purged without scanning the whole store.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Expiration index keyed by deadline
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    /// Deadline -> keys due at that deadline
    deadlines: BTreeMap<Instant, Vec<String>>,
    /// Key -> its scheduled deadline, for O(log n) cancellation
    by_key: HashMap<String, Instant>,
}

impl ExpiryIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a key to expire after `ttl`, replacing any earlier schedule
    pub fn schedule(&mut self, key: &str, ttl: Duration) {
        self.cancel(key);
        let deadline = Instant::now() + ttl;
        self.deadlines.entry(deadline).or_default().push(key.to_string());
        self.by_key.insert(key.to_string(), deadline);
    }

    /// Remove a key from the index
    pub fn cancel(&mut self, key: &str) {
        if let Some(deadline) = self.by_key.remove(key) {
            if let Some(keys) = self.deadlines.get_mut(&deadline) {
                keys.retain(|k| k != key);
                if keys.is_empty() {
                    self.deadlines.remove(&deadline);
                }
            }
        }
    }

    /// Check if a key is scheduled
    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Drain and return all keys whose deadline has passed
    pub fn drain_due(&mut self, now: Instant) -> Vec<String> {
        let not_due = self.deadlines.split_off(&now);
        let due = std::mem::replace(&mut self.deadlines, not_due);

        let mut keys = Vec::new();
        for (_, bucket) in due {
            for key in bucket {
                self.by_key.remove(&key);
                keys.push(key);
            }
        }
        keys
    }

    /// Number of scheduled keys
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Drop all schedules
    pub fn clear(&mut self) {
        self.deadlines.clear();
        self.by_key.clear();
    }
}
