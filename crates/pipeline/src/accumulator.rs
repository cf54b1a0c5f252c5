//! Lock-guarded accumulator for state written by several workers.
//!
//! Lock scope: exactly one map operation per call. The guard never escapes a
//! method and is never held across an `.await`.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared map written concurrently by pipeline workers
#[derive(Debug)]
pub struct SharedAccumulator<K, V> {
    inner: Arc<Mutex<HashMap<K, V>>>,
}

impl<K, V> Clone for SharedAccumulator<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for SharedAccumulator<K, V> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K: Eq + Hash, V> SharedAccumulator<K, V> {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-applied insert,
    // so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert one entry, returning the previous value for `key`
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.lock().insert(key, value)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the accumulator is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether `key` is present
    pub fn contains_key(&self, key: &K) -> bool {
        self.lock().contains_key(key)
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> HashMap<K, V>
    where
        K: Clone,
        V: Clone,
    {
        self.lock().clone()
    }

    /// Take the contents, leaving the accumulator empty
    pub fn take(&self) -> HashMap<K, V> {
        std::mem::take(&mut *self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_snapshot() {
        let acc = SharedAccumulator::new();
        assert!(acc.is_empty());
        assert_eq!(acc.insert(1u64, "a".to_string()), None);
        assert_eq!(acc.insert(1u64, "b".to_string()), Some("a".to_string()));
        assert_eq!(acc.len(), 1);
        assert!(acc.contains_key(&1));
        assert_eq!(acc.snapshot().get(&1).map(String::as_str), Some("b"));
    }

    #[test]
    fn test_concurrent_threads_lose_no_updates() {
        let acc = SharedAccumulator::new();
        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let acc = acc.clone();
                std::thread::spawn(move || {
                    for i in 0..500u64 {
                        acc.insert(t * 1000 + i, i);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(acc.len(), 8 * 500);
        assert_eq!(acc.take().len(), 8 * 500);
        assert!(acc.is_empty());
    }
}
