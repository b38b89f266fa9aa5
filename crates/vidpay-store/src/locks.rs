//! In-process keyed locks for compound store operations.
//!
//! Keys hash onto a fixed set of stripes. A caller locks every key it will
//! touch in one call; stripes are taken in ascending index order so two
//! operations over overlapping key sets cannot deadlock.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use parking_lot::{Mutex, MutexGuard};

/// Default number of lock stripes.
pub const DEFAULT_STRIPES: usize = 256;

/// Striped lock table.
pub struct KeyedLocks {
    stripes: Vec<Mutex<()>>,
}

/// Guards held for the duration of a compound operation.
#[must_use = "locks are released when the guard is dropped"]
pub struct KeyedGuard<'a> {
    _guards: Vec<MutexGuard<'a, ()>>,
}

impl KeyedLocks {
    /// Create a table with `stripes` stripes (at least one).
    #[must_use]
    pub fn new(stripes: usize) -> Self {
        Self {
            stripes: (0..stripes.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    fn stripe(&self, key: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        // Truncation is fine: only the low bits pick a stripe.
        #[allow(clippy::cast_possible_truncation)]
        let hash = hasher.finish() as usize;
        hash % self.stripes.len()
    }

    /// Lock all `keys`, blocking until every stripe is held.
    pub fn lock<K: AsRef<[u8]>>(&self, keys: &[K]) -> KeyedGuard<'_> {
        let mut indices: Vec<usize> = keys.iter().map(|k| self.stripe(k.as_ref())).collect();
        indices.sort_unstable();
        indices.dedup();

        KeyedGuard {
            _guards: indices.into_iter().map(|i| self.stripes[i].lock()).collect(),
        }
    }
}

impl Default for KeyedLocks {
    fn default() -> Self {
        Self::new(DEFAULT_STRIPES)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn duplicate_keys_do_not_self_deadlock() {
        let locks = KeyedLocks::new(4);
        let _guard = locks.lock(&[b"a".as_slice(), b"a".as_slice(), b"b".as_slice()]);
    }

    #[test]
    fn single_stripe_serializes_everything() {
        let locks = Arc::new(KeyedLocks::new(1));
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                std::thread::spawn(move || {
                    let key = format!("key-{i}");
                    let _guard = locks.lock(&[key.as_bytes()]);
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(2));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn overlapping_sets_in_opposite_order_complete() {
        let locks = Arc::new(KeyedLocks::new(64));
        let handles: Vec<_> = (0..2)
            .map(|i| {
                let locks = Arc::clone(&locks);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let keys: [&[u8]; 2] = if i == 0 { [b"x", b"y"] } else { [b"y", b"x"] };
                        let _guard = locks.lock(&keys);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
