//! Bounded free-list of reusable key records.
//!
//! Lookups build a transient key for every request. Rather than constructing
//! a fresh record each time, [`KeyPool`] hands out recycled ones and takes
//! them back once the lookup is done, keeping at most `capacity` spares.
//!
//! ## Lifecycle
//!
//! ```text
//!            acquire()                    map creates a group with it
//!   Pooled ────────────► Lent ───────────────────────────────► Pinned
//!     ▲                   │                                      │
//!     │     release()     │              group pruned: unpin()   │
//!     └───────────────────┴◄─────────────────────────────────────┘
//! ```
//!
//! A `Pinned` key is the identity of a live group inside
//! [`GroupedLruMap`](crate::ds::GroupedLruMap); handing it back to the pool
//! while the group still indexes by it would let a later lookup overwrite
//! the group's hash key. [`KeyPool::release`] refuses pinned keys.

/// Lifecycle tag carried by every poolable key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyState {
    /// Handed out by the pool (or freshly built) and owned by a caller.
    #[default]
    Lent,
    /// Sitting in the pool's free list.
    Pooled,
    /// Canonical identity of a live group.
    Pinned,
}

/// A record that can be recycled through a [`KeyPool`].
pub trait Poolable: Default {
    fn state(&self) -> KeyState;

    fn set_state(&mut self, state: KeyState);

    /// Marks the key as the identity of a live group.
    fn pin(&mut self) {
        self.set_state(KeyState::Pinned);
    }

    /// Releases group ownership; the key may be recycled afterwards.
    fn unpin(&mut self) {
        self.set_state(KeyState::Lent);
    }

    fn is_pinned(&self) -> bool {
        self.state() == KeyState::Pinned
    }
}

/// Spare keys kept by default; lookups rarely hold more than two at once.
pub const DEFAULT_KEY_POOL_CAPACITY: usize = 20;

/// Bounded stack of recycled keys.
#[derive(Debug)]
pub struct KeyPool<K> {
    free: Vec<K>,
    capacity: usize,
    built: u64,
    reused: u64,
}

impl<K: Poolable> KeyPool<K> {
    /// Creates a pool that retains at most `capacity` spare keys.
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Vec::with_capacity(capacity),
            capacity,
            built: 0,
            reused: 0,
        }
    }

    /// Returns a recycled key if one is available, otherwise a new one.
    ///
    /// The key comes back tagged [`KeyState::Lent`]; its other fields hold
    /// whatever the previous user left and must be re-initialised.
    pub fn acquire(&mut self) -> K {
        let mut key = match self.free.pop() {
            Some(key) => {
                self.reused += 1;
                key
            },
            None => {
                self.built += 1;
                K::default()
            },
        };
        key.set_state(KeyState::Lent);
        key
    }

    /// Returns `key` to the pool, or drops it if the pool is full.
    ///
    /// Pinned keys are never pooled; releasing one is a bug in the caller and
    /// panics in debug builds.
    pub fn release(&mut self, mut key: K) {
        debug_assert_ne!(
            key.state(),
            KeyState::Pinned,
            "released a key that still identifies a live group"
        );
        if key.is_pinned() {
            return;
        }
        if self.free.len() < self.capacity {
            key.set_state(KeyState::Pooled);
            self.free.push(key);
        }
    }

    /// Number of spare keys currently held.
    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys constructed because the free list was empty.
    pub fn built(&self) -> u64 {
        self.built
    }

    /// Keys served from the free list.
    pub fn reused(&self) -> u64 {
        self.reused
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        assert!(self.free.len() <= self.capacity);
        for key in &self.free {
            assert_eq!(key.state(), KeyState::Pooled);
        }
    }
}

impl<K: Poolable> Default for KeyPool<K> {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_POOL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct TestKey {
        value: u32,
        state: KeyState,
    }

    impl Poolable for TestKey {
        fn state(&self) -> KeyState {
            self.state
        }

        fn set_state(&mut self, state: KeyState) {
            self.state = state;
        }
    }

    #[test]
    fn key_pool_builds_then_reuses() {
        let mut pool: KeyPool<TestKey> = KeyPool::new(4);
        let mut key = pool.acquire();
        key.value = 7;
        assert_eq!(key.state(), KeyState::Lent);
        assert_eq!(pool.built(), 1);

        pool.release(key);
        assert_eq!(pool.len(), 1);

        let again = pool.acquire();
        assert_eq!(again.value, 7);
        assert_eq!(again.state(), KeyState::Lent);
        assert_eq!(pool.reused(), 1);
        assert!(pool.is_empty());
    }

    #[test]
    fn key_pool_discards_beyond_capacity() {
        let mut pool: KeyPool<TestKey> = KeyPool::new(2);
        let keys: Vec<_> = (0..5).map(|_| pool.acquire()).collect();
        for key in keys {
            pool.release(key);
        }
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.capacity(), 2);
        pool.debug_validate_invariants();
    }

    #[test]
    fn key_pool_zero_capacity_never_retains() {
        let mut pool: KeyPool<TestKey> = KeyPool::new(0);
        let key = pool.acquire();
        pool.release(key);
        assert!(pool.is_empty());
        pool.acquire();
        assert_eq!(pool.built(), 2);
    }

    #[test]
    fn unpinned_key_can_be_released() {
        let mut pool: KeyPool<TestKey> = KeyPool::default();
        let mut key = pool.acquire();
        key.pin();
        assert!(key.is_pinned());
        key.unpin();
        pool.release(key);
        assert_eq!(pool.len(), 1);
        pool.debug_validate_invariants();
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "live group")]
    fn releasing_pinned_key_panics_in_debug() {
        let mut pool: KeyPool<TestKey> = KeyPool::default();
        let mut key = pool.acquire();
        key.pin();
        pool.release(key);
    }
}
