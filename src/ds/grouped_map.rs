//! Recency-ordered map of value groups.
//!
//! Like an access-ordered map, except recency is tracked per *group* of
//! values sharing a key rather than per value. This lets a pool find the
//! least recently requested *size* of buffer and shed buffers from it, instead
//! of the least recently used buffer object.
//!
//! A lookup counts as an access even when the group has no values (or did
//! not exist before the lookup). Adding or evicting values is not an access.
//!
//! ## Architecture
//!
//! ```text
//!   index: FxHashMap<K, SlotId>          nodes: SlotArena<Node<K, V>>
//!   ┌─────────┬────────┐
//!   │ [400]A  │  id_2  │──┐               ┌────────────────────────────────┐
//!   │ [100]A  │  id_1  │──┼──┐            ▼                                │
//!   │ [200]R  │  id_3  │──┼──┼──┐   ┌──────────┐   ┌──────┐   ┌──────┐   ┌──────┐
//!   └─────────┴────────┘  │  │  │   │ sentinel │◄─►│ id_2 │◄─►│ id_1 │◄─►│ id_3 │
//!                         │  │  │   │ (id_0)   │   │ [b,b]│   │ []   │   │ [b]  │
//!                         │  │  │   └──────────┘   └──────┘   └──────┘   └──────┘
//!                         │  │  │        ▲             MRU                   LRU │
//!                         │  │  │        └─────────────────────────────────────┘
//! ```
//!
//! The ring is circular and anchored by a sentinel node holding no group:
//! `sentinel.next` is the most recently used group, `sentinel.prev` the
//! least. A detached node links to itself, so unlinking it is a no-op.
//!
//! ## Operations
//!
//! | Operation         | Recency effect            | Complexity              |
//! |-------------------|---------------------------|-------------------------|
//! | `put(k, v)`       | new group goes to LRU end | O(1) avg                |
//! | `get(k)`          | group moves to MRU end    | O(1) avg                |
//! | `remove_last()`   | none; prunes empty groups | O(empty groups skipped) |
//!
//! ## Key ownership
//!
//! Keys are [`Poolable`]. The first key used for a group is pinned and kept
//! as the group's identity until the group is pruned; any later key naming
//! the same group is handed straight back to the caller's [`KeyPool`]. The
//! hash index holds its own copy of each key purely for hashing.
//!
//! `debug_validate_invariants()` is available in debug/test builds.

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::ds::key_pool::{KeyPool, Poolable};
use crate::ds::slot_arena::{SlotArena, SlotId};
use crate::error::InvariantError;

#[derive(Debug)]
struct Group<K, V> {
    key: K,
    values: Vec<V>,
}

#[derive(Debug)]
struct Node<K, V> {
    prev: SlotId,
    next: SlotId,
    // `None` only for the sentinel.
    group: Option<Group<K, V>>,
}

/// LRU-ordered ring of groups, each holding a stack of values.
#[derive(Debug)]
pub struct GroupedLruMap<K, V> {
    nodes: SlotArena<Node<K, V>>,
    index: FxHashMap<K, SlotId>,
    sentinel: SlotId,
    len: usize,
}

impl<K, V> GroupedLruMap<K, V>
where
    K: Poolable + Eq + Hash + Clone + fmt::Debug,
{
    /// Creates an empty map.
    pub fn new() -> Self {
        let mut nodes = SlotArena::new();
        let sentinel = Self::insert_detached(&mut nodes, None);
        Self {
            nodes,
            index: FxHashMap::default(),
            sentinel,
            len: 0,
        }
    }

    /// Total number of values across all groups.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no group holds a value. Empty groups may still exist.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of groups, including empty ones not yet pruned.
    pub fn group_count(&self) -> usize {
        self.index.len()
    }

    /// Iterates `(key, value count)` pairs from most to least recently used.
    pub fn iter_groups(&self) -> GroupIter<'_, K, V> {
        GroupIter {
            map: self,
            current: self.next_of(self.sentinel),
        }
    }

    /// Adds `value` to the group for `key`.
    ///
    /// A new group is placed at the least-recently-used end: a size that has
    /// only been returned to the pool, never requested, is not hot. If the
    /// group already exists, `key` is released to `pool` and recency is left
    /// untouched.
    pub fn put(&mut self, key: K, value: V, pool: &mut KeyPool<K>) {
        match self.index.get(&key).copied() {
            Some(id) => {
                pool.release(key);
                if let Some(group) = self.group_mut(id) {
                    group.values.push(value);
                }
            },
            None => {
                let id = self.create_group(key, vec![value]);
                self.make_tail(id);
            },
        }
        self.len += 1;
    }

    /// Marks the group for `key` as most recently used and pops its newest
    /// value.
    ///
    /// The group is created (empty) if it does not exist, so a miss still
    /// records the request. Such a group is pruned by [`remove_last`] once it
    /// drifts to the tail, unless values are put into it first.
    ///
    /// [`remove_last`]: GroupedLruMap::remove_last
    pub fn get(&mut self, key: K, pool: &mut KeyPool<K>) -> Option<V> {
        let id = match self.index.get(&key).copied() {
            Some(id) => {
                pool.release(key);
                id
            },
            None => self.create_group(key, Vec::new()),
        };
        self.make_head(id);

        let value = self.group_mut(id)?.values.pop();
        if value.is_some() {
            self.len -= 1;
        }
        value
    }

    /// Removes a value from the least recently used non-empty group.
    ///
    /// Empty groups met on the way from the tail are unlinked, dropped from
    /// the index, and their keys released to `pool`. Returns `None` only when
    /// no group holds a value.
    pub fn remove_last(&mut self, pool: &mut KeyPool<K>) -> Option<V> {
        let mut current = self.prev_of(self.sentinel);
        while current != self.sentinel {
            let prev = self.prev_of(current);
            if let Some(value) = self.group_mut(current).and_then(|g| g.values.pop()) {
                self.len -= 1;
                return Some(value);
            }
            self.prune(current, pool);
            current = prev;
        }
        None
    }

    /// Verifies ring links, index agreement, key pinning and the value count.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let mut seen = 0usize;
        let mut values = 0usize;
        let mut prev = self.sentinel;
        let mut current = self.next_of(self.sentinel);

        while current != self.sentinel {
            let node = self
                .nodes
                .get(current)
                .ok_or_else(|| InvariantError::new(format!("ring links to freed slot {}", current.index())))?;
            if node.prev != prev {
                return Err(InvariantError::new(format!(
                    "slot {} has prev {} but follows {}",
                    current.index(),
                    node.prev.index(),
                    prev.index()
                )));
            }
            let group = node
                .group
                .as_ref()
                .ok_or_else(|| InvariantError::new("second sentinel found in ring"))?;
            if self.index.get(&group.key) != Some(&current) {
                return Err(InvariantError::new(format!(
                    "group {:?} at slot {} is not indexed there",
                    group.key,
                    current.index()
                )));
            }
            if !group.key.is_pinned() {
                return Err(InvariantError::new(format!(
                    "group key {:?} is not pinned",
                    group.key
                )));
            }

            seen += 1;
            values += group.values.len();
            if seen > self.index.len() {
                return Err(InvariantError::new("ring holds more groups than the index"));
            }
            prev = current;
            current = node.next;
        }

        if self.prev_of(self.sentinel) != prev {
            return Err(InvariantError::new("sentinel prev is not the last ring node"));
        }
        if seen != self.index.len() {
            return Err(InvariantError::new(format!(
                "ring holds {seen} groups, index holds {}",
                self.index.len()
            )));
        }
        if self.nodes.len() != seen + 1 {
            return Err(InvariantError::new(format!(
                "arena holds {} nodes for {seen} groups",
                self.nodes.len()
            )));
        }
        if values != self.len {
            return Err(InvariantError::new(format!(
                "groups hold {values} values, len is {}",
                self.len
            )));
        }
        Ok(())
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        if let Err(err) = self.check_invariants() {
            panic!("grouped map invariant violated: {err}");
        }
    }

    fn create_group(&mut self, mut key: K, values: Vec<V>) -> SlotId {
        key.pin();
        let id = Self::insert_detached(
            &mut self.nodes,
            Some(Group {
                key: key.clone(),
                values,
            }),
        );
        self.index.insert(key, id);
        id
    }

    fn insert_detached(nodes: &mut SlotArena<Node<K, V>>, group: Option<Group<K, V>>) -> SlotId {
        // Placeholder links; rewritten to a self-loop once the id is known.
        let id = nodes.insert(Node {
            prev: SlotId(0),
            next: SlotId(0),
            group,
        });
        if let Some(node) = nodes.get_mut(id) {
            node.prev = id;
            node.next = id;
        }
        id
    }

    fn prune(&mut self, id: SlotId, pool: &mut KeyPool<K>) {
        self.unlink(id);
        let Some(Node {
            group: Some(group), ..
        }) = self.nodes.remove(id)
        else {
            return;
        };
        self.index.remove(&group.key);
        debug!(key = ?group.key, "pruned empty group");
        let mut key = group.key;
        key.unpin();
        pool.release(key);
    }

    // Make the node the most recently used group.
    fn make_head(&mut self, id: SlotId) {
        self.unlink(id);
        let first = self.next_of(self.sentinel);
        self.link_between(id, self.sentinel, first);
    }

    // Make the node the least recently used group.
    fn make_tail(&mut self, id: SlotId) {
        self.unlink(id);
        let last = self.prev_of(self.sentinel);
        self.link_between(id, last, self.sentinel);
    }

    fn unlink(&mut self, id: SlotId) {
        let (prev, next) = (self.prev_of(id), self.next_of(id));
        self.set_next(prev, next);
        self.set_prev(next, prev);
    }

    fn link_between(&mut self, id: SlotId, prev: SlotId, next: SlotId) {
        self.set_prev(id, prev);
        self.set_next(id, next);
        self.set_prev(next, id);
        self.set_next(prev, id);
    }

    fn next_of(&self, id: SlotId) -> SlotId {
        self.nodes.get(id).map_or(self.sentinel, |node| node.next)
    }

    fn prev_of(&self, id: SlotId) -> SlotId {
        self.nodes.get(id).map_or(self.sentinel, |node| node.prev)
    }

    fn set_next(&mut self, id: SlotId, next: SlotId) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.next = next;
        }
    }

    fn set_prev(&mut self, id: SlotId, prev: SlotId) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.prev = prev;
        }
    }

    fn group(&self, id: SlotId) -> Option<&Group<K, V>> {
        self.nodes.get(id).and_then(|node| node.group.as_ref())
    }

    fn group_mut(&mut self, id: SlotId) -> Option<&mut Group<K, V>> {
        self.nodes.get_mut(id).and_then(|node| node.group.as_mut())
    }
}

impl<K, V> Default for GroupedLruMap<K, V>
where
    K: Poolable + Eq + Hash + Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Display for GroupedLruMap<K, V>
where
    K: Poolable + Eq + Hash + Clone + fmt::Debug + fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GroupedLruMap( ")?;
        for (i, (key, count)) in self.iter_groups().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{{{key}:{count}}}")?;
        }
        f.write_str(" )")
    }
}

/// Iterator over `(key, value count)` from most to least recently used.
pub struct GroupIter<'a, K, V> {
    map: &'a GroupedLruMap<K, V>,
    current: SlotId,
}

impl<'a, K, V> Iterator for GroupIter<'a, K, V> {
    type Item = (&'a K, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == self.map.sentinel {
            return None;
        }
        let node = self.map.nodes.get(self.current)?;
        self.current = node.next;
        node.group
            .as_ref()
            .map(|group| (&group.key, group.values.len()))
    }
}
