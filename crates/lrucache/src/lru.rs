//! LRU (Least Recently Used) list implementation
//!
//! Hash index plus an index-linked recency list. Entries live in a slot arena
//! and `prev`/`next` are slot indices, so the list never points into itself.
//! Not synchronized: [`crate::LruCache`] wraps it in a mutex.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use ahash::RandomState;

use crate::error::{Error, Result};

/// Upper bound on slots reserved up front, so huge capacities stay lazy
const MAX_PREALLOC: usize = 1 << 16;

/// Position of a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SlotId(usize);

/// Node in the LRU doubly-linked list
struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

/// Result of [`LruList::put`]
///
/// Displaced keys and values are handed back so the caller can drop them
/// outside of any lock.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum PutOutcome<K, V> {
    /// New entry stored, nothing evicted
    Inserted,
    /// Existing entry overwritten; carries the previous value
    Updated(V),
    /// New entry stored and the least recently used entry evicted
    Evicted(K, V),
    /// Capacity is zero, nothing stored
    Rejected,
}

/// LRU list with fixed capacity
pub(crate) struct LruList<K, V> {
    map: HashMap<K, SlotId, RandomState>,
    nodes: Vec<Option<Node<K, V>>>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
    free_list: Vec<usize>,
    capacity: usize,
}

impl<K, V> LruList<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a new LRU list with the given capacity (0 stores nothing)
    pub fn new(capacity: usize) -> Self {
        let reserve = capacity.saturating_add(1).min(MAX_PREALLOC);

        Self {
            map: HashMap::with_capacity_and_hasher(reserve, RandomState::new()),
            nodes: Vec::with_capacity(reserve),
            head: None,
            tail: None,
            free_list: Vec::new(),
            capacity,
        }
    }

    /// Get a value and promote its entry to most recently used
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = *self.map.get(key)?;
        self.move_to_front(id);
        self.nodes[id.0].as_ref().map(|node| &node.value)
    }

    /// Get a value without touching recency
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = *self.map.get(key)?;
        self.nodes[id.0].as_ref().map(|node| &node.value)
    }

    /// Check for a key without touching recency
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Insert or overwrite a key-value pair, promoting it to most recently used
    pub fn put(&mut self, key: K, value: V) -> PutOutcome<K, V> {
        if self.capacity == 0 {
            return PutOutcome::Rejected;
        }

        if let Some(id) = self.map.get(&key).copied() {
            if let Some(node) = self.nodes[id.0].as_mut() {
                let previous = std::mem::replace(&mut node.value, value);
                self.move_to_front(id);
                return PutOutcome::Updated(previous);
            }
        }

        let id = self.alloc_node(Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.map.insert(key, id);
        self.attach_front(id);

        // At most one over: the check runs after every single insert.
        if self.map.len() > self.capacity {
            if let Some((key, value)) = self.pop_tail() {
                return PutOutcome::Evicted(key, value);
            }
        }

        PutOutcome::Inserted
    }

    /// Remove a key, detaching it from both the index and the list
    pub fn remove<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.map.remove(key)?;
        self.unlink(id);
        let node = self.nodes[id.0].take()?;
        self.free_list.push(id.0);
        Some((node.key, node.value))
    }

    /// Remove and return the least recently used entry
    pub fn pop_tail(&mut self) -> Option<(K, V)> {
        let id = self.tail?;
        self.unlink(id);
        let node = self.nodes[id.0].take()?;
        self.free_list.push(id.0);
        self.map.remove(&node.key);
        Some((node.key, node.value))
    }

    /// Get the current number of entries
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the list is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.map.clear();
        self.nodes.clear();
        self.free_list.clear();
        self.head = None;
        self.tail = None;
    }

    /// Iterate entries from most to least recently used
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            nodes: &self.nodes,
            next: self.head,
            remaining: self.map.len(),
        }
    }

    /// Verify that the index and the list agree
    ///
    /// Walks the list both ways and checks every slot in the arena. Returns
    /// the first broken invariant found.
    pub fn check_invariants(&self) -> Result<()> {
        let len = self.map.len();

        if len > self.capacity {
            return Err(Error::invariant(format!(
                "{} entries exceed capacity {}",
                len, self.capacity
            )));
        }
        if self.head.is_none() != self.tail.is_none() {
            return Err(Error::invariant("exactly one of head/tail is set"));
        }
        if self.head.is_none() != (len == 0) {
            return Err(Error::invariant(format!(
                "head is {:?} but index holds {} keys",
                self.head, len
            )));
        }

        // Forward walk
        let mut prev: Option<SlotId> = None;
        let mut cursor = self.head;
        let mut steps = 0;
        while let Some(id) = cursor {
            steps += 1;
            if steps > len {
                return Err(Error::invariant("list is longer than index (cycle?)"));
            }
            let node = self
                .nodes
                .get(id.0)
                .and_then(Option::as_ref)
                .ok_or_else(|| Error::invariant(format!("slot {} is linked but vacant", id.0)))?;
            if node.prev != prev {
                return Err(Error::invariant(format!(
                    "slot {} has prev {:?}, expected {:?}",
                    id.0, node.prev, prev
                )));
            }
            if self.map.get(&node.key) != Some(&id) {
                return Err(Error::invariant(format!(
                    "slot {} is not indexed under its key",
                    id.0
                )));
            }
            prev = cursor;
            cursor = node.next;
        }
        if steps != len {
            return Err(Error::invariant(format!(
                "list has {} entries, index has {}",
                steps, len
            )));
        }
        if prev != self.tail {
            return Err(Error::invariant("forward walk does not end at tail"));
        }

        // Backward walk
        let mut next: Option<SlotId> = None;
        let mut cursor = self.tail;
        let mut steps = 0;
        while let Some(id) = cursor {
            steps += 1;
            if steps > len {
                return Err(Error::invariant("reverse walk is longer than index"));
            }
            let node = self
                .nodes
                .get(id.0)
                .and_then(Option::as_ref)
                .ok_or_else(|| Error::invariant(format!("slot {} is linked but vacant", id.0)))?;
            if node.next != next {
                return Err(Error::invariant(format!(
                    "slot {} has next {:?}, expected {:?}",
                    id.0, node.next, next
                )));
            }
            next = cursor;
            cursor = node.prev;
        }
        if next != self.head {
            return Err(Error::invariant("reverse walk does not end at head"));
        }

        // Arena accounting
        let occupied = self.nodes.iter().filter(|slot| slot.is_some()).count();
        if occupied != len {
            return Err(Error::invariant(format!(
                "{} occupied slots for {} keys",
                occupied, len
            )));
        }
        let mut on_free_list = vec![false; self.nodes.len()];
        for &idx in &self.free_list {
            match self.nodes.get(idx) {
                Some(None) if !on_free_list[idx] => on_free_list[idx] = true,
                Some(None) => {
                    return Err(Error::invariant(format!("slot {} freed twice", idx)));
                }
                _ => {
                    return Err(Error::invariant(format!(
                        "free list holds live or out-of-range slot {}",
                        idx
                    )));
                }
            }
        }
        if occupied + self.free_list.len() != self.nodes.len() {
            return Err(Error::invariant("vacant slot missing from free list"));
        }

        Ok(())
    }

    fn move_to_front(&mut self, id: SlotId) {
        if self.head == Some(id) {
            return; // Already at front
        }

        self.unlink(id);
        self.attach_front(id);
    }

    fn attach_front(&mut self, id: SlotId) {
        if let Some(node) = &mut self.nodes[id.0] {
            node.prev = None;
            node.next = self.head;
        }

        if let Some(head_id) = self.head {
            if let Some(head) = &mut self.nodes[head_id.0] {
                head.prev = Some(id);
            }
        }

        self.head = Some(id);
        if self.tail.is_none() {
            self.tail = Some(id);
        }
    }

    fn unlink(&mut self, id: SlotId) {
        let (prev, next) = match &mut self.nodes[id.0] {
            Some(node) => (node.prev.take(), node.next.take()),
            None => return,
        };

        match prev {
            Some(prev_id) => {
                if let Some(prev_node) = &mut self.nodes[prev_id.0] {
                    prev_node.next = next;
                }
            }
            None => {
                self.head = next;
            }
        }

        match next {
            Some(next_id) => {
                if let Some(next_node) = &mut self.nodes[next_id.0] {
                    next_node.prev = prev;
                }
            }
            None => {
                self.tail = prev;
            }
        }
    }

    fn alloc_node(&mut self, node: Node<K, V>) -> SlotId {
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx] = Some(node);
            SlotId(idx)
        } else {
            self.nodes.push(Some(node));
            SlotId(self.nodes.len() - 1)
        }
    }
}

/// Iterator over entries in recency order, most recent first
pub(crate) struct Iter<'a, K, V> {
    nodes: &'a [Option<Node<K, V>>],
    next: Option<SlotId>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.nodes.get(self.next?.0)?.as_ref()?;
        self.next = node.next;
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}
