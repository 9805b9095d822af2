//! Eviction Queue Module
//!
//! Tracks insertion order for FIFO eviction.

use std::collections::VecDeque;

// == Eviction Queue ==
/// Tracks key arrival order for the FIFO eviction strategy.
///
/// Keys are stored in a VecDeque where:
/// - Front = Oldest insertion
/// - Back = Newest insertion
///
/// Reads never reorder the queue; only re-inserting a key refreshes its
/// position.
#[derive(Debug, Default)]
pub(crate) struct EvictionQueue {
    /// Keys in arrival order
    order: VecDeque<String>,
}

impl EvictionQueue {
    // == Constructor ==
    /// Creates a new empty eviction queue.
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Enqueue ==
    /// Records a key insertion (moves to back).
    ///
    /// If the key is already tracked, it is removed first so each key appears
    /// at most once. Overwriting an entry therefore resets its eviction slot.
    pub fn enqueue(&mut self, key: &str) {
        self.remove(key);
        self.order.push_back(key.to_string());
    }

    // == Dequeue ==
    /// Returns and removes the oldest tracked key.
    ///
    /// Returns None if the queue is empty.
    pub fn dequeue(&mut self) -> Option<String> {
        self.order.pop_front()
    }

    // == Remove ==
    /// Removes a key from the queue.
    pub fn remove(&mut self, key: &str) {
        self.order.retain(|k| k != key);
    }

    // == Peek Oldest ==
    /// Returns the oldest tracked key without removing it.
    #[allow(dead_code)]
    pub fn peek_oldest(&self) -> Option<&String> {
        self.order.front()
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    // == Is Empty ==
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    // == Contains ==
    /// Checks if a key is being tracked.
    pub fn contains(&self, key: &str) -> bool {
        self.order.iter().any(|k| k == key)
    }

    // == Clear ==
    /// Drops every tracked key.
    pub fn clear(&mut self) {
        self.order.clear();
    }

    // == Keys ==
    /// Returns a snapshot of tracked keys, oldest first.
    pub fn keys(&self) -> Vec<String> {
        self.order.iter().cloned().collect()
    }
}
