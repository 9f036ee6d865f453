//! Deferred task queue.
//!
//! FIFO of effects waiting to run. Each key can be pending at most once:
//! pushing a key that is already waiting keeps its original position and
//! does not add a second run.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

#[derive(Debug)]
pub(crate) struct TaskQueue<K>
where
    K: Copy + Eq + Hash,
{
    order: VecDeque<K>,
    pending: HashSet<K>,
}

impl<K> TaskQueue<K>
where
    K: Copy + Eq + Hash,
{
    pub(crate) fn new() -> Self {
        Self {
            order: VecDeque::new(),
            pending: HashSet::new(),
        }
    }

    /// Queue `key`. Returns `false` if it was already pending.
    pub(crate) fn push(&mut self, key: K) -> bool {
        if !self.pending.insert(key) {
            return false;
        }
        self.order.push_back(key);
        true
    }

    /// Take the oldest pending key.
    pub(crate) fn pop(&mut self) -> Option<K> {
        let key = self.order.pop_front()?;
        self.pending.remove(&key);
        Some(key)
    }

    pub(crate) fn clear(&mut self) {
        self.order.clear();
        self.pending.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_push_order() {
        let mut queue = TaskQueue::new();
        queue.push(3);
        queue.push(1);
        queue.push(2);

        assert_eq!(queue.pop(), Some(3));
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn duplicate_push_collapses() {
        let mut queue = TaskQueue::new();
        assert!(queue.push('a'));
        assert!(queue.push('b'));
        assert!(!queue.push('a'));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), Some('a'));

        // Once popped, the key can be queued again.
        assert!(queue.push('a'));
        assert_eq!(queue.pop(), Some('b'));
        assert_eq!(queue.pop(), Some('a'));
    }

    #[test]
    fn clear_forgets_pending_keys() {
        let mut queue = TaskQueue::new();
        queue.push(1);
        queue.clear();

        assert_eq!(queue.len(), 0);
        assert_eq!(queue.pop(), None);
        assert!(queue.push(1));
    }
}
