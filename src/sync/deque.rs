//! # ConcurrentDeque: mutex-protected double-ended queue.
//!
//! All operations take the same guard, so they are linearizable with respect to each
//! other. Pops never block: an empty deque yields `None` and is left untouched.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// Thread-safe double-ended sequence.
///
/// # Example
/// ```
/// use jobvisor::ConcurrentDeque;
///
/// let dq = ConcurrentDeque::new();
/// dq.push_back(2);
/// dq.push_front(1);
/// assert_eq!(dq.get(0), Some(1));
/// assert_eq!(dq.pop_back(), Some(2));
/// assert_eq!(dq.size(), 1);
/// ```
#[derive(Debug)]
pub struct ConcurrentDeque<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> ConcurrentDeque<T> {
    /// Creates an empty deque.
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    /// Inserts at the tail.
    pub fn push_back(&self, item: T) {
        self.items.lock().push_back(item);
    }

    /// Inserts at the head.
    pub fn push_front(&self, item: T) {
        self.items.lock().push_front(item);
    }

    /// Removes and returns the tail item, or `None` if empty.
    pub fn pop_back(&self) -> Option<T> {
        self.items.lock().pop_back()
    }

    /// Removes and returns the head item, or `None` if empty.
    pub fn pop_front(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Current number of items. May be stale as soon as it returns.
    pub fn size(&self) -> usize {
        self.items.lock().len()
    }

    /// True if there are no items.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Pushes every item of `iter` to the tail under a single lock acquisition.
    pub fn extend_back(&self, iter: impl IntoIterator<Item = T>) {
        self.items.lock().extend(iter);
    }

    /// Removes all items and returns how many were dropped.
    pub fn clear(&self) -> usize {
        let drained: Vec<T> = self.items.lock().drain(..).collect();
        // Items are dropped outside the guard.
        drained.len()
    }
}

impl<T: Clone> ConcurrentDeque<T> {
    /// Returns a clone of the item at `pos` (0 = head), or `None` if out of range.
    ///
    /// Meant for inspection; it does not consume the item.
    pub fn get(&self, pos: usize) -> Option<T> {
        self.items.lock().get(pos).cloned()
    }
}

impl<T> Default for ConcurrentDeque<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_empty_pops_return_none_without_mutation() {
        let dq: ConcurrentDeque<i32> = ConcurrentDeque::new();
        assert_eq!(dq.pop_front(), None);
        assert_eq!(dq.pop_back(), None);
        assert_eq!(dq.size(), 0);
        assert!(dq.is_empty());
    }

    #[test]
    fn test_size_tracks_net_inserts() {
        let dq = ConcurrentDeque::new();
        dq.push_back(1);
        dq.push_back(2);
        dq.push_front(0);
        assert_eq!(dq.size(), 3);

        assert_eq!(dq.pop_front(), Some(0));
        assert_eq!(dq.pop_back(), Some(2));
        assert_eq!(dq.size(), 1);

        assert_eq!(dq.pop_back(), Some(1));
        assert_eq!(dq.pop_back(), None);
        assert_eq!(dq.size(), 0);
    }

    #[test]
    fn test_same_end_operations_keep_fifo_order() {
        let dq = ConcurrentDeque::new();
        for i in 0..5 {
            dq.push_back(i);
        }
        let drained: Vec<_> = std::iter::from_fn(|| dq.pop_front()).collect();
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_get_by_position() {
        let dq = ConcurrentDeque::new();
        dq.push_back("b");
        dq.push_front("a");
        dq.push_back("c");
        assert_eq!(dq.get(0), Some("a"));
        assert_eq!(dq.get(2), Some("c"));
        assert_eq!(dq.get(3), None);
        assert_eq!(dq.size(), 3);
    }

    #[test]
    fn test_clear_and_extend() {
        let dq = ConcurrentDeque::new();
        dq.extend_back(0..10);
        assert_eq!(dq.size(), 10);
        assert_eq!(dq.clear(), 10);
        assert!(dq.is_empty());
    }

    #[test]
    fn test_concurrent_pushes_and_pops_balance() {
        let dq = Arc::new(ConcurrentDeque::new());
        let producers: Vec<_> = (0..4)
            .map(|p| {
                let dq = Arc::clone(&dq);
                thread::spawn(move || {
                    for i in 0..1000 {
                        if i % 2 == 0 {
                            dq.push_back(p * 1000 + i);
                        } else {
                            dq.push_front(p * 1000 + i);
                        }
                    }
                })
            })
            .collect();
        for h in producers {
            h.join().unwrap();
        }
        assert_eq!(dq.size(), 4000);

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let dq = Arc::clone(&dq);
                thread::spawn(move || {
                    let mut n = 0;
                    while dq.pop_front().or_else(|| dq.pop_back()).is_some() {
                        n += 1;
                    }
                    n
                })
            })
            .collect();
        let popped: usize = consumers.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(popped, 4000);
        assert_eq!(dq.size(), 0);
    }
}
