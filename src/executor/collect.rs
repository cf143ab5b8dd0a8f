//! # Result collection for bulk submissions.
//!
//! Two publishers back the executor's `collect*` operations:
//!
//! - [`OrderedPublisher`] emits results **strictly in submission order**. A job that
//!   finishes early is buffered until every lower-indexed slot resolved.
//! - First-serve collection needs no publisher: every wrapped job owns a sender and
//!   emits an [`Indexed`] result on completion.
//!
//! ## Slot lifecycle
//! ```text
//!  Pending ──fill(v)──► Ready(v) ──flush──► sent
//!     │
//!     └──drop without fill──► Skipped ──flush──► (nothing sent)
//! ```
//!
//! A slot is skipped when its job failed, observed a cancelled scope after finishing,
//! panicked, or was dropped without running (executor stopped). The stream closes once
//! every slot resolved, so a shorter result list is the partial-failure signal.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Result tagged with the submission index of the job that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indexed<T> {
    /// Position of the job in the submitted list.
    pub index: usize,
    /// Value produced by the job.
    pub value: T,
}

enum Slot<T> {
    Pending,
    Ready(T),
    Skipped,
}

struct OrderedState<T> {
    slots: Vec<Slot<T>>,
    next: usize,
    tx: Option<mpsc::UnboundedSender<T>>,
}

impl<T> OrderedState<T> {
    /// Emits every contiguous resolved slot starting at `next`; closes when done.
    fn flush(&mut self) {
        while self.next < self.slots.len() {
            match std::mem::replace(&mut self.slots[self.next], Slot::Skipped) {
                Slot::Pending => {
                    self.slots[self.next] = Slot::Pending;
                    return;
                }
                Slot::Ready(value) => {
                    if let Some(tx) = &self.tx {
                        let _ = tx.send(value);
                    }
                }
                Slot::Skipped => {}
            }
            self.next += 1;
        }
        self.tx = None;
    }
}

/// Reorders out-of-order completions into submission order.
pub(crate) struct OrderedPublisher<T> {
    state: Mutex<OrderedState<T>>,
}

impl<T> OrderedPublisher<T> {
    /// Creates a publisher for `len` slots writing into `tx`.
    ///
    /// With `len == 0` the sender is dropped right away and the stream is closed.
    pub(crate) fn new(len: usize, tx: mpsc::UnboundedSender<T>) -> Arc<Self> {
        let mut state = OrderedState {
            slots: (0..len).map(|_| Slot::Pending).collect(),
            next: 0,
            tx: Some(tx),
        };
        state.flush();
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    /// Returns the guard resolving slot `index`.
    pub(crate) fn slot(self: &Arc<Self>, index: usize) -> SlotGuard<T> {
        SlotGuard {
            index,
            publisher: Arc::clone(self),
            filled: false,
        }
    }

    fn resolve(&self, index: usize, value: Option<T>) {
        let mut state = self.state.lock();
        state.slots[index] = match value {
            Some(v) => Slot::Ready(v),
            None => Slot::Skipped,
        };
        state.flush();
    }
}

/// Owner of one pending slot. Dropping it unfilled marks the slot skipped.
pub(crate) struct SlotGuard<T> {
    index: usize,
    publisher: Arc<OrderedPublisher<T>>,
    filled: bool,
}

impl<T> SlotGuard<T> {
    /// Stores the slot's result.
    pub(crate) fn fill(mut self, value: T) {
        self.filled = true;
        self.publisher.resolve(self.index, Some(value));
    }
}

impl<T> Drop for SlotGuard<T> {
    fn drop(&mut self) {
        if !self.filled {
            self.publisher.resolve(self.index, None);
        }
    }
}
