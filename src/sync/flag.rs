//! # SyncFlag: set/reset condition gate.
//!
//! [`SyncFlag`] is a boolean guarded by a mutex and a condition variable. Threads (or
//! async tasks) wait until the flag is set; setters choose between waking **all**
//! waiters ([`SyncFlag::set`]) and handing off to **one** waiter ([`SyncFlag::set_one`]).
//!
//! ## Transitions
//! ```text
//!            set() / set_one()
//!   false ─────────────────────────► true
//!     ▲                               │
//!     └────────────── reset() ────────┘
//! ```
//!
//! ## Rules
//! - Waiters always **re-check the value under the lock** (spurious-wakeup safe).
//! - `reset()` never wakes anybody.
//! - Once set, new waiters return immediately until the next `reset()`.
//! - Blocking waiters park on the condvar; async waiters park on a [`Notify`].
//!   `set_one()` signals at most one waiter of each kind.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;

/// Boolean condition gate with broadcast/signal/wait/timeout semantics.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use std::thread;
/// use jobvisor::SyncFlag;
///
/// let flag = Arc::new(SyncFlag::new(false));
/// let waiter = {
///     let flag = Arc::clone(&flag);
///     thread::spawn(move || flag.wait())
/// };
///
/// flag.set();
/// waiter.join().unwrap();
/// assert!(flag.is_set());
/// ```
#[derive(Debug)]
pub struct SyncFlag {
    value: Mutex<bool>,
    cond: Condvar,
    notify: Notify,
}

impl SyncFlag {
    /// Creates a flag with the given initial value.
    pub fn new(initial: bool) -> Self {
        Self {
            value: Mutex::new(initial),
            cond: Condvar::new(),
            notify: Notify::new(),
        }
    }

    /// Returns the current value without blocking.
    #[inline]
    pub fn is_set(&self) -> bool {
        *self.value.lock()
    }

    /// Sets the flag and wakes **all** waiters.
    pub fn set(&self) {
        *self.value.lock() = true;
        self.cond.notify_all();
        self.notify.notify_waiters();
    }

    /// Sets the flag and wakes **at most one** waiter.
    ///
    /// If nobody is waiting the flag simply stays set, so the next waiter to check
    /// finds it `true`.
    pub fn set_one(&self) {
        *self.value.lock() = true;
        self.cond.notify_one();
        self.notify.notify_one();
    }

    /// Clears the flag. Does not wake anyone.
    pub fn reset(&self) {
        *self.value.lock() = false;
    }

    /// Blocks the calling thread until the flag is set.
    pub fn wait(&self) {
        let mut value = self.value.lock();
        while !*value {
            self.cond.wait(&mut value);
        }
    }

    /// Blocks until the flag is set or `timeout` elapses, whichever comes first.
    ///
    /// Returns `true` if the flag was observed set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait();
            return true;
        };

        let mut value = self.value.lock();
        while !*value {
            if self.cond.wait_until(&mut value, deadline).timed_out() {
                return *value;
            }
        }
        true
    }

    /// Waits asynchronously until the flag is set.
    ///
    /// The async counterpart of [`SyncFlag::wait`]; does not block the runtime thread.
    /// Cancel-safe: dropping the future leaves the flag untouched.
    pub async fn wait_async(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent `set` cannot slip in between.
            notified.as_mut().enable();

            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for SyncFlag {
    /// Returns an unset flag.
    fn default() -> Self {
        Self::new(false)
    }
}
