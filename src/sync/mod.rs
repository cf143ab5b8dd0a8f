//! Leaf synchronization primitives.
//!
//! ## Contents
//! - [`SyncFlag`] set/reset condition gate (condvar for threads, notify for tasks)
//! - [`ConcurrentDeque`] mutex-protected double-ended queue
//!
//! Both are building blocks of the [`Executor`](crate::Executor); the flag also gates
//! the [`Supervisor`](crate::Supervisor) start.

mod deque;
mod flag;

pub use deque::ConcurrentDeque;
pub use flag::SyncFlag;
