// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reentrant mutual exclusion with wait introspection
//!
//! [`ReentrantMutex`] is an ownership-tracking lock that is not tied to a guard:
//! the owning thread acquires and releases it explicitly, possibly many times.
//! Besides locking it exposes who owns it and which threads are waiting for it,
//! which deadlock detection and disposal rely on.
//!
//! Waiters are not served in FIFO order; whichever thread observes the lock free
//! first after a release takes it.

use crate::interrupt;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

/// Read-only view of a lock's ownership and wait state
pub trait WaitIntrospect {
    /// Thread currently holding the lock
    fn owner(&self) -> Option<ThreadId>;

    /// Holds by the current thread, 0 if it does not own the lock
    fn hold_count(&self) -> usize;

    /// Approximate number of threads blocked waiting for the lock
    fn queue_length(&self) -> usize;

    /// Snapshot of the threads blocked waiting for the lock
    fn waiting_threads(&self) -> Vec<ThreadId>;

    fn is_locked(&self) -> bool {
        self.owner().is_some()
    }

    fn is_held_by(&self, thread: ThreadId) -> bool {
        self.owner() == Some(thread)
    }

    fn is_held_by_current_thread(&self) -> bool {
        self.is_held_by(thread::current().id())
    }
}

impl<T: WaitIntrospect + ?Sized> WaitIntrospect for Arc<T> {
    fn owner(&self) -> Option<ThreadId> {
        (**self).owner()
    }

    fn hold_count(&self) -> usize {
        (**self).hold_count()
    }

    fn queue_length(&self) -> usize {
        (**self).queue_length()
    }

    fn waiting_threads(&self) -> Vec<ThreadId> {
        (**self).waiting_threads()
    }
}

/// Outcome of a bounded wait
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TryLockResult {
    Acquired,
    TimedOut,
    Interrupted,
}

/// Returned by [`ReentrantMutex::unlock`] when the caller does not own the lock
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotOwner;

#[derive(Debug, Default)]
struct State {
    owner: Option<ThreadId>,
    holds: usize,
    waiters: Vec<ThreadId>,
}

impl State {
    /// Take or re-enter the lock for `me` if possible
    fn try_take(&mut self, me: ThreadId) -> bool {
        match self.owner {
            None => {
                self.owner = Some(me);
                self.holds = 1;
                true
            }
            Some(owner) if owner == me => {
                self.holds += 1;
                true
            }
            Some(_) => false,
        }
    }

    fn remove_waiter(&mut self, me: ThreadId) {
        if let Some(pos) = self.waiters.iter().position(|t| *t == me) {
            self.waiters.swap_remove(pos);
        }
    }
}

#[derive(Debug, Default)]
pub struct ReentrantMutex {
    state: Mutex<State>,
    released: Condvar,
}

impl ReentrantMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire without waiting. Reentrant acquisitions always succeed.
    pub fn try_lock(&self) -> bool {
        self.state.lock().try_take(thread::current().id())
    }

    /// Acquire, waiting at most `timeout` for the current owner to release.
    ///
    /// A pending [`interrupt`](crate::interrupt()) for the calling thread ends the
    /// wait and is consumed. The lock is never held after a non-`Acquired` result.
    /// A `timeout` too large to represent as a deadline waits without one.
    pub fn try_lock_for(&self, timeout: Duration) -> TryLockResult {
        let me = thread::current().id();
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.state.lock();

        if state.try_take(me) {
            return TryLockResult::Acquired;
        }

        state.waiters.push(me);
        let result = loop {
            if interrupt::take(me) {
                break TryLockResult::Interrupted;
            }
            match deadline {
                Some(deadline) if Instant::now() >= deadline => break TryLockResult::TimedOut,
                Some(deadline) => {
                    self.released.wait_until(&mut state, deadline);
                }
                None => self.released.wait(&mut state),
            }
            if state.try_take(me) {
                break TryLockResult::Acquired;
            }
        };
        state.remove_waiter(me);
        result
    }

    /// Release one hold. Wakes waiters once the last hold is gone.
    pub fn unlock(&self) -> Result<(), NotOwner> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if state.owner != Some(me) {
            return Err(NotOwner);
        }
        state.holds -= 1;
        if state.holds == 0 {
            state.owner = None;
            drop(state);
            self.released.notify_all();
        }
        Ok(())
    }

    /// Wake every waiter so it re-checks its interrupt flag
    pub(crate) fn wake_waiters(&self) {
        // Held so the wake cannot land between a waiter's interrupt check and its wait
        let _state = self.state.lock();
        self.released.notify_all();
    }
}

impl WaitIntrospect for ReentrantMutex {
    fn owner(&self) -> Option<ThreadId> {
        self.state.lock().owner
    }

    fn hold_count(&self) -> usize {
        let state = self.state.lock();
        if state.owner == Some(thread::current().id()) {
            state.holds
        } else {
            0
        }
    }

    fn queue_length(&self) -> usize {
        self.state.lock().waiters.len()
    }

    fn waiting_threads(&self) -> Vec<ThreadId> {
        self.state.lock().waiters.clone()
    }
}

#[cfg(test)]
#[path = "mutex_tests.rs"]
mod tests;
