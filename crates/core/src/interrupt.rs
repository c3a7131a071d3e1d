// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interruption of threads blocked on a lock
//!
//! An interrupt is a per-thread flag. It only affects blocking waits: a thread
//! with a pending interrupt leaves its current (or next) wait, the flag is
//! consumed, and the acquisition fails with
//! [`LockError::Interrupted`](crate::LockError::Interrupted).
//!
//! A flag stays pending until a wait consumes it or it is cleared, even if the
//! thread never waits again or has exited. Whoever interrupts a thread that may
//! be done with locking drops the flag with [`clear_interrupt_for`].

use crate::registry;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::LazyLock;
use std::thread::{self, ThreadId};

static PENDING: LazyLock<Mutex<HashSet<ThreadId>>> = LazyLock::new(|| Mutex::new(HashSet::new()));

/// Interrupt `thread`, waking it if it is waiting on any lock in this process
pub fn interrupt(thread: ThreadId) {
    PENDING.lock().insert(thread);
    for table in registry::live_tables() {
        table.wake_waiter(thread);
    }
    tracing::debug!(thread = ?thread, "interrupt requested");
}

/// Whether `thread` has an interrupt that has not been consumed yet
pub fn is_interrupted(thread: ThreadId) -> bool {
    PENDING.lock().contains(&thread)
}

/// Drop a pending interrupt for the current thread. Returns whether one was pending.
pub fn clear_interrupt() -> bool {
    take(thread::current().id())
}

/// Drop a pending interrupt for `thread`. Returns whether one was pending.
pub fn clear_interrupt_for(thread: ThreadId) -> bool {
    take(thread)
}

/// Consume a pending interrupt for `thread`
pub(crate) fn take(thread: ThreadId) -> bool {
    PENDING.lock().remove(&thread)
}
