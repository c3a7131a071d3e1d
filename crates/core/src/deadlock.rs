// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wait-for cycle detection across every lock factory in the process
//!
//! Before a thread `T` waits again on a lock owned by `O`, collect every thread
//! that waits (directly or transitively) for a lock `T` holds. If `O` is among
//! them, waiting would close a cycle.
//!
//! The check samples live state, so wait relationships that change between the
//! check and the wait can go unnoticed. It never reports a cycle that is absent
//! from the snapshot it inspected.

use crate::entry::LockEntry;
use crate::error::LockError;
use crate::mutex::WaitIntrospect;
use crate::registry;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Every node reachable from `start` by repeatedly following `direct_waiters`.
///
/// `start` itself is only included if it is reachable through a cycle.
pub(crate) fn transitive_waiters<T, F>(start: T, mut direct_waiters: F) -> HashSet<T>
where
    T: Copy + Eq + Hash,
    F: FnMut(T) -> Vec<T>,
{
    let mut visited = HashSet::new();
    let mut pending = vec![start];
    while let Some(holder) = pending.pop() {
        for waiter in direct_waiters(holder) {
            if visited.insert(waiter) {
                pending.push(waiter);
            }
        }
    }
    visited
}

/// Threads waiting, directly or transitively, for any of `locks` held by `owner`
pub(crate) fn threads_waiting_for_locks_of<L: WaitIntrospect>(
    owner: ThreadId,
    locks: &[L],
) -> HashSet<ThreadId> {
    transitive_waiters(owner, |holder| {
        locks
            .iter()
            .filter(|lock| lock.is_held_by(holder))
            .flat_map(|lock| lock.waiting_threads())
            .collect()
    })
}

/// Whether `me` waiting on `target` would complete a cycle through `locks`
pub(crate) fn would_deadlock<L: WaitIntrospect + ?Sized, M: WaitIntrospect>(
    me: ThreadId,
    target: &L,
    locks: &[M],
) -> bool {
    match target.owner() {
        Some(owner) if owner != me => threads_waiting_for_locks_of(me, locks).contains(&owner),
        _ => false,
    }
}

/// Fail if waiting on `entry` could never succeed
pub(crate) fn check_for_deadlock(entry: &LockEntry) -> Result<(), LockError> {
    let me = thread::current().id();
    if !entry.is_locked() || entry.is_held_by(me) {
        return Ok(());
    }

    let locks: Vec<Arc<LockEntry>> = registry::live_tables()
        .iter()
        .flat_map(|table| table.entries())
        .collect();

    if would_deadlock(me, entry, &locks) {
        tracing::warn!(
            identifier = entry.identifier(),
            owner = ?entry.owner(),
            "imminent deadlock detected"
        );
        return Err(LockError::Deadlock {
            identifier: entry.identifier().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "deadlock_tests.rs"]
mod tests;
