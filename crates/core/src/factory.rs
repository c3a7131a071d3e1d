// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pessimistic lock factory
//!
//! [`PessimisticLockFactory::obtain_lock`] blocks until the calling thread has
//! exclusive access to an identifier, or backs off according to the factory's
//! [`BackoffPolicy`] with an error. A thread may hold the same identifier many
//! times; other threads get it only after every hold has been released.
//!
//! Entries are created on first use and removed when their last hold is
//! released, so the map only contains identifiers that are in use. Deadlocks
//! are detected across every factory in the process.

use crate::backoff::BackoffPolicy;
use crate::entry::{Acquired, LockEntry};
use crate::error::LockError;
use crate::mutex::WaitIntrospect;
use crate::registry;
use dashmap::DashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::ThreadId;

/// A held lock
pub trait Lock {
    /// Release one hold. Fails if the current thread does not hold the lock.
    fn release(&self) -> Result<(), LockError>;

    /// Whether the current thread holds the lock
    fn is_held(&self) -> bool;
}

/// Source of identifier-keyed locks
pub trait LockFactory {
    type Lock: Lock;

    /// Block until the lock for `identifier` is held by the current thread
    fn obtain_lock(&self, identifier: &str) -> Result<Self::Lock, LockError>;
}

/// Map of live entries shared by a factory, its handles, and the registry
#[derive(Debug)]
pub(crate) struct LockTable {
    locks: DashMap<String, Arc<LockEntry>>,
    policy: BackoffPolicy,
}

impl LockTable {
    fn entry_for(&self, identifier: &str) -> Arc<LockEntry> {
        if let Some(entry) = self.locks.get(identifier) {
            return Arc::clone(entry.value());
        }
        let entry = self.locks.entry(identifier.to_string()).or_insert_with(|| {
            tracing::debug!(identifier, "lock entry created");
            Arc::new(LockEntry::new(identifier))
        });
        Arc::clone(entry.value())
    }

    /// Remove `entry` only if it is still the one registered for its identifier
    fn remove(&self, entry: &Arc<LockEntry>) -> bool {
        self.locks
            .remove_if(entry.identifier(), |_, current| Arc::ptr_eq(current, entry))
            .is_some()
    }

    /// Close and remove `entry` if nobody holds it any more.
    ///
    /// The probe lock makes closing atomic with respect to acquirers: anyone who
    /// locks the entry afterwards sees it closed and retries.
    fn dispose_if_unused(&self, entry: &Arc<LockEntry>) {
        if !entry.mutex().try_lock() {
            return;
        }
        if entry.hold_count() == 1 {
            entry.close();
            if self.remove(entry) {
                tracing::debug!(identifier = entry.identifier(), "lock entry disposed");
            }
        }
        // The probe hold is ours
        if entry.mutex().unlock().is_err() {
            tracing::error!(identifier = entry.identifier(), "disposal probe was not held");
        }
    }

    /// Snapshot of the entries currently registered
    pub(crate) fn entries(&self) -> Vec<Arc<LockEntry>> {
        self.locks.iter().map(|e| Arc::clone(e.value())).collect()
    }

    /// Wake every entry `thread` is waiting on
    pub(crate) fn wake_waiter(&self, thread: ThreadId) {
        for entry in self.entries() {
            if entry.waiting_threads().contains(&thread) {
                entry.mutex().wake_waiters();
            }
        }
    }
}

/// Identifier-keyed reentrant locks with backoff and deadlock detection
///
/// Cloning yields another handle to the same locking domain.
#[derive(Clone, Debug)]
pub struct PessimisticLockFactory {
    table: Arc<LockTable>,
}

impl PessimisticLockFactory {
    pub fn new(policy: BackoffPolicy) -> Self {
        let table = Arc::new(LockTable {
            locks: DashMap::new(),
            policy,
        });
        registry::register(&table);
        Self { table }
    }

    /// Factory that never backs off.
    ///
    /// Threads may queue forever on a contended identifier. Prefer [`new`](Self::new)
    /// with explicit limits.
    pub fn unbounded() -> Self {
        tracing::warn!(
            "lock factory created without backoff limits; contended locks may starve threads indefinitely"
        );
        Self::new(BackoffPolicy::unbounded())
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.table.policy
    }

    /// Block until the current thread holds the lock for `identifier`.
    ///
    /// On error the current thread holds nothing it did not hold before.
    pub fn obtain_lock(&self, identifier: &str) -> Result<LockHandle, LockError> {
        loop {
            let entry = self.table.entry_for(identifier);
            match entry.lock(&self.table.policy)? {
                Acquired::Live => {
                    return Ok(LockHandle {
                        table: Arc::clone(&self.table),
                        entry,
                    })
                }
                Acquired::Closed => {
                    self.table.remove(&entry);
                }
            }
        }
    }

    /// Like [`obtain_lock`](Self::obtain_lock), released when the guard drops
    pub fn lock(&self, identifier: &str) -> Result<LockGuard, LockError> {
        self.obtain_lock(identifier).map(LockHandle::into_guard)
    }

    /// Identifiers with a live entry
    pub fn active_locks(&self) -> usize {
        self.table.locks.len()
    }

    /// Whether any thread holds `identifier`
    pub fn is_locked(&self, identifier: &str) -> bool {
        self.existing(identifier).is_some_and(|entry| entry.is_locked())
    }

    /// Approximate number of threads waiting for `identifier`
    pub fn queue_length(&self, identifier: &str) -> usize {
        self.existing(identifier).map_or(0, |entry| entry.queue_length())
    }

    fn existing(&self, identifier: &str) -> Option<Arc<LockEntry>> {
        self.table
            .locks
            .get(identifier)
            .map(|entry| Arc::clone(entry.value()))
    }

    #[cfg(test)]
    pub(crate) fn table(&self) -> &Arc<LockTable> {
        &self.table
    }
}

impl LockFactory for PessimisticLockFactory {
    type Lock = LockHandle;

    fn obtain_lock(&self, identifier: &str) -> Result<LockHandle, LockError> {
        PessimisticLockFactory::obtain_lock(self, identifier)
    }
}

/// Release capability for a lock obtained from a [`PessimisticLockFactory`]
///
/// Each successful acquisition must be matched by one [`release`](Self::release)
/// from the acquiring thread.
#[derive(Clone, Debug)]
pub struct LockHandle {
    table: Arc<LockTable>,
    entry: Arc<LockEntry>,
}

impl LockHandle {
    pub fn identifier(&self) -> &str {
        self.entry.identifier()
    }

    /// Release one hold, disposing of the entry after the last one
    pub fn release(&self) -> Result<(), LockError> {
        self.entry.unlock()?;
        self.table.dispose_if_unused(&self.entry);
        Ok(())
    }

    pub fn is_held(&self) -> bool {
        self.entry.is_held_by_current_thread()
    }

    /// Hand ownership of this hold to a guard that releases it on drop
    pub fn into_guard(self) -> LockGuard {
        LockGuard {
            handle: self,
            _not_send: PhantomData,
        }
    }

    #[cfg(test)]
    pub(crate) fn same_entry(&self, other: &LockHandle) -> bool {
        Arc::ptr_eq(&self.entry, &other.entry)
    }
}

impl Lock for LockHandle {
    fn release(&self) -> Result<(), LockError> {
        LockHandle::release(self)
    }

    fn is_held(&self) -> bool {
        LockHandle::is_held(self)
    }
}

/// Scoped hold released on every exit path.
///
/// Not `Send`: the hold belongs to the thread that acquired it.
#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LockGuard {
    handle: LockHandle,
    _not_send: PhantomData<*const ()>,
}

impl LockGuard {
    pub fn identifier(&self) -> &str {
        self.handle.identifier()
    }

    pub fn is_held(&self) -> bool {
        self.handle.is_held()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = self.handle.release() {
            tracing::error!(
                identifier = self.handle.identifier(),
                error = %e,
                "failed to release lock guard"
            );
        }
    }
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;
