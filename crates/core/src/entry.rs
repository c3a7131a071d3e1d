// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Disposable per-identifier lock
//!
//! A [`LockEntry`] lives in a factory's map from first use until its last hold
//! is released. Once `closed` it is out of the map and must never be handed to
//! another acquirer; a thread that still manages to lock a closed entry backs
//! out and looks the identifier up again.

use crate::backoff::BackoffPolicy;
use crate::deadlock;
use crate::error::LockError;
use crate::mutex::{ReentrantMutex, TryLockResult, WaitIntrospect};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::ThreadId;

#[derive(Debug)]
pub(crate) struct LockEntry {
    identifier: String,
    mutex: ReentrantMutex,
    closed: AtomicBool,
}

/// Result of locking an entry that may have been disposed concurrently
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Acquired {
    Live,
    /// The entry was closed while we waited; nothing is held
    Closed,
}

impl LockEntry {
    pub(crate) fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            mutex: ReentrantMutex::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn identifier(&self) -> &str {
        &self.identifier
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn mutex(&self) -> &ReentrantMutex {
        &self.mutex
    }

    /// Lock this entry, backing off as `policy` dictates
    pub(crate) fn lock(&self, policy: &BackoffPolicy) -> Result<Acquired, LockError> {
        if !self.mutex.try_lock() {
            self.wait_for_lock(policy)?;
        }

        if self.is_closed() {
            if self.mutex.unlock().is_err() {
                tracing::error!(identifier = %self.identifier, "closed entry was not held after locking it");
            }
            return Ok(Acquired::Closed);
        }
        Ok(Acquired::Live)
    }

    fn wait_for_lock(&self, policy: &BackoffPolicy) -> Result<(), LockError> {
        let queued = self.mutex.queue_length();
        if policy.queue_limit_reached(queued) {
            tracing::debug!(
                identifier = %self.identifier,
                queued,
                "lock acquisition refused: too many queued threads"
            );
            return Err(LockError::TooManyQueued {
                identifier: self.identifier.clone(),
                queued,
                limit: policy.maximum_queued().unwrap_or_default(),
            });
        }

        // The immediate attempt already used one of the budgeted attempts
        let mut remaining = policy.acquire_attempts().map(|n| n.saturating_sub(1));
        loop {
            // A cycle is reported even when the budget is spent
            deadlock::check_for_deadlock(self)?;

            if let Some(left) = remaining.as_mut() {
                if *left == 0 {
                    tracing::debug!(
                        identifier = %self.identifier,
                        attempts = ?policy.acquire_attempts(),
                        "lock acquisition failed: maximum attempts exceeded"
                    );
                    return Err(LockError::AttemptsExceeded {
                        identifier: self.identifier.clone(),
                        attempts: policy.acquire_attempts().unwrap_or_default(),
                    });
                }
                *left -= 1;
            }

            tracing::trace!(identifier = %self.identifier, remaining = ?remaining, "waiting for lock");
            match self.mutex.try_lock_for(policy.spin_time()) {
                TryLockResult::Acquired => return Ok(()),
                TryLockResult::TimedOut => continue,
                TryLockResult::Interrupted => {
                    tracing::debug!(identifier = %self.identifier, "lock wait interrupted");
                    return Err(LockError::Interrupted {
                        identifier: self.identifier.clone(),
                    });
                }
            }
        }
    }

    /// Release one hold
    pub(crate) fn unlock(&self) -> Result<(), LockError> {
        self.mutex.unlock().map_err(|_| LockError::NotHeld {
            identifier: self.identifier.clone(),
        })
    }
}

impl WaitIntrospect for LockEntry {
    fn owner(&self) -> Option<ThreadId> {
        self.mutex.owner()
    }

    fn hold_count(&self) -> usize {
        self.mutex.hold_count()
    }

    fn queue_length(&self) -> usize {
        self.mutex.queue_length()
    }

    fn waiting_threads(&self) -> Vec<ThreadId> {
        self.mutex.waiting_threads()
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
