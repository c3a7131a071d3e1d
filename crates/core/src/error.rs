// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for lock configuration and acquisition

use std::path::PathBuf;
use thiserror::Error;

/// Invalid backoff configuration, raised when a policy is built
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("acquire_attempts needs to be a positive integer or -1, but was '{0}'")]
    InvalidAcquireAttempts(i64),
    #[error("maximum_queued needs to be a positive integer or -1, but was '{0}'")]
    InvalidMaximumQueued(i64),
    #[error("spin_time needs to be a non negative integer, but was '{0}'")]
    NegativeSpinTime(i64),
    #[error("invalid backoff policy: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read backoff policy from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Conditions reported by lock acquisition and release
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("failed to acquire lock for identifier {identifier}: too many queued threads ({queued} >= {limit})")]
    TooManyQueued {
        identifier: String,
        queued: usize,
        limit: usize,
    },
    #[error("failed to acquire lock for identifier {identifier}: maximum attempts exceeded ({attempts})")]
    AttemptsExceeded { identifier: String, attempts: u32 },
    #[error("failed to acquire lock for identifier {identifier}: thread was interrupted")]
    Interrupted { identifier: String },
    #[error("an imminent deadlock was detected while attempting to acquire lock for identifier {identifier}")]
    Deadlock { identifier: String },
    #[error("lock for identifier {identifier} is not held by the current thread")]
    NotHeld { identifier: String },
}

impl LockError {
    /// The identifier of the lock this condition refers to
    pub fn identifier(&self) -> &str {
        match self {
            LockError::TooManyQueued { identifier, .. }
            | LockError::AttemptsExceeded { identifier, .. }
            | LockError::Interrupted { identifier }
            | LockError::Deadlock { identifier }
            | LockError::NotHeld { identifier } => identifier,
        }
    }

    /// The lock could not be obtained this time; the caller may retry later.
    pub fn is_acquisition_failure(&self) -> bool {
        matches!(
            self,
            LockError::TooManyQueued { .. }
                | LockError::AttemptsExceeded { .. }
                | LockError::Interrupted { .. }
        )
    }

    /// Waiting would have completed a wait-for cycle.
    ///
    /// Retrying immediately is likely to reproduce the same cycle.
    pub fn is_deadlock(&self) -> bool {
        matches!(self, LockError::Deadlock { .. })
    }

    /// A release was attempted by a thread that does not hold the lock.
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, LockError::NotHeld { .. })
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
