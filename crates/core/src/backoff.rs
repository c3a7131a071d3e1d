// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backoff policy for lock acquisition
//!
//! A policy bounds three things:
//! - **acquire_attempts** - attempts to obtain a lock before backing off. The first
//!   attempt never waits, so the longest wait is about `(acquire_attempts - 1) * spin_time`.
//! - **maximum_queued** - threads allowed to queue for one lock. The queue length is an
//!   approximation, so the effective limit may be slightly higher than configured.
//! - **spin_time** - how long each attempt after the first may wait.
//!
//! `-1` is the unbounded sentinel for both counts.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Sentinel accepted by [`BackoffPolicy::new`] for "no limit"
pub const UNBOUNDED: i64 = -1;

const LEGACY_SPIN_TIME: Duration = Duration::from_millis(100);

/// Immutable, validated acquisition limits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBackoffPolicy", into = "RawBackoffPolicy")]
pub struct BackoffPolicy {
    acquire_attempts: Option<u32>,
    maximum_queued: Option<usize>,
    spin_time: Duration,
}

/// On-disk shape, validated into a [`BackoffPolicy`]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBackoffPolicy {
    acquire_attempts: i64,
    maximum_queued: i64,
    #[serde(with = "humantime_serde")]
    spin_time: Duration,
}

impl BackoffPolicy {
    /// Build a policy from raw values.
    ///
    /// `acquire_attempts` and `maximum_queued` must be positive or [`UNBOUNDED`];
    /// `spin_time_millis` must not be negative.
    pub fn new(
        acquire_attempts: i64,
        maximum_queued: i64,
        spin_time_millis: i64,
    ) -> Result<Self, ConfigError> {
        let spin_time_millis = u64::try_from(spin_time_millis)
            .map_err(|_| ConfigError::NegativeSpinTime(spin_time_millis))?;
        Self::validated(
            acquire_attempts,
            maximum_queued,
            Duration::from_millis(spin_time_millis),
        )
    }

    /// Unbounded attempts and queue with a 100ms spin.
    ///
    /// This is the historical no-backoff behaviour. Under sustained contention a
    /// system using it will likely converge to a state where threads wait on locks
    /// indefinitely, so prefer explicit limits.
    pub fn unbounded() -> Self {
        Self {
            acquire_attempts: None,
            maximum_queued: None,
            spin_time: LEGACY_SPIN_TIME,
        }
    }

    /// Parse a policy from TOML
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a policy from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    fn validated(
        acquire_attempts: i64,
        maximum_queued: i64,
        spin_time: Duration,
    ) -> Result<Self, ConfigError> {
        let acquire_attempts = match acquire_attempts {
            UNBOUNDED => None,
            n if n > 0 => {
                Some(u32::try_from(n).map_err(|_| ConfigError::InvalidAcquireAttempts(n))?)
            }
            n => return Err(ConfigError::InvalidAcquireAttempts(n)),
        };
        let maximum_queued = match maximum_queued {
            UNBOUNDED => None,
            n if n > 0 => {
                Some(usize::try_from(n).map_err(|_| ConfigError::InvalidMaximumQueued(n))?)
            }
            n => return Err(ConfigError::InvalidMaximumQueued(n)),
        };
        Ok(Self {
            acquire_attempts,
            maximum_queued,
            spin_time,
        })
    }

    /// Attempt limit, `None` when unbounded
    pub fn acquire_attempts(&self) -> Option<u32> {
        self.acquire_attempts
    }

    /// Queue limit, `None` when unbounded
    pub fn maximum_queued(&self) -> Option<usize> {
        self.maximum_queued
    }

    pub fn spin_time(&self) -> Duration {
        self.spin_time
    }

    pub fn has_attempt_limit(&self) -> bool {
        self.acquire_attempts.is_some()
    }

    pub fn has_queue_limit(&self) -> bool {
        self.maximum_queued.is_some()
    }

    /// Whether a lock with `queue_length` waiters may not accept another one
    pub fn queue_limit_reached(&self, queue_length: usize) -> bool {
        match self.maximum_queued {
            None => false,
            Some(limit) => queue_length >= limit,
        }
    }
}

impl TryFrom<RawBackoffPolicy> for BackoffPolicy {
    type Error = ConfigError;

    fn try_from(raw: RawBackoffPolicy) -> Result<Self, Self::Error> {
        Self::validated(raw.acquire_attempts, raw.maximum_queued, raw.spin_time)
    }
}

impl From<BackoffPolicy> for RawBackoffPolicy {
    fn from(policy: BackoffPolicy) -> Self {
        Self {
            acquire_attempts: policy.acquire_attempts.map_or(UNBOUNDED, i64::from),
            maximum_queued: policy
                .maximum_queued
                .and_then(|n| i64::try_from(n).ok())
                .unwrap_or(UNBOUNDED),
            spin_time: policy.spin_time,
        }
    }
}

impl fmt::Display for BackoffPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn limit(value: Option<String>) -> String {
            value.unwrap_or_else(|| "unbounded".to_string())
        }
        writeln!(
            f,
            "acquire_attempts: {}",
            limit(self.acquire_attempts.map(|n| n.to_string()))
        )?;
        writeln!(
            f,
            "maximum_queued: {}",
            limit(self.maximum_queued.map(|n| n.to_string()))
        )?;
        write!(f, "spin_time: {}", humantime::format_duration(self.spin_time))
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
