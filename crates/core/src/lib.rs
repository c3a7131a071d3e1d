// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pessimist-core: identifier-keyed pessimistic locking
//!
//! This crate provides:
//! - A lock factory handing out reentrant, per-identifier exclusive locks
//! - Backoff policies bounding attempts, queue depth, and wait time
//! - Deadlock detection across every factory in the process
//! - Disposal of locks as soon as they are no longer held

pub mod backoff;
pub mod error;
pub mod factory;
pub mod interrupt;
pub mod mutex;
pub mod registry;

mod deadlock;
mod entry;

pub use backoff::{BackoffPolicy, UNBOUNDED};
pub use error::{ConfigError, LockError};
pub use factory::{Lock, LockFactory, LockGuard, LockHandle, PessimisticLockFactory};
pub use interrupt::{clear_interrupt, clear_interrupt_for, interrupt, is_interrupted};
pub use mutex::{ReentrantMutex, TryLockResult, WaitIntrospect};
pub use registry::live_factories;
