// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn too_many_queued_error() -> LockError {
    LockError::TooManyQueued {
        identifier: "order-1".to_string(),
        queued: 3,
        limit: 2,
    }
}

fn attempts_exceeded_error() -> LockError {
    LockError::AttemptsExceeded {
        identifier: "order-1".to_string(),
        attempts: 5,
    }
}

fn interrupted_error() -> LockError {
    LockError::Interrupted {
        identifier: "order-1".to_string(),
    }
}

fn deadlock_error() -> LockError {
    LockError::Deadlock {
        identifier: "order-1".to_string(),
    }
}

fn not_held_error() -> LockError {
    LockError::NotHeld {
        identifier: "order-1".to_string(),
    }
}

#[parameterized(
    too_many_queued = { too_many_queued_error(), true, false, false },
    attempts_exceeded = { attempts_exceeded_error(), true, false, false },
    interrupted = { interrupted_error(), true, false, false },
    deadlock = { deadlock_error(), false, true, false },
    not_held = { not_held_error(), false, false, true },
)]
fn lock_error_classification(
    error: LockError,
    acquisition_failure: bool,
    is_deadlock: bool,
    illegal_state: bool,
) {
    assert_eq!(error.is_acquisition_failure(), acquisition_failure);
    assert_eq!(error.is_deadlock(), is_deadlock);
    assert_eq!(error.is_illegal_state(), illegal_state);
    assert_eq!(error.identifier(), "order-1");
}

#[test]
fn messages_name_the_identifier_and_limits() {
    assert_eq!(
        too_many_queued_error().to_string(),
        "failed to acquire lock for identifier order-1: too many queued threads (3 >= 2)"
    );
    assert_eq!(
        attempts_exceeded_error().to_string(),
        "failed to acquire lock for identifier order-1: maximum attempts exceeded (5)"
    );
    assert!(deadlock_error().to_string().contains("imminent deadlock"));
}

#[test]
fn config_error_messages_include_rejected_value() {
    assert_eq!(
        ConfigError::InvalidAcquireAttempts(0).to_string(),
        "acquire_attempts needs to be a positive integer or -1, but was '0'"
    );
    assert_eq!(
        ConfigError::NegativeSpinTime(-5).to_string(),
        "spin_time needs to be a non negative integer, but was '-5'"
    );
}
