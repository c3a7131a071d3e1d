// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};
use yare::parameterized;

fn policy(attempts: i64, queued: i64, spin_ms: i64) -> BackoffPolicy {
    BackoffPolicy::new(attempts, queued, spin_ms).unwrap()
}

/// Lock `entry` on a background thread until the returned sender fires
fn hold_in_background(entry: &Arc<LockEntry>) -> (mpsc::Sender<()>, thread::JoinHandle<()>) {
    let (locked_tx, locked_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let entry = Arc::clone(entry);
    let handle = thread::spawn(move || {
        assert!(entry.mutex().try_lock());
        locked_tx.send(()).unwrap();
        let _ = release_rx.recv();
        entry.unlock().unwrap();
    });
    locked_rx.recv().unwrap();
    (release_tx, handle)
}

#[test]
fn lock_free_entry_is_immediate() {
    let entry = LockEntry::new("order-1");
    assert_eq!(entry.lock(&policy(1, 1, 10_000)), Ok(Acquired::Live));
    assert!(entry.is_held_by_current_thread());
    entry.unlock().unwrap();
}

#[test]
fn reentrant_lock_ignores_limits() {
    let entry = LockEntry::new("order-1");
    let strict = policy(1, 1, 0);
    for _ in 0..3 {
        assert_eq!(entry.lock(&strict), Ok(Acquired::Live));
    }
    assert_eq!(entry.hold_count(), 3);
    for _ in 0..3 {
        entry.unlock().unwrap();
    }
    assert!(!entry.is_locked());
}

#[parameterized(
    single_attempt = { 1, 0 },
    two_attempts = { 2, 1 },
    four_attempts = { 4, 3 },
)]
fn attempt_budget_bounds_wait(attempts: i64, waits: u32) {
    let entry = Arc::new(LockEntry::new("order-1"));
    let (release, handle) = hold_in_background(&entry);

    let spin = Duration::from_millis(40);
    let start = Instant::now();
    let result = entry.lock(&policy(attempts, -1, 40));
    let elapsed = start.elapsed();

    assert_eq!(
        result,
        Err(LockError::AttemptsExceeded {
            identifier: "order-1".to_string(),
            attempts: attempts as u32,
        })
    );
    assert!(elapsed >= spin * waits, "gave up too early: {:?}", elapsed);
    assert!(elapsed < spin * waits + Duration::from_secs(2));
    assert!(!entry.is_held_by_current_thread());

    release.send(()).unwrap();
    handle.join().unwrap();
}

#[test]
fn queue_limit_refuses_without_waiting() {
    let entry = Arc::new(LockEntry::new("order-1"));
    let (release, handle) = hold_in_background(&entry);

    let waiter = {
        let entry = Arc::clone(&entry);
        thread::spawn(move || entry.mutex().try_lock_for(Duration::from_secs(10)))
    };
    let deadline = Instant::now() + Duration::from_secs(5);
    while entry.queue_length() < 1 {
        assert!(Instant::now() < deadline);
        thread::sleep(Duration::from_millis(1));
    }

    let start = Instant::now();
    let result = entry.lock(&policy(-1, 1, 10_000));
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(
        result,
        Err(LockError::TooManyQueued {
            identifier: "order-1".to_string(),
            queued: 1,
            limit: 1,
        })
    );

    release.send(()).unwrap();
    handle.join().unwrap();
    assert_eq!(waiter.join().unwrap(), TryLockResult::Acquired);
}

#[test]
fn closed_entry_is_not_kept() {
    let entry = LockEntry::new("order-1");
    entry.close();

    assert_eq!(entry.lock(&policy(1, 1, 0)), Ok(Acquired::Closed));
    assert!(!entry.is_locked());
}

#[test]
fn interrupted_wait_holds_nothing() {
    let entry = Arc::new(LockEntry::new("order-1"));
    let (release, handle) = hold_in_background(&entry);

    crate::interrupt(thread::current().id());
    let result = entry.lock(&policy(-1, -1, 10_000));

    assert_eq!(
        result,
        Err(LockError::Interrupted {
            identifier: "order-1".to_string(),
        })
    );
    assert!(!entry.is_held_by_current_thread());
    assert_eq!(entry.queue_length(), 0);

    release.send(()).unwrap();
    handle.join().unwrap();
}

#[test]
fn unlock_without_holding_is_illegal_state() {
    let entry = LockEntry::new("order-1");
    let err = entry.unlock().unwrap_err();
    assert!(err.is_illegal_state());
}
