// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Contention stress command

use crate::output::{self, OutputFormat};
use anyhow::{anyhow, Result};
use clap::Args;
use pessimist_core::{BackoffPolicy, LockError, PessimisticLockFactory};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Args)]
pub struct ContendArgs {
    /// Backoff policy file (defaults to the unbounded policy)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Number of contending threads
    #[arg(long, default_value = "8")]
    pub threads: usize,
    /// Number of distinct keys
    #[arg(long, default_value = "2")]
    pub keys: usize,
    /// Acquisitions per thread
    #[arg(long, default_value = "100")]
    pub iterations: usize,
    /// How long each acquisition holds its key, in milliseconds
    #[arg(long, default_value = "1")]
    pub hold_ms: u64,
}

#[derive(Debug, Default, Serialize)]
pub struct ContendReport {
    pub threads: usize,
    pub keys: usize,
    pub iterations: usize,
    pub acquired: usize,
    pub too_many_queued: usize,
    pub attempts_exceeded: usize,
    pub interrupted: usize,
    pub deadlocks: usize,
    pub violations: usize,
    pub leaked_locks: usize,
    pub elapsed_ms: u128,
}

impl fmt::Display for ContendReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Contended {} keys from {} threads x {} iterations in {}ms",
            self.keys, self.threads, self.iterations, self.elapsed_ms
        )?;
        writeln!(f, "  acquired:          {}", self.acquired)?;
        writeln!(f, "  too_many_queued:   {}", self.too_many_queued)?;
        writeln!(f, "  attempts_exceeded: {}", self.attempts_exceeded)?;
        writeln!(f, "  interrupted:       {}", self.interrupted)?;
        writeln!(f, "  deadlocks:         {}", self.deadlocks)?;
        writeln!(f, "  violations:        {}", self.violations)?;
        write!(f, "  leaked_locks:      {}", self.leaked_locks)
    }
}

#[derive(Default)]
struct Counters {
    acquired: AtomicUsize,
    too_many_queued: AtomicUsize,
    attempts_exceeded: AtomicUsize,
    interrupted: AtomicUsize,
    deadlocks: AtomicUsize,
    violations: AtomicUsize,
}

impl Counters {
    fn record_failure(&self, error: &LockError) {
        let counter = match error {
            LockError::TooManyQueued { .. } => &self.too_many_queued,
            LockError::AttemptsExceeded { .. } => &self.attempts_exceeded,
            LockError::Interrupted { .. } => &self.interrupted,
            LockError::Deadlock { .. } => &self.deadlocks,
            LockError::NotHeld { .. } => &self.violations,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn contend(args: ContendArgs, format: OutputFormat) -> Result<()> {
    if args.threads == 0 || args.keys == 0 {
        return Err(anyhow!("--threads and --keys must be at least 1"));
    }

    let factory = match &args.config {
        Some(path) => PessimisticLockFactory::new(BackoffPolicy::load(path)?),
        None => PessimisticLockFactory::unbounded(),
    };
    let report = run(&factory, &args)?;
    output::print(&report, format)
}

fn run(factory: &PessimisticLockFactory, args: &ContendArgs) -> Result<ContendReport> {
    let counters = Arc::new(Counters::default());
    let inside: Arc<Vec<AtomicUsize>> = Arc::new((0..args.keys).map(|_| AtomicUsize::new(0)).collect());
    let barrier = Arc::new(Barrier::new(args.threads));
    let hold = Duration::from_millis(args.hold_ms);
    let start = Instant::now();

    let workers: Vec<_> = (0..args.threads)
        .map(|t| {
            let factory = factory.clone();
            let counters = Arc::clone(&counters);
            let inside = Arc::clone(&inside);
            let barrier = Arc::clone(&barrier);
            let (keys, iterations) = (args.keys, args.iterations);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..iterations {
                    let key = (t + i) % keys;
                    let lock = match factory.obtain_lock(&format!("key-{}", key)) {
                        Ok(lock) => lock,
                        Err(e) => {
                            tracing::debug!(error = %e, "acquisition failed");
                            counters.record_failure(&e);
                            continue;
                        }
                    };
                    if inside[key].fetch_add(1, Ordering::SeqCst) != 0 {
                        counters.violations.fetch_add(1, Ordering::Relaxed);
                    }
                    thread::sleep(hold);
                    inside[key].fetch_sub(1, Ordering::SeqCst);
                    counters.acquired.fetch_add(1, Ordering::Relaxed);
                    if let Err(e) = lock.release() {
                        counters.record_failure(&e);
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker
            .join()
            .map_err(|_| anyhow!("contending thread panicked"))?;
    }

    Ok(ContendReport {
        threads: args.threads,
        keys: args.keys,
        iterations: args.iterations,
        acquired: counters.acquired.load(Ordering::Relaxed),
        too_many_queued: counters.too_many_queued.load(Ordering::Relaxed),
        attempts_exceeded: counters.attempts_exceeded.load(Ordering::Relaxed),
        interrupted: counters.interrupted.load(Ordering::Relaxed),
        deadlocks: counters.deadlocks.load(Ordering::Relaxed),
        violations: counters.violations.load(Ordering::Relaxed),
        leaked_locks: factory.active_locks(),
        elapsed_ms: start.elapsed().as_millis(),
    })
}
