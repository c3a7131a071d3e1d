// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deadlock demonstration command
//!
//! A worker takes `x` and then waits for `y`; the main thread takes `y` and
//! then asks for `x`. One of the two requests must fail instead of hanging.

use crate::output::{self, OutputFormat};
use anyhow::{anyhow, bail, Result};
use clap::Args;
use pessimist_core::{BackoffPolicy, LockError, PessimisticLockFactory};
use serde::Serialize;
use std::fmt;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const QUEUE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Args)]
pub struct DeadlockArgs {
    /// Place the two keys in separate lock factories
    #[arg(long)]
    pub split: bool,
}

#[derive(Debug, Serialize)]
pub struct DeadlockReport {
    pub factories: usize,
    pub identifier: String,
    pub detected_by: String,
    pub error: String,
}

impl fmt::Display for DeadlockReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Deadlock detected by {} thread acquiring {} ({} factories)",
            self.detected_by, self.identifier, self.factories
        )?;
        write!(f, "  {}", self.error)
    }
}

pub fn deadlock(args: DeadlockArgs, format: OutputFormat) -> Result<()> {
    // Bounded so a missed detection ends in an error instead of a hang
    let policy = BackoffPolicy::new(50, -1, 100)?;
    let fx = PessimisticLockFactory::new(policy);
    let fy = if args.split {
        PessimisticLockFactory::new(policy)
    } else {
        fx.clone()
    };

    let (has_x_tx, has_x_rx) = mpsc::channel();
    let (go_tx, go_rx) = mpsc::channel::<()>();
    let worker = {
        let (fx, fy) = (fx.clone(), fy.clone());
        thread::spawn(move || -> Result<(), LockError> {
            let x = fx.obtain_lock("x")?;
            let _ = has_x_tx.send(());
            let _ = go_rx.recv();
            let y = fy.obtain_lock("y");
            x.release()?;
            y?.release()
        })
    };

    let y = fy.obtain_lock("y")?;
    has_x_rx.recv()?;
    go_tx.send(())?;
    let deadline = Instant::now() + QUEUE_TIMEOUT;
    while fy.queue_length("y") == 0 {
        if Instant::now() >= deadline {
            bail!("worker never queued for y");
        }
        thread::sleep(Duration::from_millis(1));
    }

    let main_result = match fx.obtain_lock("x") {
        Ok(lock) => {
            lock.release()?;
            Ok(())
        }
        Err(e) => Err(e),
    };
    y.release()?;
    let worker_result = worker
        .join()
        .map_err(|_| anyhow!("worker thread panicked"))?;

    let (detected_by, error) = match (main_result, worker_result) {
        (Err(e), _) if e.is_deadlock() => ("main", e),
        (Ok(()), Err(e)) if e.is_deadlock() => ("worker", e),
        (Err(e), _) | (Ok(()), Err(e)) => bail!("expected a deadlock, got: {}", e),
        (Ok(()), Ok(())) => bail!("lock cycle was not detected"),
    };

    output::print(
        &DeadlockReport {
            factories: if args.split { 2 } else { 1 },
            identifier: error.identifier().to_string(),
            detected_by: detected_by.to_string(),
            error: error.to_string(),
        },
        format,
    )
}
