// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Policy validation command

use crate::output::{self, OutputFormat};
use anyhow::Result;
use clap::Args;
use pessimist_core::BackoffPolicy;
use std::path::PathBuf;

#[derive(Args)]
pub struct CheckConfigArgs {
    /// TOML file with acquire_attempts, maximum_queued, and spin_time
    pub path: PathBuf,
}

pub fn check_config(args: CheckConfigArgs, format: OutputFormat) -> Result<()> {
    let policy = BackoffPolicy::load(&args.path)?;
    output::print(&policy, format)
}
