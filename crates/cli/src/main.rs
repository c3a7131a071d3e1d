// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! pessimist - exercise identifier-keyed pessimistic locks

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{check_config, contend, deadlock};
use output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "pessimist",
    version,
    about = "Pessimistic lock factory - stress, deadlock, and policy tools"
)]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a backoff policy file
    CheckConfig(check_config::CheckConfigArgs),
    /// Contend for a set of keys from many threads
    Contend(contend::ContendArgs),
    /// Stage a two-thread lock cycle and report its detection
    Deadlock(deadlock::DeadlockArgs),
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckConfig(args) => check_config::check_config(args, cli.format),
        Commands::Contend(args) => contend::contend(args, cli.format),
        Commands::Deadlock(args) => deadlock::deadlock(args, cli.format),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
