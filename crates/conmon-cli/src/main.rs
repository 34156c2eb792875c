//! # conmon
//!
//! Spawned once per container or exec session. Validates its flags, opens
//! the requested log drivers, launches the OCI runtime, and stays alive
//! until the supervised process exits.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod cli;

use anyhow::Context;
use clap::Parser;
use conmon_common::constants::{APP_NAME, COMMIT, VERSION};
use conmon_runtime::monitor::Monitor;
use conmon_runtime::process::{self, OciRuntimeLauncher};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

fn main() {
    let cli = Cli::parse();
    if cli.version {
        print_version();
        return;
    }

    let level = match cli::parse_log_level(cli.log_level.as_deref()) {
        Ok(level) => level,
        Err(e) => fail(&e),
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .init();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => fail(&e),
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let monitor = Monitor::prepare(cli.into_options())?;

    // Must precede every other thread so none of them catches the signals.
    let _ = process::spawn_signal_forwarder(monitor.container())
        .context("failed to install signal forwarding")?;

    tracing::debug!(id = %monitor.container().id(), "launching runtime");
    Ok(monitor.run(&OciRuntimeLauncher)?)
}

#[allow(clippy::print_stdout)]
fn print_version() {
    println!("{APP_NAME} version {VERSION}");
    println!("commit: {COMMIT}");
}

#[allow(clippy::print_stderr)]
fn fail(err: &dyn std::fmt::Display) -> ! {
    eprintln!("{APP_NAME}: {err}");
    std::process::exit(1);
}
