//! Scenario runner for the Ethereum txpool fuzzer.
//!
//! Exit codes: `0` clean termination, `1` account-load failure, `2`
//! unrecoverable driver failure, `3` configuration error.

#![warn(missing_debug_implementations, rustdoc::all)]
#![deny(unused_must_use, rust_2018_idioms)]

use crate::cli::{init_tracing_subscriber, FuzzCli};
use anyhow::{Context, Result};
use clap::Parser;
use std::{process::ExitCode, sync::Arc, time::Duration};
use tracing::{error, info};
use txfuzz::{
    accounts::AccountTable,
    engine::{FuzzEngine, FuzzReport},
};
use txfuzz_drivers_alloy::AlloyNodeDriver;

mod cli;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let cfg = FuzzCli::parse();
    if let Err(err) = init_tracing_subscriber(cfg.v) {
        eprintln!("failed to initialize tracing: {err}");
        return ExitCode::from(3);
    }

    match run(cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => code,
    }
}

async fn run(cfg: FuzzCli) -> Result<(), ExitCode> {
    if let Err(err) = cfg.validate() {
        error!(target: "cli", %err, "invalid configuration");
        return Err(ExitCode::from(3));
    }

    let accounts = match AccountTable::from_csv_files(&cfg.keys, cfg.max_accounts) {
        Ok(accounts) => Arc::new(accounts),
        Err(err) => {
            error!(target: "cli", %err, "failed to load accounts");
            return Err(ExitCode::from(1));
        }
    };

    let driver = match AlloyNodeDriver::connect(
        &cfg.rpc_url,
        cfg.node,
        &accounts,
        cfg.chain_id,
        Duration::from_secs(cfg.rpc_timeout_secs),
    )
    .await
    {
        Ok(driver) => driver,
        Err(err) => {
            error!(target: "cli", %err, rpc_url = %cfg.rpc_url, "driver unavailable");
            return Err(ExitCode::from(2));
        }
    };

    let mut engine = match FuzzEngine::new(
        driver,
        accounts.clone(),
        cfg.mutator(accounts),
        cfg.detector(),
        cfg.pool_params(),
        cfg.engine_settings(),
    ) {
        Ok(engine) => engine,
        Err(err) => {
            error!(target: "cli", %err, "failed to assemble the engine");
            return Err(ExitCode::from(3));
        }
    };

    let report = engine.run().await;
    info!(
        target: "cli",
        exploits = report.exploits.len(),
        unique_states = report.unique_states,
        "campaign complete"
    );

    if let Err(err) = write_report(&report, cfg.out.as_deref()) {
        error!(target: "cli", %err, "failed to write the exploit log");
        return Err(ExitCode::from(2));
    }
    Ok(())
}

/// Writes the JSON exploit log to `out`, or stdout when no path was given.
fn write_report(report: &FuzzReport, out: Option<&std::path::Path>) -> Result<()> {
    let rendered = serde_json::to_string_pretty(report).context("serializing the report")?;
    match out {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("writing the report to {}", path.display()))?,
        None => println!("{rendered}"),
    }
    Ok(())
}
