//! CLI surface of the fuzzer binary: argument parsing, scenario presets, and
//! tracing setup.

use alloy_primitives::Address;
use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser, ValueEnum};
use std::{path::PathBuf, str::FromStr, sync::Arc, time::Duration};
use tracing::Level;
use txfuzz::{
    accounts::AccountTable,
    config::{BlobParams, EngineSettings, PoolParams},
    detect::ExploitDetector,
    errors::ConfigError,
    mutate::{BlobMutator, DefaultMutator, Mutator},
};
use txfuzz_drivers_alloy::NodeKind;

/// Scenario presets binding mutators and detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Scenario {
    /// Default mutator with the low-cost-state detector, ladder step 1.
    Baseline,
    /// Default mutator with the ε-scaled cost detector, ladder step 2.
    Epsilon,
    /// Default plus blob mutators with the blob detector family.
    Blob,
    /// Baseline with queued future holders enabled.
    Futures,
}

/// The fuzzer binary CLI arguments.
#[derive(Debug, Parser)]
#[command(name = "txfuzz", about = "Coverage-guided fuzzer for Ethereum transaction pools")]
pub(crate) struct FuzzCli {
    /// Verbosity level (0-4)
    #[arg(long, short, help = "Verbosity level (0-4)", action = ArgAction::Count)]
    pub v: u8,
    /// Address of the JSON-RPC endpoint of the node under test.
    #[clap(long, default_value = "http://127.0.0.1:8545")]
    pub rpc_url: String,
    /// Node variant behind the endpoint.
    #[clap(long, default_value = "anvil")]
    pub node: NodeKind,
    /// Scenario preset.
    #[clap(long, value_enum, default_value = "baseline")]
    pub scenario: Scenario,
    /// CSV key files (`pub_key,priv_key`), loaded in order.
    #[clap(long, required = true, num_args = 1..)]
    pub keys: Vec<PathBuf>,
    /// Hard cap on loaded accounts.
    #[clap(long, default_value_t = txfuzz::config::DEFAULT_MAX_ACCOUNTS)]
    pub max_accounts: usize,
    /// Assumed pending-slot count of the target pool.
    #[clap(long, default_value_t = 4)]
    pub pool_size: usize,
    /// Gas price marking baseline filler transactions.
    #[clap(long, default_value_t = 3)]
    pub normal_price: u128,
    /// Head price at which a parent classifies as a replacement.
    #[clap(long, default_value_t = 12_000)]
    pub replacement_threshold: u128,
    /// Value at which a child stops classifying as low-value.
    #[clap(long, default_value_t = 10_000)]
    pub child_value_threshold: u128,
    /// Maximum seed-scheduling iterations.
    #[clap(long, default_value_t = 1_000)]
    pub max_iterations: u64,
    /// Wall-clock budget for the campaign, in seconds.
    #[clap(long, default_value_t = 3_600)]
    pub timeout_secs: u64,
    /// Per-RPC timeout, in seconds.
    #[clap(long, default_value_t = 10)]
    pub rpc_timeout_secs: u64,
    /// Threshold scale for the epsilon scenario.
    #[clap(long, default_value_t = 0.9)]
    pub epsilon: f64,
    /// Ladder step length; defaults to 1 (2 for the epsilon scenario).
    #[clap(long)]
    pub step_length: Option<u128>,
    /// Baseline transactions sent on the cold path; defaults to the pool size.
    #[clap(long)]
    pub initial_normal_tx_count: Option<usize>,
    /// Queued future holders seeded when the scenario enables them.
    #[clap(long, default_value_t = 1)]
    pub future_slots: usize,
    /// Seed for the blob mutator's generator, for replayable campaigns.
    #[clap(long, default_value_t = 0)]
    pub rng_seed: u64,
    /// Chain id override; defaults to the node's reported id.
    #[clap(long)]
    pub chain_id: Option<u64>,
    /// Transfer recipient; defaults to the first loaded account.
    #[clap(long, value_parser = parse_address)]
    pub recipient: Option<Address>,
    /// Use snapshot/revert for baseline recreation when the node supports it.
    #[clap(long)]
    pub use_snapshots: bool,
    /// Write the JSON exploit log here instead of stdout.
    #[clap(long)]
    pub out: Option<PathBuf>,
}

impl FuzzCli {
    /// Validates the configuration before anything touches the node.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        self.pool_params().validate()?;
        if self.scenario == Scenario::Epsilon {
            txfuzz::config::validate_epsilon(self.epsilon)?;
        }
        Ok(())
    }

    pub(crate) fn pool_params(&self) -> PoolParams {
        PoolParams {
            pool_size: self.pool_size,
            normal_price: self.normal_price,
            replacement_price_threshold: self.replacement_threshold,
            child_value_threshold: self.child_value_threshold,
        }
    }

    pub(crate) fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            max_iterations: self.max_iterations,
            global_timeout: Duration::from_secs(self.timeout_secs),
            initial_normal_tx_count: self.initial_normal_tx_count.unwrap_or(self.pool_size),
            future_slots: self.future_slots,
            future_flag: self.scenario == Scenario::Futures,
            use_snapshots: self.use_snapshots,
            recipient: self.recipient,
        }
    }

    pub(crate) fn mutator(&self, accounts: Arc<AccountTable>) -> Mutator {
        let params = self.pool_params();
        let step_default = if self.scenario == Scenario::Epsilon { 2 } else { 1 };
        let step = self.step_length.unwrap_or(step_default);
        let default = Mutator::Default(DefaultMutator::new(accounts.clone(), params, step));
        match self.scenario {
            Scenario::Blob => Mutator::Composite(vec![
                default,
                Mutator::Blob(BlobMutator::new(accounts, BlobParams::default(), self.rng_seed)),
            ]),
            _ => default,
        }
    }

    pub(crate) fn detector(&self) -> ExploitDetector {
        let params = self.pool_params();
        let blob = BlobParams::default();
        match self.scenario {
            Scenario::Baseline | Scenario::Futures => ExploitDetector::Composite(vec![
                ExploitDetector::PendingEmpty,
                ExploitDetector::LowCostState { params },
            ]),
            Scenario::Epsilon => ExploitDetector::Composite(vec![
                ExploitDetector::PendingEmpty,
                ExploitDetector::EpsilonCost { params, epsilon: self.epsilon },
            ]),
            Scenario::Blob => ExploitDetector::Composite(vec![
                ExploitDetector::PendingEmpty,
                ExploitDetector::blob_pool_stall(),
                ExploitDetector::BlobGasPriceManipulation {
                    min: blob.min_blob_gas_price,
                    max: blob.max_blob_gas_price,
                },
                ExploitDetector::InvalidBlobAcceptance,
            ]),
        }
    }
}

/// Parse a string slice into [Address].
pub(crate) fn parse_address(s: &str) -> Result<Address, String> {
    Address::from_str(s).map_err(|_| format!("Invalid address value: {s}"))
}

/// Installs the global tracing subscriber; `verbosity` counts the `-v` flags,
/// from errors-only (0) up to traces (4).
pub(crate) fn init_tracing_subscriber(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = tracing_subscriber::fmt().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).map_err(|e| anyhow!(e))
}
