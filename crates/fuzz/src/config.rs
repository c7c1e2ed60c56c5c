//! Scenario configuration: the constants that bind the symbolic abstraction,
//! the mutation strategies, and the engine loop to a concrete target pool.

use crate::errors::ConfigError;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chain id used for signing when the target does not report one.
pub const DEFAULT_CHAIN_ID: u64 = 20_191_003;

/// Hard cap on the number of accounts loaded from key files.
pub const DEFAULT_MAX_ACCOUNTS: usize = 100;

/// Parameters of the symbolic pool abstraction.
///
/// Two pools abstracted under the same parameters are comparable; fingerprints
/// computed under different parameters are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParams {
    /// Number of pending slots the target pool is assumed to hold.
    pub pool_size: usize,
    /// Gas price that marks a sender chain as baseline filler (`N`).
    pub normal_price: u128,
    /// Head price at or above which a parent classifies as a replacement (`R`).
    pub replacement_price_threshold: u128,
    /// Value at or below which a child classifies as low-value (`C`).
    pub child_value_threshold: u128,
}

impl Default for PoolParams {
    fn default() -> Self {
        Self {
            pool_size: 4,
            normal_price: 3,
            replacement_price_threshold: 12_000,
            child_value_threshold: 10_000,
        }
    }
}

impl PoolParams {
    /// Validates the parameter set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 {
            return Err(ConfigError::ZeroPoolSize);
        }
        if self.replacement_price_threshold <= self.normal_price {
            return Err(ConfigError::ThresholdBelowNormal {
                threshold: self.replacement_price_threshold,
                normal: self.normal_price,
            });
        }
        Ok(())
    }
}

/// Settings for the outer fuzzing loop and the state-recreation executor.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Maximum number of seed-scheduling iterations.
    pub max_iterations: u64,
    /// Wall-clock budget for the whole campaign.
    pub global_timeout: Duration,
    /// Number of baseline transactions sent on the cold path.
    pub initial_normal_tx_count: usize,
    /// Number of future (queued-slot) intents sent when the future flag is on.
    pub future_slots: usize,
    /// Whether the executor seeds future intents at all.
    pub future_flag: bool,
    /// Opt-in: revert to a post-baseline snapshot instead of replaying the
    /// baseline fill, when the driver supports snapshots. Falls back to the
    /// reset path silently when it does not.
    pub use_snapshots: bool,
    /// Transfer recipient; defaults to account 0 of the loaded table.
    pub recipient: Option<Address>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_iterations: 1_000,
            global_timeout: Duration::from_secs(3_600),
            initial_normal_tx_count: 4,
            future_slots: 1,
            future_flag: false,
            use_snapshots: false,
            recipient: None,
        }
    }
}

/// Parameters for blob-transaction mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobParams {
    /// Maximum number of blobs attached to a single transaction.
    pub max_blobs_per_tx: usize,
    /// Lower bound for the mutated `maxFeePerBlobGas`.
    pub min_blob_gas_price: u128,
    /// Upper bound for the mutated `maxFeePerBlobGas`.
    pub max_blob_gas_price: u128,
}

impl Default for BlobParams {
    fn default() -> Self {
        Self { max_blobs_per_tx: 2, min_blob_gas_price: 1, max_blob_gas_price: 1_000 }
    }
}

/// Validates an epsilon threshold scale for the near-miss cost detector.
pub fn validate_epsilon(epsilon: f64) -> Result<(), ConfigError> {
    if epsilon > 0.0 && epsilon <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::EpsilonOutOfRange(epsilon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_are_valid() {
        PoolParams::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_pool_size() {
        let params = PoolParams { pool_size: 0, ..Default::default() };
        assert_eq!(params.validate(), Err(ConfigError::ZeroPoolSize));
    }

    #[test]
    fn rejects_threshold_below_normal() {
        let params =
            PoolParams { normal_price: 20_000, replacement_price_threshold: 12_000, ..Default::default() };
        assert!(matches!(params.validate(), Err(ConfigError::ThresholdBelowNormal { .. })));
    }

    #[test]
    fn epsilon_bounds() {
        validate_epsilon(1.0).unwrap();
        validate_epsilon(0.5).unwrap();
        assert!(validate_epsilon(0.0).is_err());
        assert!(validate_epsilon(1.1).is_err());
    }
}
