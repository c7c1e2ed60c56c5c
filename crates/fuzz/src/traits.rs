//! The [`NodeDriver`] capability contract: everything the engine needs from a
//! node under test, independent of the concrete client (Anvil, Geth, Reth).

use crate::{
    errors::DriverError,
    types::{RawPool, TxIntent},
};
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A snapshot of the node's current gas-price family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSnapshot {
    /// Legacy `eth_gasPrice`.
    pub gas_price: u128,
    /// EIP-1559 fee cap (base fee + tip when derived).
    pub max_fee_per_gas: u128,
    /// EIP-1559 priority fee.
    pub max_priority_fee_per_gas: u128,
    /// EIP-4844 blob fee (1 gwei fallback when the node does not report one).
    pub max_fee_per_blob_gas: u128,
}

impl FeeSnapshot {
    /// A flat snapshot where every non-blob fee equals `price`. Used as the
    /// conservative fallback when the node cannot be queried.
    pub const fn flat(price: u128) -> Self {
        Self {
            gas_price: price,
            max_fee_per_gas: price,
            max_priority_fee_per_gas: price,
            max_fee_per_blob_gas: 0,
        }
    }
}

/// Capability set of a node under test.
///
/// Implementations must tolerate back-to-back `reset_state → send* →
/// pool_content` sequences without leaking state between runs. Optional
/// capabilities default to [`DriverError::Unsupported`].
#[async_trait]
pub trait NodeDriver {
    /// Restores an empty pool and genesis-equivalent balances.
    async fn reset_state(&mut self) -> Result<(), DriverError>;

    /// Best-effort pool clear for nodes without a full state reset. Callers
    /// must treat success as a loss of balance determinism.
    async fn clear_pool(&mut self) -> Result<(), DriverError>;

    /// Fetches the current gas-price family.
    async fn fee_snapshot(&mut self) -> Result<FeeSnapshot, DriverError>;

    /// Signs and sends a transfer described by `intent` to `recipient`.
    /// Returns the transaction hash.
    async fn send_transfer(
        &mut self,
        intent: &TxIntent,
        recipient: Address,
    ) -> Result<B256, DriverError>;

    /// Reads the current pool content.
    async fn pool_content(&mut self) -> Result<RawPool, DriverError>;

    /// Tops up the given addresses to `balance` wei.
    async fn fund_accounts(
        &mut self,
        _addresses: &[Address],
        _balance: U256,
    ) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("fund_accounts"))
    }

    /// Captures a chain-state snapshot, returning its id.
    async fn snapshot(&mut self) -> Result<String, DriverError> {
        Err(DriverError::Unsupported("snapshot"))
    }

    /// Reverts to a previously captured snapshot. Returns whether the node
    /// accepted the revert.
    async fn revert(&mut self, _snapshot_id: &str) -> Result<bool, DriverError> {
        Err(DriverError::Unsupported("revert"))
    }

    /// Escape hatch for client-specific RPC methods; the driver owns
    /// method-name aliasing.
    async fn custom_rpc(
        &mut self,
        _method: &str,
        _params: serde_json::Value,
    ) -> Result<serde_json::Value, DriverError> {
        Err(DriverError::Unsupported("custom_rpc"))
    }
}
