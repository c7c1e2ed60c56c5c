//! Raw-pool construction helpers for tests.

use crate::types::{RawPool, SenderRecords, TxRecord};
use alloy_primitives::Address;

/// A deterministic test address.
pub fn addr(tag: u8) -> Address {
    Address::repeat_byte(tag)
}

/// A legacy (type 0) record with the given gas price and value.
pub fn legacy_record(price: u128, value: u128) -> TxRecord {
    TxRecord {
        gas_price: Some(hex(price)),
        value: Some(hex(value)),
        tx_type: Some("0x0".to_string()),
        ..Default::default()
    }
}

/// A dynamic-fee (type 2) record with the given fee cap and value.
pub fn record_1559(max_fee: u128, value: u128) -> TxRecord {
    TxRecord {
        max_fee_per_gas: Some(hex(max_fee)),
        max_priority_fee_per_gas: Some("0x1".to_string()),
        value: Some(hex(value)),
        tx_type: Some("0x2".to_string()),
        ..Default::default()
    }
}

/// A blob (type 3) record with the given fee cap, blob fee, and hash list.
pub fn blob_record(max_fee: u128, blob_fee: u128, hashes: &[&str]) -> TxRecord {
    TxRecord {
        max_fee_per_gas: Some(hex(max_fee)),
        max_priority_fee_per_gas: Some("0x1".to_string()),
        max_fee_per_blob_gas: Some(hex(blob_fee)),
        value: Some("0x0".to_string()),
        tx_type: Some("0x3".to_string()),
        blob_versioned_hashes: Some(hashes.iter().map(|h| h.to_string()).collect()),
        gas_price: None,
    }
}

fn hex(quantity: u128) -> String {
    format!("{quantity:#x}")
}

/// Builds [`RawPool`] values record by record.
#[derive(Debug, Default)]
pub struct PoolBuilder {
    pool: RawPool,
}

impl PoolBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pending chain for `sender`, records assigned nonces `0..n`.
    pub fn pending_chain(mut self, sender: Address, records: &[TxRecord]) -> Self {
        let chain: &mut SenderRecords = self.pool.pending.entry(sender).or_default();
        let base = chain.len() as u64;
        for (offset, record) in records.iter().enumerate() {
            chain.insert((base + offset as u64).to_string(), record.clone());
        }
        self
    }

    /// Adds a single queued record for `sender` at `nonce`.
    pub fn queued_record(mut self, sender: Address, nonce: u64, record: TxRecord) -> Self {
        self.pool.queued.entry(sender).or_default().insert(nonce.to_string(), record);
        self
    }

    /// Finishes the pool.
    pub fn build(self) -> RawPool {
        self.pool
    }
}
