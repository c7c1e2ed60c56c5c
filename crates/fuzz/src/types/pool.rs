//! Raw transaction-pool snapshots in the `txpool_content` wire shape.
//!
//! Snapshots are captured once per execution and flow through abstraction and
//! detection by value. Every quantity is kept as the raw hex string the node
//! returned and parsed on demand, so a single malformed field degrades one
//! record instead of the whole snapshot.

use crate::{
    errors::MalformedField,
    types::{TxClass, TxIntent},
};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Records of one sender, keyed by decimal nonce string.
pub type SenderRecords = BTreeMap<String, TxRecord>;

/// A raw pool snapshot: `pending` and `queued` sections, each mapping
/// `sender → (nonce → record)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPool {
    /// Executable transactions.
    pub pending: BTreeMap<Address, SenderRecords>,
    /// Nonce-gapped / future transactions.
    pub queued: BTreeMap<Address, SenderRecords>,
}

impl RawPool {
    /// Total number of pending records.
    pub fn pending_records(&self) -> usize {
        self.pending.values().map(BTreeMap::len).sum()
    }

    /// Whether the pending section holds no records at all.
    pub fn is_pending_empty(&self) -> bool {
        self.pending_records() == 0
    }

    /// Whether an intent is still present in the snapshot, matched by
    /// `(sender, nonce, value, type)` across both sections.
    pub fn contains_intent(&self, intent: &TxIntent) -> bool {
        self.pending
            .get(&intent.sender)
            .into_iter()
            .chain(self.queued.get(&intent.sender))
            .flat_map(|records| records.iter())
            .any(|(nonce, record)| {
                nonce.parse::<u64>() == Ok(intent.nonce)
                    && record.value().is_ok_and(|v| v == intent.value)
                    && record.tx_class().is_ok_and(|c| c == intent.class.as_u8())
            })
    }
}

/// A single pool record, fields as hex-quantity strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TxRecord {
    /// Legacy gas price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    /// EIP-1559 fee cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<String>,
    /// EIP-1559 priority fee.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<String>,
    /// EIP-4844 blob fee cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_blob_gas: Option<String>,
    /// Transferred value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Wire type byte.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub tx_type: Option<String>,
    /// Blob versioned hashes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_versioned_hashes: Option<Vec<String>>,
}

impl TxRecord {
    /// Wire type byte of the record; absent means legacy (0).
    pub fn tx_class(&self) -> Result<u8, MalformedField> {
        match &self.tx_type {
            None => Ok(0),
            Some(raw) => parse_quantity("type", raw).map(|ty| ty as u8),
        }
    }

    /// The price the pool orders this record by: `maxFeePerGas` for classes
    /// 2/3, `gasPrice` otherwise. Absent fields read as zero.
    pub fn effective_price(&self) -> Result<u128, MalformedField> {
        let field = if matches!(self.tx_class()?, 2 | 3) {
            ("maxFeePerGas", &self.max_fee_per_gas)
        } else {
            ("gasPrice", &self.gas_price)
        };
        match field.1 {
            None => Ok(0),
            Some(raw) => parse_quantity(field.0, raw),
        }
    }

    /// Transferred value; absent reads as zero.
    pub fn value(&self) -> Result<u128, MalformedField> {
        match &self.value {
            None => Ok(0),
            Some(raw) => parse_quantity("value", raw),
        }
    }

    /// Blob fee cap; absent reads as zero.
    pub fn blob_fee(&self) -> Result<u128, MalformedField> {
        match &self.max_fee_per_blob_gas {
            None => Ok(0),
            Some(raw) => parse_quantity("maxFeePerBlobGas", raw),
        }
    }

    /// Whether the record carries a non-empty blob hash list.
    pub fn has_blob_hashes(&self) -> bool {
        self.blob_versioned_hashes.as_ref().is_some_and(|hashes| !hashes.is_empty())
    }
}

/// Returns a sender's records sorted by numeric nonce, skipping records whose
/// nonce key does not parse.
pub fn sorted_records(records: &SenderRecords) -> Vec<(u64, &TxRecord)> {
    let mut out: Vec<(u64, &TxRecord)> = records
        .iter()
        .filter_map(|(nonce, record)| match nonce.parse::<u64>() {
            Ok(n) => Some((n, record)),
            Err(_) => {
                warn!(target: "pool", %nonce, "unparsable nonce key in pool snapshot, skipping record");
                None
            }
        })
        .collect();
    out.sort_unstable_by_key(|(nonce, _)| *nonce);
    out
}

/// Parses a `0x`-prefixed hex quantity (decimal accepted as a fallback).
fn parse_quantity(field: &'static str, raw: &str) -> Result<u128, MalformedField> {
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u128::from_str_radix(hex, 16),
        None => raw.parse::<u128>(),
    };
    parsed.map_err(|_| MalformedField::new(field, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(price: &str, value: &str, ty: &str) -> TxRecord {
        TxRecord {
            gas_price: Some(price.to_string()),
            value: Some(value.to_string()),
            tx_type: Some(ty.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn parses_txpool_content_shape() {
        let raw = r#"{
            "pending": {
                "0x00000000000000000000000000000000000000aa": {
                    "0": {
                        "gasPrice": "0x3",
                        "value": "0x1",
                        "type": "0x0"
                    }
                }
            },
            "queued": {}
        }"#;
        let pool: RawPool = serde_json::from_str(raw).unwrap();
        assert_eq!(pool.pending_records(), 1);
        let sender: Address =
            "0x00000000000000000000000000000000000000aa".parse().unwrap();
        let record = &pool.pending[&sender]["0"];
        assert_eq!(record.effective_price(), Ok(3));
        assert_eq!(record.value(), Ok(1));
        assert_eq!(record.tx_class(), Ok(0));
    }

    #[test]
    fn effective_price_selects_by_class() {
        let legacy = record("0x5", "0x0", "0x0");
        assert_eq!(legacy.effective_price(), Ok(5));

        let dynamic = TxRecord {
            gas_price: Some("0x1".to_string()),
            max_fee_per_gas: Some("0x2ee0".to_string()),
            tx_type: Some("0x2".to_string()),
            ..Default::default()
        };
        assert_eq!(dynamic.effective_price(), Ok(12_000));
    }

    #[test]
    fn malformed_fields_error_not_panic() {
        let bad = record("0xzz", "bogus", "0x0");
        assert!(bad.effective_price().is_err());
        assert!(bad.value().is_err());
    }

    #[test]
    fn absent_fields_read_as_defaults() {
        let empty = TxRecord::default();
        assert_eq!(empty.tx_class(), Ok(0));
        assert_eq!(empty.effective_price(), Ok(0));
        assert_eq!(empty.value(), Ok(0));
        assert_eq!(empty.blob_fee(), Ok(0));
        assert!(!empty.has_blob_hashes());
    }

    #[test]
    fn sorted_records_orders_numerically_and_skips_bad_keys() {
        let mut records = SenderRecords::new();
        records.insert("10".to_string(), record("0x1", "0x0", "0x0"));
        records.insert("2".to_string(), record("0x2", "0x0", "0x0"));
        records.insert("junk".to_string(), record("0x3", "0x0", "0x0"));
        let sorted = sorted_records(&records);
        assert_eq!(sorted.iter().map(|(n, _)| *n).collect::<Vec<_>>(), vec![2, 10]);
    }

    #[test]
    fn contains_intent_matches_on_tuple() {
        let mut pool = RawPool::default();
        let sender = Address::repeat_byte(7);
        let mut records = SenderRecords::new();
        records.insert("0".to_string(), record("0x3", "0xa", "0x0"));
        pool.pending.insert(sender, records);

        let hit = TxIntent::legacy(0, sender, 0, 3, 10);
        assert!(pool.contains_intent(&hit));

        let wrong_value = TxIntent::legacy(0, sender, 0, 3, 11);
        assert!(!pool.contains_intent(&wrong_value));

        let wrong_class = TxIntent::dynamic_fee(0, sender, 0, 3, 1, 10);
        assert!(!pool.contains_intent(&wrong_class));
    }
}
