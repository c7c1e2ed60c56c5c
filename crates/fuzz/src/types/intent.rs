//! Transaction intents: the fuzzer-side description of a single transfer the
//! driver should sign and send.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Gas limit used for every transfer the fuzzer sends.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Sentinel nonce that parks an intent in the queued (future) section of the
/// pool. A future intent never becomes pending.
pub const FUTURE_NONCE: u64 = 10_000;

/// Sentinel value carried by future intents.
pub const FUTURE_VALUE: u128 = 2;

/// EIP-2718 transaction class of an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TxClass {
    /// Type 0: legacy transaction with a single `gasPrice`.
    Legacy,
    /// Type 1: EIP-2930 access-list transaction.
    AccessList,
    /// Type 2: EIP-1559 dynamic-fee transaction.
    DynamicFee,
    /// Type 3: EIP-4844 blob transaction.
    Blob,
}

impl TxClass {
    /// Returns the wire type byte.
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Legacy => 0,
            Self::AccessList => 1,
            Self::DynamicFee => 2,
            Self::Blob => 3,
        }
    }

    /// Maps a wire type byte back to a class.
    pub const fn from_u8(ty: u8) -> Option<Self> {
        match ty {
            0 => Some(Self::Legacy),
            1 => Some(Self::AccessList),
            2 => Some(Self::DynamicFee),
            3 => Some(Self::Blob),
            _ => None,
        }
    }
}

/// A single transaction the fuzzer wants sent.
///
/// `price` is the legacy `gasPrice` for classes 0/1 and `maxFeePerGas` for
/// classes 2/3. Intents are immutable once constructed; mutation strategies
/// emit fresh copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIntent {
    /// Logical slot of the sender in the account table.
    pub account_index: usize,
    /// Sender address.
    pub sender: Address,
    /// Explicit nonce; [`FUTURE_NONCE`] marks a future intent.
    pub nonce: u64,
    /// Transaction class.
    pub class: TxClass,
    /// `gasPrice` (classes 0/1) or `maxFeePerGas` (classes 2/3).
    pub price: u128,
    /// Transferred value in wei.
    pub value: u128,
    /// `maxPriorityFeePerGas` for classes 2/3.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_priority_fee: Option<u128>,
    /// `maxFeePerBlobGas`; set iff class 3.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_blob_gas: Option<u128>,
    /// Blob versioned hashes; non-empty iff class 3.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_versioned_hashes: Option<Vec<B256>>,
}

impl TxIntent {
    /// Creates a legacy (class 0) transfer intent.
    pub const fn legacy(
        account_index: usize,
        sender: Address,
        nonce: u64,
        price: u128,
        value: u128,
    ) -> Self {
        Self {
            account_index,
            sender,
            nonce,
            class: TxClass::Legacy,
            price,
            value,
            max_priority_fee: None,
            max_fee_per_blob_gas: None,
            blob_versioned_hashes: None,
        }
    }

    /// Creates a dynamic-fee (class 2) transfer intent.
    pub const fn dynamic_fee(
        account_index: usize,
        sender: Address,
        nonce: u64,
        max_fee: u128,
        priority_fee: u128,
        value: u128,
    ) -> Self {
        Self {
            account_index,
            sender,
            nonce,
            class: TxClass::DynamicFee,
            price: max_fee,
            value,
            max_priority_fee: Some(priority_fee),
            max_fee_per_blob_gas: None,
            blob_versioned_hashes: None,
        }
    }

    /// Creates a blob (class 3) transfer intent.
    ///
    /// The class-3 invariant (blob fee and hashes present) holds by
    /// construction; `hashes` must be non-empty for a well-formed blob intent,
    /// and deliberately malformed mutations may violate the hash/blob count
    /// relationship but never the presence of the fields.
    pub fn blob(
        account_index: usize,
        sender: Address,
        nonce: u64,
        max_fee: u128,
        priority_fee: u128,
        blob_fee: u128,
        hashes: Vec<B256>,
    ) -> Self {
        Self {
            account_index,
            sender,
            nonce,
            class: TxClass::Blob,
            price: max_fee,
            value: 0,
            max_priority_fee: Some(priority_fee),
            max_fee_per_blob_gas: Some(blob_fee),
            blob_versioned_hashes: Some(hashes),
        }
    }

    /// Creates a future intent: class 2, sentinel nonce and value, destined
    /// for a queued slot.
    pub const fn future(
        account_index: usize,
        sender: Address,
        max_fee: u128,
        priority_fee: u128,
    ) -> Self {
        Self {
            account_index,
            sender,
            nonce: FUTURE_NONCE,
            class: TxClass::DynamicFee,
            price: max_fee,
            value: FUTURE_VALUE,
            max_priority_fee: Some(priority_fee),
            max_fee_per_blob_gas: None,
            blob_versioned_hashes: None,
        }
    }

    /// Whether this intent targets a queued (future) slot.
    pub const fn is_future(&self) -> bool {
        self.nonce == FUTURE_NONCE
    }
}

/// Value heuristic for a normal-priced intent at `price`:
/// `21_000 · (ceiling − price)`.
///
/// The heuristic feeds the symbolic abstraction, so the exact formula is part
/// of the contract. Prices at or above `ceiling` would go negative; those are
/// clamped to zero.
pub fn normal_priced_value(price: u128, ceiling: u128) -> u128 {
    if price >= ceiling {
        warn!(target: "intent", price, ceiling, "price at or above value ceiling, clamping value to 0");
        return 0;
    }
    TRANSFER_GAS_LIMIT as u128 * (ceiling - price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_class_roundtrip() {
        for class in [TxClass::Legacy, TxClass::AccessList, TxClass::DynamicFee, TxClass::Blob] {
            assert_eq!(TxClass::from_u8(class.as_u8()), Some(class));
        }
        assert_eq!(TxClass::from_u8(4), None);
    }

    #[test]
    fn future_intent_shape() {
        let intent = TxIntent::future(7, Address::repeat_byte(1), 100, 1);
        assert!(intent.is_future());
        assert_eq!(intent.nonce, FUTURE_NONCE);
        assert_eq!(intent.value, FUTURE_VALUE);
        assert_eq!(intent.class, TxClass::DynamicFee);
    }

    #[test]
    fn blob_intent_holds_invariant() {
        let intent =
            TxIntent::blob(0, Address::repeat_byte(2), 0, 100, 1, 5, vec![B256::repeat_byte(9)]);
        assert_eq!(intent.class, TxClass::Blob);
        assert!(intent.max_fee_per_blob_gas.is_some());
        assert!(!intent.blob_versioned_hashes.as_ref().unwrap().is_empty());
    }

    #[test]
    fn value_heuristic_clamps() {
        assert_eq!(normal_priced_value(3, 12_000), 21_000 * 11_997);
        assert_eq!(normal_priced_value(12_000, 12_000), 0);
        assert_eq!(normal_priced_value(20_000, 12_000), 0);
    }
}
