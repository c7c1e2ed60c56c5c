//! A mock [`NodeDriver`] backed by a miniature mempool model.
//!
//! The model is deliberately small: contiguous-nonce chains become pending,
//! gapped nonces are queued, an optional capacity evicts the cheapest record,
//! and replacements must strictly outbid the incumbent. Exact duplicates are
//! accepted and silently dropped, matching how a node treats re-sent
//! transactions during state recreation.

use crate::{
    errors::DriverError,
    traits::{FeeSnapshot, NodeDriver},
    types::{RawPool, TxClass, TxIntent},
};
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};

type Section = BTreeMap<Address, BTreeMap<u64, TxIntent>>;

/// In-memory driver for engine and executor tests.
#[derive(Debug, Clone)]
pub struct TestNodeDriver {
    /// Snapshot returned by [`NodeDriver::fee_snapshot`].
    pub fees: FeeSnapshot,
    /// Pending-section capacity; `None` means unbounded.
    pub capacity: Option<usize>,
    /// Whether `reset_state` succeeds.
    pub supports_reset: bool,
    /// Whether `clear_pool` succeeds.
    pub supports_clear: bool,
    /// Whether `snapshot`/`revert` succeed.
    pub supports_snapshot: bool,
    /// Fail every send with an RPC error.
    pub fail_all_sends: bool,
    /// Fail sends matching `(sender, nonce)`.
    pub fail_sends: HashSet<(Address, u64)>,
    /// Every intent handed to `send_transfer`, accepted or not.
    pub sent: Vec<TxIntent>,
    /// Number of successful state resets.
    pub resets: usize,
    pending: Section,
    queued: Section,
    snapshots: HashMap<String, (Section, Section)>,
    snapshot_seq: usize,
}

impl Default for TestNodeDriver {
    fn default() -> Self {
        Self {
            // Baseline sends use the fee cap, so a cap equal to the normal
            // price indicator makes cold-path fills classify as `N`; the
            // legacy gas price stays off-normal so new parents classify `P`.
            fees: FeeSnapshot {
                gas_price: 5,
                max_fee_per_gas: 3,
                max_priority_fee_per_gas: 1,
                max_fee_per_blob_gas: 100,
            },
            capacity: None,
            supports_reset: true,
            supports_clear: true,
            supports_snapshot: false,
            fail_all_sends: false,
            fail_sends: HashSet::new(),
            sent: Vec::new(),
            resets: 0,
            pending: Section::new(),
            queued: Section::new(),
            snapshots: HashMap::new(),
            snapshot_seq: 0,
        }
    }
}

impl TestNodeDriver {
    /// Creates a driver with the default fee snapshot and no capacity bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pending-section capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Total number of records currently pending.
    pub fn pending_len(&self) -> usize {
        self.pending.values().map(BTreeMap::len).sum()
    }

    fn accept(&mut self, intent: &TxIntent) {
        if intent.is_future() {
            self.queued.entry(intent.sender).or_default().insert(intent.nonce, intent.clone());
            return;
        }

        let chain = self.pending.entry(intent.sender).or_default();
        let next_nonce = chain.len() as u64;
        if intent.nonce > next_nonce {
            self.queued.entry(intent.sender).or_default().insert(intent.nonce, intent.clone());
            return;
        }
        if intent.nonce < next_nonce {
            // Replacement: strictly outbid or be dropped as a duplicate.
            let incumbent = chain.get_mut(&intent.nonce).expect("contiguous chain");
            if intent.price > incumbent.price {
                *incumbent = intent.clone();
            }
            return;
        }

        chain.insert(intent.nonce, intent.clone());
        if let Some(capacity) = self.capacity {
            while self.pending_len() > capacity {
                self.evict_cheapest();
            }
        }
    }

    fn evict_cheapest(&mut self) {
        let victim = self
            .pending
            .iter()
            .flat_map(|(sender, chain)| {
                chain.values().map(move |intent| (intent.price, *sender, intent.nonce))
            })
            .min_by_key(|(price, sender, nonce)| (*price, *sender, std::cmp::Reverse(*nonce)));
        let Some((_, sender, nonce)) = victim else { return };

        let chain = self.pending.get_mut(&sender).expect("victim sender");
        chain.remove(&nonce);
        // Records above the gap are no longer executable.
        let orphans: Vec<u64> = chain.keys().copied().filter(|n| *n > nonce).collect();
        for orphan_nonce in orphans {
            if let Some(orphan) = chain.remove(&orphan_nonce) {
                self.queued.entry(sender).or_default().insert(orphan_nonce, orphan);
            }
        }
        if chain.is_empty() {
            self.pending.remove(&sender);
        }
    }

    fn render(section: &Section) -> BTreeMap<Address, crate::types::SenderRecords> {
        section
            .iter()
            .map(|(sender, chain)| {
                let records = chain
                    .iter()
                    .map(|(nonce, intent)| (nonce.to_string(), render_record(intent)))
                    .collect();
                (*sender, records)
            })
            .collect()
    }
}

fn render_record(intent: &TxIntent) -> crate::types::TxRecord {
    let mut record = crate::types::TxRecord {
        value: Some(format!("{:#x}", intent.value)),
        tx_type: Some(format!("{:#x}", intent.class.as_u8())),
        ..Default::default()
    };
    match intent.class {
        TxClass::Legacy | TxClass::AccessList => {
            record.gas_price = Some(format!("{:#x}", intent.price));
        }
        TxClass::DynamicFee | TxClass::Blob => {
            record.max_fee_per_gas = Some(format!("{:#x}", intent.price));
            record.max_priority_fee_per_gas =
                intent.max_priority_fee.map(|fee| format!("{fee:#x}"));
        }
    }
    if intent.class == TxClass::Blob {
        record.max_fee_per_blob_gas = intent.max_fee_per_blob_gas.map(|fee| format!("{fee:#x}"));
        record.blob_versioned_hashes = intent
            .blob_versioned_hashes
            .as_ref()
            .map(|hashes| hashes.iter().map(|h| format!("{h}")).collect());
    }
    record
}

#[async_trait]
impl NodeDriver for TestNodeDriver {
    async fn reset_state(&mut self) -> Result<(), DriverError> {
        if !self.supports_reset {
            return Err(DriverError::Unsupported("reset_state"));
        }
        self.pending.clear();
        self.queued.clear();
        self.resets += 1;
        Ok(())
    }

    async fn clear_pool(&mut self) -> Result<(), DriverError> {
        if !self.supports_clear {
            return Err(DriverError::Unsupported("clear_pool"));
        }
        self.pending.clear();
        self.queued.clear();
        Ok(())
    }

    async fn fee_snapshot(&mut self) -> Result<FeeSnapshot, DriverError> {
        Ok(self.fees)
    }

    async fn send_transfer(
        &mut self,
        intent: &TxIntent,
        _recipient: Address,
    ) -> Result<B256, DriverError> {
        self.sent.push(intent.clone());
        if self.fail_all_sends || self.fail_sends.contains(&(intent.sender, intent.nonce)) {
            return Err(DriverError::Rpc("scripted send failure".to_string()));
        }
        self.accept(intent);
        Ok(B256::with_last_byte((self.sent.len() % 255) as u8))
    }

    async fn pool_content(&mut self) -> Result<RawPool, DriverError> {
        Ok(RawPool { pending: Self::render(&self.pending), queued: Self::render(&self.queued) })
    }

    async fn fund_accounts(
        &mut self,
        _addresses: &[Address],
        _balance: U256,
    ) -> Result<(), DriverError> {
        Ok(())
    }

    async fn snapshot(&mut self) -> Result<String, DriverError> {
        if !self.supports_snapshot {
            return Err(DriverError::Unsupported("snapshot"));
        }
        let id = format!("0x{:x}", self.snapshot_seq);
        self.snapshot_seq += 1;
        self.snapshots.insert(id.clone(), (self.pending.clone(), self.queued.clone()));
        Ok(id)
    }

    async fn revert(&mut self, snapshot_id: &str) -> Result<bool, DriverError> {
        if !self.supports_snapshot {
            return Err(DriverError::Unsupported("revert"));
        }
        match self.snapshots.get(snapshot_id) {
            Some((pending, queued)) => {
                self.pending = pending.clone();
                self.queued = queued.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::PoolParams, state::abstract_pool};

    fn intent(tag: u8, nonce: u64, price: u128, value: u128) -> TxIntent {
        TxIntent::dynamic_fee(tag as usize, Address::repeat_byte(tag), nonce, price, 1, value)
    }

    #[tokio::test]
    async fn capacity_evicts_cheapest_record() {
        let mut driver = TestNodeDriver::new().with_capacity(4);
        for tag in 1..=4 {
            driver.send_transfer(&intent(tag, 0, 3, 1), Address::ZERO).await.unwrap();
        }
        driver.send_transfer(&intent(9, 0, 12_500, 0), Address::ZERO).await.unwrap();

        let pool = driver.pool_content().await.unwrap();
        assert_eq!(abstract_pool(&pool, &PoolParams::default()).as_str(), "NNNR");
    }

    #[tokio::test]
    async fn duplicate_sends_are_noops() {
        let mut driver = TestNodeDriver::new();
        driver.send_transfer(&intent(1, 0, 10, 5), Address::ZERO).await.unwrap();
        driver.send_transfer(&intent(1, 0, 10, 5), Address::ZERO).await.unwrap();
        assert_eq!(driver.pending_len(), 1);

        // A strictly higher fee replaces the incumbent.
        driver.send_transfer(&intent(1, 0, 11, 7), Address::ZERO).await.unwrap();
        let pool = driver.pool_content().await.unwrap();
        let record = &pool.pending[&Address::repeat_byte(1)]["0"];
        assert_eq!(record.effective_price(), Ok(11));
    }

    #[tokio::test]
    async fn gapped_nonces_are_queued() {
        let mut driver = TestNodeDriver::new();
        driver.send_transfer(&intent(1, 2, 10, 5), Address::ZERO).await.unwrap();
        assert_eq!(driver.pending_len(), 0);
        let pool = driver.pool_content().await.unwrap();
        assert_eq!(pool.queued[&Address::repeat_byte(1)].len(), 1);
    }

    #[tokio::test]
    async fn snapshot_revert_roundtrip() {
        let mut driver = TestNodeDriver::new();
        driver.supports_snapshot = true;
        driver.send_transfer(&intent(1, 0, 10, 5), Address::ZERO).await.unwrap();
        let id = driver.snapshot().await.unwrap();
        driver.send_transfer(&intent(2, 0, 10, 5), Address::ZERO).await.unwrap();
        assert!(driver.revert(&id).await.unwrap());
        assert_eq!(driver.pending_len(), 1);
    }
}
