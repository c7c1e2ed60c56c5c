//! Exploit detectors: predicates over raw pool snapshots that flag suspicious
//! states.
//!
//! Detectors are a closed set behind [`ExploitDetector`]; a composite variant
//! evaluates all children and reports every one that fired. All detectors are
//! pure except [`ExploitDetector::BlobPoolStall`], which compares consecutive
//! observations.

use crate::{
    config::PoolParams,
    types::{sorted_records, RawPool},
};
use alloy_primitives::Address;
use std::collections::HashSet;
use tracing::warn;

/// The result of a firing detector: the names of every predicate that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Names of the fired detectors.
    pub fired: Vec<&'static str>,
}

impl Detection {
    fn single(name: &'static str) -> Self {
        Self { fired: vec![name] }
    }
}

/// The closed set of exploit detectors.
#[derive(Debug, Clone)]
pub enum ExploitDetector {
    /// The pending section holds no records at all.
    PendingEmpty,
    /// Attack chains fill the pool at a cost strictly below `pool_size`
    /// normal transactions.
    LowCostState {
        /// Abstraction parameters of the scenario.
        params: PoolParams,
    },
    /// [`ExploitDetector::LowCostState`] with the cost threshold scaled by
    /// `epsilon ∈ (0, 1]`, catching near-miss underpricing.
    EpsilonCost {
        /// Abstraction parameters of the scenario.
        params: PoolParams,
        /// Threshold scale.
        epsilon: f64,
    },
    /// A blob record survived a full observation without progressing.
    BlobPoolStall {
        /// Blob record keys seen in the previous observation.
        last_seen: HashSet<(Address, u64)>,
    },
    /// A pending blob record prices its blob gas outside the given band.
    BlobGasPriceManipulation {
        /// Inclusive lower bound.
        min: u128,
        /// Inclusive upper bound.
        max: u128,
    },
    /// A pending blob record that would fingerprint as malformed (`I`).
    InvalidBlobAcceptance,
    /// Logical OR of the children, recording every child that fired.
    Composite(Vec<ExploitDetector>),
}

impl ExploitDetector {
    /// A stall detector with empty history.
    pub fn blob_pool_stall() -> Self {
        Self::BlobPoolStall { last_seen: HashSet::new() }
    }

    /// The detector's name as recorded in exploit reports.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PendingEmpty => "pending_empty",
            Self::LowCostState { .. } => "low_cost_state",
            Self::EpsilonCost { .. } => "epsilon_cost",
            Self::BlobPoolStall { .. } => "blob_pool_stall",
            Self::BlobGasPriceManipulation { .. } => "blob_gas_price_manipulation",
            Self::InvalidBlobAcceptance => "invalid_blob_acceptance",
            Self::Composite(_) => "composite",
        }
    }

    /// Evaluates the detector against a snapshot. `None` means nothing fired.
    pub fn fires(&mut self, pool: &RawPool) -> Option<Detection> {
        match self {
            Self::PendingEmpty => pool.is_pending_empty().then(|| Detection::single("pending_empty")),
            Self::LowCostState { params } => {
                attack_fills_below_cost(pool, params, 1.0).then(|| Detection::single("low_cost_state"))
            }
            Self::EpsilonCost { params, epsilon } => attack_fills_below_cost(pool, params, *epsilon)
                .then(|| Detection::single("epsilon_cost")),
            Self::BlobPoolStall { last_seen } => {
                let current = blob_record_keys(pool);
                let stalled = current.intersection(last_seen).next().is_some();
                *last_seen = current;
                stalled.then(|| Detection::single("blob_pool_stall"))
            }
            Self::BlobGasPriceManipulation { min, max } => {
                blob_fee_outside(pool, *min, *max)
                    .then(|| Detection::single("blob_gas_price_manipulation"))
            }
            Self::InvalidBlobAcceptance => {
                has_invalid_blob(pool).then(|| Detection::single("invalid_blob_acceptance"))
            }
            Self::Composite(children) => {
                let fired: Vec<&'static str> = children
                    .iter_mut()
                    .filter_map(|child| child.fires(pool))
                    .flat_map(|detection| detection.fired)
                    .collect();
                (!fired.is_empty()).then_some(Detection { fired })
            }
        }
    }
}

/// Whether the attack chains (non-normal, non-blob heads) fill the pool while
/// costing strictly less than `epsilon · pool_size · normal_price`. The
/// per-transfer gas factor cancels on both sides.
fn attack_fills_below_cost(pool: &RawPool, params: &PoolParams, epsilon: f64) -> bool {
    let mut attack_records = 0usize;
    let mut attack_cost = 0u128;

    for (sender, records) in &pool.pending {
        let chain = sorted_records(records);
        let Some((_, head)) = chain.first() else { continue };
        if head.tx_class().unwrap_or(0) == 3 {
            continue;
        }
        let head_price = match head.effective_price() {
            Ok(price) => price,
            Err(err) => {
                warn!(target: "detect", %sender, %err, "malformed head price, counting chain as attack");
                params.normal_price + 1
            }
        };
        if head_price == params.normal_price {
            continue;
        }
        attack_records += chain.len();
        for (_, record) in &chain {
            attack_cost += record.effective_price().unwrap_or(head_price);
        }
    }

    if attack_records < params.pool_size {
        return false;
    }
    let threshold = epsilon * (params.pool_size as f64) * (params.normal_price as f64);
    (attack_cost as f64) < threshold
}

/// Keys of every pending record belonging to a blob-headed chain.
fn blob_record_keys(pool: &RawPool) -> HashSet<(Address, u64)> {
    let mut keys = HashSet::new();
    for (sender, records) in &pool.pending {
        for (nonce, record) in sorted_records(records) {
            if record.tx_class().unwrap_or(0) == 3 {
                keys.insert((*sender, nonce));
            }
        }
    }
    keys
}

/// Whether any pending blob record prices its blob gas outside `[min, max]`.
fn blob_fee_outside(pool: &RawPool, min: u128, max: u128) -> bool {
    for (sender, records) in &pool.pending {
        for (nonce, record) in sorted_records(records) {
            if record.tx_class().unwrap_or(0) != 3 {
                continue;
            }
            match record.blob_fee() {
                Ok(fee) if fee < min || fee > max => return true,
                Ok(_) => {}
                Err(err) => {
                    warn!(target: "detect", %sender, nonce, %err, "malformed blob fee, skipping record");
                }
            }
        }
    }
    false
}

/// Whether any pending blob record lacks versioned hashes.
fn has_invalid_blob(pool: &RawPool) -> bool {
    pool.pending.values().any(|records| {
        records
            .values()
            .any(|record| record.tx_class().unwrap_or(0) == 3 && !record.has_blob_hashes())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::pool::{addr, blob_record, record_1559, PoolBuilder};

    fn params() -> PoolParams {
        PoolParams::default()
    }

    #[test]
    fn pending_empty_fires_on_drained_pool() {
        let mut detector = ExploitDetector::PendingEmpty;
        assert!(detector.fires(&RawPool::default()).is_some());

        let filled = PoolBuilder::new().pending_chain(addr(1), &[record_1559(3, 1)]).build();
        assert!(detector.fires(&filled).is_none());
    }

    #[test]
    fn low_cost_state_requires_full_cheap_pool() {
        // Four attack records at prices 4 + 1 + 1 + 1 = 7 < 4 * 3.
        let pool = PoolBuilder::new()
            .pending_chain(
                addr(1),
                &[record_1559(4, 0), record_1559(1, 5), record_1559(1, 5), record_1559(1, 5)],
            )
            .build();
        let mut detector = ExploitDetector::LowCostState { params: params() };
        assert!(detector.fires(&pool).is_some());

        // Same shape but expensive records do not fire.
        let pricey = PoolBuilder::new()
            .pending_chain(
                addr(1),
                &[record_1559(4, 0), record_1559(12_000, 5), record_1559(1, 5), record_1559(1, 5)],
            )
            .build();
        assert!(detector.fires(&pricey).is_none());

        // Too few attack records do not fire regardless of cost.
        let sparse = PoolBuilder::new().pending_chain(addr(1), &[record_1559(1, 0)]).build();
        assert!(detector.fires(&sparse).is_none());
    }

    #[test]
    fn epsilon_scales_the_threshold() {
        // Cost 10 with threshold 12: fires at ε=1 but not at ε=0.8 (9.6).
        let pool = PoolBuilder::new()
            .pending_chain(
                addr(1),
                &[record_1559(7, 0), record_1559(1, 5), record_1559(1, 5), record_1559(1, 5)],
            )
            .build();
        assert!(ExploitDetector::LowCostState { params: params() }.fires(&pool).is_some());
        assert!(ExploitDetector::EpsilonCost { params: params(), epsilon: 0.8 }
            .fires(&pool)
            .is_none());
    }

    #[test]
    fn blob_stall_needs_two_observations() {
        let pool = PoolBuilder::new()
            .pending_chain(addr(1), &[blob_record(100, 50, &["0x01aa"])])
            .build();
        let mut detector = ExploitDetector::blob_pool_stall();
        assert!(detector.fires(&pool).is_none());
        assert!(detector.fires(&pool).is_some());

        // The record progressed out of the pool: history resets.
        assert!(detector.fires(&RawPool::default()).is_none());
        assert!(detector.fires(&pool).is_none());
    }

    #[test]
    fn blob_gas_band_detection() {
        let cheap = PoolBuilder::new()
            .pending_chain(addr(1), &[blob_record(100, 2, &["0x01aa"])])
            .build();
        let mut detector = ExploitDetector::BlobGasPriceManipulation { min: 10, max: 1_000 };
        assert!(detector.fires(&cheap).is_some());

        let sane = PoolBuilder::new()
            .pending_chain(addr(1), &[blob_record(100, 500, &["0x01aa"])])
            .build();
        assert!(detector.fires(&sane).is_none());
    }

    #[test]
    fn invalid_blob_acceptance_matches_hashless_records() {
        let invalid = PoolBuilder::new()
            .pending_chain(addr(1), &[blob_record(100, 50, &[])])
            .build();
        assert!(ExploitDetector::InvalidBlobAcceptance.fires(&invalid).is_some());

        let valid = PoolBuilder::new()
            .pending_chain(addr(1), &[blob_record(100, 50, &["0x01aa"])])
            .build();
        assert!(ExploitDetector::InvalidBlobAcceptance.fires(&valid).is_none());
    }

    #[test]
    fn composite_records_every_fired_child() {
        let mut detector = ExploitDetector::Composite(vec![
            ExploitDetector::PendingEmpty,
            ExploitDetector::InvalidBlobAcceptance,
            ExploitDetector::BlobGasPriceManipulation { min: 10, max: 1_000 },
        ]);

        let detection = detector.fires(&RawPool::default()).unwrap();
        assert_eq!(detection.fired, vec!["pending_empty"]);

        let pool = PoolBuilder::new()
            .pending_chain(addr(1), &[blob_record(100, 2, &[])])
            .build();
        let detection = detector.fires(&pool).unwrap();
        assert_eq!(
            detection.fired,
            vec!["invalid_blob_acceptance", "blob_gas_price_manipulation"]
        );
    }
}
