//! The symbolic pool abstraction: a pure map from a raw snapshot to a
//! canonical fingerprint string over the alphabet `{E, F, N, P, R, C, O, B, I}`.
//!
//! Symbol legend:
//! - `E` empty pool slot, `F` queued future holder, `N` baseline filler
//! - `P` non-normal parent (low-priced head), `R` replacement-priced parent
//! - `C` low-value child of `P`, `O` override (high value, or any child of `R`)
//! - `B` valid blob record, `I` malformed blob record
//!
//! Two raw pools with equal fingerprints are equivalent for coverage purposes.

use crate::{
    config::PoolParams,
    types::{sorted_records, RawPool, TxRecord, FUTURE_NONCE},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Fingerprint reserved for the initial seed, before any pool was observed.
const INITIAL_STATE: &str = "<INITIAL_STATE>";

/// Canonical symbolic form of a pool snapshot.
///
/// Canonical ordering: `E* F* B* I* N*`, then one block per non-normal sender
/// chain, blocks sorted by head price.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wraps an already-canonical symbol string.
    pub fn new(symbols: impl Into<String>) -> Self {
        Self(symbols.into())
    }

    /// The sentinel fingerprint of the initial seed.
    pub fn initial() -> Self {
        Self(INITIAL_STATE.to_string())
    }

    /// Whether this is the initial-seed sentinel.
    pub fn is_initial(&self) -> bool {
        self.0 == INITIAL_STATE
    }

    /// The underlying symbol string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of occurrences of `symbol`.
    pub fn count(&self, symbol: char) -> usize {
        self.0.chars().filter(|c| *c == symbol).count()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One non-normal sender chain, symbolized.
struct Block {
    head_price: u128,
    symbols: String,
}

/// Computes the canonical fingerprint of a raw pool snapshot.
pub fn abstract_pool(pool: &RawPool, params: &PoolParams) -> Fingerprint {
    // Queued records holding the sentinel nonce occupy future slots; blob
    // records never count as futures.
    let mut future_count = 0usize;
    for (sender, records) in &pool.queued {
        for (nonce, record) in sorted_records(records) {
            let class = record.tx_class().unwrap_or_else(|err| {
                warn!(target: "state", %sender, nonce, %err, "malformed type on queued record, assuming legacy");
                0
            });
            if nonce == FUTURE_NONCE && class != 3 {
                future_count += 1;
            }
        }
    }

    let mut pending_total = 0usize;
    let mut normal_count = 0usize;
    let mut blob_count = 0usize;
    let mut invalid_blob_count = 0usize;
    let mut blocks: Vec<Block> = Vec::new();

    for (sender, records) in &pool.pending {
        let chain = sorted_records(records);
        if chain.is_empty() {
            continue;
        }
        pending_total += chain.len();

        let (_, head) = chain[0];
        let head_class = head.tx_class().unwrap_or_else(|err| {
            warn!(target: "state", %sender, %err, "malformed type on head record, assuming legacy");
            0
        });

        if head_class == 3 {
            if head.has_blob_hashes() {
                blob_count += chain.len();
            } else {
                invalid_blob_count += chain.len();
            }
            continue;
        }

        // A malformed head price classifies the chain as replacement-priced,
        // which also forces its children to `O` per the malformed-field rule.
        let head_price = head.effective_price().unwrap_or_else(|err| {
            warn!(target: "state", %sender, %err, "malformed head price, classifying chain as replacement");
            u128::MAX
        });

        if head_price == params.normal_price {
            normal_count += chain.len();
            continue;
        }

        blocks.push(symbolize_chain(&chain, head_price, params));
    }

    // Content-determined ordering: head price first, then the block's own
    // symbols, so equal pools differing only in sender identity collide.
    blocks.sort_by(|a, b| a.head_price.cmp(&b.head_price).then_with(|| a.symbols.cmp(&b.symbols)));

    let total_counted = future_count + pending_total;
    let empty_count = params.pool_size.saturating_sub(total_counted);

    let mut symbols = String::with_capacity(total_counted + empty_count);
    push_repeated(&mut symbols, 'E', empty_count);
    push_repeated(&mut symbols, 'F', future_count);
    push_repeated(&mut symbols, 'B', blob_count);
    push_repeated(&mut symbols, 'I', invalid_blob_count);
    push_repeated(&mut symbols, 'N', normal_count);
    for block in blocks {
        symbols.push_str(&block.symbols);
    }

    Fingerprint(symbols)
}

/// Symbolizes one non-normal chain: `R`/`P` head, `C`/`O` children.
fn symbolize_chain(chain: &[(u64, &TxRecord)], head_price: u128, params: &PoolParams) -> Block {
    let head_is_replacement = head_price >= params.replacement_price_threshold;
    let mut symbols = String::with_capacity(chain.len());

    for (position, (nonce, record)) in chain.iter().enumerate() {
        if position == 0 {
            symbols.push(if head_is_replacement { 'R' } else { 'P' });
            continue;
        }

        // Blob records below a non-blob head should not occur; symbolize them
        // on their own merits rather than dropping them.
        if record.tx_class().unwrap_or(0) == 3 {
            symbols.push(if record.has_blob_hashes() { 'B' } else { 'I' });
            continue;
        }

        match record.value() {
            Ok(value) if !head_is_replacement && value <= params.child_value_threshold => {
                symbols.push('C');
            }
            Ok(_) => symbols.push('O'),
            Err(err) => {
                warn!(target: "state", nonce, %err, "malformed child value, symbolizing as override");
                symbols.push('O');
            }
        }
    }

    Block { head_price, symbols }
}

fn push_repeated(out: &mut String, symbol: char, count: usize) {
    out.extend(std::iter::repeat(symbol).take(count));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::pool::{addr, blob_record, legacy_record, record_1559, PoolBuilder};
    use proptest::prelude::*;

    fn params() -> PoolParams {
        PoolParams::default()
    }

    #[test]
    fn empty_pool_is_all_empty_slots() {
        assert_eq!(abstract_pool(&RawPool::default(), &params()).as_str(), "EEEE");
    }

    #[test]
    fn baseline_fill_is_all_normal() {
        let pool = PoolBuilder::new()
            .pending_chain(addr(1), &[record_1559(3, 1)])
            .pending_chain(addr(2), &[record_1559(3, 1)])
            .pending_chain(addr(3), &[record_1559(3, 1)])
            .pending_chain(addr(4), &[record_1559(3, 1)])
            .build();
        assert_eq!(abstract_pool(&pool, &params()).as_str(), "NNNN");
    }

    #[test]
    fn replacement_parent_displaces_a_normal() {
        let pool = PoolBuilder::new()
            .pending_chain(addr(1), &[record_1559(3, 1)])
            .pending_chain(addr(2), &[record_1559(3, 1)])
            .pending_chain(addr(3), &[record_1559(3, 1)])
            .pending_chain(addr(5), &[record_1559(12_500, 0)])
            .build();
        assert_eq!(abstract_pool(&pool, &params()).as_str(), "NNNR");
    }

    #[test]
    fn child_classification_by_value_and_head() {
        // Child of a replacement head is always an override.
        let pool = PoolBuilder::new()
            .pending_chain(addr(1), &[record_1559(12_500, 0), record_1559(12_500, 10_000)])
            .build();
        assert_eq!(abstract_pool(&pool, &params()).as_str(), "EERO");

        // Child of a low-priced parent splits on the value threshold.
        let low = PoolBuilder::new()
            .pending_chain(addr(1), &[record_1559(5, 0), record_1559(12_500, 10_000)])
            .build();
        assert_eq!(abstract_pool(&low, &params()).as_str(), "EEPC");

        let high = PoolBuilder::new()
            .pending_chain(addr(1), &[record_1559(5, 0), record_1559(12_500, 10_001)])
            .build();
        assert_eq!(abstract_pool(&high, &params()).as_str(), "EEPO");
    }

    #[test]
    fn futures_count_only_sentinel_non_blob() {
        let pool = PoolBuilder::new()
            .queued_record(addr(1), 10_000, record_1559(3, 2))
            .queued_record(addr(2), 10_000, blob_record(12_500, 1, &["0x01aa"]))
            .queued_record(addr(3), 7, record_1559(3, 2))
            .build();
        assert_eq!(abstract_pool(&pool, &params()).as_str(), "EEEF");
    }

    #[test]
    fn blob_heads_split_on_hash_presence() {
        let pool = PoolBuilder::new()
            .pending_chain(addr(1), &[blob_record(100, 5, &["0x01aa"])])
            .pending_chain(addr(2), &[blob_record(100, 5, &[])])
            .build();
        assert_eq!(abstract_pool(&pool, &params()).as_str(), "EEBI");
    }

    #[test]
    fn overfull_pool_emits_no_empty_slots() {
        let mut builder = PoolBuilder::new();
        for i in 1..=6 {
            builder = builder.pending_chain(addr(i), &[record_1559(3, 1)]);
        }
        let fingerprint = abstract_pool(&builder.build(), &params());
        assert_eq!(fingerprint.as_str(), "NNNNNN");
        assert_eq!(fingerprint.count('E'), 0);
    }

    #[test]
    fn malformed_head_price_classifies_as_replacement() {
        let mut bad = legacy_record(1, 5);
        bad.gas_price = Some("0xnope".to_string());
        let pool = PoolBuilder::new()
            .pending_chain(addr(1), &[bad, record_1559(12_500, 1)])
            .build();
        assert_eq!(abstract_pool(&pool, &params()).as_str(), "EERO");
    }

    #[test]
    fn blocks_sort_by_head_price() {
        let pool = PoolBuilder::new()
            .pending_chain(addr(9), &[record_1559(9_000, 0)])
            .pending_chain(addr(1), &[record_1559(5, 0)])
            .pending_chain(addr(5), &[record_1559(12_500, 0)])
            .build();
        assert_eq!(abstract_pool(&pool, &params()).as_str(), "EPPR");
    }

    #[test]
    fn fingerprint_invariant_under_sender_identity() {
        let left = PoolBuilder::new()
            .pending_chain(addr(1), &[record_1559(5, 0)])
            .pending_chain(addr(2), &[record_1559(9_000, 0)])
            .build();
        let right = PoolBuilder::new()
            .pending_chain(addr(8), &[record_1559(9_000, 0)])
            .pending_chain(addr(9), &[record_1559(5, 0)])
            .build();
        assert_eq!(abstract_pool(&left, &params()), abstract_pool(&right, &params()));
    }

    #[test]
    fn initial_sentinel_is_distinct() {
        let sentinel = Fingerprint::initial();
        assert!(sentinel.is_initial());
        assert_ne!(sentinel, abstract_pool(&RawPool::default(), &params()));
    }

    proptest! {
        #[test]
        fn alphabet_and_length_law(
            chains in proptest::collection::vec(
                (1u8..=40, proptest::collection::vec((prop_oneof![Just(3u128), 1u128..20_000], 0u128..20_000, prop_oneof![Just(0u8), Just(2u8)]), 1..4)),
                0..6,
            ),
            futures in 0usize..3,
        ) {
            let mut builder = PoolBuilder::new();
            let mut seen = std::collections::BTreeSet::new();
            let mut pending = 0usize;
            for (sender, records) in &chains {
                if !seen.insert(*sender) {
                    continue;
                }
                let recs: Vec<_> = records
                    .iter()
                    .map(|(price, value, class)| match class {
                        0 => legacy_record(*price, *value),
                        _ => record_1559(*price, *value),
                    })
                    .collect();
                pending += recs.len();
                builder = builder.pending_chain(addr(*sender), &recs);
            }
            for i in 0..futures {
                builder = builder.queued_record(addr(200 + i as u8), 10_000, record_1559(3, 2));
            }

            let params = PoolParams::default();
            let fingerprint = abstract_pool(&builder.build(), &params);

            prop_assert!(fingerprint.as_str().chars().all(|c| "EFNPRCOBI".contains(c)));
            let counted = pending + futures;
            prop_assert_eq!(fingerprint.as_str().len(), counted.max(params.pool_size));
        }
    }
}
