//! Blob-transaction mutation: well-formed, underpriced, and malformed blob
//! candidates from a fresh account.

use crate::{
    accounts::AccountTable,
    blob::{dummy_blobs, versioned_hashes},
    config::BlobParams,
    mutate::{surviving_indices, MutationContext},
    types::{Input, TxIntent},
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;
use tracing::warn;

/// The blob mutation strategy. Emits three candidates per call — a valid blob
/// transaction with a randomized blob fee, a variant pinned to the minimum
/// blob fee, and a variant whose hash list is one longer than its blob count.
#[derive(Debug)]
pub struct BlobMutator {
    accounts: Arc<AccountTable>,
    params: BlobParams,
    rng: StdRng,
}

impl BlobMutator {
    /// Creates the strategy with a seeded generator so campaigns replay
    /// deterministically.
    pub fn new(accounts: Arc<AccountTable>, params: BlobParams, rng_seed: u64) -> Self {
        Self { accounts, params, rng: StdRng::seed_from_u64(rng_seed) }
    }

    /// Produces the candidate children of `base`.
    pub fn mutate(&mut self, base: &Input, ctx: &MutationContext<'_>) -> Vec<Input> {
        let resends = surviving_indices(base, ctx.pool);

        let account_index = ctx.next_free_account + 1;
        let Some(sender) = self.accounts.address(account_index) else {
            warn!(target: "mutate", account_index, "no fresh account available for blob mutation");
            return Vec::new();
        };

        let blob_count = self.rng.gen_range(1..=self.params.max_blobs_per_tx.max(1));
        let blobs = dummy_blobs(&mut self.rng, blob_count);
        let hashes = versioned_hashes(&blobs);

        let max_fee = ctx.fees.max_fee_per_gas.max(self.rng.gen_range(1..=100));
        let priority_fee = ctx.fees.max_priority_fee_per_gas.max(self.rng.gen_range(1..=50));
        let blob_fee = self.random_blob_fee(ctx.fees.max_fee_per_blob_gas);

        let valid = TxIntent::blob(
            account_index,
            sender,
            0,
            max_fee,
            priority_fee,
            blob_fee,
            hashes.clone(),
        );

        let underpriced = TxIntent::blob(
            account_index,
            sender,
            0,
            max_fee,
            priority_fee,
            self.params.min_blob_gas_price,
            hashes.clone(),
        );

        // One hash more than blobs: shaped like a blob transaction, but the
        // hash/blob relationship cannot hold.
        let mut excess_hashes = hashes;
        if let Some(first) = excess_hashes.first().copied() {
            excess_hashes.push(first);
        }
        let malformed = TxIntent::blob(
            account_index,
            sender,
            0,
            max_fee,
            priority_fee,
            blob_fee,
            excess_hashes,
        );

        [valid, underpriced, malformed]
            .into_iter()
            .map(|intent| {
                let mut sequence = base.sequence.clone();
                sequence.push(intent);
                Input::with_resends(sequence, resends.clone())
            })
            .collect()
    }

    /// A blob fee drawn from `[snapshot/2, snapshot·2]`, clamped into the
    /// configured band.
    fn random_blob_fee(&mut self, snapshot_fee: u128) -> u128 {
        let low = snapshot_fee / 2;
        let high = snapshot_fee.saturating_mul(2);
        let drawn = if high > low { self.rng.gen_range(low..=high) } else { low };
        drawn.clamp(self.params.min_blob_gas_price, self.params.max_blob_gas_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test_utils::pool::addr, traits::FeeSnapshot, types::TxClass};

    fn fees() -> FeeSnapshot {
        FeeSnapshot {
            gas_price: 5,
            max_fee_per_gas: 3,
            max_priority_fee_per_gas: 1,
            max_fee_per_blob_gas: 100,
        }
    }

    fn mutator(seed: u64) -> BlobMutator {
        BlobMutator::new(Arc::new(AccountTable::synthetic(8)), BlobParams::default(), seed)
    }

    #[test]
    fn emits_three_blob_candidates() {
        let fees = fees();
        let ctx = MutationContext { pool: None, fees: &fees, next_free_account: 2 };
        let children = mutator(1).mutate(&Input::empty(), &ctx);

        assert_eq!(children.len(), 3);
        for child in &children {
            let intent = child.sequence.last().unwrap();
            assert_eq!(intent.class, TxClass::Blob);
            assert_eq!(intent.sender, addr(4));
            assert_eq!(intent.nonce, 0);
            assert!(intent.max_fee_per_blob_gas.is_some());
        }

        let params = BlobParams::default();
        let valid = children[0].sequence.last().unwrap();
        let fee = valid.max_fee_per_blob_gas.unwrap();
        assert!((params.min_blob_gas_price..=params.max_blob_gas_price).contains(&fee));

        let underpriced = children[1].sequence.last().unwrap();
        assert_eq!(underpriced.max_fee_per_blob_gas, Some(params.min_blob_gas_price));

        // The malformed variant carries one extra, duplicated hash.
        let valid_hashes = valid.blob_versioned_hashes.as_ref().unwrap();
        let excess = children[2].sequence.last().unwrap().blob_versioned_hashes.as_ref().unwrap();
        assert_eq!(excess.len(), valid_hashes.len() + 1);
        assert_eq!(excess.last(), excess.first());
    }

    #[test]
    fn seeded_runs_replay_identically() {
        let fees = fees();
        let ctx = MutationContext { pool: None, fees: &fees, next_free_account: 0 };
        let a = mutator(42).mutate(&Input::empty(), &ctx);
        let b = mutator(42).mutate(&Input::empty(), &ctx);
        assert_eq!(a, b);
    }

    #[test]
    fn exhausted_account_table_yields_nothing() {
        let fees = fees();
        let mut strategy = BlobMutator::new(Arc::new(AccountTable::synthetic(2)), BlobParams::default(), 0);
        let ctx = MutationContext { pool: None, fees: &fees, next_free_account: 5 };
        assert!(strategy.mutate(&Input::empty(), &ctx).is_empty());
    }
}
