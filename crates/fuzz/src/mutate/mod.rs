//! Mutation strategies: given a seed's input and observed pool, synthesize
//! candidate child inputs.
//!
//! Strategies form a closed set behind the [`Mutator`] enum so the engine can
//! handle them exhaustively; a composite variant concatenates its children's
//! candidates. Mutation itself is pure and synchronous — the engine fetches a
//! fresh fee snapshot from the driver each iteration and passes it in.

mod default;

pub use default::DefaultMutator;

mod blob;

pub use blob::BlobMutator;

use crate::{
    accounts::AccountTable,
    traits::FeeSnapshot,
    types::{Input, RawPool},
};
use alloy_primitives::Address;
use tracing::warn;

/// Everything a strategy may consult when mutating.
#[derive(Debug, Clone, Copy)]
pub struct MutationContext<'a> {
    /// The seed's observed pool; `None` for the initial seed.
    pub pool: Option<&'a RawPool>,
    /// Fresh gas-price family from the driver.
    pub fees: &'a FeeSnapshot,
    /// The engine's account cursor: the highest logical slot handed out.
    pub next_free_account: usize,
}

/// The closed set of mutation strategies.
#[derive(Debug)]
pub enum Mutator {
    /// Child/replacement/parent/ladder mutations on the default pool shape.
    Default(DefaultMutator),
    /// Blob-transaction mutations.
    Blob(BlobMutator),
    /// Concatenation of child strategies' candidates.
    Composite(Vec<Mutator>),
}

impl Mutator {
    /// Produces candidate child inputs for `base` under `ctx`.
    pub fn mutate(&mut self, base: &Input, ctx: &MutationContext<'_>) -> Vec<Input> {
        match self {
            Self::Default(strategy) => strategy.mutate(base, ctx),
            Self::Blob(strategy) => strategy.mutate(base, ctx),
            Self::Composite(children) => {
                children.iter_mut().flat_map(|child| child.mutate(base, ctx)).collect()
            }
        }
    }
}

/// Positions of `base` intents still present in the observed pool, matched by
/// `(sender, nonce, value, type)`. These are the intents the executor must
/// re-send to rebuild the base state.
pub(crate) fn surviving_indices(base: &Input, pool: Option<&RawPool>) -> Vec<usize> {
    let Some(pool) = pool else { return Vec::new() };
    base.sequence
        .iter()
        .enumerate()
        .filter(|(_, intent)| pool.contains_intent(intent))
        .map(|(position, _)| position)
        .collect()
}

/// Resolves a logical account slot, clamping out-of-range slots to the last
/// loaded account.
pub(crate) fn account_at(accounts: &AccountTable, index: usize) -> Option<(usize, Address)> {
    if let Some(address) = accounts.address(index) {
        return Some((index, address));
    }
    let last = accounts.len().checked_sub(1)?;
    warn!(target: "mutate", index, last, "account slot out of range, clamping to last loaded account");
    accounts.address(last).map(|address| (last, address))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_utils::pool::{addr, record_1559, PoolBuilder},
        types::TxIntent,
    };

    #[test]
    fn surviving_indices_match_tuple() {
        let survivor = TxIntent::dynamic_fee(1, addr(1), 0, 12_500, 1, 0);
        let gone = TxIntent::dynamic_fee(2, addr(2), 0, 12_500, 1, 0);
        let base = Input::new(vec![survivor, gone]);

        let pool = PoolBuilder::new().pending_chain(addr(1), &[record_1559(12_500, 0)]).build();
        assert_eq!(surviving_indices(&base, Some(&pool)), vec![0]);
        assert_eq!(surviving_indices(&base, None), Vec::<usize>::new());
    }

    #[test]
    fn account_at_clamps() {
        let accounts = AccountTable::synthetic(3);
        assert_eq!(account_at(&accounts, 1), Some((1, addr(2))));
        assert_eq!(account_at(&accounts, 9), Some((2, addr(3))));
        assert_eq!(account_at(&AccountTable::default(), 0), None);
    }
}
