//! The default pool mutation strategy: child/override appends, replacements,
//! new parents, and price laddering.

use crate::{
    accounts::AccountTable,
    config::PoolParams,
    mutate::{account_at, surviving_indices, MutationContext},
    types::{
        normal_priced_value, sorted_records, Input, RawPool, TxIntent, TRANSFER_GAS_LIMIT,
    },
};
use alloy_primitives::Address;
use std::sync::Arc;
use tracing::warn;

/// Budget from which child/override values are derived.
const OVERRIDE_VALUE_BUDGET: u128 = 1_000_000_000_000_000;

/// A pending sender whose head record is not baseline-priced.
#[derive(Debug, Clone, Copy)]
struct AttackHead {
    account_index: usize,
    sender: Address,
    next_nonce: u64,
    head_price: u128,
}

/// The default mutation strategy: `P`/`R`/`C`/`O` chain shapes plus price
/// ladders.
#[derive(Debug)]
pub struct DefaultMutator {
    accounts: Arc<AccountTable>,
    params: PoolParams,
    step_length: u128,
}

impl DefaultMutator {
    /// Creates the strategy. `step_length` is the ladder spacing, typically
    /// 1 or 2 depending on the scenario.
    pub fn new(accounts: Arc<AccountTable>, params: PoolParams, step_length: u128) -> Self {
        Self { accounts, params, step_length }
    }

    /// Produces the candidate children of `base`.
    pub fn mutate(&mut self, base: &Input, ctx: &MutationContext<'_>) -> Vec<Input> {
        let resends = surviving_indices(base, ctx.pool);
        let heads = self.attack_heads(ctx.pool);
        let mut out = Vec::new();

        let fee_floor = ctx.fees.max_fee_per_gas.max(self.params.replacement_price_threshold);
        let priority_fee = ctx.fees.max_priority_fee_per_gas;

        // Child appends and replacements for every attack chain in the pool.
        for head in &heads {
            let override_value = OVERRIDE_VALUE_BUDGET
                .saturating_sub(TRANSFER_GAS_LIMIT as u128 * fee_floor)
                .saturating_sub(100);
            let override_child = TxIntent::dynamic_fee(
                head.account_index,
                head.sender,
                head.next_nonce,
                fee_floor,
                priority_fee,
                override_value,
            );
            out.push(append(base, override_child, &resends));

            let low_child = TxIntent::dynamic_fee(
                head.account_index,
                head.sender,
                head.next_nonce,
                fee_floor,
                priority_fee,
                self.params.child_value_threshold,
            );
            out.push(append(base, low_child, &resends));

            let replacement = TxIntent::dynamic_fee(
                head.account_index,
                head.sender,
                0,
                fee_floor,
                priority_fee,
                normal_priced_value(fee_floor, self.params.replacement_price_threshold),
            );
            out.push(append(base, replacement, &resends));
        }

        // A fresh low-priced parent when no attack chain is pending.
        if heads.is_empty() {
            if let Some(parent) = self.fresh_parent(ctx) {
                out.push(append(base, parent, &resends));
            }
        }

        // The price ladder over the base input's nonce-0 intents.
        let mut base_parents: Vec<&TxIntent> = base.parents().collect();
        base_parents.sort_by_key(|intent| intent.price);
        let ladder: Vec<u128> = base_parents.iter().map(|intent| intent.price).collect();
        let ladder_floor = ctx.fees.max_fee_per_gas.max(self.params.normal_price + 1);

        // Ladder insertion: one candidate per attack chain whose head price
        // appears in the ladder.
        for head in &heads {
            let Some(position) = ladder.iter().position(|price| *price == head.head_price) else {
                continue;
            };
            let options = self.ladder_options(ladder_floor, ladder.len() + 1);
            let new_price = options[position];
            out.extend(self.laddered_candidate(base, ctx, &resends, &ladder, options, new_price));
        }

        // Ladder extension: one candidate priced one step above the max.
        if let Some(max_price) = ladder.last() {
            // Position of the first occurrence, matching the insertion rule.
            let max_position =
                ladder.iter().position(|price| price == max_price).unwrap_or(ladder.len() - 1);
            let new_price = ladder_floor + (max_position as u128 + 1) * self.step_length;
            let options = self.ladder_options(ladder_floor, ladder.len() + 2);
            out.extend(self.laddered_candidate(base, ctx, &resends, &ladder, options, new_price));
        }

        // Last resort: introduce a parent when neither the pool nor the base
        // input has one.
        if heads.is_empty() && ladder.is_empty() {
            if let Some(parent) = self.fresh_parent(ctx) {
                out.push(Input::with_resends(vec![parent], resends.clone()));
            }
        }

        out
    }

    /// Pending senders whose head record prices off-baseline, with the chain
    /// length as the next free nonce.
    fn attack_heads(&self, pool: Option<&RawPool>) -> Vec<AttackHead> {
        let Some(pool) = pool else { return Vec::new() };
        let mut heads = Vec::new();

        for (sender, records) in &pool.pending {
            let chain = sorted_records(records);
            let Some((_, head)) = chain.first() else { continue };
            if head.tx_class().unwrap_or(0) == 3 {
                continue;
            }
            let head_price = head.effective_price().unwrap_or_else(|err| {
                warn!(target: "mutate", %sender, %err, "malformed head price, treating chain as attack head");
                self.params.normal_price + 1
            });
            if head_price == self.params.normal_price {
                continue;
            }
            let Some(account_index) = self.accounts.index_of(sender) else {
                warn!(target: "mutate", %sender, "pending sender not in account table, skipping");
                continue;
            };
            heads.push(AttackHead {
                account_index,
                sender: *sender,
                next_nonce: chain.len() as u64,
                head_price,
            });
        }
        heads
    }

    /// A legacy parent at the snapshot gas price from a fresh account.
    fn fresh_parent(&self, ctx: &MutationContext<'_>) -> Option<TxIntent> {
        let (index, sender) = account_at(&self.accounts, ctx.next_free_account + 1)?;
        Some(TxIntent::legacy(
            index,
            sender,
            0,
            ctx.fees.gas_price,
            normal_priced_value(ctx.fees.gas_price, self.params.replacement_price_threshold),
        ))
    }

    fn ladder_options(&self, floor: u128, count: usize) -> Vec<u128> {
        (0..count).map(|step| floor + step as u128 * self.step_length).collect()
    }

    /// Builds one laddered candidate: re-price the base parents against the
    /// remaining ladder options and append a fresh parent at `new_price`.
    fn laddered_candidate(
        &self,
        base: &Input,
        ctx: &MutationContext<'_>,
        resends: &[usize],
        ladder: &[u128],
        mut options: Vec<u128>,
        new_price: u128,
    ) -> Option<Input> {
        if let Some(position) = options.iter().position(|price| *price == new_price) {
            options.remove(position);
        }

        let mut sequence = base.sequence.clone();
        for intent in &mut sequence {
            if intent.nonce != 0 {
                continue;
            }
            let Some(position) = ladder.iter().position(|price| *price == intent.price) else {
                continue;
            };
            let Some(new_price) = options.get(position) else {
                warn!(target: "mutate", position, "ladder exhausted while re-pricing parent");
                continue;
            };
            *intent = TxIntent::dynamic_fee(
                intent.account_index,
                intent.sender,
                intent.nonce,
                *new_price,
                ctx.fees.max_priority_fee_per_gas,
                normal_priced_value(*new_price, self.params.replacement_price_threshold),
            );
        }

        let (index, sender) = account_at(&self.accounts, ctx.next_free_account + 1)?;
        sequence.push(TxIntent::dynamic_fee(
            index,
            sender,
            0,
            new_price,
            ctx.fees.max_priority_fee_per_gas,
            normal_priced_value(new_price, self.params.replacement_price_threshold),
        ));
        Some(Input::with_resends(sequence, resends.to_vec()))
    }
}

fn append(base: &Input, intent: TxIntent, resends: &[usize]) -> Input {
    let mut sequence = base.sequence.clone();
    sequence.push(intent);
    Input::with_resends(sequence, resends.to_vec())
}
