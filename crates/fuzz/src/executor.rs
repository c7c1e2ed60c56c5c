//! The state-recreation executor: deterministically rebuilds an arbitrary
//! previous pool state from scratch, then applies a new input.
//!
//! Two paths exist. The *cold* path — selected only when the parent pool was
//! never observed (`None`) — resets the node and seeds the baseline fill. The
//! *warm* path resets and replays exactly what the parent fingerprint says was
//! in the pool: baseline and future holders by count, then the parent input's
//! surviving intents. An observed-empty parent pool is warm with zero
//! re-sends, which is not equivalent to a cold reset.

use crate::{
    accounts::AccountTable,
    config::PoolParams,
    errors::{DriverError, ExecutorError},
    mutate::account_at,
    state::abstract_pool,
    traits::{FeeSnapshot, NodeDriver},
    types::{Input, RawPool, TxIntent},
};
use alloy_primitives::Address;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, warn};

/// The engine-owned account cursor: the next logical slot to hand to a fresh
/// sender. The executor resets it at the start of every run and advances it
/// once per successfully seeded future holder.
#[derive(Debug, Default, Clone, Copy)]
pub struct FuzzCursor {
    /// Next unused account-table slot.
    pub next_free_account: usize,
}

/// Per-address fuzzer nonce counters, distinct from on-chain nonces. Reset at
/// the start of every state recreation.
#[derive(Debug, Default, Clone)]
pub struct NonceLedger {
    counters: HashMap<Address, u64>,
}

impl NonceLedger {
    /// The next nonce the fuzzer would use for `address`.
    pub fn next(&self, address: &Address) -> u64 {
        self.counters.get(address).copied().unwrap_or(0)
    }

    /// Advances the counter for `address`.
    pub fn bump(&mut self, address: Address) {
        *self.counters.entry(address).or_insert(0) += 1;
    }

    /// Resets every counter to zero.
    pub fn reset(&mut self) {
        self.counters.clear();
    }
}

/// Settings of the recreation protocol.
#[derive(Debug, Clone, Copy)]
pub struct RecreationSettings {
    /// Baseline transactions sent on the cold path.
    pub initial_normal_tx_count: usize,
    /// Future holders seeded when the future flag is on.
    pub future_slots: usize,
    /// Whether future holders are seeded at all.
    pub future_flag: bool,
    /// Opt-in snapshot/revert fast path for exact-baseline parents.
    pub use_snapshots: bool,
}

/// Rebuilds pool states and applies inputs over a [`NodeDriver`].
#[derive(Debug)]
pub struct StateRecreator {
    accounts: Arc<AccountTable>,
    params: PoolParams,
    settings: RecreationSettings,
    nonces: NonceLedger,
    recipient: Address,
    baseline_snapshot: Option<String>,
}

impl StateRecreator {
    /// Creates an executor. `recipient` receives every transfer.
    pub fn new(
        accounts: Arc<AccountTable>,
        params: PoolParams,
        settings: RecreationSettings,
        recipient: Address,
    ) -> Self {
        Self {
            accounts,
            params,
            settings,
            nonces: NonceLedger::default(),
            recipient,
            baseline_snapshot: None,
        }
    }

    /// Read-only view of the fuzzer nonce counters.
    pub const fn nonces(&self) -> &NonceLedger {
        &self.nonces
    }

    /// Drives the node so that its pool equals "parent state + `target`", and
    /// returns the observed final pool.
    pub async fn run<D: NodeDriver + Send>(
        &mut self,
        driver: &mut D,
        cursor: &mut FuzzCursor,
        target: &Input,
        parent_pool: Option<&RawPool>,
        parent_input: &Input,
    ) -> Result<RawPool, ExecutorError> {
        match parent_pool {
            None => self.cold_path(driver, cursor).await?,
            Some(pool) => self.warm_path(driver, cursor, pool, parent_input).await?,
        }

        for intent in &target.sequence {
            match driver.send_transfer(intent, self.recipient).await {
                Ok(_) => {
                    if !intent.is_future() {
                        self.nonces.bump(intent.sender);
                    }
                }
                Err(err) => {
                    warn!(
                        target: "executor",
                        sender = %intent.sender,
                        nonce = intent.nonce,
                        %err,
                        "send failed, skipping intent"
                    );
                }
            }
        }

        driver.pool_content().await.map_err(ExecutorError::PoolRead)
    }

    /// Full reset followed by the initial baseline (and optional future) fill.
    async fn cold_path<D: NodeDriver + Send>(
        &mut self,
        driver: &mut D,
        cursor: &mut FuzzCursor,
    ) -> Result<(), ExecutorError> {
        self.reset(driver).await?;
        self.nonces.reset();
        cursor.next_free_account = 0;

        let fees = self.fetch_fees(driver).await;
        self.send_baselines(driver, self.settings.initial_normal_tx_count, &fees).await;
        if self.settings.future_flag {
            self.send_futures(driver, cursor, self.settings.future_slots, &fees).await;
        }

        if self.settings.use_snapshots {
            self.capture_baseline_snapshot(driver).await;
        }
        Ok(())
    }

    /// Reset, replay the parent fingerprint's baseline/future counts, then
    /// re-send the parent input's surviving intents without touching the
    /// nonce counters.
    async fn warm_path<D: NodeDriver + Send>(
        &mut self,
        driver: &mut D,
        cursor: &mut FuzzCursor,
        parent_pool: &RawPool,
        parent_input: &Input,
    ) -> Result<(), ExecutorError> {
        let fingerprint = abstract_pool(parent_pool, &self.params);
        let normal_count = fingerprint.count('N');
        let future_count = fingerprint.count('F');

        if !self.rebuild_from_snapshot(driver, cursor, normal_count, future_count).await {
            self.reset(driver).await?;
            self.nonces.reset();
            cursor.next_free_account = 0;

            let fees = self.fetch_fees(driver).await;
            self.send_baselines(driver, normal_count, &fees).await;
            if self.settings.future_flag {
                self.send_futures(driver, cursor, future_count, &fees).await;
            }
        }

        // Reconstitutions of state the parent already created: sent with
        // their historical nonces, in ascending nonce order, and never
        // counted against the fuzzer nonce ledger.
        let mut resend: Vec<&TxIntent> = parent_input
            .resend_indices
            .iter()
            .filter_map(|&position| match parent_input.sequence.get(position) {
                Some(intent) => Some(intent),
                None => {
                    warn!(target: "executor", position, "resend index out of range, skipping");
                    None
                }
            })
            .collect();
        resend.sort_by_key(|intent| intent.nonce);

        for intent in resend {
            if let Err(err) = driver.send_transfer(intent, self.recipient).await {
                warn!(
                    target: "executor",
                    sender = %intent.sender,
                    nonce = intent.nonce,
                    %err,
                    "re-send failed, skipping intent"
                );
            }
        }
        Ok(())
    }

    /// Attempts the snapshot fast path; only exact-baseline parents qualify.
    async fn rebuild_from_snapshot<D: NodeDriver + Send>(
        &mut self,
        driver: &mut D,
        cursor: &mut FuzzCursor,
        normal_count: usize,
        future_count: usize,
    ) -> bool {
        if !self.settings.use_snapshots {
            return false;
        }
        let expected_futures = if self.settings.future_flag { self.settings.future_slots } else { 0 };
        if normal_count != self.settings.initial_normal_tx_count || future_count != expected_futures
        {
            return false;
        }
        let Some(snapshot_id) = self.baseline_snapshot.clone() else { return false };

        match driver.revert(&snapshot_id).await {
            Ok(true) => {
                debug!(target: "executor", snapshot_id = %snapshot_id, "reverted to baseline snapshot");
                self.nonces.reset();
                cursor.next_free_account = future_count;
                for slot in 0..normal_count {
                    if let Some(address) = self.accounts.address(slot) {
                        self.nonces.bump(address);
                    }
                }
                // Reverting consumes the snapshot on most nodes; recapture.
                self.capture_baseline_snapshot(driver).await;
                true
            }
            Ok(false) => {
                warn!(target: "executor", snapshot_id = %snapshot_id, "node rejected snapshot revert");
                self.baseline_snapshot = None;
                false
            }
            Err(err) => {
                debug!(target: "executor", %err, "snapshot revert unavailable");
                self.baseline_snapshot = None;
                false
            }
        }
    }

    async fn capture_baseline_snapshot<D: NodeDriver + Send>(&mut self, driver: &mut D) {
        match driver.snapshot().await {
            Ok(id) => self.baseline_snapshot = Some(id),
            Err(err) => {
                debug!(target: "executor", %err, "baseline snapshot unavailable");
                self.baseline_snapshot = None;
            }
        }
    }

    /// `reset_state`, falling back to the best-effort pool clear.
    async fn reset<D: NodeDriver + Send>(&mut self, driver: &mut D) -> Result<(), ExecutorError> {
        match driver.reset_state().await {
            Ok(()) => Ok(()),
            Err(DriverError::Unsupported(_)) => {
                warn!(target: "executor", "state reset unsupported, falling back to pool clear; balance determinism is lost");
                driver.clear_pool().await.map_err(|err| {
                    ExecutorError::CannotRecreate(format!(
                        "reset unsupported and pool clear failed: {err}"
                    ))
                })
            }
            Err(err) => Err(ExecutorError::CannotRecreate(format!("state reset failed: {err}"))),
        }
    }

    async fn fetch_fees<D: NodeDriver + Send>(&self, driver: &mut D) -> FeeSnapshot {
        match driver.fee_snapshot().await {
            Ok(fees) => fees,
            Err(err) => {
                warn!(target: "executor", %err, "fee snapshot unavailable, using flat normal-price fees");
                FeeSnapshot::flat(self.params.normal_price)
            }
        }
    }

    /// Sends `count` baseline transfers from the first table slots.
    async fn send_baselines<D: NodeDriver + Send>(
        &mut self,
        driver: &mut D,
        count: usize,
        fees: &FeeSnapshot,
    ) {
        let mut sent = 0usize;
        for slot in 0..self.params.pool_size {
            if sent >= count {
                break;
            }
            let Some(address) = self.accounts.address(slot) else {
                warn!(target: "executor", slot, sent, "ran out of accounts for baseline fill");
                break;
            };
            let intent = TxIntent::dynamic_fee(
                slot,
                address,
                self.nonces.next(&address),
                fees.max_fee_per_gas,
                fees.max_priority_fee_per_gas,
                1,
            );
            match driver.send_transfer(&intent, self.recipient).await {
                Ok(_) => {
                    self.nonces.bump(address);
                    sent += 1;
                }
                Err(err) => {
                    warn!(target: "executor", %address, %err, "baseline send failed, skipping");
                }
            }
        }
    }

    /// Seeds `count` future holders, advancing the account cursor once per
    /// success.
    async fn send_futures<D: NodeDriver + Send>(
        &mut self,
        driver: &mut D,
        cursor: &mut FuzzCursor,
        count: usize,
        fees: &FeeSnapshot,
    ) {
        for _ in 0..count {
            let Some((index, address)) = account_at(&self.accounts, cursor.next_free_account)
            else {
                warn!(target: "executor", "no account available for future holder");
                return;
            };
            let intent = TxIntent::future(
                index,
                address,
                fees.max_fee_per_gas,
                fees.max_priority_fee_per_gas,
            );
            match driver.send_transfer(&intent, self.recipient).await {
                Ok(_) => cursor.next_free_account += 1,
                Err(err) => {
                    warn!(target: "executor", %address, %err, "future send failed, skipping");
                }
            }
        }
    }
}
