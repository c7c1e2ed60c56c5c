//! The fuzzing engine: pick a seed, mutate it, recreate its state and apply
//! each child, abstract the outcome, run the detectors, and admit novel
//! states — until the iteration or wall-clock budget runs out.

use crate::{
    accounts::AccountTable,
    config::{EngineSettings, PoolParams},
    detect::ExploitDetector,
    errors::{AccountLoadError, FuzzError},
    executor::{FuzzCursor, RecreationSettings, StateRecreator},
    mutate::{MutationContext, Mutator},
    seeds::{Seed, SeedDatabase},
    state::{abstract_pool, pool_energy, Fingerprint},
    traits::{FeeSnapshot, NodeDriver},
    types::{Input, RawPool},
};
use alloy_primitives::Address;
use serde::Serialize;
use std::{collections::HashMap, sync::Arc, time::Instant};
use tracing::{debug, info, warn};

/// One recorded detector firing.
#[derive(Debug, Clone, Serialize)]
pub struct ExploitRecord {
    /// Names of the detectors that fired.
    pub fired: Vec<String>,
    /// Prefix-closed `P/R/C/O` symbolization of the producing input.
    pub input_symbol: String,
    /// Human-readable per-intent description of the producing input.
    pub input_concrete: Vec<String>,
    /// Fingerprint of the end state.
    pub end_state: Fingerprint,
    /// Energy of the end state.
    pub energy: u64,
    /// Raw pool snapshot at detection time.
    pub raw_pool: RawPool,
    /// Generation of the seed that produced the input.
    pub seed_generation: u32,
    /// Seconds into the campaign at detection time.
    pub elapsed_secs: f64,
}

/// Summary of a finished campaign. The engine always returns a report; no
/// error crosses the engine boundary once the loop has started.
#[derive(Debug, Serialize)]
pub struct FuzzReport {
    /// Every detector firing, in discovery order.
    pub exploits: Vec<ExploitRecord>,
    /// Seed-scheduling iterations run.
    pub iterations: u64,
    /// Unique symbolic states discovered (seed-database size).
    pub unique_states: usize,
    /// Campaign duration in seconds.
    pub elapsed_secs: f64,
}

/// The outer fuzzing loop over a [`NodeDriver`].
#[derive(Debug)]
pub struct FuzzEngine<D> {
    driver: D,
    mutator: Mutator,
    detector: ExploitDetector,
    params: PoolParams,
    settings: EngineSettings,
    executor: StateRecreator,
    seeds: SeedDatabase,
    cursor: FuzzCursor,
    recipient: Address,
}

impl<D: NodeDriver + Send> FuzzEngine<D> {
    /// Assembles an engine. Fails if no recipient can be derived from the
    /// account table.
    pub fn new(
        driver: D,
        accounts: Arc<AccountTable>,
        mutator: Mutator,
        detector: ExploitDetector,
        params: PoolParams,
        settings: EngineSettings,
    ) -> Result<Self, FuzzError> {
        params.validate()?;
        let recipient = settings
            .recipient
            .or_else(|| accounts.address(0))
            .ok_or(AccountLoadError::NoAccounts)?;
        let executor = StateRecreator::new(
            accounts,
            params,
            RecreationSettings {
                initial_normal_tx_count: settings.initial_normal_tx_count,
                future_slots: settings.future_slots,
                future_flag: settings.future_flag,
                use_snapshots: settings.use_snapshots,
            },
            recipient,
        );
        Ok(Self {
            driver,
            mutator,
            detector,
            params,
            settings,
            executor,
            seeds: SeedDatabase::new(),
            cursor: FuzzCursor::default(),
            recipient,
        })
    }

    /// Runs the campaign to completion and returns the exploit log.
    pub async fn run(&mut self) -> FuzzReport {
        let start = Instant::now();
        let mut exploits: Vec<ExploitRecord> = Vec::new();
        let mut iterations = 0u64;

        self.seeds.initialize();
        info!(target: "engine", "starting fuzzing campaign");

        while !self.seeds.is_empty()
            && iterations < self.settings.max_iterations
            && start.elapsed() < self.settings.global_timeout
        {
            let Some(seed) = self.seeds.pop_best() else { break };
            iterations += 1;
            debug!(
                target: "engine",
                iteration = iterations,
                seeds = self.seeds.len(),
                fingerprint = %seed.fingerprint,
                energy = seed.energy,
                generation = seed.generation,
                "scheduling seed"
            );

            let fees = match self.driver.fee_snapshot().await {
                Ok(fees) => fees,
                Err(err) => {
                    warn!(target: "engine", %err, "fee snapshot unavailable, using flat normal-price fees");
                    FeeSnapshot::flat(self.params.normal_price)
                }
            };
            let children = self.mutator.mutate(
                &seed.input,
                &MutationContext {
                    pool: seed.pool.as_ref(),
                    fees: &fees,
                    next_free_account: self.cursor.next_free_account,
                },
            );

            for child in children {
                let pool = match self
                    .executor
                    .run(&mut self.driver, &mut self.cursor, &child, seed.pool.as_ref(), &seed.input)
                    .await
                {
                    Ok(pool) => pool,
                    Err(err) => {
                        warn!(target: "engine", %err, "discarding child input");
                        continue;
                    }
                };

                // The child may have introduced senders from fresh slots;
                // advance the cursor past the highest one it used.
                if let Some(last) = child.sequence.last() {
                    if last.account_index >= self.cursor.next_free_account {
                        self.cursor.next_free_account = last.account_index + 1;
                    }
                }

                let fingerprint = abstract_pool(&pool, &self.params);
                let energy = pool_energy(&pool, &self.params);

                if let Some(detection) = self.detector.fires(&pool) {
                    info!(
                        target: "engine",
                        fired = ?detection.fired,
                        fingerprint = %fingerprint,
                        "exploit condition fired"
                    );
                    exploits.push(ExploitRecord {
                        fired: detection.fired.iter().map(ToString::to_string).collect(),
                        input_symbol: symbolize_input(&child, &self.params),
                        input_concrete: concrete_input(&child, self.recipient),
                        end_state: fingerprint.clone(),
                        energy,
                        raw_pool: pool.clone(),
                        seed_generation: seed.generation,
                        elapsed_secs: start.elapsed().as_secs_f64(),
                    });
                }

                self.seeds.admit(Seed::new(child, Some(pool), fingerprint, energy));
            }
        }

        let report = FuzzReport {
            exploits,
            iterations,
            unique_states: self.seeds.len(),
            elapsed_secs: start.elapsed().as_secs_f64(),
        };
        info!(
            target: "engine",
            iterations = report.iterations,
            unique_states = report.unique_states,
            exploits = report.exploits.len(),
            elapsed_secs = report.elapsed_secs,
            "fuzzing campaign finished"
        );
        report
    }
}

/// Symbolizes an input as a prefix-closed sequence over `{P, R, C, O}`.
///
/// Nonce-0 intents open a chain (`P` below the replacement threshold, `R` at
/// or above it); an intent extends a chain only when its nonce directly
/// follows the sender's previous one (`C` at or below the value threshold,
/// `O` above). Anything else — gapped nonces, futures — is not symbolized.
pub fn symbolize_input(input: &Input, params: &PoolParams) -> String {
    let mut symbols = String::new();
    let mut last_nonce: HashMap<Address, u64> = HashMap::new();

    for intent in &input.sequence {
        if intent.nonce == 0 {
            symbols.push(if intent.price < params.replacement_price_threshold { 'P' } else { 'R' });
            last_nonce.insert(intent.sender, 0);
        } else if let Some(previous) = last_nonce.get(&intent.sender).copied() {
            if intent.nonce == previous + 1 {
                symbols
                    .push(if intent.value <= params.child_value_threshold { 'C' } else { 'O' });
                last_nonce.insert(intent.sender, intent.nonce);
            }
        }
    }
    symbols
}

/// Concrete per-intent rendering of an input for exploit reports.
pub fn concrete_input(input: &Input, recipient: Address) -> Vec<String> {
    input
        .sequence
        .iter()
        .map(|intent| {
            format!(
                "from: {}, to: {}, nonce: {}, price: {}, value: {}",
                intent.sender, recipient, intent.nonce, intent.price, intent.value
            )
        })
        .collect()
}
