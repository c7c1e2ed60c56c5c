//! The seed database: an energy-ordered frontier of explored pool states,
//! deduplicated by symbolic fingerprint.

use crate::{
    state::Fingerprint,
    types::{Input, RawPool},
};
use serde::{Deserialize, Serialize};
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, trace};

/// One entry of the search frontier: an input, the pool it produced, and the
/// scheduling metadata derived from it.
///
/// The initial seed carries `pool = None` — an *unobserved* state, distinct
/// from an observed empty pool. The executor selects its cold path on `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seed {
    /// The input whose execution produced `pool`.
    pub input: Input,
    /// Raw pool snapshot observed after executing `input`.
    pub pool: Option<RawPool>,
    /// Symbolic fingerprint of `pool`.
    pub fingerprint: Fingerprint,
    /// Priority score; lower is dequeued first.
    pub energy: u64,
    /// Number of times this seed has been dequeued for mutation.
    pub generation: u32,
}

impl Seed {
    /// Creates a fresh, never-scheduled seed.
    pub const fn new(
        input: Input,
        pool: Option<RawPool>,
        fingerprint: Fingerprint,
        energy: u64,
    ) -> Self {
        Self { input, pool, fingerprint, energy, generation: 0 }
    }

    /// The sentinel seed the database is initialized with.
    pub fn initial() -> Self {
        Self::new(Input::empty(), None, Fingerprint::initial(), 0)
    }
}

/// Heap entry; ordered so the binary max-heap pops the minimum
/// `(energy, generation, seq)` first. `seq` is the admission order and makes
/// the order strictly total, which the engine relies on for determinism.
#[derive(Debug, Clone)]
struct QueueEntry {
    seed: Seed,
    seq: u64,
}

impl QueueEntry {
    fn key(&self) -> (u64, u32, u64) {
        (self.seed.energy, self.seed.generation, self.seq)
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reversed: the max-heap surfaces the smallest key.
        other.key().cmp(&self.key())
    }
}

/// Priority queue of seeds plus the set of fingerprints already covered.
///
/// Seeds are owned by the database and never leave it: `pop_best` returns a
/// working copy and re-files the stored seed with a bumped generation.
#[derive(Debug, Default)]
pub struct SeedDatabase {
    queue: BinaryHeap<QueueEntry>,
    covered: HashSet<Fingerprint>,
    next_seq: u64,
}

impl SeedDatabase {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits the sentinel initial seed. Its energy of zero guarantees it is
    /// dequeued first.
    pub fn initialize(&mut self) {
        self.admit(Seed::initial());
    }

    /// Admits a seed unless its fingerprint is already covered.
    /// Returns whether the seed was inserted.
    pub fn admit(&mut self, seed: Seed) -> bool {
        if !self.covered.insert(seed.fingerprint.clone()) {
            trace!(target: "seeds", fingerprint = %seed.fingerprint, "state already covered, dropping seed");
            return false;
        }
        debug!(
            target: "seeds",
            fingerprint = %seed.fingerprint,
            energy = seed.energy,
            "admitted new seed"
        );
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(QueueEntry { seed, seq });
        true
    }

    /// Returns a copy of the best seed — minimum `(energy, generation)` —
    /// after bumping its stored generation. `None` iff the database is empty.
    pub fn pop_best(&mut self) -> Option<Seed> {
        let mut entry = self.queue.pop()?;
        entry.seed.generation += 1;
        let seed = entry.seed.clone();
        self.queue.push(entry);
        Some(seed)
    }

    /// Whether a fingerprint has already been covered.
    pub fn covers(&self, fingerprint: &Fingerprint) -> bool {
        self.covered.contains(fingerprint)
    }

    /// Number of seeds currently held.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the database holds no seeds.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(fingerprint: &str, energy: u64) -> Seed {
        Seed::new(Input::empty(), None, Fingerprint::new(fingerprint), energy)
    }

    #[test]
    fn initial_seed_pops_first() {
        let mut db = SeedDatabase::new();
        db.initialize();
        db.admit(seed("NNNN", 12));
        let first = db.pop_best().unwrap();
        assert!(first.fingerprint.is_initial());
        assert_eq!(first.energy, 0);
        assert_eq!(first.generation, 1);
    }

    #[test]
    fn covered_fingerprints_are_dropped() {
        let mut db = SeedDatabase::new();
        assert!(db.admit(seed("NNNR", 14)));
        assert!(!db.admit(seed("NNNR", 2)));
        assert_eq!(db.len(), 1);
        assert!(db.covers(&Fingerprint::new("NNNR")));
    }

    #[test]
    fn pop_order_is_monotone_in_energy_then_generation() {
        let mut db = SeedDatabase::new();
        db.admit(seed("A", 5));
        db.admit(seed("B", 3));
        db.admit(seed("C", 3));

        let mut keys = Vec::new();
        for _ in 0..6 {
            let seed = db.pop_best().unwrap();
            keys.push((seed.energy, seed.generation));
        }
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);

        // Lowest energy goes first, admission order breaks the 3/3 tie.
        assert_eq!(keys[0], (3, 1));
        assert_eq!(keys[1], (3, 1));
        assert_eq!(keys[2], (3, 2));
    }

    #[test]
    fn seeds_are_retained_across_pops() {
        let mut db = SeedDatabase::new();
        db.admit(seed("A", 1));
        for _ in 0..10 {
            assert!(db.pop_best().is_some());
        }
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn pop_on_empty_is_none() {
        assert!(SeedDatabase::new().pop_best().is_none());
    }
}
