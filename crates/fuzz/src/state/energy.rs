//! The energy score of a pool snapshot. Lower is better: the seed database
//! dequeues low-energy states first, so states closer to an attack shape are
//! explored before well-filled baseline states.

use crate::{
    config::PoolParams,
    types::{sorted_records, RawPool},
};
use tracing::warn;

/// Blob fee caps outside this band are interesting and earn a boost.
const BLOB_FEE_SANE_MIN: u128 = 10;
const BLOB_FEE_SANE_MAX: u128 = 1_000;

/// Computes the energy of a raw pool snapshot.
///
/// Per pending sender: a valid-blob head scores `2·count` (plus 5 when the
/// blob fee leaves the sane band), a malformed-blob head `15·count`, a
/// normal-priced head `3·count`. Every other sender is an attack parent and
/// scores 1 per low-value record, plus an escalating `4 + i` bonus per attack
/// parent. The empty pool scores 0.
pub fn pool_energy(pool: &RawPool, params: &PoolParams) -> u64 {
    let mut energy = 0u64;
    let mut attack_parents = 0u64;

    for (sender, records) in &pool.pending {
        let chain = sorted_records(records);
        if chain.is_empty() {
            continue;
        }
        let count = chain.len() as u64;

        let (_, head) = chain[0];
        let head_class = head.tx_class().unwrap_or(0);

        if head_class == 3 {
            if head.has_blob_hashes() {
                energy += 2 * count;
                let blob_fee = head.blob_fee().unwrap_or_else(|err| {
                    warn!(target: "state", %sender, %err, "malformed blob fee, scoring as zero");
                    0
                });
                if !(BLOB_FEE_SANE_MIN..=BLOB_FEE_SANE_MAX).contains(&blob_fee) {
                    energy += 5;
                }
            } else {
                energy += 15 * count;
            }
            continue;
        }

        let head_price = match head.effective_price() {
            Ok(price) => price,
            Err(err) => {
                warn!(target: "state", %sender, %err, "malformed head price, scoring chain as attack parent");
                params.normal_price + 1
            }
        };

        if head_price == params.normal_price {
            energy += 3 * count;
            continue;
        }

        attack_parents += 1;
        for (nonce, record) in &chain {
            match record.value() {
                Ok(value) if value <= params.child_value_threshold => energy += 1,
                Ok(_) => {}
                Err(err) => {
                    warn!(target: "state", %sender, nonce, %err, "malformed value, scoring as high-value record");
                }
            }
        }
    }

    for i in 0..attack_parents {
        energy += 4 + i;
    }

    energy
}
