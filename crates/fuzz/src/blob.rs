//! Dummy blob payloads and their versioned hashes.
//!
//! Pool validators check the shape of a blob transaction — hash count and the
//! version byte — not the payload itself, so small random buffers hashed with
//! a sha-256 commitment stand-in are sufficient to exercise blob handling.

use alloy_primitives::B256;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Version byte of an EIP-4844 versioned hash.
pub const VERSIONED_HASH_VERSION: u8 = 0x01;

/// Size of a dummy blob buffer.
pub const DUMMY_BLOB_SIZE: usize = 4_096;

/// Generates `count` random dummy blob buffers.
pub fn dummy_blobs<R: Rng>(rng: &mut R, count: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|_| {
            let mut blob = vec![0u8; DUMMY_BLOB_SIZE];
            rng.fill(blob.as_mut_slice());
            blob
        })
        .collect()
}

/// Computes the versioned hash of a blob buffer:
/// the version byte followed by the tail of the buffer's sha-256 digest.
pub fn versioned_hash(blob: &[u8]) -> B256 {
    let digest = Sha256::digest(blob);
    let mut hash = B256::from_slice(&digest);
    hash.0[0] = VERSIONED_HASH_VERSION;
    hash
}

/// Versioned hashes for a list of blob buffers.
pub fn versioned_hashes(blobs: &[Vec<u8>]) -> Vec<B256> {
    blobs.iter().map(|blob| versioned_hash(blob)).collect()
}
