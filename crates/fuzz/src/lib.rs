#![doc = include_str!("../README.md")]
#![warn(missing_debug_implementations, missing_docs, rustdoc::all)]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

/// Re-export commonly used types and traits.
pub mod prelude {
    pub use crate::{
        config::{BlobParams, EngineSettings, PoolParams},
        detect::{Detection, ExploitDetector},
        engine::{ExploitRecord, FuzzEngine, FuzzReport},
        errors::{DriverError, FuzzError},
        mutate::Mutator,
        state::{abstract_pool, pool_energy, Fingerprint},
        traits::{FeeSnapshot, NodeDriver},
        types::{Input, RawPool, TxClass, TxIntent},
    };
}

pub mod accounts;
pub mod blob;
pub mod config;
pub mod detect;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod mutate;
pub mod seeds;
pub mod state;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
