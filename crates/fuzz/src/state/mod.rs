//! Symbolic pool state: the fingerprint abstraction and the energy score that
//! together drive seed selection and coverage deduplication.

mod abstraction;
mod energy;

pub use abstraction::{abstract_pool, Fingerprint};
pub use energy::pool_energy;
