//! Core value types: transaction intents, fuzzing inputs, and raw pool
//! snapshots.

mod intent;
mod input;
mod pool;

pub use intent::{
    normal_priced_value, TxClass, TxIntent, FUTURE_NONCE, FUTURE_VALUE, TRANSFER_GAS_LIMIT,
};
pub use input::Input;
pub use pool::{sorted_records, RawPool, SenderRecords, TxRecord};
