//! Error types for the fuzzing engine and its collaborators.

use thiserror::Error;

/// Errors surfaced by [`NodeDriver`](crate::traits::NodeDriver) implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriverError {
    /// The driver does not implement the requested capability.
    #[error("operation `{0}` is not supported by this driver")]
    Unsupported(&'static str),
    /// The node rejected or failed an RPC call.
    #[error("rpc error: {0}")]
    Rpc(String),
    /// An RPC call did not complete within the driver's timeout.
    #[error("rpc timeout after {0}")]
    Timeout(String),
    /// The node is unreachable.
    #[error("driver unavailable: {0}")]
    Unavailable(String),
}

/// A pool record field that could not be interpreted as a hex quantity.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed `{field}` field: {raw:?}")]
pub struct MalformedField {
    /// Name of the offending record field.
    pub field: &'static str,
    /// The raw string as returned by the node.
    pub raw: String,
}

impl MalformedField {
    /// Creates a new [`MalformedField`] error.
    pub fn new(field: &'static str, raw: impl Into<String>) -> Self {
        Self { field, raw: raw.into() }
    }
}

/// Errors produced by the state-recreation executor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutorError {
    /// State reset is unsupported and the best-effort pool clear failed,
    /// so the base state cannot be deterministically rebuilt.
    #[error("cannot recreate base pool state: {0}")]
    CannotRecreate(String),
    /// The final pool snapshot could not be read back.
    #[error("pool content unavailable after execution: {0}")]
    PoolRead(DriverError),
}

/// Errors raised while loading the account table.
#[derive(Debug, Error)]
pub enum AccountLoadError {
    /// A key file could not be opened.
    #[error("failed to open key file {path}: {source}")]
    Io {
        /// Path of the unreadable file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A key file could not be parsed as CSV.
    #[error("failed to parse key file {path}: {source}")]
    Csv {
        /// Path of the unparsable file.
        path: String,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },
    /// No usable accounts were found across all key files.
    #[error("no usable accounts loaded")]
    NoAccounts,
}

/// Configuration errors, fatal at startup.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// The pool size must be at least one slot.
    #[error("pool size must be non-zero")]
    ZeroPoolSize,
    /// The replacement threshold must exceed the normal price, otherwise
    /// every baseline transaction classifies as a replacement parent.
    #[error("replacement price threshold ({threshold}) must exceed the normal price ({normal})")]
    ThresholdBelowNormal {
        /// Configured replacement threshold.
        threshold: u128,
        /// Configured normal price indicator.
        normal: u128,
    },
    /// Epsilon must lie in `(0, 1]`.
    #[error("epsilon must be in (0, 1], got {0}")]
    EpsilonOutOfRange(f64),
}

/// Umbrella error for fatal engine-construction failures.
#[derive(Debug, Error)]
pub enum FuzzError {
    /// A driver capability failed fatally.
    #[error(transparent)]
    Driver(#[from] DriverError),
    /// The executor could not recreate a state.
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    /// The account table could not be loaded.
    #[error(transparent)]
    Accounts(#[from] AccountLoadError),
    /// The scenario configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
