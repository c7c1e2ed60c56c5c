//! Per-node RPC method-name alias tables.

use std::{fmt, str::FromStr};

/// Supported node variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Foundry's Anvil development node.
    Anvil,
    /// go-ethereum.
    Geth,
    /// Paradigm's Reth.
    Reth,
}

impl NodeKind {
    /// The variant's method-name alias table.
    pub const fn aliases(self) -> RpcAliases {
        match self {
            Self::Anvil => RpcAliases {
                reset_state: Some("anvil_reset"),
                clear_pool: Some("anvil_reset"),
                set_balance: Some("anvil_setBalance"),
                snapshot: Some("evm_snapshot"),
                revert: Some("evm_revert"),
                blob_base_fee: "eth_blobBaseFee",
            },
            Self::Geth => RpcAliases {
                reset_state: Some("debug_resetChain"),
                clear_pool: None,
                set_balance: None,
                snapshot: None,
                revert: None,
                blob_base_fee: "eth_blobBaseFee",
            },
            Self::Reth => RpcAliases {
                reset_state: None,
                clear_pool: None,
                set_balance: None,
                snapshot: None,
                revert: None,
                blob_base_fee: "eth_blobBaseFee",
            },
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anvil => f.write_str("anvil"),
            Self::Geth => f.write_str("geth"),
            Self::Reth => f.write_str("reth"),
        }
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "anvil" => Ok(Self::Anvil),
            "geth" => Ok(Self::Geth),
            "reth" => Ok(Self::Reth),
            other => Err(format!("unknown node kind: {other}")),
        }
    }
}

/// Method names a node variant answers for the fuzzer's generic operations.
/// `None` means the capability is unavailable on that variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpcAliases {
    /// Full state reset to genesis.
    pub reset_state: Option<&'static str>,
    /// Best-effort pool clear.
    pub clear_pool: Option<&'static str>,
    /// Per-address balance override.
    pub set_balance: Option<&'static str>,
    /// Chain-state snapshot.
    pub snapshot: Option<&'static str>,
    /// Revert to a snapshot.
    pub revert: Option<&'static str>,
    /// Blob base fee lookup.
    pub blob_base_fee: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anvil_supports_the_full_set() {
        let aliases = NodeKind::Anvil.aliases();
        assert_eq!(aliases.reset_state, Some("anvil_reset"));
        assert_eq!(aliases.set_balance, Some("anvil_setBalance"));
        assert_eq!(aliases.snapshot, Some("evm_snapshot"));
        assert_eq!(aliases.revert, Some("evm_revert"));
    }

    #[test]
    fn geth_and_reth_lack_balance_overrides() {
        assert_eq!(NodeKind::Geth.aliases().set_balance, None);
        assert_eq!(NodeKind::Reth.aliases().reset_state, None);
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Anvil".parse::<NodeKind>(), Ok(NodeKind::Anvil));
        assert_eq!("GETH".parse::<NodeKind>(), Ok(NodeKind::Geth));
        assert_eq!("reth".parse::<NodeKind>(), Ok(NodeKind::Reth));
        assert!("besu".parse::<NodeKind>().is_err());
    }
}
