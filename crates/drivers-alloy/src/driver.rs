//! [`NodeDriver`] over an alloy HTTP provider.

use crate::{aliases::RpcAliases, tx::encode_signed_transfer, NodeKind};
use alloy_primitives::{Address, B256, U256};
use alloy_provider::{Provider, ReqwestProvider};
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::TransportResult;
use async_trait::async_trait;
use serde_json::Value;
use std::{collections::HashMap, future::Future, time::Duration};
use tracing::{debug, info, warn};
use txfuzz::{
    accounts::AccountTable,
    errors::DriverError,
    traits::{FeeSnapshot, NodeDriver},
    types::{RawPool, SenderRecords, TxIntent, TxRecord},
};

/// Priority-fee fallback when the node does not answer
/// `eth_maxPriorityFeePerGas`, and the blob-fee fallback: one gwei.
const GWEI: u128 = 1_000_000_000;

/// A [`NodeDriver`] speaking JSON-RPC over HTTP through an alloy provider.
/// One struct serves every [`NodeKind`]; only the alias table differs.
#[derive(Debug)]
pub struct AlloyNodeDriver {
    provider: ReqwestProvider,
    kind: NodeKind,
    aliases: RpcAliases,
    signers: HashMap<Address, PrivateKeySigner>,
    chain_id: u64,
    rpc_timeout: Duration,
}

impl AlloyNodeDriver {
    /// Connects to `url`, verifies the node is reachable, and prepares a
    /// signer per loaded account. `chain_id` overrides the node's reported id
    /// when given.
    pub async fn connect(
        url: &str,
        kind: NodeKind,
        accounts: &AccountTable,
        chain_id: Option<u64>,
        rpc_timeout: Duration,
    ) -> Result<Self, DriverError> {
        let url: reqwest::Url = url
            .parse()
            .map_err(|err| DriverError::Unavailable(format!("invalid rpc url: {err}")))?;
        let provider = ReqwestProvider::new_http(url);

        let mut signers = HashMap::new();
        for account in accounts.accounts() {
            match PrivateKeySigner::from_bytes(&account.secret) {
                Ok(signer) => {
                    signers.insert(account.address, signer);
                }
                Err(err) => {
                    warn!(target: "driver", address = %account.address, %err, "account key is not a valid secp256k1 secret, skipping");
                }
            }
        }

        let reported = tokio::time::timeout(rpc_timeout, provider.get_chain_id())
            .await
            .map_err(|_| DriverError::Unavailable("node did not answer eth_chainId".to_string()))?
            .map_err(|err| DriverError::Unavailable(err.to_string()))?;
        let chain_id = chain_id.unwrap_or(reported);
        info!(target: "driver", %kind, chain_id, "connected to node");

        Ok(Self { provider, kind, aliases: kind.aliases(), signers, chain_id, rpc_timeout })
    }

    /// The node variant this driver talks to.
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Applies the driver timeout and maps transport failures.
    async fn guarded<T>(
        &self,
        fut: impl Future<Output = TransportResult<T>> + Send,
    ) -> Result<T, DriverError> {
        match tokio::time::timeout(self.rpc_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(DriverError::Rpc(err.to_string())),
            Err(_) => Err(DriverError::Timeout(format!("{:?}", self.rpc_timeout))),
        }
    }

    /// Best-effort pool view from `eth_getBlockByNumber("pending", true)` for
    /// nodes without the txpool namespace. Queued transactions are invisible
    /// to this fallback.
    async fn pending_block_fallback(&self) -> Result<RawPool, DriverError> {
        let block: Value = self
            .guarded(
                self.provider
                    .raw_request("eth_getBlockByNumber".into(), ("pending".to_string(), true)),
            )
            .await?;

        let mut pending: std::collections::BTreeMap<Address, SenderRecords> =
            std::collections::BTreeMap::new();
        let transactions = block
            .get("transactions")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for tx in transactions {
            let Some(sender) = tx.get("from").and_then(Value::as_str) else { continue };
            let Ok(sender) = sender.parse::<Address>() else {
                warn!(target: "driver", "unparsable sender in pending block, skipping transaction");
                continue;
            };
            let Some(nonce) = tx.get("nonce").and_then(Value::as_str).and_then(parse_hex_u64)
            else {
                warn!(target: "driver", %sender, "unparsable nonce in pending block, skipping transaction");
                continue;
            };
            pending
                .entry(sender)
                .or_default()
                .insert(nonce.to_string(), record_from_json(&tx));
        }
        Ok(RawPool { pending, queued: Default::default() })
    }
}

fn parse_hex_u64(raw: &str) -> Option<u64> {
    u64::from_str_radix(raw.strip_prefix("0x")?, 16).ok()
}

fn json_string(tx: &Value, field: &str) -> Option<String> {
    tx.get(field).and_then(Value::as_str).map(str::to_string)
}

fn record_from_json(tx: &Value) -> TxRecord {
    TxRecord {
        gas_price: json_string(tx, "gasPrice"),
        max_fee_per_gas: json_string(tx, "maxFeePerGas"),
        max_priority_fee_per_gas: json_string(tx, "maxPriorityFeePerGas"),
        max_fee_per_blob_gas: json_string(tx, "maxFeePerBlobGas"),
        value: json_string(tx, "value"),
        tx_type: json_string(tx, "type"),
        blob_versioned_hashes: tx.get("blobVersionedHashes").and_then(Value::as_array).map(
            |hashes| {
                hashes.iter().filter_map(Value::as_str).map(str::to_string).collect::<Vec<_>>()
            },
        ),
    }
}

#[async_trait]
impl NodeDriver for AlloyNodeDriver {
    async fn reset_state(&mut self) -> Result<(), DriverError> {
        let Some(method) = self.aliases.reset_state else {
            return Err(DriverError::Unsupported("reset_state"));
        };
        let _: Value = self.guarded(self.provider.raw_request(method.into(), ())).await?;
        debug!(target: "driver", method, "node state reset");
        Ok(())
    }

    async fn clear_pool(&mut self) -> Result<(), DriverError> {
        let Some(method) = self.aliases.clear_pool else {
            return Err(DriverError::Unsupported("clear_pool"));
        };
        let _: Value = self.guarded(self.provider.raw_request(method.into(), ())).await?;
        debug!(target: "driver", method, "pool cleared");
        Ok(())
    }

    async fn fee_snapshot(&mut self) -> Result<FeeSnapshot, DriverError> {
        let gas_price = self.guarded(self.provider.get_gas_price()).await?;

        let max_priority_fee_per_gas =
            match self.guarded(self.provider.get_max_priority_fee_per_gas()).await {
                Ok(fee) => fee,
                Err(err) => {
                    debug!(target: "driver", %err, "eth_maxPriorityFeePerGas unavailable, assuming one gwei");
                    GWEI
                }
            };

        // Derive the fee cap from the latest base fee plus the tip; fall back
        // to the legacy gas price on pre-1559 nodes.
        let latest: Value = self
            .guarded(
                self.provider
                    .raw_request("eth_getBlockByNumber".into(), ("latest".to_string(), false)),
            )
            .await?;
        let max_fee_per_gas = latest
            .get("baseFeePerGas")
            .and_then(Value::as_str)
            .and_then(|raw| u128::from_str_radix(raw.strip_prefix("0x")?, 16).ok())
            .map_or(gas_price, |base_fee| base_fee + max_priority_fee_per_gas);

        let max_fee_per_blob_gas = match self
            .guarded(self.provider.raw_request::<_, Value>(self.aliases.blob_base_fee.into(), ()))
            .await
        {
            Ok(raw) => raw
                .as_str()
                .and_then(|raw| u128::from_str_radix(raw.strip_prefix("0x")?, 16).ok())
                .unwrap_or(GWEI),
            Err(err) => {
                debug!(target: "driver", %err, "blob base fee unavailable, assuming one gwei");
                GWEI
            }
        };

        Ok(FeeSnapshot { gas_price, max_fee_per_gas, max_priority_fee_per_gas, max_fee_per_blob_gas })
    }

    async fn send_transfer(
        &mut self,
        intent: &TxIntent,
        recipient: Address,
    ) -> Result<B256, DriverError> {
        let Some(signer) = self.signers.get(&intent.sender) else {
            return Err(DriverError::Rpc(format!("no signer loaded for sender {}", intent.sender)));
        };
        let encoded = encode_signed_transfer(signer, intent, recipient, self.chain_id)?;

        let pending = self.guarded(self.provider.send_raw_transaction(&encoded)).await?;
        let hash = *pending.tx_hash();
        debug!(
            target: "driver",
            sender = %intent.sender,
            nonce = intent.nonce,
            %hash,
            "transfer submitted"
        );
        Ok(hash)
    }

    async fn pool_content(&mut self) -> Result<RawPool, DriverError> {
        match self.guarded(self.provider.raw_request("txpool_content".into(), ())).await {
            Ok(pool) => Ok(pool),
            Err(err) => {
                debug!(target: "driver", %err, "txpool_content unavailable, using pending-block fallback");
                self.pending_block_fallback().await
            }
        }
    }

    async fn fund_accounts(
        &mut self,
        addresses: &[Address],
        balance: U256,
    ) -> Result<(), DriverError> {
        let Some(method) = self.aliases.set_balance else {
            return Err(DriverError::Unsupported("fund_accounts"));
        };
        for address in addresses {
            let _: Value = self
                .guarded(
                    self.provider
                        .raw_request(method.into(), (*address, format!("{balance:#x}"))),
                )
                .await?;
        }
        debug!(target: "driver", count = addresses.len(), "accounts funded");
        Ok(())
    }

    async fn snapshot(&mut self) -> Result<String, DriverError> {
        let Some(method) = self.aliases.snapshot else {
            return Err(DriverError::Unsupported("snapshot"));
        };
        let id: Value = self.guarded(self.provider.raw_request(method.into(), ())).await?;
        Ok(id.as_str().map_or_else(|| id.to_string(), str::to_string))
    }

    async fn revert(&mut self, snapshot_id: &str) -> Result<bool, DriverError> {
        let Some(method) = self.aliases.revert else {
            return Err(DriverError::Unsupported("revert"));
        };
        self.guarded(
            self.provider.raw_request(method.into(), (snapshot_id.to_string(),)),
        )
        .await
    }

    async fn custom_rpc(
        &mut self,
        method: &str,
        params: Value,
    ) -> Result<Value, DriverError> {
        self.guarded(self.provider.raw_request(method.to_string().into(), params)).await
    }
}
