//! Ethereum `LedgerSource` over any [`RpcTransport`].
//!
//! | Operation                  | JSON-RPC call                               |
//! |----------------------------|---------------------------------------------|
//! | `block_number`             | `eth_blockNumber`                           |
//! | `block_transaction_hashes` | `eth_getBlockByNumber(<hex height>, false)` |
//! | `block_transactions`       | `eth_getBlockByNumber(<hex height>, true)`  |
//! | `transaction_by_hash`      | `eth_getTransactionByHash(<hash>)`          |

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};

use chainwatch_core::{Address, LedgerSource, Transaction, WatchError};

use crate::error::TransportError;
use crate::transport::RpcTransport;

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_hex_u64(s: &str) -> Result<u64, TransportError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| TransportError::InvalidResponse(format!("quantity without 0x prefix: {s:?}")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| TransportError::InvalidResponse(format!("bad hex quantity {s:?}: {e}")))
}

/// Encode a height as a hex quantity (`100` → `"0x64"`).
pub fn to_hex_quantity(n: u64) -> String {
    format!("{n:#x}")
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RpcBlock<T> {
    transactions: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransaction {
    hash: String,
    from: String,
    to: Option<String>,
    value: String,
    nonce: String,
    block_number: Option<String>,
    transaction_index: Option<String>,
}

impl TryFrom<RpcTransaction> for Transaction {
    type Error = TransportError;

    fn try_from(raw: RpcTransaction) -> Result<Self, Self::Error> {
        let address = |s: &str| {
            Address::parse(s).map_err(|e| TransportError::InvalidResponse(e.to_string()))
        };
        let (Some(block), Some(index)) = (&raw.block_number, &raw.transaction_index) else {
            return Err(TransportError::InvalidResponse(format!(
                "transaction {} is not in a block",
                raw.hash
            )));
        };

        Ok(Transaction {
            from: address(&raw.from)?,
            to: raw.to.as_deref().map(address).transpose()?,
            nonce: parse_hex_u64(&raw.nonce)?,
            block_number: parse_hex_u64(block)?,
            transaction_index: parse_hex_u64(index)?,
            value: raw.value,
            hash: raw.hash,
        })
    }
}

// ─── EthLedgerSource ─────────────────────────────────────────────────────────

pub struct EthLedgerSource<T: RpcTransport> {
    transport: T,
    next_id: AtomicU64,
}

impl<T: RpcTransport> EthLedgerSource<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn block<B: serde::de::DeserializeOwned>(
        &self,
        number: u64,
        full: bool,
    ) -> Result<RpcBlock<B>, WatchError> {
        let block: Option<RpcBlock<B>> = self
            .transport
            .call(
                self.next_id(),
                "eth_getBlockByNumber",
                vec![json!(to_hex_quantity(number)), json!(full)],
            )
            .await?;
        block.ok_or(WatchError::BlockNotFound { block: number })
    }
}

#[async_trait]
impl<T: RpcTransport> LedgerSource for EthLedgerSource<T> {
    async fn block_number(&self) -> Result<u64, WatchError> {
        let hex: String = self
            .transport
            .call(self.next_id(), "eth_blockNumber", vec![])
            .await?;
        Ok(parse_hex_u64(&hex)?)
    }

    async fn block_transaction_hashes(&self, number: u64) -> Result<Vec<String>, WatchError> {
        Ok(self.block::<String>(number, false).await?.transactions)
    }

    async fn block_transactions(&self, number: u64) -> Result<Vec<Transaction>, WatchError> {
        let block = self.block::<RpcTransaction>(number, true).await?;
        let txs = block
            .transactions
            .into_iter()
            .map(Transaction::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(block = number, count = txs.len(), url = %self.transport.url(), "Fetched block");
        Ok(txs)
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<Transaction, WatchError> {
        let raw: Option<RpcTransaction> = self
            .transport
            .call(self.next_id(), "eth_getTransactionByHash", vec![json!(hash)])
            .await?;
        let raw = raw.ok_or_else(|| WatchError::TransactionNotFound { hash: hash.into() })?;
        Ok(Transaction::try_from(raw)?)
    }
}
