use crate::aggregate::types::{NetworkSnapshot, TransactionRecord, WalletProfile};
use crate::errors::FetchError;
use crate::registry::{ChainDescriptor, ChainFamily, ChainId};
use crate::sources::explorers::ChainAdapter;
use crate::sources::http::HttpClient;
use async_trait::async_trait;
use futures::future;
use serde::Deserialize;
use std::collections::HashMap;

const SOURCE: &str = "evm-explorer";

/// Adapter for the Etherscan-style explorer API family.
///
/// All chains in the family share one wire protocol (`module`/`action`
/// query calls) and one API key; only the base URL differs per chain, so
/// the adapter holds a chain id -> base URL map.
#[derive(Clone, Debug)]
pub struct EvmExplorerAdapter {
    http: HttpClient,
    bases: HashMap<String, String>,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EvmBlock {
    timestamp: String,
    #[serde(default)]
    transactions: Vec<EvmBlockTx>,
}

#[derive(Debug, Deserialize)]
struct EvmBlockTx {
    hash: String,
    from: String,
    #[serde(default)]
    to: Option<String>,
    value: String,
}

#[derive(Debug, Deserialize)]
struct AccountTx {
    hash: String,
    from: String,
    #[serde(default)]
    to: String,
    value: String,
    #[serde(rename = "timeStamp")]
    time_stamp: String,
}

impl EvmExplorerAdapter {
    pub fn new(
        http: HttpClient,
        bases: HashMap<String, String>,
        api_key: Option<String>,
    ) -> Self {
        Self { http, bases, api_key }
    }

    fn base_for(&self, chain: &ChainId) -> Result<&str, FetchError> {
        self.bases
            .get(chain.as_str())
            .map(String::as_str)
            .ok_or(FetchError::config(SOURCE, "explorer api base url"))
    }

    fn api_key(&self) -> Result<&str, FetchError> {
        self.api_key
            .as_deref()
            .ok_or(FetchError::config(SOURCE, "explorer api key"))
    }

    async fn call(
        &self,
        base: &str,
        module: &str,
        action: &str,
        extra: &[(&str, String)],
    ) -> Result<serde_json::Value, FetchError> {
        let key = self.api_key()?;
        let mut query: Vec<(&str, String)> = vec![
            ("module", module.to_owned()),
            ("action", action.to_owned()),
            ("apikey", key.to_owned()),
        ];
        query.extend_from_slice(extra);
        self.http.get_json(SOURCE, base, &query).await
    }

    /// Proxy-module call (`eth_*` passthrough), unwrapped to its `result`.
    async fn proxy(
        &self,
        base: &str,
        action: &str,
        extra: &[(&str, String)],
    ) -> Result<serde_json::Value, FetchError> {
        let envelope = self.call(base, "proxy", action, extra).await?;
        take_result(envelope)
    }
}

#[async_trait]
impl ChainAdapter for EvmExplorerAdapter {
    fn family(&self) -> ChainFamily {
        ChainFamily::Evm
    }

    async fn chain_stats(&self, chain: &ChainDescriptor) -> Result<NetworkSnapshot, FetchError> {
        let base = self.base_for(&chain.id)?;
        let tag = self.proxy(base, "eth_blockNumber", &[]).await?;
        let tag = as_hex_str(&tag)?.to_owned();
        let latest_block = hex_to_u64(&tag)?;

        let (gas, block) = future::join(
            self.proxy(base, "eth_gasPrice", &[]),
            self.proxy(
                base,
                "eth_getBlockByNumber",
                &[("tag", tag.clone()), ("boolean", "true".to_owned())],
            ),
        )
        .await;

        let gas_wei = hex_to_u64(as_hex_str(&gas?)?)?;
        let block: EvmBlock = serde_json::from_value(block?)
            .map_err(|e| FetchError::parse(SOURCE, format!("bad block payload: {e}")))?;

        Ok(NetworkSnapshot {
            latest_block,
            gas_price_display: format_gwei(gas_wei),
            approx_tx_count: block.transactions.len() as u64,
            tps: None,
        })
    }

    async fn latest_transactions(
        &self,
        chain: &ChainDescriptor,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, FetchError> {
        let base = self.base_for(&chain.id)?;
        let tag = self.proxy(base, "eth_blockNumber", &[]).await?;
        let tag = as_hex_str(&tag)?.to_owned();
        let block = self
            .proxy(
                base,
                "eth_getBlockByNumber",
                &[("tag", tag), ("boolean", "true".to_owned())],
            )
            .await?;
        let block: EvmBlock = serde_json::from_value(block)
            .map_err(|e| FetchError::parse(SOURCE, format!("bad block payload: {e}")))?;
        let timestamp = hex_to_u64(&block.timestamp)?;

        // The block lists transactions in execution order; take the tail and
        // flip it so the newest-executed comes first.
        let start = block.transactions.len().saturating_sub(limit);
        Ok(block.transactions[start..]
            .iter()
            .rev()
            .map(|tx| TransactionRecord::Evm {
                hash: tx.hash.clone(),
                from: tx.from.clone(),
                to: tx.to.clone().filter(|to| !to.is_empty()),
                value: tx.value.clone(),
                timestamp,
            })
            .collect())
    }

    async fn wallet_info(
        &self,
        chain: &ChainDescriptor,
        address: &str,
    ) -> Result<WalletProfile, FetchError> {
        let base = self.base_for(&chain.id)?;
        let (balance, txlist) = future::join(
            self.call(
                base,
                "account",
                "balance",
                &[("address", address.to_owned()), ("tag", "latest".to_owned())],
            ),
            self.call(
                base,
                "account",
                "txlist",
                &[
                    ("address", address.to_owned()),
                    ("startblock", "0".to_owned()),
                    ("endblock", "99999999".to_owned()),
                    ("page", "1".to_owned()),
                    ("offset", "10".to_owned()),
                    ("sort", "desc".to_owned()),
                ],
            ),
        )
        .await;

        let balance = take_result(balance?)?;
        let balance = balance
            .as_str()
            .ok_or_else(|| FetchError::parse(SOURCE, "balance is not a string"))?
            .to_owned();

        // An account with no history answers status "0" with a message
        // instead of an empty array; treat anything non-array as empty.
        let txs: Vec<AccountTx> = match txlist?.get("result") {
            Some(serde_json::Value::Array(rows)) => {
                serde_json::from_value(serde_json::Value::Array(rows.clone()))
                    .map_err(|e| FetchError::parse(SOURCE, format!("bad txlist payload: {e}")))?
            }
            _ => Vec::new(),
        };

        let recent_transactions = txs
            .into_iter()
            .take(10)
            .map(|tx| {
                let timestamp = tx.time_stamp.parse::<u64>().unwrap_or_default();
                TransactionRecord::Evm {
                    hash: tx.hash,
                    from: tx.from,
                    to: (!tx.to.is_empty()).then_some(tx.to),
                    value: tx.value,
                    timestamp,
                }
            })
            .collect::<Vec<_>>();

        Ok(WalletProfile {
            balance,
            transaction_count: recent_transactions.len() as u64,
            recent_transactions,
        })
    }
}

/// Unwrap an Etherscan envelope to its `result`, surfacing the rate-limit
/// and bad-key answers the API hides behind status "0".
fn take_result(envelope: serde_json::Value) -> Result<serde_json::Value, FetchError> {
    if envelope.get("status").and_then(|s| s.as_str()) == Some("0") {
        let detail = envelope
            .get("result")
            .and_then(|r| r.as_str())
            .or_else(|| envelope.get("message").and_then(|m| m.as_str()))
            .unwrap_or("status 0")
            .to_owned();
        return Err(FetchError::upstream(SOURCE, None, detail));
    }
    match envelope.get("result") {
        Some(result) if !result.is_null() => Ok(result.clone()),
        _ => Err(FetchError::parse(SOURCE, "missing result field")),
    }
}

fn as_hex_str(value: &serde_json::Value) -> Result<&str, FetchError> {
    value
        .as_str()
        .ok_or_else(|| FetchError::parse(SOURCE, format!("expected hex string, got {value}")))
}

fn hex_to_u64(value: &str) -> Result<u64, FetchError> {
    u64::from_str_radix(value.trim_start_matches("0x"), 16)
        .map_err(|e| FetchError::parse(SOURCE, format!("bad hex quantity {value:?}: {e}")))
}

/// Wei -> human gas label. Whole numbers above one Gwei, two decimals
/// below it so L2 sub-Gwei prices stay visible.
fn format_gwei(wei: u64) -> String {
    let gwei = wei as f64 / 1e9;
    if gwei >= 1.0 {
        format!("{gwei:.0} Gwei")
    } else {
        format!("{gwei:.2} Gwei")
    }
}
