use crate::aggregate::types::{NetworkSnapshot, TransactionRecord};
use crate::errors::FetchError;
use crate::registry::{ChainDescriptor, ChainFamily};
use crate::sources::explorers::ChainAdapter;
use crate::sources::http::HttpClient;
use async_trait::async_trait;
use serde::Deserialize;

const SOURCE: &str = "aptos-fullnode";

/// Aptos fullnode REST adapter. Numeric fields arrive as decimal strings
/// and block timestamps are in microseconds.
#[derive(Clone, Debug)]
pub struct AptosAdapter {
    http: HttpClient,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct AptosBlock {
    block_height: String,
    block_timestamp: String,
    #[serde(default)]
    transactions: Vec<AptosTx>,
}

#[derive(Debug, Deserialize)]
struct AptosTx {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    sender: Option<String>,
    #[serde(default)]
    gas_used: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

impl AptosAdapter {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChainAdapter for AptosAdapter {
    fn family(&self) -> ChainFamily {
        ChainFamily::Aptos
    }

    async fn chain_stats(&self, _chain: &ChainDescriptor) -> Result<NetworkSnapshot, FetchError> {
        // Two most recent blocks: the head for height and fill, the one
        // before it for the throughput window.
        let blocks: Vec<AptosBlock> = self
            .http
            .get_json(SOURCE, &self.url("/v1/blocks"), &[("limit", "2".to_owned())])
            .await?;
        let latest = blocks
            .first()
            .ok_or_else(|| FetchError::parse(SOURCE, "empty blocks response"))?;

        let approx_tx_count = latest.transactions.len() as u64;
        let tps = blocks.get(1).and_then(|previous| {
            let head_us = latest.block_timestamp.parse::<u64>().ok()?;
            let prev_us = previous.block_timestamp.parse::<u64>().ok()?;
            let elapsed = head_us.checked_sub(prev_us)? as f64 / 1e6;
            (elapsed > 0.0).then(|| approx_tx_count as f64 / elapsed)
        });

        Ok(NetworkSnapshot {
            latest_block: parse_u64(&latest.block_height)?,
            gas_price_display: "-".to_owned(),
            approx_tx_count,
            tps,
        })
    }

    async fn latest_transactions(
        &self,
        _chain: &ChainDescriptor,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, FetchError> {
        let txs: Vec<AptosTx> = self
            .http
            .get_json(
                SOURCE,
                &self.url("/v1/transactions"),
                &[("limit", limit.to_string())],
            )
            .await?;
        // Only committed transactions carry a version; system entries
        // without one are skipped. The fullnode lists ascending by
        // version, so flip to newest first before trimming.
        let mut records: Vec<TransactionRecord> = txs
            .into_iter()
            .filter_map(|tx| {
                let version = tx.version.as_deref()?.parse::<u64>().ok()?;
                Some(TransactionRecord::Aptos {
                    version,
                    sender: tx.sender.unwrap_or_else(|| "-".to_owned()),
                    gas_used: tx
                        .gas_used
                        .and_then(|gas| gas.parse::<u64>().ok())
                        .unwrap_or_default(),
                    timestamp: tx
                        .timestamp
                        .and_then(|us| us.parse::<u64>().ok())
                        .map(|us| us / 1_000_000)
                        .unwrap_or_default(),
                })
            })
            .collect();
        records.reverse();
        records.truncate(limit);
        Ok(records)
    }
}

fn parse_u64(value: &str) -> Result<u64, FetchError> {
    value
        .parse::<u64>()
        .map_err(|e| FetchError::parse(SOURCE, format!("bad numeric string {value:?}: {e}")))
}
