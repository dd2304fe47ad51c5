use crate::aggregate::types::{NetworkSnapshot, TransactionRecord};
use crate::errors::FetchError;
use crate::registry::{ChainDescriptor, ChainFamily};
use crate::sources::explorers::ChainAdapter;
use crate::sources::http::HttpClient;
use async_trait::async_trait;
use serde::Deserialize;

const SOURCE: &str = "sei-rest";

/// Sei adapter over a Cosmos REST gateway. Heights come back as decimal
/// strings and block times as RFC 3339 timestamps.
#[derive(Clone, Debug)]
pub struct SeiRestAdapter {
    http: HttpClient,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SeiBlockResponse {
    block: SeiBlock,
}

#[derive(Debug, Deserialize)]
struct SeiBlock {
    header: SeiHeader,
    data: SeiBlockData,
}

#[derive(Debug, Deserialize)]
struct SeiHeader {
    height: String,
    time: String,
}

#[derive(Debug, Deserialize)]
struct SeiBlockData {
    /// Raw base64 transaction blobs; only the count matters here.
    #[serde(default)]
    txs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SeiTxsResponse {
    #[serde(default)]
    txs: Vec<SeiTxRow>,
}

#[derive(Debug, Deserialize)]
struct SeiTxRow {
    txhash: String,
    height: String,
    timestamp: String,
}

impl SeiRestAdapter {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    async fn block(&self, path: &str) -> Result<SeiBlockResponse, FetchError> {
        self.http.get_json(SOURCE, &self.url(path), &[]).await
    }
}

#[async_trait]
impl ChainAdapter for SeiRestAdapter {
    fn family(&self) -> ChainFamily {
        ChainFamily::Sei
    }

    async fn chain_stats(&self, _chain: &ChainDescriptor) -> Result<NetworkSnapshot, FetchError> {
        let latest = self.block("/blocks/latest").await?;
        let height = parse_u64(&latest.block.header.height)?;
        let approx_tx_count = latest.block.data.txs.len() as u64;

        // Block time from the previous header; losing that call only costs
        // the throughput figure.
        let tps = if height > 1 {
            match self.block(&format!("/blocks/{}", height - 1)).await {
                Ok(previous) => block_window_tps(
                    approx_tx_count,
                    &latest.block.header.time,
                    &previous.block.header.time,
                ),
                Err(_) => None,
            }
        } else {
            None
        };

        Ok(NetworkSnapshot {
            latest_block: height,
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
        let response: SeiTxsResponse = self
            .http
            .get_json(SOURCE, &self.url("/txs"), &[("limit", limit.to_string())])
            .await?;
        // The gateway pages oldest-first within the window.
        let mut records: Vec<TransactionRecord> = response
            .txs
            .into_iter()
            .filter_map(|tx| {
                let height = tx.height.parse::<u64>().ok()?;
                Some(TransactionRecord::Sei {
                    hash: tx.txhash,
                    height,
                    timestamp: tx.timestamp,
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

fn block_window_tps(tx_count: u64, head_time: &str, prev_time: &str) -> Option<f64> {
    let head = chrono::DateTime::parse_from_rfc3339(head_time).ok()?;
    let prev = chrono::DateTime::parse_from_rfc3339(prev_time).ok()?;
    let elapsed = (head - prev).num_milliseconds() as f64 / 1000.0;
    (elapsed > 0.0).then(|| tx_count as f64 / elapsed)
}
