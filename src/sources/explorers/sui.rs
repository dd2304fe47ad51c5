use crate::aggregate::types::{NetworkSnapshot, TransactionRecord};
use crate::errors::FetchError;
use crate::registry::{ChainDescriptor, ChainFamily};
use crate::sources::explorers::ChainAdapter;
use crate::sources::http::HttpClient;
use async_trait::async_trait;
use futures::future;
use serde::Deserialize;
use serde_json::json;

const SOURCE: &str = "sui-rpc";

/// Sui JSON-RPC adapter. The latest checkpoint stands in for "latest
/// block", and throughput comes from the running network transaction total
/// across a ten-checkpoint window.
#[derive(Clone, Debug)]
pub struct SuiRpcAdapter {
    http: HttpClient,
    rpc_url: String,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuiCheckpoint {
    #[serde(default)]
    timestamp_ms: Option<serde_json::Value>,
    #[serde(default)]
    network_total_transactions: Option<serde_json::Value>,
    #[serde(default)]
    transactions: Vec<serde_json::Value>,
}

impl SuiRpcAdapter {
    pub fn new(http: HttpClient, rpc_url: impl Into<String>) -> Self {
        Self { http, rpc_url: rpc_url.into() }
    }

    async fn rpc(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, FetchError> {
        let body = json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params});
        let envelope: RpcEnvelope = self.http.post_json(SOURCE, &self.rpc_url, &body).await?;
        if let Some(err) = envelope.error {
            return Err(FetchError::upstream(
                SOURCE,
                None,
                format!("{} (code {})", err.message, err.code),
            ));
        }
        envelope
            .result
            .ok_or_else(|| FetchError::parse(SOURCE, "missing rpc result"))
    }

    async fn checkpoint(&self, sequence: u64) -> Result<SuiCheckpoint, FetchError> {
        let result = self
            .rpc("sui_getCheckpoint", json!([sequence.to_string()]))
            .await?;
        serde_json::from_value(result)
            .map_err(|e| FetchError::parse(SOURCE, format!("bad checkpoint payload: {e}")))
    }
}

#[async_trait]
impl ChainAdapter for SuiRpcAdapter {
    fn family(&self) -> ChainFamily {
        ChainFamily::Sui
    }

    async fn chain_stats(&self, _chain: &ChainDescriptor) -> Result<NetworkSnapshot, FetchError> {
        let sequence = self
            .rpc("sui_getLatestCheckpointSequenceNumber", json!([]))
            .await?;
        let latest = value_to_u64(&sequence)
            .ok_or_else(|| FetchError::parse(SOURCE, "bad checkpoint sequence number"))?;

        // The checkpoint detail calls only enrich the snapshot; losing them
        // degrades fill and throughput to unavailable, not the whole fetch.
        let window = latest.min(10);
        let (head, earlier) = future::join(
            self.checkpoint(latest),
            self.checkpoint(latest - window),
        )
        .await;
        let head = head.ok();
        let earlier = earlier.ok();

        let approx_tx_count = head
            .as_ref()
            .map(|checkpoint| checkpoint.transactions.len() as u64)
            .unwrap_or_default();
        let tps = head.as_ref().zip(earlier.as_ref()).and_then(|(head, earlier)| {
            let total_delta = value_to_u64(head.network_total_transactions.as_ref()?)?
                .checked_sub(value_to_u64(earlier.network_total_transactions.as_ref()?)?)?;
            let elapsed_ms = value_to_u64(head.timestamp_ms.as_ref()?)?
                .checked_sub(value_to_u64(earlier.timestamp_ms.as_ref()?)?)?;
            let elapsed = elapsed_ms as f64 / 1000.0;
            (elapsed > 0.0).then(|| total_delta as f64 / elapsed)
        });

        Ok(NetworkSnapshot {
            latest_block: latest,
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
        let result = self
            .rpc("sui_getRecentTransactions", json!([limit]))
            .await?;
        let rows = result
            .as_array()
            .ok_or_else(|| FetchError::parse(SOURCE, "recent transactions is not an array"))?;

        // Rows are plain digests on current nodes and [sequence, digest]
        // pairs on older ones; ascending by sequence either way.
        let mut records: Vec<TransactionRecord> = rows
            .iter()
            .filter_map(|row| {
                let digest = match row {
                    serde_json::Value::String(digest) => digest.clone(),
                    serde_json::Value::Array(pair) => pair.last()?.as_str()?.to_owned(),
                    _ => return None,
                };
                Some(TransactionRecord::Sui { digest })
            })
            .collect();
        records.reverse();
        records.truncate(limit);
        Ok(records)
    }
}

fn value_to_u64(value: &serde_json::Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}
