use crate::aggregate::types::MarketSnapshot;
use crate::errors::FetchError;
use crate::registry::ChainId;
use crate::sources::http::HttpClient;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

const SOURCE: &str = "coingecko";

/// Bulk market data adapter. One request covers every requested chain id;
/// ids the provider does not know are simply absent from the result map.
#[derive(Clone, Debug)]
pub struct MarketDataClient {
    http: HttpClient,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MarketRow {
    id: String,
    current_price: Option<f64>,
    market_cap: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    image: Option<String>,
}

impl MarketDataClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }

    /// Fetch market snapshots for `ids` in a single batched request.
    pub async fn fetch(
        &self,
        ids: &[ChainId],
    ) -> Result<HashMap<ChainId, MarketSnapshot>, FetchError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let joined = ids
            .iter()
            .map(ChainId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}/coins/markets", self.base_url.trim_end_matches('/'));
        let rows: Vec<MarketRow> = self
            .http
            .get_json(
                SOURCE,
                &url,
                &[("vs_currency", "usd".to_owned()), ("ids", joined)],
            )
            .await?;
        debug!(requested = ids.len(), returned = rows.len(), "market data refreshed");
        Ok(rows
            .into_iter()
            .map(|row| {
                let snapshot = MarketSnapshot {
                    price_usd: row.current_price,
                    market_cap_usd: row.market_cap,
                    price_change_24h_percent: row.price_change_percentage_24h,
                    logo_url: row.image,
                };
                (ChainId::new(row.id), snapshot)
            })
            .collect())
    }
}
