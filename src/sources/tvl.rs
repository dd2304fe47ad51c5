use crate::aggregate::types::TvlIndex;
use crate::errors::FetchError;
use crate::sources::http::HttpClient;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

const SOURCE: &str = "defillama";

/// Protocol-level TVL adapter, reduced to one total per chain.
///
/// The provider's chain names do not always match registry display names
/// (it says "zkSync Era" where the registry says "zkSync"), so rows pass
/// through an alias table before they are summed.
#[derive(Clone, Debug)]
pub struct TvlClient {
    http: HttpClient,
    base_url: String,
    aliases: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ProtocolRow {
    #[serde(default)]
    chain: Option<String>,
    #[serde(default)]
    tvl: Option<f64>,
}

/// Provider chain name -> registry display name.
pub fn default_aliases() -> HashMap<String, String> {
    HashMap::from([("zkSync Era".to_owned(), "zkSync".to_owned())])
}

impl TvlClient {
    pub fn new(
        http: HttpClient,
        base_url: impl Into<String>,
        aliases: HashMap<String, String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            aliases,
        }
    }

    pub async fn fetch(&self) -> Result<TvlIndex, FetchError> {
        let url = format!("{}/protocols", self.base_url.trim_end_matches('/'));
        let rows: Vec<ProtocolRow> = self.http.get_json(SOURCE, &url, &[]).await?;
        let mut index = TvlIndex::default();
        for row in rows {
            let (Some(chain), Some(tvl)) = (row.chain, row.tvl) else {
                continue;
            };
            let name = self.aliases.get(&chain).unwrap_or(&chain);
            index.add_row(name, tvl);
        }
        debug!(chains = index.len(), "tvl totals refreshed");
        Ok(index)
    }
}
