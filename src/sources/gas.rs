use crate::aggregate::types::GasSnapshot;
use crate::errors::FetchError;
use crate::registry::ChainId;
use crate::sources::http::HttpClient;
use serde::Deserialize;
use tracing::warn;

const SOURCE: &str = "etherscan-gas";

/// Gas oracle adapter for the one chain the oracle covers.
///
/// The oracle reports failures inside a 200 body (`status != "1"`), and the
/// result shape varies between an object and a plain error string. Any of
/// those cases settles into [`GasSnapshot::unavailable`] so a flaky oracle
/// never fails an overview refresh; only transport and HTTP-level failures
/// surface as errors.
#[derive(Clone, Debug)]
pub struct GasOracleClient {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
    chain_id: ChainId,
}

#[derive(Debug, Deserialize)]
struct GasOracleResponse {
    status: String,
    #[serde(default)]
    result: serde_json::Value,
}

impl GasOracleClient {
    pub fn new(
        http: HttpClient,
        base_url: impl Into<String>,
        api_key: Option<String>,
        chain_id: ChainId,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key,
            chain_id,
        }
    }

    /// The chain this oracle's reading applies to.
    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    pub async fn fetch(&self) -> Result<GasSnapshot, FetchError> {
        let Some(api_key) = &self.api_key else {
            warn!("gas oracle api key not configured, reporting unavailable");
            return Ok(GasSnapshot::unavailable(self.chain_id.clone()));
        };
        let response: GasOracleResponse = self
            .http
            .get_json(
                SOURCE,
                &self.base_url,
                &[
                    ("module", "gastracker".to_owned()),
                    ("action", "gasoracle".to_owned()),
                    ("apikey", api_key.clone()),
                ],
            )
            .await?;

        if response.status != "1" {
            warn!(status = %response.status, "gas oracle reported failure status");
            return Ok(GasSnapshot::unavailable(self.chain_id.clone()));
        }
        match response.result.get("SafeGasPrice").and_then(|v| v.as_str()) {
            Some(price) => Ok(GasSnapshot {
                chain_id: self.chain_id.clone(),
                display: Some(format!("{price} Gwei")),
            }),
            None => {
                warn!("gas oracle payload missing SafeGasPrice");
                Ok(GasSnapshot::unavailable(self.chain_id.clone()))
            }
        }
    }
}
