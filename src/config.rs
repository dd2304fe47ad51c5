use crate::sources::tvl::default_aliases;
use crate::utils::config_loader::{
    BoardConfigLoader, BoardConfigLoaderSync, LoadConfigError, load_from_file, load_from_file_sync,
};
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Configuration for the dashboard aggregation service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoardConfig {
    /// Base URL of the bulk market data API
    pub market_api_url: String,
    /// Gas oracle endpoint (Etherscan gas tracker module)
    pub gas_oracle_url: String,
    /// Chain id the gas oracle reading applies to
    pub gas_chain_id: String,
    /// Base URL of the protocol TVL API
    pub tvl_api_url: String,
    /// Aptos fullnode REST base URL
    pub aptos_api_url: String,
    /// Sui JSON-RPC endpoint
    pub sui_rpc_url: String,
    /// Sei REST gateway base URL
    pub sei_api_url: String,
    /// Etherscan-family API base URL per EVM chain id
    pub evm_explorer_urls: HashMap<String, String>,
    /// Shared Etherscan-family API key, also used by the gas oracle
    pub etherscan_api_key: Option<String>,
    /// TVL provider chain name -> registry display name
    pub tvl_aliases: HashMap<String, String>,
    /// Overview refresh cadence in seconds
    pub overview_interval_secs: u64,
    /// Detail refresh cadence in seconds
    pub detail_interval_secs: u64,
    /// Wallet refresh cadence in seconds
    pub wallet_interval_secs: u64,
    /// Timeout for HTTP requests in seconds
    pub http_timeout_secs: u64,
    /// Ceiling for the failure backoff in seconds
    pub max_backoff_secs: u64,
    /// Transactions per detail or wallet page
    pub tx_page_size: usize,
}

/// Etherscan-dialect API bases for the EVM chains that have one. The zkSync
/// explorer speaks a different protocol and is intentionally absent.
fn default_evm_explorer_urls() -> HashMap<String, String> {
    HashMap::from([
        ("ethereum".to_string(), "https://api.etherscan.io/api".to_string()),
        ("arbitrum-one".to_string(), "https://api.arbiscan.io/api".to_string()),
        (
            "optimistic-ethereum".to_string(),
            "https://api-optimistic.etherscan.io/api".to_string(),
        ),
        ("base".to_string(), "https://api.basescan.org/api".to_string()),
    ])
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            market_api_url: "https://api.coingecko.com/api/v3".to_string(),
            gas_oracle_url: "https://api.etherscan.io/api".to_string(),
            gas_chain_id: "ethereum".to_string(),
            tvl_api_url: "https://api.llama.fi".to_string(),
            aptos_api_url: "https://fullnode.mainnet.aptoslabs.com".to_string(),
            sui_rpc_url: "https://fullnode.mainnet.sui.io".to_string(),
            sei_api_url: "https://rest.cosmos.directory/sei".to_string(),
            evm_explorer_urls: default_evm_explorer_urls(),
            etherscan_api_key: None,
            tvl_aliases: default_aliases(),
            overview_interval_secs: 60,
            detail_interval_secs: 10,
            wallet_interval_secs: 5,
            http_timeout_secs: 10,
            max_backoff_secs: 120,
            tx_page_size: 10,
        }
    }
}

impl BoardConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> eyre::Result<Self> {
        let mut config = Self::default();

        for (var, target) in [
            ("MARKET_API_URL", &mut config.market_api_url),
            ("GAS_ORACLE_URL", &mut config.gas_oracle_url),
            ("TVL_API_URL", &mut config.tvl_api_url),
            ("APTOS_API_URL", &mut config.aptos_api_url),
            ("SUI_RPC_URL", &mut config.sui_rpc_url),
            ("SEI_API_URL", &mut config.sei_api_url),
        ] {
            if let Ok(value) = std::env::var(var) {
                let _url = Url::parse(&value).map_err(|e| eyre::eyre!("Invalid {}: {}", var, e))?;
                *target = value;
            }
        }

        if let Ok(gas_chain_id) = std::env::var("GAS_CHAIN_ID") {
            config.gas_chain_id = gas_chain_id;
        }

        if let Ok(api_key) = std::env::var("ETHERSCAN_API_KEY") {
            if !api_key.trim().is_empty() {
                config.etherscan_api_key = Some(api_key);
            }
        }

        if let Ok(interval_str) = std::env::var("OVERVIEW_INTERVAL_SECS") {
            config.overview_interval_secs = interval_str
                .parse()
                .map_err(|e| eyre::eyre!("Invalid OVERVIEW_INTERVAL_SECS: {}", e))?;
        }

        if let Ok(interval_str) = std::env::var("DETAIL_INTERVAL_SECS") {
            config.detail_interval_secs = interval_str
                .parse()
                .map_err(|e| eyre::eyre!("Invalid DETAIL_INTERVAL_SECS: {}", e))?;
        }

        if let Ok(interval_str) = std::env::var("WALLET_INTERVAL_SECS") {
            config.wallet_interval_secs = interval_str
                .parse()
                .map_err(|e| eyre::eyre!("Invalid WALLET_INTERVAL_SECS: {}", e))?;
        }

        if let Ok(timeout_str) = std::env::var("HTTP_TIMEOUT_SECS") {
            config.http_timeout_secs = timeout_str
                .parse()
                .map_err(|e| eyre::eyre!("Invalid HTTP_TIMEOUT_SECS: {}", e))?;
        }

        if let Ok(backoff_str) = std::env::var("MAX_BACKOFF_SECS") {
            config.max_backoff_secs = backoff_str
                .parse()
                .map_err(|e| eyre::eyre!("Invalid MAX_BACKOFF_SECS: {}", e))?;
        }

        if let Ok(page_str) = std::env::var("TX_PAGE_SIZE") {
            config.tx_page_size = page_str
                .parse()
                .map_err(|e| eyre::eyre!("Invalid TX_PAGE_SIZE: {}", e))?;
        }

        Ok(config)
    }

    /// Reject configurations the service cannot run with.
    pub fn validate(&self) -> eyre::Result<()> {
        for (name, value) in [
            ("market_api_url", &self.market_api_url),
            ("gas_oracle_url", &self.gas_oracle_url),
            ("tvl_api_url", &self.tvl_api_url),
            ("aptos_api_url", &self.aptos_api_url),
            ("sui_rpc_url", &self.sui_rpc_url),
            ("sei_api_url", &self.sei_api_url),
        ] {
            Url::parse(value).map_err(|e| eyre::eyre!("Invalid {}: {}", name, e))?;
        }
        for (chain, url) in &self.evm_explorer_urls {
            Url::parse(url)
                .map_err(|e| eyre::eyre!("Invalid explorer url for chain {}: {}", chain, e))?;
        }
        if self.overview_interval_secs == 0
            || self.detail_interval_secs == 0
            || self.wallet_interval_secs == 0
        {
            return Err(eyre::eyre!("Refresh intervals must be non-zero"));
        }
        if self.tx_page_size == 0 {
            return Err(eyre::eyre!("tx_page_size must be non-zero"));
        }
        Ok(())
    }

    pub fn overview_interval(&self) -> Duration {
        Duration::from_secs(self.overview_interval_secs)
    }

    pub fn detail_interval(&self) -> Duration {
        Duration::from_secs(self.detail_interval_secs)
    }

    pub fn wallet_interval(&self) -> Duration {
        Duration::from_secs(self.wallet_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct BoardConfigRoot {
    pub board: BoardConfig,
}

#[async_trait]
impl BoardConfigLoader for BoardConfig {
    type SectionType = BoardConfig;

    async fn load_section_from_file(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        let root: BoardConfigRoot = load_from_file(file_name).await?;
        Ok(root.board)
    }
}

impl BoardConfigLoaderSync for BoardConfig {
    type SectionType = BoardConfig;

    fn load_section_from_file_sync(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        let root: BoardConfigRoot = load_from_file_sync(file_name)?;
        Ok(root.board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BoardConfig::default();
        assert_eq!(config.market_api_url, "https://api.coingecko.com/api/v3");
        assert_eq!(config.gas_chain_id, "ethereum");
        assert_eq!(config.overview_interval_secs, 60);
        assert_eq!(config.detail_interval_secs, 10);
        assert_eq!(config.wallet_interval_secs, 5);
        assert!(config.etherscan_api_key.is_none());
        assert!(config.evm_explorer_urls.contains_key("base"));
        assert!(!config.evm_explorer_urls.contains_key("zksync"));
        assert_eq!(config.tvl_aliases.get("zkSync Era").unwrap(), "zkSync");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_durations() {
        let config = BoardConfig::default();
        assert_eq!(config.overview_interval(), Duration::from_secs(60));
        assert_eq!(config.detail_interval(), Duration::from_secs(10));
        assert_eq!(config.wallet_interval(), Duration::from_secs(5));
        assert_eq!(config.http_timeout(), Duration::from_secs(10));
        assert_eq!(config.max_backoff(), Duration::from_secs(120));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = BoardConfig::default();
        config.sui_rpc_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = BoardConfig::default();
        config.detail_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_section_from_toml() {
        let dir = std::env::temp_dir();
        let file = dir.join("chainboard_config_test.toml");
        std::fs::write(
            &file,
            "[board]\noverview_interval_secs = 30\netherscan_api_key = \"abc\"\n",
        )
        .unwrap();

        let config =
            BoardConfig::load_section_from_file_sync(file.to_string_lossy().into_owned()).unwrap();
        std::fs::remove_file(&file).ok();

        assert_eq!(config.overview_interval_secs, 30);
        assert_eq!(config.etherscan_api_key.as_deref(), Some("abc"));
        // Unset keys keep their defaults.
        assert_eq!(config.detail_interval_secs, 10);
    }
}
