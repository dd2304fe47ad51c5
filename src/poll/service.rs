use crate::aggregate::combine;
use crate::aggregate::types::{
    ChainViewModel, NetworkSnapshot, TransactionRecord, TvlIndex, WalletView,
};
use crate::config::BoardConfig;
use crate::errors::FetchError;
use crate::poll::slot::{Generation, PollOptions, spawn_poll};
use crate::poll::state::{PollKey, PollSubscription};
use crate::registry::{ChainDescriptor, ChainId, ChainRegistry};
use crate::sources::{
    AdapterRegistry, GasOracleClient, HttpClient, MarketDataClient, TvlClient, standard_adapters,
};
use dashmap::DashMap;
use eyre::{Result, eyre};
use futures::future;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Slot categories with switch-to-latest semantics: starting a new
/// subscription in a category supersedes the previous one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum SlotKind {
    DetailStats,
    DetailTransactions,
    Wallet,
}

/// The dashboard aggregation service.
///
/// Owns the chain registry, the source adapters and the polling slots, and
/// hands out subscriptions that refresh themselves on the configured
/// cadences. Dropping a subscription stops its loop; dropping the service
/// leaves live subscriptions running until they are dropped themselves.
pub struct Chainboard {
    config: BoardConfig,
    registry: Arc<ChainRegistry>,
    market: MarketDataClient,
    gas: GasOracleClient,
    tvl: TvlClient,
    adapters: AdapterRegistry,
    slots: DashMap<SlotKind, Generation>,
}

/// Builder for [`Chainboard`], for swapping the registry or the adapter set
/// before startup.
pub struct ChainboardBuilder {
    config: BoardConfig,
    registry: Option<ChainRegistry>,
    adapters: Option<AdapterRegistry>,
}

impl ChainboardBuilder {
    pub fn new(config: BoardConfig) -> Self {
        Self {
            config,
            registry: None,
            adapters: None,
        }
    }

    pub fn registry(mut self, registry: ChainRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = Some(adapters);
        self
    }

    pub fn build(self) -> Result<Chainboard> {
        self.config.validate()?;
        let http = HttpClient::new(self.config.http_timeout());
        let registry = self.registry.unwrap_or_else(ChainRegistry::mainnet);
        let adapters = self
            .adapters
            .unwrap_or_else(|| standard_adapters(&http, &self.config));

        let market = MarketDataClient::new(http.clone(), self.config.market_api_url.clone());
        let gas = GasOracleClient::new(
            http.clone(),
            self.config.gas_oracle_url.clone(),
            self.config.etherscan_api_key.clone(),
            ChainId::new(self.config.gas_chain_id.clone()),
        );
        let tvl = TvlClient::new(
            http,
            self.config.tvl_api_url.clone(),
            self.config.tvl_aliases.clone(),
        );

        info!(
            chains = registry.all_ids().len(),
            families = adapters.families().len(),
            "chainboard service ready"
        );
        Ok(Chainboard {
            config: self.config,
            registry: Arc::new(registry),
            market,
            gas,
            tvl,
            adapters,
            slots: DashMap::new(),
        })
    }
}

impl Chainboard {
    pub fn new(config: BoardConfig) -> Result<Self> {
        ChainboardBuilder::new(config).build()
    }

    pub fn builder(config: BoardConfig) -> ChainboardBuilder {
        ChainboardBuilder::new(config)
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn list_chains(&self) -> &[ChainDescriptor] {
        self.registry.chains()
    }

    fn slot(&self, kind: SlotKind) -> Generation {
        self.slots.entry(kind).or_default().clone()
    }

    /// Subscribe to the combined overview for `ids` (top-level chains; their
    /// L2s come along automatically). An empty list subscribes to every
    /// registered chain. Refreshes on the overview cadence; a source that
    /// fails leaves its fields unavailable without failing the refresh.
    pub fn subscribe_chain_overview(
        &self,
        ids: &[ChainId],
    ) -> PollSubscription<Vec<ChainViewModel>> {
        let chains: Vec<ChainDescriptor> = if ids.is_empty() {
            self.registry.chains().to_vec()
        } else {
            ids.iter()
                .filter_map(|id| {
                    let found = self.registry.get(id).cloned();
                    if found.is_none() {
                        warn!(chain = %id, "overview subscription skips unknown chain");
                    }
                    found
                })
                .collect()
        };
        let market_ids: Vec<ChainId> = chains
            .iter()
            .flat_map(ChainDescriptor::iter_with_children)
            .map(|chain| chain.id.clone())
            .collect();

        let market = self.market.clone();
        let gas = self.gas.clone();
        let tvl = self.tvl.clone();
        let options = PollOptions {
            interval: self.config.overview_interval(),
            max_backoff: self.config.max_backoff(),
        };
        spawn_poll(PollKey::Overview, Generation::detached(), options, move || {
            let market = market.clone();
            let gas = gas.clone();
            let tvl = tvl.clone();
            let chains = chains.clone();
            let market_ids = market_ids.clone();
            async move {
                let (market_result, gas_result, tvl_result) =
                    future::join3(market.fetch(&market_ids), gas.fetch(), tvl.fetch()).await;

                let market_map = market_result.unwrap_or_else(|error| {
                    warn!(%error, "market source failed, leaving fields unavailable");
                    HashMap::new()
                });
                let gas_snapshot = match gas_result {
                    Ok(snapshot) => Some(snapshot),
                    Err(error) => {
                        warn!(%error, "gas source failed, leaving field unavailable");
                        None
                    }
                };
                let tvl_index = tvl_result.unwrap_or_else(|error| {
                    warn!(%error, "tvl source failed, leaving fields unavailable");
                    TvlIndex::default()
                });

                Ok(combine(
                    &chains,
                    &market_map,
                    gas_snapshot.as_ref(),
                    &tvl_index,
                ))
            }
        })
    }

    /// Subscribe to one chain's detail data: live stats and recent
    /// transactions, each on the detail cadence. Starting a new detail
    /// subscription supersedes the previous one, so a response still in
    /// flight for the old chain is discarded rather than published.
    pub fn subscribe_chain_detail(&self, chain_id: &ChainId) -> Result<ChainDetailSubscription> {
        let chain = self
            .registry
            .get(chain_id)
            .cloned()
            .ok_or_else(|| eyre!("unknown chain id: {chain_id}"))?;
        let adapter = self.adapters.for_chain(&chain)?;
        let options = PollOptions {
            interval: self.config.detail_interval(),
            max_backoff: self.config.max_backoff(),
        };

        let stats = {
            let adapter = adapter.clone();
            let chain = chain.clone();
            spawn_poll(
                PollKey::Stats(chain.id.clone()),
                self.slot(SlotKind::DetailStats).advance(),
                options,
                move || {
                    let adapter = adapter.clone();
                    let chain = chain.clone();
                    async move { adapter.chain_stats(&chain).await }
                },
            )
        };

        let transactions = {
            let adapter = adapter.clone();
            let chain = chain.clone();
            let page = self.config.tx_page_size;
            spawn_poll(
                PollKey::Transactions(chain.id.clone()),
                self.slot(SlotKind::DetailTransactions).advance(),
                options,
                move || {
                    let adapter = adapter.clone();
                    let chain = chain.clone();
                    async move { adapter.latest_transactions(&chain, page).await }
                },
            )
        };

        Ok(ChainDetailSubscription {
            chain,
            stats,
            transactions,
        })
    }

    /// Look up a wallet on one chain, refreshing on the wallet cadence.
    /// Families without wallet support settle into a typed
    /// `supported: false` view, not an error. A new lookup supersedes the
    /// previous one.
    pub fn query_wallet(
        &self,
        chain_id: &ChainId,
        address: &str,
    ) -> Result<PollSubscription<WalletView>> {
        let chain = self
            .registry
            .get(chain_id)
            .cloned()
            .ok_or_else(|| eyre!("unknown chain id: {chain_id}"))?;
        let adapter = self.adapters.for_chain(&chain)?;
        let address = address.trim().to_owned();
        if address.is_empty() {
            return Err(eyre!("wallet address is empty"));
        }

        let options = PollOptions {
            interval: self.config.wallet_interval(),
            max_backoff: self.config.max_backoff(),
        };
        let key = PollKey::Wallet(chain.id.clone(), address.clone());
        Ok(spawn_poll(
            key,
            self.slot(SlotKind::Wallet).advance(),
            options,
            move || {
                let adapter = adapter.clone();
                let chain = chain.clone();
                let address = address.clone();
                async move {
                    match adapter.wallet_info(&chain, &address).await {
                        Ok(profile) => Ok(WalletView::from_profile(profile)),
                        Err(error) if error.is_unsupported() => Ok(WalletView::unsupported()),
                        Err(error) => Err(error),
                    }
                }
            },
        ))
    }
}

/// The two polled halves of a chain's detail view.
pub struct ChainDetailSubscription {
    chain: ChainDescriptor,
    pub stats: PollSubscription<NetworkSnapshot>,
    pub transactions: PollSubscription<Vec<TransactionRecord>>,
}

impl ChainDetailSubscription {
    pub fn chain(&self) -> &ChainDescriptor {
        &self.chain
    }

    /// Merged snapshot of both halves.
    pub fn view(&self) -> ChainDetailView {
        let stats = self.stats.state();
        let transactions = self.transactions.state();
        ChainDetailView {
            loading: stats.loading || transactions.loading,
            error: stats.error.or(transactions.error),
            stats: stats.value,
            transactions: transactions.value,
        }
    }

    /// Wait until either half changes.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        tokio::select! {
            changed = self.stats.changed() => changed,
            changed = self.transactions.changed() => changed,
        }
    }
}

/// Point-in-time view of a detail subscription.
#[derive(Clone, Debug)]
pub struct ChainDetailView {
    pub stats: Option<Arc<NetworkSnapshot>>,
    pub transactions: Option<Arc<Vec<TransactionRecord>>>,
    pub loading: bool,
    pub error: Option<Arc<FetchError>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> BoardConfig {
        let uri = server.uri();
        let mut config = BoardConfig::default();
        config.market_api_url = uri.clone();
        config.gas_oracle_url = format!("{uri}/gas");
        config.tvl_api_url = uri.clone();
        config.aptos_api_url = uri.clone();
        config.sui_rpc_url = format!("{uri}/sui");
        config.sei_api_url = uri.clone();
        config.etherscan_api_key = Some("test-key".to_owned());
        config.evm_explorer_urls =
            HashMap::from([("ethereum".to_owned(), format!("{uri}/etherscan"))]);
        config
    }

    async fn mount_market(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/coins/markets"))
            .and(query_param("vs_currency", "usd"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "id": "ethereum",
                    "current_price": 3000.0,
                    "market_cap": 3.6e11,
                    "price_change_percentage_24h": -1.2,
                    "image": "https://img.test/ethereum.png"
                },
                {
                    "id": "zksync",
                    "current_price": 0.5,
                    "market_cap": 1.0e9,
                    "price_change_percentage_24h": 0.4,
                    "image": "https://img.test/zksync.png"
                }
            ])))
            .mount(server)
            .await;
    }

    async fn mount_tvl(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/protocols"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "Lido", "chain": "Ethereum", "tvl": 5.0e10},
                {"name": "Uniswap", "chain": "Ethereum", "tvl": 1.0e9},
                {"name": "SyncSwap", "chain": "zkSync Era", "tvl": 2.0e8},
                {"name": "Broken", "chain": null, "tvl": 1.0}
            ])))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_overview_refresh_combines_all_sources() {
        let server = MockServer::start().await;
        mount_market(&server).await;
        mount_tvl(&server).await;
        Mock::given(method("GET"))
            .and(path("/gas"))
            .and(query_param("module", "gastracker"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "1",
                "message": "OK",
                "result": {"SafeGasPrice": "12", "ProposeGasPrice": "14", "FastGasPrice": "18"}
            })))
            .mount(&server)
            .await;

        let board = Chainboard::new(test_config(&server)).unwrap();
        let mut sub = board.subscribe_chain_overview(&[]);
        let state = sub.next_settled().await.unwrap();

        assert!(state.error.is_none());
        let views = state.value.unwrap();
        assert_eq!(views.len(), 4);

        let ethereum = &views[0];
        assert_eq!(ethereum.price_usd, Some(3000.0));
        assert_eq!(ethereum.market_cap_usd, Some(3.6e11));
        assert_eq!(ethereum.price_change_24h_percent, Some(-1.2));
        assert_eq!(ethereum.gas_price_display.as_deref(), Some("12 Gwei"));
        assert_eq!(ethereum.tvl_usd, Some(5.1e10));

        // Alias table folds the provider's "zkSync Era" into the L2 row.
        let zksync = ethereum
            .l2s
            .iter()
            .find(|l2| l2.id.as_str() == "zksync")
            .unwrap();
        assert_eq!(zksync.tvl_usd, Some(2.0e8));
        assert_eq!(zksync.price_usd, Some(0.5));

        // Chains no source covered still render from the registry.
        let sei = views.iter().find(|vm| vm.id.as_str() == "sei-network").unwrap();
        assert!(sei.price_usd.is_none());
        assert_eq!(sei.symbol, "SEI");
    }

    #[tokio::test]
    async fn test_overview_survives_gas_failure_status() {
        let server = MockServer::start().await;
        mount_market(&server).await;
        mount_tvl(&server).await;
        Mock::given(method("GET"))
            .and(path("/gas"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "0",
                "message": "NOTOK",
                "result": "Invalid API Key"
            })))
            .mount(&server)
            .await;

        let board = Chainboard::new(test_config(&server)).unwrap();
        let mut sub = board.subscribe_chain_overview(&[ChainId::from("ethereum")]);
        let state = sub.next_settled().await.unwrap();

        // The refresh as a whole succeeds; only the gas field is missing.
        assert!(state.error.is_none());
        let views = state.value.unwrap();
        assert_eq!(views.len(), 1);
        assert!(views[0].gas_price_display.is_none());
        assert_eq!(views[0].price_usd, Some(3000.0));
        assert_eq!(views[0].tvl_usd, Some(5.1e10));
    }

    #[tokio::test]
    async fn test_detail_subscription_polls_both_halves() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/blocks"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "block_height": "420000",
                    "block_timestamp": "1700000002000000",
                    "transactions": [{"version": "9000"}, {"version": "9001"}]
                },
                {
                    "block_height": "419999",
                    "block_timestamp": "1700000001000000",
                    "transactions": []
                }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/transactions"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "version": "9001",
                    "sender": "0xsender",
                    "gas_used": "55",
                    "timestamp": "1700000002000000"
                }
            ])))
            .mount(&server)
            .await;

        let board = Chainboard::new(test_config(&server)).unwrap();
        let mut detail = board.subscribe_chain_detail(&ChainId::from("aptos")).unwrap();

        let stats = detail.stats.next_settled().await.unwrap();
        let stats = stats.value.unwrap();
        assert_eq!(stats.latest_block, 420_000);
        assert_eq!(stats.approx_tx_count, 2);
        assert_eq!(stats.gas_price_display, "-");
        assert_eq!(stats.tps, Some(2.0));

        let transactions = detail.transactions.next_settled().await.unwrap();
        let transactions = transactions.value.unwrap();
        assert_eq!(transactions.len(), 1);
        match &transactions[0] {
            TransactionRecord::Aptos { version, sender, gas_used, timestamp } => {
                assert_eq!(*version, 9001);
                assert_eq!(sender, "0xsender");
                assert_eq!(*gas_used, 55);
                assert_eq!(*timestamp, 1_700_000_002);
            }
            other => panic!("expected aptos record, got {other:?}"),
        }

        let view = detail.view();
        assert!(!view.loading);
        assert!(view.error.is_none());
    }

    #[tokio::test]
    async fn test_wallet_on_unsupported_family_settles_typed() {
        let server = MockServer::start().await;
        let board = Chainboard::new(test_config(&server)).unwrap();
        let mut sub = board
            .query_wallet(&ChainId::from("sui"), "0x1234")
            .unwrap();
        let state = sub.next_settled().await.unwrap();

        assert!(state.error.is_none());
        let view = state.value.unwrap();
        assert!(!view.supported);
        assert!(view.recent_transactions.is_empty());
        assert!(view.balance.is_none());
    }

    #[tokio::test]
    async fn test_unknown_chain_is_rejected_up_front() {
        let server = MockServer::start().await;
        let board = Chainboard::new(test_config(&server)).unwrap();
        assert!(board.subscribe_chain_detail(&ChainId::from("dogecoin")).is_err());
        assert!(board.query_wallet(&ChainId::from("dogecoin"), "0xabc").is_err());
        assert!(board.query_wallet(&ChainId::from("ethereum"), "   ").is_err());
    }
}
