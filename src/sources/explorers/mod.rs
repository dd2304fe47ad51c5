//! Per-family explorer adapters.
//!
//! Each chain family (EVM, Aptos, Sui, Sei) gets one adapter that speaks its
//! explorer's wire protocol and normalizes the answers into the shared view
//! types. Adapters are registered per family, so adding a chain to an
//! existing family is a registry-only change.

pub mod aptos;
pub mod evm;
pub mod sei;
pub mod sui;

use crate::aggregate::types::{NetworkSnapshot, TransactionRecord, WalletProfile};
use crate::config::BoardConfig;
use crate::errors::FetchError;
use crate::registry::{ChainDescriptor, ChainFamily};
use crate::sources::http::HttpClient;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

pub use aptos::AptosAdapter;
pub use evm::EvmExplorerAdapter;
pub use sei::SeiRestAdapter;
pub use sui::SuiRpcAdapter;

/// A chain family's explorer capabilities.
///
/// `wallet_info` defaults to a typed unsupported error; only families with a
/// wallet API override it.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    fn family(&self) -> ChainFamily;

    /// Live stats for the detail header: height, gas, block fill, throughput.
    async fn chain_stats(&self, chain: &ChainDescriptor) -> Result<NetworkSnapshot, FetchError>;

    /// Most recent transactions, newest first, at most `limit` records.
    async fn latest_transactions(
        &self,
        chain: &ChainDescriptor,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, FetchError>;

    async fn wallet_info(
        &self,
        chain: &ChainDescriptor,
        address: &str,
    ) -> Result<WalletProfile, FetchError> {
        let _ = (chain, address);
        Err(FetchError::unsupported(self.family(), "wallet lookup"))
    }
}

/// Family-keyed adapter lookup. Chains resolve to adapters through their
/// descriptor's family, never through chain-specific branching.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<ChainFamily, Arc<dyn ChainAdapter>>,
}

impl AdapterRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn ChainAdapter>) -> Self {
        self.adapters.insert(adapter.family(), adapter);
        self
    }

    pub fn get(&self, family: ChainFamily) -> Result<Arc<dyn ChainAdapter>, FetchError> {
        self.adapters
            .get(&family)
            .cloned()
            .ok_or(FetchError::unsupported(family, "explorer adapter"))
    }

    pub fn for_chain(&self, chain: &ChainDescriptor) -> Result<Arc<dyn ChainAdapter>, FetchError> {
        self.get(chain.family)
    }

    pub fn families(&self) -> Vec<ChainFamily> {
        self.adapters.keys().copied().collect()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("families", &self.families())
            .finish()
    }
}

/// Build the full adapter set from configuration. Called once at service
/// startup.
pub fn standard_adapters(http: &HttpClient, config: &BoardConfig) -> AdapterRegistry {
    AdapterRegistry::empty()
        .with_adapter(Arc::new(EvmExplorerAdapter::new(
            http.clone(),
            config.evm_explorer_urls.clone(),
            config.etherscan_api_key.clone(),
        )))
        .with_adapter(Arc::new(AptosAdapter::new(
            http.clone(),
            config.aptos_api_url.clone(),
        )))
        .with_adapter(Arc::new(SuiRpcAdapter::new(
            http.clone(),
            config.sui_rpc_url.clone(),
        )))
        .with_adapter(Arc::new(SeiRestAdapter::new(
            http.clone(),
            config.sei_api_url.clone(),
        )))
}
