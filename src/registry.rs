use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString, VariantNames};

/// Stable chain identifier shared by every layer.
///
/// Uses the market data provider's id scheme (`"ethereum"`,
/// `"arbitrum-one"`, `"sei-network"`) so the same key works for registry
/// lookups, market snapshots and polling keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChainId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ChainId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ChainId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Adapter family a chain belongs to. Every chain in the registry maps to
/// exactly one family, and the explorer adapter for that family serves all
/// of its chains.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumIter,
    EnumString,
    VariantNames,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChainFamily {
    Evm,
    Aptos,
    Sui,
    Sei,
}

/// Static description of one chain: identity, presentation fields, explorer
/// location and its position in the L1/L2 hierarchy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainDescriptor {
    pub id: ChainId,
    pub display_name: String,
    pub symbol: String,
    pub family: ChainFamily,
    /// Human-facing explorer, used to build outbound links.
    pub explorer_base_url: String,
    #[serde(default)]
    pub parent_chain_id: Option<ChainId>,
    /// L2s rolled up under this chain. Only ever one level deep.
    #[serde(default)]
    pub children: Vec<ChainDescriptor>,
}

impl ChainDescriptor {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        symbol: impl Into<String>,
        family: ChainFamily,
        explorer_base_url: impl Into<String>,
    ) -> Self {
        Self {
            id: ChainId::new(id),
            display_name: display_name.into(),
            symbol: symbol.into(),
            family,
            explorer_base_url: explorer_base_url.into(),
            parent_chain_id: None,
            children: Vec::new(),
        }
    }

    /// Attach child chains, stamping their `parent_chain_id`.
    pub fn with_children(mut self, children: Vec<ChainDescriptor>) -> Self {
        self.children = children
            .into_iter()
            .map(|mut child| {
                child.parent_chain_id = Some(self.id.clone());
                child
            })
            .collect();
        self
    }

    /// Explorer link for a transaction hash. The path segment differs per
    /// family (`/tx/` on EVM explorers, `/txn/` on the Aptos explorer).
    pub fn tx_url(&self, hash: &str) -> String {
        let base = self.explorer_base_url.trim_end_matches('/');
        match self.family {
            ChainFamily::Aptos => format!("{base}/txn/{hash}"),
            ChainFamily::Evm | ChainFamily::Sui | ChainFamily::Sei => {
                format!("{base}/tx/{hash}")
            }
        }
    }

    /// This descriptor followed by its children, depth-first.
    pub fn iter_with_children(&self) -> impl Iterator<Item = &ChainDescriptor> {
        std::iter::once(self).chain(self.children.iter())
    }
}

/// The set of chains the dashboard knows about. Lookups cover children as
/// well as top-level chains; iteration preserves insertion order so view
/// models come out in a stable order.
#[derive(Clone, Debug, Default)]
pub struct ChainRegistry {
    chains: Vec<ChainDescriptor>,
}

impl ChainRegistry {
    pub fn new(chains: Vec<ChainDescriptor>) -> Self {
        Self { chains }
    }

    /// The registry of supported mainnet chains: Ethereum with its major
    /// L2s, plus Aptos, Sui and Sei.
    pub fn mainnet() -> Self {
        let ethereum = ChainDescriptor::new(
            "ethereum",
            "Ethereum",
            "ETH",
            ChainFamily::Evm,
            "https://etherscan.io",
        )
        .with_children(vec![
            ChainDescriptor::new(
                "arbitrum-one",
                "Arbitrum",
                "ARB",
                ChainFamily::Evm,
                "https://arbiscan.io",
            ),
            ChainDescriptor::new(
                "optimistic-ethereum",
                "Optimism",
                "OP",
                ChainFamily::Evm,
                "https://optimistic.etherscan.io",
            ),
            ChainDescriptor::new(
                "zksync",
                "zkSync",
                "ZK",
                ChainFamily::Evm,
                "https://explorer.zksync.io",
            ),
            ChainDescriptor::new(
                "base",
                "Base",
                "BASE",
                ChainFamily::Evm,
                "https://basescan.org",
            ),
        ]);

        let aptos = ChainDescriptor::new(
            "aptos",
            "Aptos",
            "APT",
            ChainFamily::Aptos,
            "https://explorer.aptoslabs.com",
        );
        let sui = ChainDescriptor::new(
            "sui",
            "Sui",
            "SUI",
            ChainFamily::Sui,
            "https://suiscan.xyz/mainnet",
        );
        let sei = ChainDescriptor::new(
            "sei-network",
            "Sei",
            "SEI",
            ChainFamily::Sei,
            "https://www.seiscan.app",
        );

        Self::new(vec![ethereum, aptos, sui, sei])
    }

    pub fn chains(&self) -> &[ChainDescriptor] {
        &self.chains
    }

    /// Find a chain by id, searching children as well.
    pub fn get(&self, id: &ChainId) -> Option<&ChainDescriptor> {
        self.chains
            .iter()
            .flat_map(ChainDescriptor::iter_with_children)
            .find(|chain| &chain.id == id)
    }

    /// Ids of all top-level chains, in registry order.
    pub fn top_level_ids(&self) -> Vec<ChainId> {
        self.chains.iter().map(|chain| chain.id.clone()).collect()
    }

    /// Ids of every chain including children, in registry order. This is the
    /// id set handed to the bulk market fetch.
    pub fn all_ids(&self) -> Vec<ChainId> {
        self.chains
            .iter()
            .flat_map(ChainDescriptor::iter_with_children)
            .map(|chain| chain.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
