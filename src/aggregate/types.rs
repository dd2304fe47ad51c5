use crate::registry::{ChainDescriptor, ChainId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Market data for one chain's native asset, as returned by the bulk market
/// fetch. Fields are optional because the provider serves explicit nulls for
/// thin assets.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub price_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub price_change_24h_percent: Option<f64>,
    pub logo_url: Option<String>,
}

/// Gas oracle reading for the one chain the oracle covers.
///
/// `display` is `None` when the oracle reported a failure status or an
/// unusable payload; the refresh as a whole still succeeds and the field
/// surfaces as unavailable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GasSnapshot {
    pub chain_id: ChainId,
    /// Ready-to-render value, e.g. `"12 Gwei"`.
    pub display: Option<String>,
}

impl GasSnapshot {
    pub fn unavailable(chain_id: ChainId) -> Self {
        Self { chain_id, display: None }
    }

    pub fn is_available(&self) -> bool {
        self.display.is_some()
    }
}

/// Total value locked per chain, reduced from the provider's per-protocol
/// rows. Keys are the provider's chain display names after alias
/// resolution, so lookups use `ChainDescriptor::display_name`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TvlIndex {
    totals: HashMap<String, f64>,
}

impl TvlIndex {
    /// Add one protocol row into the per-chain total. Rows with
    /// non-finite or negative values are dropped; summation is
    /// commutative so row order never changes the result.
    pub fn add_row(&mut self, chain_name: &str, tvl_usd: f64) {
        if !tvl_usd.is_finite() || tvl_usd < 0.0 {
            return;
        }
        *self.totals.entry(chain_name.to_owned()).or_insert(0.0) += tvl_usd;
    }

    pub fn get(&self, chain_name: &str) -> Option<f64> {
        self.totals.get(chain_name).copied()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

/// Live network statistics for one chain's detail view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    /// Latest block height, checkpoint sequence number for Sui.
    pub latest_block: u64,
    /// Ready-to-render gas price; `"-"` for families without a gas market.
    pub gas_price_display: String,
    /// Transactions observed in the latest block or checkpoint.
    pub approx_tx_count: u64,
    /// Recent throughput in transactions per second, where the family
    /// exposes enough data to derive it.
    pub tps: Option<f64>,
}

/// One recent transaction, shaped per chain family. Value and balance
/// fields stay in chain-native units as raw strings; rendering decides
/// how to scale them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum TransactionRecord {
    Evm {
        hash: String,
        from: String,
        to: Option<String>,
        /// Wei amount as the explorer returned it (hex in block payloads,
        /// decimal in account history).
        value: String,
        /// Unix seconds.
        timestamp: u64,
    },
    Aptos {
        version: u64,
        sender: String,
        gas_used: u64,
        /// Unix seconds.
        timestamp: u64,
    },
    Sui {
        digest: String,
    },
    Sei {
        hash: String,
        height: u64,
        /// RFC 3339 timestamp as returned by the gateway.
        timestamp: String,
    },
}

impl TransactionRecord {
    /// The hash-like identifier used to build explorer links.
    pub fn link_id(&self) -> &str {
        match self {
            Self::Evm { hash, .. } | Self::Sei { hash, .. } => hash,
            Self::Sui { digest } => digest,
            Self::Aptos { .. } => "",
        }
    }

    /// Explorer URL for this transaction, or `None` where the record has no
    /// linkable id (Aptos records link by version instead).
    pub fn explorer_url(&self, chain: &ChainDescriptor) -> Option<String> {
        match self {
            Self::Aptos { version, .. } => Some(chain.tx_url(&version.to_string())),
            _ => {
                let id = self.link_id();
                (!id.is_empty()).then(|| chain.tx_url(id))
            }
        }
    }
}

/// Wallet lookup result from an explorer adapter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WalletProfile {
    /// Native-unit balance as a raw string (wei for EVM chains).
    pub balance: String,
    pub transaction_count: u64,
    /// Newest first, at most ten records.
    pub recent_transactions: Vec<TransactionRecord>,
}

/// Wallet view handed to subscribers. Lookups against families without
/// wallet support settle into a typed `supported: false` value instead of
/// an error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WalletView {
    pub supported: bool,
    pub balance: Option<String>,
    pub transaction_count: Option<u64>,
    pub recent_transactions: Vec<TransactionRecord>,
}

impl WalletView {
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            balance: None,
            transaction_count: None,
            recent_transactions: Vec::new(),
        }
    }

    pub fn from_profile(profile: WalletProfile) -> Self {
        Self {
            supported: true,
            balance: Some(profile.balance),
            transaction_count: Some(profile.transaction_count),
            recent_transactions: profile.recent_transactions,
        }
    }

    /// The shortlist shown inline, at most five records.
    pub fn shortlist(&self) -> &[TransactionRecord] {
        let n = self.recent_transactions.len().min(5);
        &self.recent_transactions[..n]
    }
}

/// Everything the overview needs to render one chain. Unavailable fields
/// are `None` and serialize as explicit nulls so downstream consumers can
/// tell "unavailable" apart from zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainViewModel {
    pub id: ChainId,
    pub display_name: String,
    pub symbol: String,
    pub explorer_base_url: String,
    pub price_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub price_change_24h_percent: Option<f64>,
    pub logo_url: Option<String>,
    pub gas_price_display: Option<String>,
    pub tvl_usd: Option<f64>,
    #[serde(default)]
    pub l2s: Vec<ChainViewModel>,
}

impl ChainViewModel {
    /// Static fields only; every data field starts unavailable.
    pub fn from_descriptor(chain: &ChainDescriptor) -> Self {
        Self {
            id: chain.id.clone(),
            display_name: chain.display_name.clone(),
            symbol: chain.symbol.clone(),
            explorer_base_url: chain.explorer_base_url.clone(),
            price_usd: None,
            market_cap_usd: None,
            price_change_24h_percent: None,
            logo_url: None,
            gas_price_display: None,
            tvl_usd: None,
            l2s: Vec::new(),
        }
    }

    pub fn price_label(&self) -> String {
        match self.price_usd {
            Some(price) => format!("${price:.2}"),
            None => "N/A".to_owned(),
        }
    }

    pub fn change_label(&self) -> String {
        match self.price_change_24h_percent {
            Some(change) => format!("{change:+.2}%"),
            None => "N/A".to_owned(),
        }
    }

    pub fn gas_label(&self) -> String {
        self.gas_price_display.clone().unwrap_or_else(|| "N/A".to_owned())
    }

    pub fn tvl_label(&self) -> String {
        match self.tvl_usd {
            Some(tvl) => format_usd_compact(tvl),
            None => "N/A".to_owned(),
        }
    }
}

/// Compact dollar formatting for dashboard cells: `$51.00B`, `$12.30M`.
pub fn format_usd_compact(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e12 {
        format!("${:.2}T", value / 1e12)
    } else if abs >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("${:.2}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("${:.2}K", value / 1e3)
    } else {
        format!("${value:.2}")
    }
}
