//! Aggregation layer: pure assembly of source data into view models.

pub mod combiner;
pub mod types;

pub use combiner::combine;
pub use types::{
    ChainViewModel, GasSnapshot, MarketSnapshot, NetworkSnapshot, TransactionRecord, TvlIndex,
    WalletProfile, WalletView, format_usd_compact,
};
