// Three-Layer Architecture
pub mod sources;    // Source Layer: upstream API adapters, wire formats
pub mod aggregate;  // Aggregation Layer: view model assembly
pub mod poll;       // Polling Layer: keyed refresh loops, subscriptions

// Common utilities and types
pub mod config;
pub mod errors;
pub mod registry;
pub mod utils;

// Re-export key components from each layer
pub use aggregate::{
    ChainViewModel, GasSnapshot, MarketSnapshot, NetworkSnapshot, TransactionRecord, TvlIndex,
    WalletProfile, WalletView, combine, format_usd_compact,
};
pub use config::BoardConfig;
pub use errors::FetchError;
pub use poll::{
    ChainDetailSubscription, ChainDetailView, Chainboard, ChainboardBuilder, PollKey, PollState,
    PollSubscription,
};
pub use registry::{ChainDescriptor, ChainFamily, ChainId, ChainRegistry};
pub use sources::{
    AdapterRegistry, AptosAdapter, ChainAdapter, EvmExplorerAdapter, GasOracleClient, HttpClient,
    MarketDataClient, SeiRestAdapter, SuiRpcAdapter, TvlClient, standard_adapters,
};
