//! Source layer: adapters over every upstream API the dashboard reads.
//!
//! Each adapter owns one upstream's wire format and folds its failures into
//! [`crate::errors::FetchError`] at the boundary. The aggregation and
//! polling layers only ever see the shared view types.

pub mod explorers;
pub mod gas;
pub mod http;
pub mod market;
pub mod tvl;


pub use explorers::{
    AdapterRegistry, AptosAdapter, ChainAdapter, EvmExplorerAdapter, SeiRestAdapter,
    SuiRpcAdapter, standard_adapters,
};
pub use gas::GasOracleClient;
pub use http::HttpClient;
pub use market::MarketDataClient;
pub use tvl::{TvlClient, default_aliases};
