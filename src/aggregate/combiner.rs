use crate::aggregate::types::{ChainViewModel, GasSnapshot, MarketSnapshot, TvlIndex};
use crate::registry::{ChainDescriptor, ChainId};
use std::collections::HashMap;

/// Merge per-source data into one view model per chain.
///
/// This is a total function: every descriptor yields a view model no matter
/// which sources delivered, and a source that failed or skipped a chain
/// leaves the matching fields `None`. Children are combined with the same
/// rule and nested under their parent.
pub fn combine(
    chains: &[ChainDescriptor],
    market: &HashMap<ChainId, MarketSnapshot>,
    gas: Option<&GasSnapshot>,
    tvl: &TvlIndex,
) -> Vec<ChainViewModel> {
    chains
        .iter()
        .map(|chain| combine_one(chain, market, gas, tvl))
        .collect()
}

fn combine_one(
    chain: &ChainDescriptor,
    market: &HashMap<ChainId, MarketSnapshot>,
    gas: Option<&GasSnapshot>,
    tvl: &TvlIndex,
) -> ChainViewModel {
    let mut vm = ChainViewModel::from_descriptor(chain);

    if let Some(snapshot) = market.get(&chain.id) {
        vm.price_usd = snapshot.price_usd;
        vm.market_cap_usd = snapshot.market_cap_usd;
        vm.price_change_24h_percent = snapshot.price_change_24h_percent;
        vm.logo_url = snapshot.logo_url.clone();
    }

    // The oracle covers a single chain; everyone else keeps None.
    if let Some(gas) = gas {
        if gas.chain_id == chain.id {
            vm.gas_price_display = gas.display.clone();
        }
    }

    vm.tvl_usd = tvl.get(&chain.display_name);

    vm.l2s = chain
        .children
        .iter()
        .map(|child| combine_one(child, market, gas, tvl))
        .collect();
    vm
}
