/// Live dashboard monitor - connects to the real public APIs
///
/// Subscribes to the multi-chain overview plus one chain's detail view and
/// prints every refresh until Ctrl+C. Read-only; no API key is required,
/// though without ETHERSCAN_API_KEY the gas column usually shows N/A.

use chainboard::{
    BoardConfig, ChainDetailSubscription, ChainId, ChainViewModel, Chainboard, TransactionRecord,
    WalletView,
};
use eyre::Result;
use std::time::Instant;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        // A missing .env file is fine.
        eprintln!("note: no .env file loaded: {}", e);
    }

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_line_number(true)
        .init();

    info!("Starting live dashboard monitor");
    info!("{}", "=".repeat(60));

    validate_environment();

    let config = create_board_config()?;
    let board = Chainboard::new(config)?;

    run_live_monitoring(&board).await?;

    Ok(())
}

/// Check optional environment configuration and warn about the consequences
/// of leaving it out.
fn validate_environment() {
    info!("Checking environment configuration...");

    if std::env::var("ETHERSCAN_API_KEY").is_err() {
        warn!("ETHERSCAN_API_KEY is not set");
        warn!("The gas oracle and EVM explorers are heavily rate limited without one");
    } else {
        info!("Found ETHERSCAN_API_KEY");
    }

    if std::env::var("DETAIL_CHAIN").is_err() {
        info!("DETAIL_CHAIN not set, detail view defaults to ethereum");
    }
    if std::env::var("WALLET_ADDRESS").is_err() {
        info!("WALLET_ADDRESS not set, skipping the wallet lookup demo");
    }
}

/// Build the service configuration from the environment with defaults for
/// everything unset.
fn create_board_config() -> Result<BoardConfig> {
    info!("Creating service configuration...");

    let config = BoardConfig::from_env()?;

    info!("Configuration:");
    info!("  Market API:  {}", config.market_api_url);
    info!("  Gas oracle:  {}", config.gas_oracle_url);
    info!("  TVL API:     {}", config.tvl_api_url);
    info!("  Overview cadence: {}s", config.overview_interval_secs);
    info!("  Detail cadence:   {}s", config.detail_interval_secs);

    Ok(config)
}

/// Run the monitoring loop until Ctrl+C.
async fn run_live_monitoring(board: &Chainboard) -> Result<()> {
    info!("Starting live monitoring...");
    info!("Press Ctrl+C to stop");

    let mut overview = board.subscribe_chain_overview(&[]);

    let detail_chain = ChainId::new(
        std::env::var("DETAIL_CHAIN").unwrap_or_else(|_| "ethereum".to_string()),
    );
    let mut detail = board.subscribe_chain_detail(&detail_chain)?;

    // One-shot wallet demo before the loop, when an address is configured.
    if let Ok(address) = std::env::var("WALLET_ADDRESS") {
        let wallet_chain = ChainId::new(
            std::env::var("WALLET_CHAIN").unwrap_or_else(|_| "ethereum".to_string()),
        );
        run_wallet_lookup(board, &wallet_chain, &address).await?;
    }

    let mut overview_refreshes = 0u64;
    let mut detail_refreshes = 0u64;
    let start_time = Instant::now();

    loop {
        tokio::select! {
            changed = overview.changed() => {
                if changed.is_err() {
                    warn!("overview polling loop stopped");
                    break;
                }
                let state = overview.state();
                if state.loading {
                    info!("Overview loading...");
                    continue;
                }
                if let Some(error) = &state.error {
                    warn!("Overview refresh failed ({}), keeping last values", error);
                }
                if let Some(views) = &state.value {
                    overview_refreshes += 1;
                    display_overview(views);
                }
            }

            changed = detail.changed() => {
                if changed.is_err() {
                    warn!("detail polling loop stopped");
                    break;
                }
                detail_refreshes += 1;
                display_detail(&detail);
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received stop signal, shutting down...");
                break;
            }
        }
    }

    display_final_stats(overview_refreshes, detail_refreshes, start_time);
    Ok(())
}

/// Print the overview table, one row per chain with its L2s indented.
fn display_overview(views: &[ChainViewModel]) {
    info!("Chain overview ({} chains):", views.len());
    info!(
        "  {:<22} {:>12} {:>9} {:>10} {:>10}",
        "chain", "price", "24h", "gas", "tvl"
    );
    for view in views {
        display_overview_row(view, 0);
    }
}

fn display_overview_row(view: &ChainViewModel, indent: usize) {
    info!(
        "  {:<22} {:>12} {:>9} {:>10} {:>10}",
        format!("{}{}", "  ".repeat(indent), view.display_name),
        view.price_label(),
        view.change_label(),
        view.gas_label(),
        view.tvl_label(),
    );
    for l2 in &view.l2s {
        display_overview_row(l2, indent + 1);
    }
}

/// Print the detail view for the subscribed chain.
fn display_detail(detail: &ChainDetailSubscription) {
    let view = detail.view();
    if view.loading {
        info!("Detail for {} still loading...", detail.chain().display_name);
        return;
    }
    if let Some(error) = &view.error {
        warn!(
            "Detail refresh for {} failed ({}), keeping last values",
            detail.chain().display_name,
            error
        );
    }

    if let Some(stats) = &view.stats {
        info!(
            "{}: block {} | gas {} | {} txs in latest block | tps {}",
            detail.chain().display_name,
            stats.latest_block,
            stats.gas_price_display,
            stats.approx_tx_count,
            stats
                .tps
                .map(|tps| format!("{tps:.1}"))
                .unwrap_or_else(|| "-".to_string()),
        );
    }
    if let Some(transactions) = &view.transactions {
        for record in transactions.iter().take(3) {
            info!("  {}", describe_transaction(record));
        }
        if transactions.len() > 3 {
            info!("  ...and {} more", transactions.len() - 3);
        }
    }
}

/// Look up one wallet, wait for the first settle and print the result.
async fn run_wallet_lookup(board: &Chainboard, chain_id: &ChainId, address: &str) -> Result<()> {
    info!("Looking up wallet {} on {}...", address, chain_id);

    let mut subscription = board.query_wallet(chain_id, address)?;
    let state = subscription.next_settled().await?;

    if let Some(error) = &state.error {
        warn!("Wallet lookup failed: {}", error);
        return Ok(());
    }
    if let Some(view) = &state.value {
        display_wallet(view);
    }
    Ok(())
}

fn display_wallet(view: &WalletView) {
    if !view.supported {
        info!("Wallet lookups are not supported on this chain family");
        return;
    }
    info!(
        "Wallet balance: {} | known transactions: {}",
        view.balance.as_deref().unwrap_or("-"),
        view.transaction_count
            .map(|count| count.to_string())
            .unwrap_or_else(|| "-".to_string()),
    );
    for record in view.shortlist() {
        info!("  {}", describe_transaction(record));
    }
}

/// One-line rendering of a transaction record, per chain family.
fn describe_transaction(record: &TransactionRecord) -> String {
    match record {
        TransactionRecord::Evm { hash, from, to, .. } => format!(
            "tx {} from {} to {}",
            shorten(hash),
            shorten(from),
            to.as_deref().map(shorten).unwrap_or_else(|| "(contract creation)".to_string()),
        ),
        TransactionRecord::Aptos { version, sender, gas_used, .. } => {
            format!("version {} from {} (gas {})", version, shorten(sender), gas_used)
        }
        TransactionRecord::Sui { digest } => format!("checkpoint tx {}", shorten(digest)),
        TransactionRecord::Sei { hash, height, .. } => {
            format!("tx {} at height {}", shorten(hash), height)
        }
    }
}

/// Shorten a hash or address for terminal output.
fn shorten(value: &str) -> String {
    if value.len() > 14 {
        format!("{}...{}", &value[..8], &value[value.len() - 4..])
    } else {
        value.to_string()
    }
}

/// Print the final run statistics.
fn display_final_stats(overview_refreshes: u64, detail_refreshes: u64, start_time: Instant) {
    let elapsed = start_time.elapsed();
    info!("Final report:");
    info!("{}", "=".repeat(40));
    info!("  Total runtime:      {:?}", elapsed);
    info!("  Overview refreshes: {}", overview_refreshes);
    info!("  Detail refreshes:   {}", detail_refreshes);
}
