//! CEX Arbitrage Bot
//! Main entry point: startup fetches, then the sequential driver loop over
//! the common pairs.
//!
//! Author: AI-Generated
//! Created: 2026-07-28

use anyhow::Result;
use cexarb_bot::arbitrage::{common_pairs, OpportunityDetector, QuoteOrchestrator, RoundError};
use cexarb_bot::config::load_config;
use cexarb_bot::exchanges::{
    Bitfinex, ExchangeAdapter, ExchangeError, Gemini, Kraken, OkCoin, SharedAdapter,
};
use cexarb_bot::http::HttpClient;
use cexarb_bot::opportunity_log::OpportunityLog;
use cexarb_bot::storage;
use cexarb_bot::types::Exchange;
use cexarb_bot::wallet::WalletRegistry;
use clap::Parser;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cexarb-bot", about = "Cross-exchange spot arbitrage scanner")]
struct Cli {
    /// Run a single sweep over the common pairs and exit.
    #[arg(long)]
    once: bool,
    /// Comma-separated pair ids to restrict the scan to (e.g. "btcusd,ethusd").
    #[arg(long)]
    pairs: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config()?;

    info!("CEX Arbitrage Bot starting");
    storage::ensure_exchange_dirs(&config.data_dir)?;

    let http = Arc::new(HttpClient::new(config.http_timeout_ms)?);
    let adapters: Vec<SharedAdapter> = vec![
        Arc::new(Mutex::new(Bitfinex::new(Arc::clone(&http), &config.data_dir))),
        Arc::new(Mutex::new(Gemini::new(
            Arc::clone(&http),
            &config.data_dir,
            config.gemini_maker_fee,
            config.gemini_taker_fee,
        ))),
        Arc::new(Mutex::new(Kraken::new(Arc::clone(&http), &config.data_dir))),
        Arc::new(Mutex::new(OkCoin::new(Arc::clone(&http), &config.data_dir))),
    ];

    // Startup fetches run per exchange, in parallel: pairs list, pair
    // metadata, then the primed book cache.
    let startups = adapters.iter().map(|adapter| async move {
        let mut guard = adapter.lock().await;
        let exchange = guard.exchange();
        let result = startup(&mut *guard).await;
        (exchange, result)
    });
    let results = join_all(startups).await;

    // An exchange that exposes no books cannot contribute to any pair; drop
    // it for this run instead of letting it empty the common set.
    let mut ready: Vec<SharedAdapter> = Vec::new();
    for (adapter, (exchange, result)) in adapters.into_iter().zip(results) {
        match result {
            Ok(count) if count > 0 => {
                info!("{} ready with {} cached books", exchange, count);
                ready.push(adapter);
            }
            Ok(_) => warn!("{} exposed no order books, excluding it from this run", exchange),
            Err(e) => warn!("{} startup failed ({}), excluding it from this run", exchange, e),
        }
    }

    if ready.len() < 2 {
        warn!("Fewer than two exchanges available, nothing to arbitrage");
        return Ok(());
    }

    let mut initial = Vec::with_capacity(ready.len());
    for adapter in &ready {
        initial.push(adapter.lock().await.to_snapshot());
    }

    let mut pairs = common_pairs(&initial);
    if let Some(filter) = &cli.pairs {
        let wanted: HashSet<&str> = filter.split(',').map(str::trim).collect();
        pairs.retain(|pair| wanted.contains(pair.as_str()));
    }
    if pairs.is_empty() {
        warn!("No common pairs to scan, exiting");
        return Ok(());
    }
    pairs.sort();
    info!(
        "Scanning {} common pairs across {} exchanges",
        pairs.len(),
        ready.len()
    );

    let exchanges: Vec<Exchange> = {
        let mut exchanges = Vec::with_capacity(ready.len());
        for adapter in &ready {
            exchanges.push(adapter.lock().await.exchange());
        }
        exchanges
    };

    let registry = WalletRegistry::new();
    registry.seed(&exchanges, &pairs, config.starting_balance);

    let orchestrator =
        QuoteOrchestrator::new(ready, Duration::from_millis(config.round_timeout_ms));
    let detector = OpportunityDetector::new();
    let log = OpportunityLog::new(&config.opportunity_log);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    'sweeps: loop {
        for pair in &pairs {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping");
                    break 'sweeps;
                }
                _ = run_round(&orchestrator, &detector, &registry, &log, pair) => {}
            }
            tokio::time::sleep(Duration::from_millis(config.poll_interval_ms)).await;
        }
        if cli.once {
            info!("Single sweep complete");
            break;
        }
    }

    Ok(())
}

async fn startup(adapter: &mut dyn ExchangeAdapter) -> Result<usize, ExchangeError> {
    let pairs = adapter.fetch_pairs_list().await?;
    debug!("{} lists {} pairs", adapter.exchange(), pairs.len());
    adapter.fetch_pair_details().await?;
    adapter.prime_books().await
}

/// One full round for one pair: refresh everywhere, prune, detect, book, log.
async fn run_round(
    orchestrator: &QuoteOrchestrator,
    detector: &OpportunityDetector,
    registry: &WalletRegistry,
    log: &OpportunityLog,
    pair_id: &str,
) {
    let mut snapshots = Vec::with_capacity(orchestrator.adapters().len());
    for adapter in orchestrator.adapters() {
        let guard = adapter.lock().await;
        let mut snapshot = guard.to_snapshot();
        snapshot.wallet = registry.wallet(guard.exchange());
        snapshots.push(snapshot);
    }

    let survivors = match orchestrator.refresh_round(pair_id, snapshots).await {
        Ok(survivors) => survivors,
        Err(RoundError::InsufficientSurvivors { survivors }) => {
            debug!(
                "Round for [{}] aborted with {} survivor(s), moving on",
                pair_id, survivors
            );
            return;
        }
    };

    if let Some(opportunity) = detector.check_pair(pair_id, &survivors) {
        registry.apply(&opportunity);
        log.append(&opportunity);
    }
}
