//! Per-round quote orchestration
//!
//! One task per exchange, all refreshing the same pair under a shared
//! wall-clock budget. Tasks settle in whatever order the network decides, so
//! failures are collected as indices, sorted, and removed afterwards; the
//! survivor slice keeps a deterministic order no matter who finished first.
//!
//! A refresh replaces only the order book: the wallet and fee values a
//! snapshot carried into the round must come out unchanged, otherwise the
//! bookkeeper's state would be silently erased.
//!
//! Author: AI-Generated
//! Created: 2026-07-28

use crate::exchanges::{ExchangeError, SharedAdapter};
use crate::types::MarketSnapshot;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RoundError {
    /// Fewer than two exchanges answered; there is nothing to compare.
    #[error("only {survivors} exchange(s) survived the round, need at least 2")]
    InsufficientSurvivors { survivors: usize },
}

/// Fans one pair refresh out to every adapter and prunes the failures.
pub struct QuoteOrchestrator {
    adapters: Vec<SharedAdapter>,
    round_timeout: Duration,
}

impl QuoteOrchestrator {
    pub fn new(adapters: Vec<SharedAdapter>, round_timeout: Duration) -> Self {
        Self {
            adapters,
            round_timeout,
        }
    }

    pub fn adapters(&self) -> &[SharedAdapter] {
        &self.adapters
    }

    /// Refresh `pair_id` on every exchange and return the surviving
    /// snapshots, in the same relative order as the input.
    ///
    /// `snapshots` must be index-aligned with the orchestrator's adapters.
    /// Survivors keep the wallet and fees they carried into the round; only
    /// their order books are replaced.
    pub async fn refresh_round(
        &self,
        pair_id: &str,
        snapshots: Vec<MarketSnapshot>,
    ) -> Result<Vec<MarketSnapshot>, RoundError> {
        debug_assert_eq!(snapshots.len(), self.adapters.len());

        for adapter in &self.adapters {
            adapter.lock().await.begin_round(pair_id);
        }

        let mut tasks = JoinSet::new();
        for (index, adapter) in self.adapters.iter().enumerate() {
            let adapter = Arc::clone(adapter);
            let pair = pair_id.to_string();
            let budget = self.round_timeout;

            tasks.spawn(async move {
                let refreshed = timeout(budget, async {
                    let mut guard = adapter.lock().await;
                    guard.refresh_top_of_book(&pair).await
                })
                .await;

                match refreshed {
                    Ok(Ok(_)) => (index, true),
                    Ok(Err(ExchangeError::PairNotTradable(pair))) => {
                        info!("Pair [{}] not tradable, excluding exchange this round", pair);
                        (index, false)
                    }
                    Ok(Err(e)) => {
                        warn!("Refresh of [{}] failed: {}", pair, e);
                        (index, false)
                    }
                    Err(_) => {
                        // Deadline elapsed: the in-flight request was dropped
                        // and its partial result discarded.
                        adapter.lock().await.mark_failed(&pair);
                        warn!("Refresh of [{}] exceeded the round budget", pair);
                        (index, false)
                    }
                }
            });
        }

        let mut failed: Vec<usize> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, true)) => {}
                Ok((index, false)) => failed.push(index),
                Err(e) => error!("Refresh task aborted: {}", e),
            }
        }

        // Results arrive in completion order; sort so removal is stable.
        failed.sort_unstable();

        let indexed: Vec<(usize, MarketSnapshot)> = snapshots.into_iter().enumerate().collect();
        let surviving = remove_failed(indexed, &failed);

        if surviving.len() < 2 {
            return Err(RoundError::InsufficientSurvivors {
                survivors: surviving.len(),
            });
        }

        let mut survivors = Vec::with_capacity(surviving.len());
        for (index, previous) in surviving {
            let mut refreshed = self.adapters[index].lock().await.to_snapshot();
            refreshed.wallet = previous.wallet;
            refreshed.maker_fee = previous.maker_fee;
            refreshed.taker_fee = previous.taker_fee;
            survivors.push(refreshed);
        }
        Ok(survivors)
    }
}

/// Remove an ascending index list from the items, preserving the relative
/// order of everything else.
fn remove_failed<T>(items: Vec<T>, failed: &[usize]) -> Vec<T> {
    let mut failed = failed.iter().peekable();
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            if failed.peek() == Some(&&index) {
                failed.next();
                None
            } else {
                Some(item)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::ExchangeAdapter;
    use crate::types::{Exchange, MarketSnapshot, Order, PairBook, Wallet};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    struct MockAdapter {
        exchange: Exchange,
        fail: bool,
        delay: Option<Duration>,
        book: PairBook,
        maker_fee: f64,
        taker_fee: f64,
    }

    impl MockAdapter {
        fn shared(exchange: Exchange, fail: bool, delay: Option<Duration>) -> SharedAdapter {
            let book = PairBook {
                pair_id: "btcusd".to_string(),
                asks: vec![Order::new(101.0, 2.0)],
                bids: vec![Order::new(100.0, 2.0)],
            };
            Arc::new(Mutex::new(MockAdapter {
                exchange,
                fail,
                delay,
                book,
                maker_fee: 0.1,
                taker_fee: 0.2,
            }))
        }
    }

    #[async_trait]
    impl ExchangeAdapter for MockAdapter {
        fn exchange(&self) -> Exchange {
            self.exchange
        }

        fn normalize_pair(&self, pair_id: &str) -> String {
            pair_id.to_string()
        }

        fn maker_fee(&self) -> f64 {
            self.maker_fee
        }

        fn taker_fee(&self) -> f64 {
            self.taker_fee
        }

        async fn fetch_pairs_list(&mut self) -> Result<Vec<String>, ExchangeError> {
            Ok(Vec::new())
        }

        async fn fetch_pair_details(&mut self) -> Result<(), ExchangeError> {
            Ok(())
        }

        async fn prime_books(&mut self) -> Result<usize, ExchangeError> {
            Ok(0)
        }

        async fn refresh_top_of_book(
            &mut self,
            _pair_id: &str,
        ) -> Result<PairBook, ExchangeError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(ExchangeError::Transport("connection refused".to_string()));
            }
            Ok(self.book.clone())
        }

        fn to_snapshot(&self) -> MarketSnapshot {
            let mut snapshot =
                MarketSnapshot::new(self.exchange, self.maker_fee, self.taker_fee);
            snapshot
                .asks
                .insert(self.book.pair_id.clone(), self.book.asks.clone());
            snapshot
                .bids
                .insert(self.book.pair_id.clone(), self.book.bids.clone());
            snapshot
        }
    }

    fn input_snapshot(exchange: Exchange, balance: f64) -> MarketSnapshot {
        let mut snapshot = MarketSnapshot::new(exchange, 0.1, 0.2);
        let mut wallet = Wallet::new(exchange);
        wallet.coins.insert("btc".to_string(), balance);
        wallet.coins.insert("usd".to_string(), balance);
        snapshot.wallet = wallet;
        snapshot
    }

    #[tokio::test]
    async fn test_failed_adapters_are_pruned_in_order() {
        let adapters = vec![
            MockAdapter::shared(Exchange::Bitfinex, false, None),
            MockAdapter::shared(Exchange::Gemini, true, None),
            MockAdapter::shared(Exchange::Kraken, true, None),
            MockAdapter::shared(Exchange::OkCoin, false, None),
        ];
        let orchestrator = QuoteOrchestrator::new(adapters, Duration::from_secs(2));

        let snapshots = vec![
            input_snapshot(Exchange::Bitfinex, 100.0),
            input_snapshot(Exchange::Gemini, 100.0),
            input_snapshot(Exchange::Kraken, 100.0),
            input_snapshot(Exchange::OkCoin, 100.0),
        ];

        let survivors = orchestrator.refresh_round("btcusd", snapshots).await.unwrap();
        let names: Vec<Exchange> = survivors.iter().map(|s| s.exchange).collect();
        assert_eq!(names, vec![Exchange::Bitfinex, Exchange::OkCoin]);
    }

    #[tokio::test]
    async fn test_survivors_keep_wallet_and_fees() {
        let adapters = vec![
            MockAdapter::shared(Exchange::Bitfinex, false, None),
            MockAdapter::shared(Exchange::Kraken, false, None),
        ];
        let orchestrator = QuoteOrchestrator::new(adapters, Duration::from_secs(2));

        let inputs = vec![
            input_snapshot(Exchange::Bitfinex, 250.0),
            input_snapshot(Exchange::Kraken, 75.0),
        ];
        let expected: Vec<Wallet> = inputs.iter().map(|s| s.wallet.clone()).collect();

        let survivors = orchestrator.refresh_round("btcusd", inputs).await.unwrap();
        for (survivor, wallet) in survivors.iter().zip(&expected) {
            assert_eq!(&survivor.wallet, wallet);
            assert_eq!(survivor.maker_fee, 0.1);
            assert_eq!(survivor.taker_fee, 0.2);
            // The book itself was replaced by the refresh.
            assert!(survivor.best_ask("btcusd").is_some());
        }
    }

    #[tokio::test]
    async fn test_insufficient_survivors_aborts_round() {
        let adapters = vec![
            MockAdapter::shared(Exchange::Bitfinex, true, None),
            MockAdapter::shared(Exchange::Gemini, true, None),
            MockAdapter::shared(Exchange::Kraken, true, None),
            MockAdapter::shared(Exchange::OkCoin, false, None),
        ];
        let orchestrator = QuoteOrchestrator::new(adapters, Duration::from_secs(2));

        let snapshots = vec![
            input_snapshot(Exchange::Bitfinex, 1.0),
            input_snapshot(Exchange::Gemini, 1.0),
            input_snapshot(Exchange::Kraken, 1.0),
            input_snapshot(Exchange::OkCoin, 1.0),
        ];

        let result = orchestrator.refresh_round("btcusd", snapshots).await;
        assert!(matches!(
            result,
            Err(RoundError::InsufficientSurvivors { survivors: 1 })
        ));
    }

    #[tokio::test]
    async fn test_deadline_prunes_hung_adapter() {
        let adapters = vec![
            MockAdapter::shared(Exchange::Bitfinex, false, None),
            MockAdapter::shared(Exchange::Kraken, false, Some(Duration::from_secs(5))),
            MockAdapter::shared(Exchange::OkCoin, false, None),
        ];
        let orchestrator = QuoteOrchestrator::new(adapters, Duration::from_millis(50));

        let snapshots = vec![
            input_snapshot(Exchange::Bitfinex, 1.0),
            input_snapshot(Exchange::Kraken, 1.0),
            input_snapshot(Exchange::OkCoin, 1.0),
        ];

        let survivors = orchestrator.refresh_round("btcusd", snapshots).await.unwrap();
        let names: Vec<Exchange> = survivors.iter().map(|s| s.exchange).collect();
        assert_eq!(names, vec![Exchange::Bitfinex, Exchange::OkCoin]);
    }

    #[test]
    fn test_remove_failed_preserves_order() {
        let items = vec!["1", "2", "3", "4", "5", "6"];
        let remaining = remove_failed(items, &[0, 1, 2, 3]);
        assert_eq!(remaining, vec!["5", "6"]);
    }

    #[test]
    fn test_remove_failed_nothing_failed() {
        let items = vec![10, 20, 30];
        assert_eq!(remove_failed(items, &[]), vec![10, 20, 30]);
    }
}
