//! Opportunity detection
//!
//! Scans the surviving snapshots of a round for the most profitable
//! fee-adjusted round trip on a single pair.
//!
//! The buy leg is chosen as the minimum over top bids and the sell leg as the
//! maximum over top asks. Conventional book semantics would swap the two
//! sides; this scanner intentionally keeps the inherited behavior, and it
//! must not be "corrected" without a product decision (see DESIGN.md).
//!
//! Author: AI-Generated
//! Created: 2026-07-28

use crate::types::{MarketSnapshot, Opportunity, Order};
use tracing::{debug, info};

/// Cross-exchange opportunity detector for one pair at a time.
pub struct OpportunityDetector;

impl OpportunityDetector {
    pub fn new() -> Self {
        Self
    }

    /// Find the best opportunity for `pair_id` among the survivors.
    ///
    /// Returns `None` when fewer than two snapshots are given, when buy and
    /// sell would land on the same exchange, when the shared volume does not
    /// clear both minimum-volume floors, or when no candidate earns anything
    /// after taker fees. Ties on earning keep the first candidate found.
    pub fn check_pair(&self, pair_id: &str, snapshots: &[MarketSnapshot]) -> Option<Opportunity> {
        if snapshots.len() < 2 {
            debug!("Pair {} has < 2 surviving exchanges, skipping", pair_id);
            return None;
        }

        let mut best_buy = 0usize;
        let mut best_sell = 0usize;
        let mut best: Option<Opportunity> = None;

        for candidate in 1..snapshots.len() {
            let market = &snapshots[candidate];

            let market_bid = market.best_bid(pair_id);
            let market_ask = market.best_ask(pair_id);
            if market_bid.is_none() || market_ask.is_none() {
                debug!(
                    "{}: missing quotes on {}, skipping comparison",
                    pair_id, market.exchange
                );
            } else {
                // Buy side: lowest top bid wins.
                if let (Some(bid), Some(current)) =
                    (market_bid, snapshots[best_buy].best_bid(pair_id))
                {
                    if market.exchange != snapshots[best_sell].exchange
                        && bid.price < current.price
                    {
                        best_buy = candidate;
                    }
                }

                // Sell side: highest top ask wins.
                if let (Some(ask), Some(current)) =
                    (market_ask, snapshots[best_sell].best_ask(pair_id))
                {
                    if market.exchange != snapshots[best_sell].exchange
                        && ask.price > current.price
                    {
                        best_sell = candidate;
                    }
                }
            }

            if snapshots[best_buy].exchange == snapshots[best_sell].exchange {
                continue;
            }

            let (Some(buy_order), Some(sell_order)) = (
                snapshots[best_buy].best_bid(pair_id),
                snapshots[best_sell].best_ask(pair_id),
            ) else {
                continue;
            };

            let Some(found) =
                self.evaluate(pair_id, snapshots, best_buy, best_sell, buy_order, sell_order)
            else {
                continue;
            };

            // Strictly greater: on equal earning the first candidate stands.
            if best
                .as_ref()
                .map_or(true, |current| found.earning > current.earning)
            {
                best = Some(found);
            }
        }

        if let Some(opportunity) = &best {
            info!(
                "🎯 OPPORTUNITY: {} | Buy {} @ {:.6} | Sell {} @ {:.6} | Volume {:.4} | Earning {:.4}",
                opportunity.pair_id,
                opportunity.exchange_buy,
                opportunity.buy_price,
                opportunity.exchange_sell,
                opportunity.sell_price,
                opportunity.volume,
                opportunity.earning
            );
        }
        best
    }

    /// Price one buy/sell combination; `None` when it should not be emitted.
    fn evaluate(
        &self,
        pair_id: &str,
        snapshots: &[MarketSnapshot],
        best_buy: usize,
        best_sell: usize,
        buy_order: &Order,
        sell_order: &Order,
    ) -> Option<Opportunity> {
        // The executable volume is shared by both legs.
        let volume = sell_order.volume.min(buy_order.volume);

        // Both floors are strict: a volume equal to the minimum is rejected.
        if volume <= sell_order.min_volume || volume <= buy_order.min_volume {
            debug!(
                "{}: volume {:.6} does not clear the minimum-volume floors",
                pair_id, volume
            );
            return None;
        }

        let mut buy_total = volume * buy_order.price;
        buy_total += buy_total * snapshots[best_buy].taker_fee / 100.0;

        let mut sell_total = volume * sell_order.price;
        sell_total += sell_total * snapshots[best_sell].taker_fee / 100.0;

        let earning = sell_total - buy_total;
        if earning <= 0.0 {
            return None;
        }

        Some(Opportunity {
            pair_id: pair_id.to_string(),
            exchange_buy: snapshots[best_buy].exchange,
            exchange_sell: snapshots[best_sell].exchange,
            buy_price: buy_order.price,
            sell_price: sell_order.price,
            volume,
            earning,
            timestamp_ns: chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0),
            wallets: snapshots.iter().map(|s| s.wallet.clone()).collect(),
        })
    }
}

impl Default for OpportunityDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Exchange, Order};

    fn snapshot(
        exchange: Exchange,
        taker_fee: f64,
        bid: Option<(f64, f64, f64)>,
        ask: Option<(f64, f64, f64)>,
    ) -> MarketSnapshot {
        let mut snapshot = MarketSnapshot::new(exchange, 0.0, taker_fee);
        let to_orders = |level: Option<(f64, f64, f64)>| {
            level
                .map(|(price, volume, min_volume)| {
                    vec![Order {
                        price,
                        volume,
                        min_volume,
                    }]
                })
                .unwrap_or_default()
        };
        snapshot.asks.insert("btcusd".to_string(), to_orders(ask));
        snapshot.bids.insert("btcusd".to_string(), to_orders(bid));
        snapshot
    }

    #[test]
    fn test_same_exchange_on_both_legs_emits_nothing() {
        // The second exchange holds both the lowest bid and the highest ask,
        // so buy and sell never separate.
        let snapshots = vec![
            snapshot(
                Exchange::Bitfinex,
                0.1,
                Some((100.0, 2.0, 0.1)),
                Some((101.0, 2.0, 0.1)),
            ),
            snapshot(
                Exchange::Kraken,
                0.2,
                Some((99.0, 3.0, 0.1)),
                Some((103.0, 3.0, 0.1)),
            ),
        ];

        let detector = OpportunityDetector::new();
        assert!(detector.check_pair("btcusd", &snapshots).is_none());
    }

    #[test]
    fn test_detects_cross_exchange_earning() {
        // The first exchange keeps the sell leg (its ask was never beaten),
        // the second takes the buy leg with the lower bid.
        let snapshots = vec![
            snapshot(
                Exchange::Bitfinex,
                0.01,
                Some((100.0, 2.0, 0.1)),
                Some((101.0, 2.0, 0.1)),
            ),
            snapshot(
                Exchange::Kraken,
                0.1,
                Some((99.0, 3.0, 0.1)),
                Some((100.0, 3.0, 0.1)),
            ),
        ];

        let detector = OpportunityDetector::new();
        let opportunity = detector.check_pair("btcusd", &snapshots).unwrap();

        assert_eq!(opportunity.exchange_buy, Exchange::Kraken);
        assert_eq!(opportunity.exchange_sell, Exchange::Bitfinex);
        assert_eq!(opportunity.volume, 2.0);
        assert_eq!(opportunity.buy_price, 99.0);
        assert_eq!(opportunity.sell_price, 101.0);
        // buy_total = 2 * 99 * 1.001 = 198.198
        // sell_total = 2 * 101 * 1.0001 = 202.0202
        assert!((opportunity.earning - 3.8222).abs() < 1e-9);
        // Wallets of every survivor are snapshotted at decision time.
        assert_eq!(opportunity.wallets.len(), 2);
    }

    #[test]
    fn test_equal_bids_keep_first_exchange() {
        let snapshots = vec![
            snapshot(
                Exchange::Bitfinex,
                0.0,
                Some((100.0, 1.0, 0.0)),
                Some((110.0, 1.0, 0.0)),
            ),
            snapshot(
                Exchange::Kraken,
                0.0,
                Some((90.0, 1.0, 0.0)),
                Some((100.0, 1.0, 0.0)),
            ),
            // Same bid as Kraken: strict less-than keeps the earlier leg.
            snapshot(
                Exchange::OkCoin,
                0.0,
                Some((90.0, 1.0, 0.0)),
                Some((100.0, 1.0, 0.0)),
            ),
        ];

        let detector = OpportunityDetector::new();
        let opportunity = detector.check_pair("btcusd", &snapshots).unwrap();
        assert_eq!(opportunity.exchange_buy, Exchange::Kraken);
        assert_eq!(opportunity.exchange_sell, Exchange::Bitfinex);
    }

    #[test]
    fn test_volume_equal_to_floor_is_rejected() {
        let snapshots = vec![
            snapshot(
                Exchange::Bitfinex,
                0.0,
                Some((100.0, 2.0, 2.0)),
                Some((110.0, 2.0, 2.0)),
            ),
            snapshot(
                Exchange::Kraken,
                0.0,
                Some((90.0, 2.0, 2.0)),
                Some((100.0, 2.0, 2.0)),
            ),
        ];

        let detector = OpportunityDetector::new();
        assert!(detector.check_pair("btcusd", &snapshots).is_none());
    }

    #[test]
    fn test_missing_side_is_skipped() {
        // One exchange lost its bids: the comparison involving it is skipped
        // and no candidate can separate buy from sell.
        let snapshots = vec![
            snapshot(Exchange::Bitfinex, 0.0, None, Some((110.0, 1.0, 0.0))),
            snapshot(
                Exchange::Kraken,
                0.0,
                Some((90.0, 1.0, 0.0)),
                Some((100.0, 1.0, 0.0)),
            ),
        ];

        let detector = OpportunityDetector::new();
        assert!(detector.check_pair("btcusd", &snapshots).is_none());
    }

    #[test]
    fn test_single_snapshot_emits_nothing() {
        let snapshots = vec![snapshot(
            Exchange::Gemini,
            0.0,
            Some((100.0, 1.0, 0.0)),
            Some((101.0, 1.0, 0.0)),
        )];

        let detector = OpportunityDetector::new();
        assert!(detector.check_pair("btcusd", &snapshots).is_none());
    }

    #[test]
    fn test_unprofitable_after_fees_emits_nothing() {
        // The raw 0.6 spread is wiped out by the 1% taker fee on the buy leg.
        let snapshots = vec![
            snapshot(
                Exchange::Bitfinex,
                0.0,
                Some((100.0, 1.0, 0.0)),
                Some((100.5, 1.0, 0.0)),
            ),
            snapshot(
                Exchange::Kraken,
                1.0,
                Some((99.9, 1.0, 0.0)),
                Some((100.0, 1.0, 0.0)),
            ),
        ];

        let detector = OpportunityDetector::new();
        assert!(detector.check_pair("btcusd", &snapshots).is_none());
    }
}
