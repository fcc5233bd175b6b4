//! Core data structures for the arbitrage engine
//!
//! Everything downstream of the exchange adapters speaks this uniform model:
//! normalized pair ids, top-of-book orders, per-exchange market snapshots,
//! simulated wallets, and detected opportunities.
//!
//! Author: AI-Generated
//! Created: 2026-07-28

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The exchanges this bot scans. Closed set; adding one means writing an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    Bitfinex,
    Gemini,
    Kraken,
    OkCoin,
}

impl Exchange {
    /// All supported exchanges, in adapter registration order.
    pub fn all() -> [Exchange; 4] {
        [
            Exchange::Bitfinex,
            Exchange::Gemini,
            Exchange::Kraken,
            Exchange::OkCoin,
        ]
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Exchange::Bitfinex => write!(f, "BITFINEX"),
            Exchange::Gemini => write!(f, "GEMINI"),
            Exchange::Kraken => write!(f, "KRAKEN"),
            Exchange::OkCoin => write!(f, "OKCOIN"),
        }
    }
}

/// A single price level. `min_volume` is the exchange's minimum tradable
/// quantity for the pair; 0.0 means no floor is known.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub price: f64,
    pub volume: f64,
    pub min_volume: f64,
}

impl Order {
    pub fn new(price: f64, volume: f64) -> Self {
        Self {
            price,
            volume,
            min_volume: 0.0,
        }
    }
}

/// Top-of-book for one normalized pair on one exchange.
///
/// Both sides are ordered best-first: asks non-decreasing, bids non-increasing.
/// Either side may be empty when the exchange reported nothing for it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PairBook {
    pub pair_id: String,
    pub asks: Vec<Order>,
    pub bids: Vec<Order>,
}

impl PairBook {
    pub fn new(pair_id: impl Into<String>) -> Self {
        Self {
            pair_id: pair_id.into(),
            asks: Vec::new(),
            bids: Vec::new(),
        }
    }
}

/// Simulated balances attached to one exchange.
///
/// Seeded at startup with a dummy balance for every currency appearing in the
/// common pair set, and mutated only by the wallet bookkeeper. Balances may go
/// negative: this models paper P&L, not trading feasibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub exchange: Exchange,
    /// Currency symbol (lowercase) -> balance.
    pub coins: HashMap<String, f64>,
}

impl Wallet {
    pub fn new(exchange: Exchange) -> Self {
        Self {
            exchange,
            coins: HashMap::new(),
        }
    }

    /// Balance for a currency, 0.0 when the coin was never seeded.
    pub fn balance(&self, coin: &str) -> f64 {
        self.coins.get(coin).copied().unwrap_or(0.0)
    }
}

/// Uniform view of one exchange at one instant.
///
/// `asks` and `bids` are keyed by normalized pair id and always carry the same
/// key set: an adapter that has a book for a pair inserts both sides, empty or
/// not. Fees are percentages (0.1 means 0.1%).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub exchange: Exchange,
    pub asks: HashMap<String, Vec<Order>>,
    pub bids: HashMap<String, Vec<Order>>,
    pub maker_fee: f64,
    pub taker_fee: f64,
    pub wallet: Wallet,
}

impl MarketSnapshot {
    pub fn new(exchange: Exchange, maker_fee: f64, taker_fee: f64) -> Self {
        Self {
            exchange,
            asks: HashMap::new(),
            bids: HashMap::new(),
            maker_fee,
            taker_fee,
            wallet: Wallet::new(exchange),
        }
    }

    /// Best ask for a pair, if the pair is known and the side is non-empty.
    pub fn best_ask(&self, pair_id: &str) -> Option<&Order> {
        self.asks.get(pair_id).and_then(|orders| orders.first())
    }

    /// Best bid for a pair, if the pair is known and the side is non-empty.
    pub fn best_bid(&self, pair_id: &str) -> Option<&Order> {
        self.bids.get(pair_id).and_then(|orders| orders.first())
    }
}

/// One detected arbitrage. Created by the detector, consumed once by the
/// wallet bookkeeper and once by the opportunity log; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub pair_id: String,
    pub exchange_buy: Exchange,
    pub exchange_sell: Exchange,
    pub buy_price: f64,
    pub sell_price: f64,
    pub volume: f64,
    /// Fee-adjusted profit of the round trip, in quote currency.
    pub earning: f64,
    /// Nanoseconds since the UNIX epoch at the moment of the decision.
    pub timestamp_ns: i64,
    /// Snapshot of every surviving exchange's wallet when the decision was made.
    pub wallets: Vec<Wallet>,
}

/// Split a normalized pair id into `(base, quote)`.
///
/// The quote is always the last three characters, the base the remainder.
/// Four-letter quotes (usdt, eurs) are deliberately split the same way; the
/// wallet ledger only needs the split to be stable, not semantically exact.
pub fn split_pair(pair_id: &str) -> (String, String) {
    if pair_id.len() <= 3 {
        return (pair_id.to_string(), String::new());
    }
    let cut = pair_id.len() - 3;
    (pair_id[..cut].to_string(), pair_id[cut..].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pair() {
        assert_eq!(split_pair("btcusd"), ("btc".to_string(), "usd".to_string()));
        assert_eq!(split_pair("adaeth"), ("ada".to_string(), "eth".to_string()));
        // Four-letter quotes split on the last three chars as well.
        assert_eq!(
            split_pair("btcusdt"),
            ("btcu".to_string(), "sdt".to_string())
        );
    }

    #[test]
    fn test_split_pair_short_input() {
        assert_eq!(split_pair("btc"), ("btc".to_string(), String::new()));
    }

    #[test]
    fn test_snapshot_best_sides() {
        let mut snapshot = MarketSnapshot::new(Exchange::Kraken, 0.16, 0.26);
        snapshot
            .asks
            .insert("btcusd".to_string(), vec![Order::new(101.0, 2.0)]);
        snapshot.bids.insert("btcusd".to_string(), vec![]);

        assert_eq!(snapshot.best_ask("btcusd").unwrap().price, 101.0);
        assert!(snapshot.best_bid("btcusd").is_none());
        assert!(snapshot.best_ask("ethusd").is_none());
    }

    #[test]
    fn test_wallet_balance_defaults_to_zero() {
        let wallet = Wallet::new(Exchange::Gemini);
        assert_eq!(wallet.balance("btc"), 0.0);
    }
}
