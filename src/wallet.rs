//! Simulated wallet bookkeeping
//!
//! One dummy wallet per exchange, seeded with a large balance for every
//! currency in the common pair set. The registry is the single owner of
//! wallet state; snapshots only ever carry clones of it. Balances are
//! allowed to go negative: this ledger tracks paper P&L, not feasibility.
//!
//! Author: AI-Generated
//! Created: 2026-07-28

use crate::types::{split_pair, Exchange, Opportunity, Wallet};
use dashmap::DashMap;
use tracing::{debug, info};

/// Default balance credited to every seeded currency.
pub const DUMMY_BALANCE: f64 = 50_000.0;

/// Exchange-keyed registry of simulated wallets.
#[derive(Debug, Default)]
pub struct WalletRegistry {
    wallets: DashMap<Exchange, Wallet>,
}

impl WalletRegistry {
    pub fn new() -> Self {
        Self {
            wallets: DashMap::new(),
        }
    }

    /// Create a wallet per exchange with `balance` in each currency of every
    /// given pair (base and quote).
    pub fn seed(&self, exchanges: &[Exchange], pair_ids: &[String], balance: f64) {
        for &exchange in exchanges {
            let mut wallet = Wallet::new(exchange);
            for pair_id in pair_ids {
                let (base, quote) = split_pair(pair_id);
                wallet.coins.insert(base, balance);
                if !quote.is_empty() {
                    wallet.coins.insert(quote, balance);
                }
            }
            info!(
                "Seeded {} wallet with {} currencies at {:.2} each",
                exchange,
                wallet.coins.len(),
                balance
            );
            self.wallets.insert(exchange, wallet);
        }
    }

    /// Current wallet for an exchange; an empty one if never seeded.
    pub fn wallet(&self, exchange: Exchange) -> Wallet {
        self.wallets
            .get(&exchange)
            .map(|entry| entry.clone())
            .unwrap_or_else(|| Wallet::new(exchange))
    }

    /// Book a winning opportunity: the buy wallet pays quote and gains base,
    /// the sell wallet gains quote and pays base.
    pub fn apply(&self, opportunity: &Opportunity) {
        let (base, quote) = split_pair(&opportunity.pair_id);

        {
            let mut buy = self
                .wallets
                .entry(opportunity.exchange_buy)
                .or_insert_with(|| Wallet::new(opportunity.exchange_buy));
            *buy.coins.entry(quote.clone()).or_insert(0.0) -=
                opportunity.volume * opportunity.buy_price;
            *buy.coins.entry(base.clone()).or_insert(0.0) += opportunity.volume;
        }

        {
            let mut sell = self
                .wallets
                .entry(opportunity.exchange_sell)
                .or_insert_with(|| Wallet::new(opportunity.exchange_sell));
            *sell.coins.entry(quote.clone()).or_insert(0.0) +=
                opportunity.volume * opportunity.sell_price;
            *sell.coins.entry(base.clone()).or_insert(0.0) -= opportunity.volume;
        }

        debug!(
            "Booked {} {} on {} (buy) / {} (sell)",
            opportunity.volume, opportunity.pair_id, opportunity.exchange_buy,
            opportunity.exchange_sell
        );
    }
}
