//! Exchange adapters
//!
//! One adapter per exchange, all implementing the same capability set:
//! pair-name normalization, top-of-book refresh, projection into the uniform
//! market model, and the startup fetches for pair lists and pair metadata.
//! The orchestrator only ever sees the trait.
//!
//! Author: AI-Generated
//! Created: 2026-07-28

pub mod bitfinex;
pub mod gemini;
pub mod kraken;
pub mod okcoin;

pub use bitfinex::Bitfinex;
pub use gemini::Gemini;
pub use kraken::Kraken;
pub use okcoin::OkCoin;

use crate::types::{Exchange, MarketSnapshot, PairBook};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Failure kinds for a single adapter operation. Every variant marks the
/// adapter failed for the current round; none is fatal to the process.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("non-OK status code: {0}")]
    NonOkStatus(u16),
    #[error("decode failure: {0}")]
    Decode(String),
    #[error("pair not tradable: {0}")]
    PairNotTradable(String),
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::Decode(err.to_string())
    }
}

/// Capability set shared by all exchange adapters.
///
/// Each adapter exclusively owns its cached books and fee settings; the
/// orchestrator serializes access through a mutex per adapter.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Which exchange this adapter talks to.
    fn exchange(&self) -> Exchange;

    /// Convert a normalized pair id into the exchange's native pair name.
    fn normalize_pair(&self, pair_id: &str) -> String;

    fn maker_fee(&self) -> f64;

    fn taker_fee(&self) -> f64;

    /// Fetch the list of native pair names tradable on the exchange.
    /// Disk-cached: a previously dumped list is reused without a request.
    async fn fetch_pairs_list(&mut self) -> Result<Vec<String>, ExchangeError>;

    /// Fetch per-pair metadata (minimum order size, price precision).
    /// Disk-cached like the pairs list. Consumed later by `to_snapshot`.
    async fn fetch_pair_details(&mut self) -> Result<(), ExchangeError>;

    /// Populate the book cache for every listed pair, preferring the on-disk
    /// copy over a live request. Returns how many books ended up cached.
    async fn prime_books(&mut self) -> Result<usize, ExchangeError>;

    /// One exchange request for the top-of-book of a single pair.
    /// On success the adapter's cache is replaced for that pair.
    async fn refresh_top_of_book(&mut self, pair_id: &str) -> Result<PairBook, ExchangeError>;

    /// Project the cached books into the uniform market model.
    fn to_snapshot(&self) -> MarketSnapshot;

    /// Reset per-pair round state; called by the orchestrator before a round.
    fn begin_round(&mut self, _pair_id: &str) {}

    /// Record a failure decided outside the adapter (round deadline elapsed).
    fn mark_failed(&mut self, _pair_id: &str) {}
}

/// Adapters are shared between the driver and the per-round refresh tasks.
pub type SharedAdapter = Arc<Mutex<dyn ExchangeAdapter>>;

/// Convert an exchange-native pair name back into a normalized pair id:
/// lowercase, with at most one separator removed.
pub fn pair_id_from_native(native: &str) -> String {
    native.to_lowercase().replacen('-', "", 1)
}

/// Book freshness for one pair in one adapter's cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookState {
    /// Never successfully refreshed.
    Unknown,
    /// Refreshed during the current round.
    Cached,
    /// Carried over from an earlier round, not yet re-confirmed.
    Stale,
}

#[derive(Debug, Clone, Copy)]
struct PairCacheState {
    book: BookState,
    failed_this_round: bool,
}

/// Per-pair cache state machine.
///
/// `Unknown -> Cached` on first successful refresh, `Cached -> Cached` on
/// refresh success, any state gains the failed flag on a refresh error, and
/// the flag resets at the start of each round (with `Cached` demoted to
/// `Stale` until the new refresh confirms it).
#[derive(Debug, Default)]
pub struct BookTracker {
    states: HashMap<String, PairCacheState>,
}

impl BookTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, pair_id: &str) -> &mut PairCacheState {
        self.states
            .entry(pair_id.to_string())
            .or_insert(PairCacheState {
                book: BookState::Unknown,
                failed_this_round: false,
            })
    }

    pub fn begin_round(&mut self, pair_id: &str) {
        let state = self.entry(pair_id);
        state.failed_this_round = false;
        if state.book == BookState::Cached {
            state.book = BookState::Stale;
        }
    }

    pub fn mark_success(&mut self, pair_id: &str) {
        let state = self.entry(pair_id);
        state.book = BookState::Cached;
        state.failed_this_round = false;
    }

    pub fn mark_failure(&mut self, pair_id: &str) {
        self.entry(pair_id).failed_this_round = true;
    }

    pub fn book_state(&self, pair_id: &str) -> BookState {
        self.states
            .get(pair_id)
            .map(|state| state.book)
            .unwrap_or(BookState::Unknown)
    }

    pub fn failed_this_round(&self, pair_id: &str) -> bool {
        self.states
            .get(pair_id)
            .map(|state| state.failed_this_round)
            .unwrap_or(false)
    }
}

/// A numeric field that arrives as either a JSON string or a JSON number.
/// Exchange payloads mix both shapes freely.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawNum {
    Str(String),
    Num(f64),
}

impl RawNum {
    /// Parse to `f64`; unparsable fields become zero per the market model.
    pub fn as_f64(&self) -> f64 {
        match self {
            RawNum::Str(s) => s.parse().unwrap_or(0.0),
            RawNum::Num(n) => *n,
        }
    }
}

impl Default for RawNum {
    fn default() -> Self {
        RawNum::Num(0.0)
    }
}
