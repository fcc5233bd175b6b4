//! OKCoin adapter
//!
//! Native pair names carry a dash between base and quote (`ETH-USD`).
//! Normalization matches the tail of the pair id against the small set of
//! quote currencies the exchange lists; a three-letter match puts the dash
//! before the last three characters, anything else before the last four.
//! Orders arrive as positional string arrays, with a named-object fallback.
//!
//! Author: AI-Generated
//! Created: 2026-07-28

use super::{pair_id_from_native, BookTracker, ExchangeAdapter, ExchangeError, RawNum};
use crate::http::HttpClient;
use crate::storage;
use crate::types::{Exchange, MarketSnapshot, Order, PairBook};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const PAIRS_URL: &str = "https://www.okcoin.com/api/spot/v3/instruments/ticker";
const PAIRS_DETAILS_URL: &str = "https://www.okcoin.com/api/spot/v3/instruments/";

/// Quote currencies the exchange trades against. Three-letter entries are
/// matched against the last three characters of the pair id; the four-letter
/// ones exist so the fallback split is documented in one place.
const ALLOWED_QUOTES: [&str; 5] = ["EUR", "EURS", "USD", "USDT", "SGD"];

const MAKER_FEE: f64 = 0.1;
const TAKER_FEE: f64 = 0.35;

/// One book level: `[price, size, num_orders]` on the wire, with a named
/// fallback for the variant some endpoints serve.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OkCoinOrder {
    Positional(RawNum, RawNum, RawNum),
    Named {
        price: RawNum,
        size: RawNum,
    },
}

impl OkCoinOrder {
    fn to_order(&self) -> Order {
        match self {
            OkCoinOrder::Positional(price, size, _) => Order::new(price.as_f64(), size.as_f64()),
            OkCoinOrder::Named { price, size } => Order::new(price.as_f64(), size.as_f64()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct OkCoinOrderBook {
    #[serde(default)]
    asks: Vec<OkCoinOrder>,
    #[serde(default)]
    bids: Vec<OkCoinOrder>,
}

impl OkCoinOrderBook {
    fn into_pair_book(self, pair_id: &str) -> PairBook {
        PairBook {
            pair_id: pair_id.to_string(),
            asks: self.asks.iter().map(OkCoinOrder::to_order).collect(),
            bids: self.bids.iter().map(OkCoinOrder::to_order).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct OkCoinTicker {
    product_id: String,
}

/// Instrument metadata; decoded for validation and logging only, because the
/// minimum-volume floor stays unset for this exchange.
#[derive(Debug, Clone, Deserialize)]
struct OkCoinPairDetail {
    #[serde(alias = "instrument_id")]
    pair: String,
    #[serde(default)]
    #[allow(dead_code)]
    min_size: Option<String>,
}

pub struct OkCoin {
    http: Arc<HttpClient>,
    data_dir: PathBuf,
    pairs_names: Vec<String>,
    books: HashMap<String, PairBook>,
    tracker: BookTracker,
}

impl OkCoin {
    pub fn new(http: Arc<HttpClient>, base_dir: &Path) -> Self {
        Self {
            http,
            data_dir: storage::exchange_dir(base_dir, Exchange::OkCoin),
            pairs_names: Vec::new(),
            books: HashMap::new(),
            tracker: BookTracker::new(),
        }
    }

    async fn fetch_book(&self, pair_id: &str) -> Result<PairBook, ExchangeError> {
        let native = self.normalize_pair(pair_id);
        let url = format!("{}{}/book?size=1", PAIRS_DETAILS_URL, native);
        let body = self.http.get_ok(&url).await?;
        let book: OkCoinOrderBook = serde_json::from_str(&body)?;
        Ok(book.into_pair_book(pair_id))
    }
}

#[async_trait]
impl ExchangeAdapter for OkCoin {
    fn exchange(&self) -> Exchange {
        Exchange::OkCoin
    }

    fn normalize_pair(&self, pair_id: &str) -> String {
        // Already in native form: leave it alone.
        if pair_id.contains('-') {
            return pair_id.to_string();
        }
        if pair_id.len() <= 3 {
            return pair_id.to_uppercase();
        }

        let tail = pair_id[pair_id.len() - 3..].to_uppercase();
        if ALLOWED_QUOTES.contains(&tail.as_str()) {
            return format!("{}-{}", &pair_id[..pair_id.len() - 3], tail).to_uppercase();
        }

        // Quote is not a three-letter currency: split before the last four.
        if pair_id.len() <= 4 {
            return pair_id.to_uppercase();
        }
        format!(
            "{}-{}",
            &pair_id[..pair_id.len() - 4],
            &pair_id[pair_id.len() - 4..]
        )
        .to_uppercase()
    }

    fn maker_fee(&self) -> f64 {
        MAKER_FEE
    }

    fn taker_fee(&self) -> f64 {
        TAKER_FEE
    }

    async fn fetch_pairs_list(&mut self) -> Result<Vec<String>, ExchangeError> {
        let cache = self.data_dir.join("pairs_list.json");
        if cache.exists() {
            if let Ok(pairs) = storage::load_json::<Vec<String>>(&cache) {
                debug!("Pairs list already cached, skipping the OKCOIN request");
                self.pairs_names = pairs.clone();
                return Ok(pairs);
            }
        }

        let body = self.http.get_ok(PAIRS_URL).await?;
        let tickers: Vec<OkCoinTicker> = serde_json::from_str(&body)?;
        let pairs: Vec<String> = tickers.into_iter().map(|t| t.product_id).collect();
        storage::dump_json(&pairs, &cache);
        self.pairs_names = pairs.clone();
        Ok(pairs)
    }

    async fn fetch_pair_details(&mut self) -> Result<(), ExchangeError> {
        // Best effort: instrument metadata validates but feeds nothing
        // downstream (no minimum-volume floor for this exchange).
        let cache = self.data_dir.join("pairs_info.json");
        let body = if cache.exists() {
            match std::fs::read_to_string(&cache) {
                Ok(body) => body,
                Err(e) => {
                    debug!("Unable to read OKCOIN pair details cache: {}", e);
                    return Ok(());
                }
            }
        } else {
            match self.http.get_ok(PAIRS_DETAILS_URL).await {
                Ok(body) => {
                    if let Err(e) = std::fs::write(&cache, &body) {
                        debug!("Unable to cache OKCOIN pair details: {}", e);
                    }
                    body
                }
                Err(e) => {
                    debug!("OKCOIN pair details unavailable: {}", e);
                    return Ok(());
                }
            }
        };

        match serde_json::from_str::<Vec<OkCoinPairDetail>>(&body) {
            Ok(details) => debug!(
                "Loaded {} OKCOIN pair details ({} known)",
                details.len(),
                details.iter().filter(|d| !d.pair.is_empty()).count()
            ),
            Err(e) => debug!("Error decoding OKCOIN pair details: {}", e),
        }
        Ok(())
    }

    async fn prime_books(&mut self) -> Result<usize, ExchangeError> {
        for native in self.pairs_names.clone() {
            let pair_id = pair_id_from_native(&native);
            let cache_file = self.data_dir.join("orders").join(format!("{}.json", native));

            if cache_file.exists() {
                match storage::load_json::<PairBook>(&cache_file) {
                    Ok(book) => {
                        self.books.insert(pair_id.clone(), book);
                        self.tracker.mark_success(&pair_id);
                        continue;
                    }
                    Err(e) => debug!("Discarding unreadable book cache {:?}: {}", cache_file, e),
                }
            }

            match self.refresh_top_of_book(&pair_id).await {
                Ok(book) => storage::dump_json(&book, &cache_file),
                Err(e) => debug!("Skipping pair [{}] on OKCOIN: {}", pair_id, e),
            }
        }
        Ok(self.books.len())
    }

    async fn refresh_top_of_book(&mut self, pair_id: &str) -> Result<PairBook, ExchangeError> {
        let result = self.fetch_book(pair_id).await;
        match &result {
            Ok(book) => {
                self.books.insert(pair_id.to_string(), book.clone());
                self.tracker.mark_success(pair_id);
            }
            Err(_) => self.tracker.mark_failure(pair_id),
        }
        result
    }

    fn to_snapshot(&self) -> MarketSnapshot {
        let mut snapshot = MarketSnapshot::new(Exchange::OkCoin, MAKER_FEE, TAKER_FEE);
        for (pair_id, book) in &self.books {
            snapshot.asks.insert(pair_id.clone(), book.asks.clone());
            snapshot.bids.insert(pair_id.clone(), book.bids.clone());
        }
        snapshot
    }

    fn begin_round(&mut self, pair_id: &str) {
        self.tracker.begin_round(pair_id);
    }

    fn mark_failed(&mut self, pair_id: &str) {
        self.tracker.mark_failure(pair_id);
    }
}
