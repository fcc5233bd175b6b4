//! Bitfinex adapter
//!
//! Native pair names are already lowercase with no separator, so
//! normalization is the identity. Pairs containing a colon are synthetic
//! margin symbols and are not tradable here. The public book endpoint is
//! aggressively rate limited, hence the fixed pre-request delay.
//!
//! Author: AI-Generated
//! Created: 2026-07-28

use super::{pair_id_from_native, BookTracker, ExchangeAdapter, ExchangeError, RawNum};
use crate::http::HttpClient;
use crate::storage;
use crate::types::{Exchange, MarketSnapshot, Order, PairBook};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const PAIRS_URL: &str = "https://api.bitfinex.com/v1/symbols";
const PAIRS_DETAILS_URL: &str = "https://api.bitfinex.com/v1/symbols_details";
const ORDER_BOOK_URL: &str = "https://api.bitfinex.com/v1/book/";

/// Mandatory pause before every order-book request (public rate limit).
const RATE_LIMIT_DELAY: Duration = Duration::from_secs(2);

const MAKER_FEE: f64 = 0.1;
const TAKER_FEE: f64 = 0.2;

/// One order as Bitfinex serves it: numeric strings, `amount` not `volume`.
#[derive(Debug, Clone, Deserialize)]
struct BitfinexOrder {
    price: RawNum,
    amount: RawNum,
}

#[derive(Debug, Clone, Deserialize)]
struct BitfinexOrderBook {
    #[serde(default)]
    bids: Vec<BitfinexOrder>,
    #[serde(default)]
    asks: Vec<BitfinexOrder>,
}

impl BitfinexOrderBook {
    fn into_pair_book(self, pair_id: &str) -> PairBook {
        let convert = |orders: Vec<BitfinexOrder>| {
            orders
                .into_iter()
                .map(|o| Order::new(o.price.as_f64(), o.amount.as_f64()))
                .collect()
        };
        PairBook {
            pair_id: pair_id.to_string(),
            asks: convert(self.asks),
            bids: convert(self.bids),
        }
    }
}

/// Static metadata for one pair, fetched once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitfinexPairDetail {
    pub pair: String,
    #[serde(rename = "minimum_order_size")]
    pub min_order: String,
    #[serde(rename = "maximum_order_size", default)]
    pub max_order: String,
    #[serde(default)]
    pub price_precision: i32,
}

pub struct Bitfinex {
    http: Arc<HttpClient>,
    data_dir: PathBuf,
    pairs_names: Vec<String>,
    /// Native pair name -> startup metadata; source of `min_volume`.
    pair_details: HashMap<String, BitfinexPairDetail>,
    /// Normalized pair id -> latest top-of-book.
    books: HashMap<String, PairBook>,
    tracker: BookTracker,
}

impl Bitfinex {
    pub fn new(http: Arc<HttpClient>, base_dir: &Path) -> Self {
        Self {
            http,
            data_dir: storage::exchange_dir(base_dir, Exchange::Bitfinex),
            pairs_names: Vec::new(),
            pair_details: HashMap::new(),
            books: HashMap::new(),
            tracker: BookTracker::new(),
        }
    }

    async fn fetch_book(&self, pair_id: &str) -> Result<PairBook, ExchangeError> {
        if pair_id.contains(':') {
            info!("Pair [{}] is not tradable on {}", pair_id, Exchange::Bitfinex);
            return Err(ExchangeError::PairNotTradable(pair_id.to_string()));
        }

        tokio::time::sleep(RATE_LIMIT_DELAY).await;

        let native = self.normalize_pair(pair_id);
        let url = format!("{}{}?limit_bids=1&limit_asks=1", ORDER_BOOK_URL, native);
        let body = self.http.get_ok(&url).await?;
        let book: BitfinexOrderBook = serde_json::from_str(&body)?;
        Ok(book.into_pair_book(pair_id))
    }

    fn min_volume_for(&self, pair_id: &str) -> f64 {
        let native = self.normalize_pair(pair_id);
        self.pair_details
            .get(&native)
            .map(|detail| detail.min_order.parse().unwrap_or(0.0))
            .unwrap_or(0.0)
    }
}

#[async_trait]
impl ExchangeAdapter for Bitfinex {
    fn exchange(&self) -> Exchange {
        Exchange::Bitfinex
    }

    fn normalize_pair(&self, pair_id: &str) -> String {
        pair_id.to_lowercase()
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
                debug!("Pairs list already cached, skipping the BITFINEX request");
                self.pairs_names = pairs.clone();
                return Ok(pairs);
            }
        }

        let body = self.http.get_ok(PAIRS_URL).await?;
        let pairs: Vec<String> = serde_json::from_str(&body)?;
        storage::dump_json(&pairs, &cache);
        self.pairs_names = pairs.clone();
        Ok(pairs)
    }

    async fn fetch_pair_details(&mut self) -> Result<(), ExchangeError> {
        let cache = self.data_dir.join("pairs_info.json");
        let details: Vec<BitfinexPairDetail> = if cache.exists() {
            storage::load_json(&cache).map_err(|e| ExchangeError::Decode(e.to_string()))?
        } else {
            let body = self.http.get_ok(PAIRS_DETAILS_URL).await?;
            let details: Vec<BitfinexPairDetail> = serde_json::from_str(&body)?;
            storage::dump_json(&details, &cache);
            details
        };

        self.pair_details = details
            .into_iter()
            .map(|detail| (detail.pair.clone(), detail))
            .collect();
        debug!("Loaded {} BITFINEX pair details", self.pair_details.len());
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
                Err(e) => debug!("Skipping pair [{}] on BITFINEX: {}", pair_id, e),
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
        let mut snapshot = MarketSnapshot::new(Exchange::Bitfinex, MAKER_FEE, TAKER_FEE);
        for (pair_id, book) in &self.books {
            let min_volume = self.min_volume_for(pair_id);
            let stamp = |orders: &[Order]| {
                orders
                    .iter()
                    .map(|order| Order {
                        min_volume,
                        ..order.clone()
                    })
                    .collect::<Vec<_>>()
            };
            snapshot.asks.insert(pair_id.clone(), stamp(&book.asks));
            snapshot.bids.insert(pair_id.clone(), stamp(&book.bids));
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
