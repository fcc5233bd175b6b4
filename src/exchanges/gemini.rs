//! Gemini adapter
//!
//! Native symbols are lowercase with no separator (same shape as the
//! normalized pair id). Orders arrive as named objects with numeric strings.
//! Gemini does not publish flat fees on the public API, so both fees default
//! to zero and can be overridden from the environment.
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

const PAIRS_URL: &str = "https://api.sandbox.gemini.com/v1/symbols";
const PAIRS_DETAILS_URL: &str = "https://api.gemini.com/v1/symbols_details";
const ORDER_BOOK_URL: &str = "https://api.sandbox.gemini.com/v1/book/";

#[derive(Debug, Clone, Deserialize)]
struct GeminiOrder {
    price: RawNum,
    #[serde(alias = "amount")]
    volume: RawNum,
    #[serde(default)]
    #[allow(dead_code)]
    timestamp: Option<RawNum>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiOrderBook {
    #[serde(default)]
    bids: Vec<GeminiOrder>,
    #[serde(default)]
    asks: Vec<GeminiOrder>,
}

impl GeminiOrderBook {
    fn into_pair_book(self, pair_id: &str) -> PairBook {
        let convert = |orders: Vec<GeminiOrder>| {
            orders
                .into_iter()
                .map(|o| Order::new(o.price.as_f64(), o.volume.as_f64()))
                .collect()
        };
        PairBook {
            pair_id: pair_id.to_string(),
            asks: convert(self.asks),
            bids: convert(self.bids),
        }
    }
}

/// Startup metadata; decoded for validation and logging only, because the
/// minimum-volume floor stays unset for this exchange.
#[derive(Debug, Clone, Deserialize)]
struct GeminiPairDetail {
    #[serde(rename = "symbol")]
    pair: String,
    #[serde(rename = "min_order", default)]
    #[allow(dead_code)]
    min_order: Option<f64>,
}

pub struct Gemini {
    http: Arc<HttpClient>,
    data_dir: PathBuf,
    pairs_names: Vec<String>,
    books: HashMap<String, PairBook>,
    tracker: BookTracker,
    maker_fee: f64,
    taker_fee: f64,
}

impl Gemini {
    pub fn new(http: Arc<HttpClient>, base_dir: &Path, maker_fee: f64, taker_fee: f64) -> Self {
        Self {
            http,
            data_dir: storage::exchange_dir(base_dir, Exchange::Gemini),
            pairs_names: Vec::new(),
            books: HashMap::new(),
            tracker: BookTracker::new(),
            maker_fee,
            taker_fee,
        }
    }

    async fn fetch_book(&self, pair_id: &str) -> Result<PairBook, ExchangeError> {
        let native = self.normalize_pair(pair_id);
        let url = format!("{}{}?limit_bids=1&limit_asks=1", ORDER_BOOK_URL, native);
        let body = self.http.get_ok(&url).await?;
        let book: GeminiOrderBook = serde_json::from_str(&body)?;
        Ok(book.into_pair_book(pair_id))
    }
}

#[async_trait]
impl ExchangeAdapter for Gemini {
    fn exchange(&self) -> Exchange {
        Exchange::Gemini
    }

    fn normalize_pair(&self, pair_id: &str) -> String {
        pair_id.to_lowercase()
    }

    fn maker_fee(&self) -> f64 {
        self.maker_fee
    }

    fn taker_fee(&self) -> f64 {
        self.taker_fee
    }

    async fn fetch_pairs_list(&mut self) -> Result<Vec<String>, ExchangeError> {
        let cache = self.data_dir.join("pairs_list.json");
        if cache.exists() {
            if let Ok(pairs) = storage::load_json::<Vec<String>>(&cache) {
                debug!("Pairs list already cached, skipping the GEMINI request");
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
        // Best effort: the details feed validates but feeds nothing downstream
        // (no minimum-volume floor for this exchange).
        let cache = self.data_dir.join("pairs_info.json");
        let body = if cache.exists() {
            match std::fs::read_to_string(&cache) {
                Ok(body) => body,
                Err(e) => {
                    debug!("Unable to read GEMINI pair details cache: {}", e);
                    return Ok(());
                }
            }
        } else {
            match self.http.get_ok(PAIRS_DETAILS_URL).await {
                Ok(body) => {
                    if let Err(e) = std::fs::write(&cache, &body) {
                        debug!("Unable to cache GEMINI pair details: {}", e);
                    }
                    body
                }
                Err(e) => {
                    debug!("GEMINI pair details unavailable: {}", e);
                    return Ok(());
                }
            }
        };

        match serde_json::from_str::<Vec<GeminiPairDetail>>(&body) {
            Ok(details) => debug!(
                "Loaded {} GEMINI pair details ({} known)",
                details.len(),
                details.iter().filter(|d| !d.pair.is_empty()).count()
            ),
            Err(e) => debug!("Error decoding GEMINI pair details: {}", e),
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
                Err(e) => debug!("Skipping pair [{}] on GEMINI: {}", pair_id, e),
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
        let mut snapshot = MarketSnapshot::new(Exchange::Gemini, self.maker_fee, self.taker_fee);
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

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> Gemini {
        let http = Arc::new(HttpClient::new(2000).unwrap());
        Gemini::new(http, Path::new("./data"), 0.0, 0.0)
    }

    #[test]
    fn test_normalize_is_identity_lowercase() {
        let gemini = adapter();
        assert_eq!(gemini.normalize_pair("ethusd"), "ethusd");
        assert_eq!(gemini.normalize_pair("ETHUSD"), "ethusd");
    }

    #[test]
    fn test_decode_named_orders() {
        let body = r#"{
            "bids": [{"price": "9100.25", "volume": "2", "timestamp": "1588248603"}],
            "asks": [{"price": "9102.00", "volume": "1.5", "timestamp": "1588248603"}]
        }"#;
        let wire: GeminiOrderBook = serde_json::from_str(body).unwrap();
        let book = wire.into_pair_book("btcusd");
        assert_eq!(book.bids[0].price, 9100.25);
        assert_eq!(book.asks[0].volume, 1.5);
        // No floor known for this exchange.
        assert_eq!(book.asks[0].min_volume, 0.0);
    }

    #[test]
    fn test_snapshot_keeps_fees_and_zero_floor() {
        let mut gemini = adapter();
        gemini.books.insert(
            "ethusd".to_string(),
            PairBook {
                pair_id: "ethusd".to_string(),
                asks: vec![Order::new(210.0, 4.0)],
                bids: vec![],
            },
        );

        let snapshot = gemini.to_snapshot();
        assert_eq!(snapshot.maker_fee, 0.0);
        assert_eq!(snapshot.taker_fee, 0.0);
        assert_eq!(snapshot.best_ask("ethusd").unwrap().min_volume, 0.0);
        assert!(snapshot.bids.contains_key("ethusd"));
        assert!(snapshot.best_bid("ethusd").is_none());
    }
}
