//! Kraken adapter
//!
//! Native pair names are the uppercase altnames from the AssetPairs feed.
//! Every public endpoint wraps its payload in an `{error, result}` envelope
//! where `result` holds a single entry under an exchange-chosen key; the
//! decoder extracts that entry whatever the key is. Orders arrive either as
//! positional `[price, volume, timestamp]` tuples or as named objects, and
//! the minimum tradable amounts come from a hand-maintained text file.
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
use tracing::debug;

const PAIRS_DETAILS_URL: &str = "https://api.kraken.com/0/public/AssetPairs";
const ORDER_BOOK_URL: &str = "https://api.kraken.com/0/public/Depth?pair=";

const MAKER_FEE: f64 = 0.16;
const TAKER_FEE: f64 = 0.26;

/// Envelope shared by the Kraken public endpoints. `result` maps one
/// arbitrary key (the exchange's internal pair spelling) to the payload.
#[derive(Debug, Clone, Deserialize)]
struct KrakenEnvelope<T> {
    #[serde(default)]
    error: Vec<serde_json::Value>,
    #[serde(default)]
    result: HashMap<String, T>,
}

impl<T> KrakenEnvelope<T> {
    /// Extract the single payload entry, rejecting error responses.
    fn into_single(self) -> Result<T, ExchangeError> {
        if !self.error.is_empty() {
            return Err(ExchangeError::Decode(format!(
                "kraken error: {:?}",
                self.error
            )));
        }
        self.result
            .into_values()
            .next()
            .ok_or_else(|| ExchangeError::Decode("empty kraken result".to_string()))
    }
}

/// One order, decoded positional-first with a named-object fallback.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum KrakenOrder {
    Positional(RawNum, RawNum, serde_json::Value),
    Named {
        price: RawNum,
        volume: RawNum,
        #[serde(default)]
        #[allow(dead_code)]
        timestamp: serde_json::Value,
    },
}

impl KrakenOrder {
    fn to_order(&self) -> Order {
        match self {
            KrakenOrder::Positional(price, volume, _) => {
                Order::new(price.as_f64(), volume.as_f64())
            }
            KrakenOrder::Named { price, volume, .. } => {
                Order::new(price.as_f64(), volume.as_f64())
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct KrakenOrderBook {
    #[serde(default)]
    asks: Vec<KrakenOrder>,
    #[serde(default)]
    bids: Vec<KrakenOrder>,
}

impl KrakenOrderBook {
    fn into_pair_book(self, pair_id: &str) -> PairBook {
        PairBook {
            pair_id: pair_id.to_string(),
            asks: self.asks.iter().map(KrakenOrder::to_order).collect(),
            bids: self.bids.iter().map(KrakenOrder::to_order).collect(),
        }
    }
}

/// AssetPairs metadata; the altname is the tradable pair spelling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KrakenPairDetail {
    pub altname: String,
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub quote: String,
    #[serde(default)]
    pub pair_decimals: i32,
    #[serde(default)]
    pub lot_decimals: i32,
}

pub struct Kraken {
    http: Arc<HttpClient>,
    data_dir: PathBuf,
    pairs_names: Vec<String>,
    /// Currency symbol (lowercase) -> minimum tradable amount, from
    /// `min_amount.txt`. Matched by prefix against the normalized pair id.
    min_amounts: HashMap<String, f64>,
    books: HashMap<String, PairBook>,
    tracker: BookTracker,
}

impl Kraken {
    pub fn new(http: Arc<HttpClient>, base_dir: &Path) -> Self {
        Self {
            http,
            data_dir: storage::exchange_dir(base_dir, Exchange::Kraken),
            pairs_names: Vec::new(),
            min_amounts: HashMap::new(),
            books: HashMap::new(),
            tracker: BookTracker::new(),
        }
    }

    async fn fetch_book(&self, pair_id: &str) -> Result<PairBook, ExchangeError> {
        let native = self.normalize_pair(pair_id);
        let url = format!("{}{}&count=1", ORDER_BOOK_URL, native);
        let body = self.http.get_ok(&url).await?;
        let envelope: KrakenEnvelope<KrakenOrderBook> = serde_json::from_str(&body)?;
        Ok(envelope.into_single()?.into_pair_book(pair_id))
    }

    fn min_volume_for(&self, pair_id: &str) -> f64 {
        for (currency, amount) in &self.min_amounts {
            if pair_id.starts_with(currency.as_str()) {
                return *amount;
            }
        }
        0.0
    }
}

#[async_trait]
impl ExchangeAdapter for Kraken {
    fn exchange(&self) -> Exchange {
        Exchange::Kraken
    }

    fn normalize_pair(&self, pair_id: &str) -> String {
        pair_id.to_uppercase()
    }

    fn maker_fee(&self) -> f64 {
        MAKER_FEE
    }

    fn taker_fee(&self) -> f64 {
        TAKER_FEE
    }

    async fn fetch_pairs_list(&mut self) -> Result<Vec<String>, ExchangeError> {
        // Kraken has no standalone symbols endpoint; the names fall out of
        // the AssetPairs metadata.
        let cache = self.data_dir.join("pairs_info.json");
        let details: HashMap<String, KrakenPairDetail> = if cache.exists() {
            storage::load_json(&cache).map_err(|e| ExchangeError::Decode(e.to_string()))?
        } else {
            let body = self.http.get_ok(PAIRS_DETAILS_URL).await?;
            let envelope: KrakenEnvelope<KrakenPairDetail> = serde_json::from_str(&body)?;
            if !envelope.error.is_empty() {
                return Err(ExchangeError::Decode(format!(
                    "kraken error: {:?}",
                    envelope.error
                )));
            }
            storage::dump_json(&envelope.result, &cache);
            envelope.result
        };

        self.pairs_names = details.values().map(|d| d.altname.clone()).collect();
        Ok(self.pairs_names.clone())
    }

    async fn fetch_pair_details(&mut self) -> Result<(), ExchangeError> {
        let path = self.data_dir.join("min_amount.txt");
        self.min_amounts = storage::load_min_amounts(&path);
        debug!("Loaded {} KRAKEN minimum amounts", self.min_amounts.len());
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
                Err(e) => debug!("Skipping pair [{}] on KRAKEN: {}", pair_id, e),
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
        let mut snapshot = MarketSnapshot::new(Exchange::Kraken, MAKER_FEE, TAKER_FEE);
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

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> Kraken {
        let http = Arc::new(HttpClient::new(2000).unwrap());
        Kraken::new(http, Path::new("./data"))
    }

    #[test]
    fn test_normalize_is_uppercase() {
        let kraken = adapter();
        assert_eq!(kraken.normalize_pair("ethbtc"), "ETHBTC");
    }

    #[test]
    fn test_envelope_extracts_arbitrary_key() {
        let body = r#"{
            "error": [],
            "result": {
                "XETHXXBT": {
                    "asks": [["0.0331", "12.5", 1588248603]],
                    "bids": [["0.0329", "3.0", 1588248600]]
                }
            }
        }"#;
        let envelope: KrakenEnvelope<KrakenOrderBook> = serde_json::from_str(body).unwrap();
        let book = envelope.into_single().unwrap().into_pair_book("ethbtc");
        assert_eq!(book.asks[0].price, 0.0331);
        assert_eq!(book.bids[0].volume, 3.0);
    }

    #[test]
    fn test_envelope_rejects_error_response() {
        let body = r#"{"error": ["EQuery:Unknown asset pair"], "result": {}}"#;
        let envelope: KrakenEnvelope<KrakenOrderBook> = serde_json::from_str(body).unwrap();
        assert!(matches!(
            envelope.into_single(),
            Err(ExchangeError::Decode(_))
        ));
    }

    #[test]
    fn test_order_decodes_positional_and_named() {
        let positional: KrakenOrder = serde_json::from_str(r#"["101.5", "2", 1588248603]"#).unwrap();
        assert_eq!(positional.to_order(), Order::new(101.5, 2.0));

        let named: KrakenOrder =
            serde_json::from_str(r#"{"price": "101.5", "volume": "2", "timestamp": 1588248603}"#)
                .unwrap();
        assert_eq!(named.to_order(), Order::new(101.5, 2.0));
    }

    #[test]
    fn test_snapshot_applies_min_amount_by_prefix() {
        let mut kraken = adapter();
        kraken.min_amounts.insert("eth".to_string(), 0.02);
        kraken.books.insert(
            "ethusd".to_string(),
            PairBook {
                pair_id: "ethusd".to_string(),
                asks: vec![Order::new(210.0, 4.0)],
                bids: vec![Order::new(209.0, 1.0)],
            },
        );
        kraken.books.insert(
            "adausd".to_string(),
            PairBook {
                pair_id: "adausd".to_string(),
                asks: vec![Order::new(0.08, 100.0)],
                bids: vec![Order::new(0.079, 80.0)],
            },
        );

        let snapshot = kraken.to_snapshot();
        assert_eq!(snapshot.best_ask("ethusd").unwrap().min_volume, 0.02);
        assert_eq!(snapshot.best_bid("ethusd").unwrap().min_volume, 0.02);
        // No entry for ada: floor stays unknown.
        assert_eq!(snapshot.best_ask("adausd").unwrap().min_volume, 0.0);
    }
}
