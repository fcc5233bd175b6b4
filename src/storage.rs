//! On-disk cache for raw exchange payloads
//!
//! Pair lists, pair metadata and primed order books are dumped as JSON under
//! `data/<EXCHANGE>/`, so repeat startups skip the corresponding requests.
//! Dump failures are logged and swallowed; the cache is an optimization,
//! never a correctness dependency.
//!
//! Author: AI-Generated
//! Created: 2026-07-28

use crate::types::Exchange;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Create the per-exchange cache tree (`<base>/<EXCHANGE>/orders/`).
pub fn ensure_exchange_dirs(base: &Path) -> Result<()> {
    for exchange in Exchange::all() {
        let orders = base.join(exchange.to_string()).join("orders");
        fs::create_dir_all(&orders)
            .with_context(|| format!("Failed to create cache directory: {:?}", orders))?;
    }
    Ok(())
}

/// Root of one exchange's cache tree.
pub fn exchange_dir(base: &Path, exchange: Exchange) -> PathBuf {
    base.join(exchange.to_string())
}

/// Serialize a value to pretty JSON on disk. Failures are logged and
/// swallowed, matching the append-only, best-effort nature of the cache.
pub fn dump_json<T: Serialize>(value: &T, path: &Path) {
    let payload = match serde_json::to_string_pretty(value) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Error serializing cache entry for {:?}: {}", path, e);
            return;
        }
    };
    if let Err(e) = fs::write(path, payload) {
        warn!("Error writing cache file {:?}: {}", path, e);
    }
}

/// Load a previously dumped JSON value.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data =
        fs::read_to_string(path).with_context(|| format!("Failed to read cache file {:?}", path))?;
    serde_json::from_str(&data).with_context(|| format!("Failed to parse cache file {:?}", path))
}

/// Load the per-currency minimum amounts table: one line per entry,
/// `<float> <CURRENCY>`. A missing or unreadable file yields an empty table
/// (no floor known) rather than an error.
pub fn load_min_amounts(path: &Path) -> HashMap<String, f64> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) => {
            warn!("Unable to read min amount file {:?}: {}", path, e);
            return HashMap::new();
        }
    };

    let mut amounts = HashMap::new();
    for line in data.lines() {
        let mut fields = line.split_whitespace();
        let (Some(raw_amount), Some(currency)) = (fields.next(), fields.next()) else {
            continue;
        };
        let amount: f64 = raw_amount.parse().unwrap_or(0.0);
        amounts.insert(currency.to_lowercase(), amount);
    }
    amounts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_dump_and_load_roundtrip() {
        let dir = env::temp_dir().join("cexarb_storage_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let path = dir.join("pairs_list.json");
        let pairs = vec!["btcusd".to_string(), "ethusd".to_string()];
        dump_json(&pairs, &path);

        let loaded: Vec<String> = load_json(&path).unwrap();
        assert_eq!(loaded, pairs);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_ensure_exchange_dirs() {
        let dir = env::temp_dir().join("cexarb_dirs_test");
        let _ = fs::remove_dir_all(&dir);

        ensure_exchange_dirs(&dir).unwrap();
        assert!(dir.join("KRAKEN").join("orders").is_dir());
        assert!(dir.join("BITFINEX").join("orders").is_dir());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_min_amounts() {
        let dir = env::temp_dir().join("cexarb_min_amount_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let path = dir.join("min_amount.txt");
        fs::write(&path, "0.002 XBT\n0.02 ETH\nnot-a-number ADA\n").unwrap();

        let amounts = load_min_amounts(&path);
        assert_eq!(amounts.get("xbt"), Some(&0.002));
        assert_eq!(amounts.get("eth"), Some(&0.02));
        assert_eq!(amounts.get("ada"), Some(&0.0));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_min_amounts_missing_file() {
        let path = env::temp_dir().join("cexarb_no_such_min_amount.txt");
        assert!(load_min_amounts(&path).is_empty());
    }
}
