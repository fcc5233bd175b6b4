//! Configuration management
//! Load settings from the environment (.env supported); every key has a
//! usable default so the bot starts with no configuration at all.

use anyhow::{anyhow, Result};
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

/// Runtime settings for the bot.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Root of the on-disk cache (`data/<EXCHANGE>/...`).
    pub data_dir: PathBuf,
    /// Append-only opportunity log.
    pub opportunity_log: PathBuf,
    /// Wall-clock budget for one pair refresh across all exchanges.
    pub round_timeout_ms: u64,
    /// Per-request timeout of the shared HTTP client.
    pub http_timeout_ms: u64,
    /// Pause between consecutive rounds.
    pub poll_interval_ms: u64,
    /// Dummy balance seeded per currency per exchange wallet.
    pub starting_balance: f64,
    /// Gemini publishes no flat fee; both default to zero until configured.
    pub gemini_maker_fee: f64,
    pub gemini_taker_fee: f64,
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow!("Invalid value for {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

pub fn load_config() -> Result<BotConfig> {
    dotenv::dotenv().ok();

    let data_dir: PathBuf = env_or("DATA_DIR", PathBuf::from("./data"))?;
    let opportunity_log = match std::env::var("OPPORTUNITY_LOG") {
        Ok(path) => PathBuf::from(path),
        Err(_) => data_dir.join("opportunities.json"),
    };

    Ok(BotConfig {
        data_dir,
        opportunity_log,
        round_timeout_ms: env_or("ROUND_TIMEOUT_MS", 2000)?,
        http_timeout_ms: env_or("HTTP_TIMEOUT_MS", 2000)?,
        poll_interval_ms: env_or("POLL_INTERVAL_MS", 1000)?,
        starting_balance: env_or("STARTING_BALANCE", crate::wallet::DUMMY_BALANCE)?,
        gemini_maker_fee: env_or("GEMINI_MAKER_FEE", 0.0)?,
        gemini_taker_fee: env_or("GEMINI_TAKER_FEE", 0.0)?,
    })
}
