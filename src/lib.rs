//! CEX Arbitrage Bot Library
//!
//! Components for cross-exchange spot arbitrage detection: exchange
//! adapters, per-round quote orchestration, opportunity detection, and
//! simulated wallet bookkeeping with a durable opportunity log.
//!
//! Author: AI-Generated
//! Created: 2026-07-28

pub mod arbitrage;
pub mod config;
pub mod exchanges;
pub mod http;
pub mod opportunity_log;
pub mod storage;
pub mod types;
pub mod wallet;

// Re-export commonly used types
pub use arbitrage::{common_pairs, OpportunityDetector, QuoteOrchestrator, RoundError};
pub use config::{load_config, BotConfig};
pub use exchanges::{ExchangeAdapter, ExchangeError, SharedAdapter};
pub use opportunity_log::OpportunityLog;
pub use types::{Exchange, MarketSnapshot, Opportunity, Order, PairBook, Wallet};
pub use wallet::WalletRegistry;
