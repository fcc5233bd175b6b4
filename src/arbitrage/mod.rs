//! Arbitrage engine
//!
//! Per-round pipeline: the orchestrator refreshes one pair across all
//! exchanges in parallel and prunes the failures, the detector scans the
//! survivors for the most profitable round trip, and the common-pair
//! resolver decides which pairs are worth scanning at all.
//!
//! Author: AI-Generated
//! Created: 2026-07-28

pub mod common;
pub mod detector;
pub mod orchestrator;

pub use common::common_pairs;
pub use detector::OpportunityDetector;
pub use orchestrator::{QuoteOrchestrator, RoundError};
