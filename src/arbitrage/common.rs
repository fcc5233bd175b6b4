//! Common-pair resolution
//!
//! A pair is only worth scanning when every exchange quotes it. The
//! intersection walks the snapshot with the most pairs and probes the rest,
//! so the cost is one membership test per candidate per market.
//!
//! Author: AI-Generated
//! Created: 2026-07-28

use crate::types::MarketSnapshot;
use tracing::debug;

/// Pair ids present in the `asks` mapping of every snapshot.
///
/// Output order is unspecified; callers must not depend on it. An empty
/// input yields an empty set, a single snapshot yields its own keys.
pub fn common_pairs(snapshots: &[MarketSnapshot]) -> Vec<String> {
    if snapshots.is_empty() {
        return Vec::new();
    }

    // Walk the largest key set; ties keep the first encountered.
    let mut largest = 0;
    for i in 1..snapshots.len() {
        if snapshots[i].asks.len() > snapshots[largest].asks.len() {
            largest = i;
        }
    }

    let mut common = Vec::new();
    for pair_id in snapshots[largest].asks.keys() {
        let everywhere = snapshots
            .iter()
            .all(|snapshot| snapshot.asks.contains_key(pair_id));
        if everywhere {
            common.push(pair_id.clone());
        } else {
            debug!("Pair [{}] is not quoted on every exchange", pair_id);
        }
    }

    debug!("{} pairs in common across all exchanges", common.len());
    common
}
