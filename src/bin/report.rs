//! Opportunity log reporter
//!
//! Reads the append-only opportunity log and prints a per-pair summary:
//! how many opportunities were recorded, what they earned in total, and the
//! single best round trip.
//!
//! Author: AI-Generated
//! Created: 2026-07-29

use anyhow::Result;
use cexarb_bot::opportunity_log::OpportunityLog;
use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "opportunity-report", about = "Summarize the opportunity log")]
struct Cli {
    /// Path of the opportunity log to read.
    #[arg(long, env = "OPPORTUNITY_LOG", default_value = "./data/opportunities.json")]
    log: PathBuf,
}

#[derive(Default)]
struct PairStats {
    count: usize,
    total_earning: f64,
    best_earning: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let records = OpportunityLog::new(&cli.log).read_all()?;

    if records.is_empty() {
        println!("No opportunities recorded in {:?}", cli.log);
        return Ok(());
    }

    let mut stats: BTreeMap<String, PairStats> = BTreeMap::new();
    for record in &records {
        let entry = stats.entry(record.pair_id.clone()).or_default();
        entry.count += 1;
        entry.total_earning += record.earning;
        entry.best_earning = entry.best_earning.max(record.earning);
    }

    println!("{:<12} {:>8} {:>16} {:>12}", "pair", "count", "total earning", "best");
    for (pair, entry) in &stats {
        println!(
            "{:<12} {:>8} {:>16.4} {:>12.4}",
            pair, entry.count, entry.total_earning, entry.best_earning
        );
    }

    let total: f64 = records.iter().map(|r| r.earning).sum();
    println!("\n{} opportunities, {:.4} total earning", records.len(), total);
    Ok(())
}
