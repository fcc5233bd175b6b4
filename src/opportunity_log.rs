//! Durable opportunity log
//!
//! One JSON object per winning opportunity, appended to a fixed file and
//! terminated by `,\n` so the stream parses once a reader wraps it in
//! brackets. Writing is best effort: an unwritable log costs a record,
//! never a round.
//!
//! Author: AI-Generated
//! Created: 2026-07-28

use crate::types::Opportunity;
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

pub struct OpportunityLog {
    path: PathBuf,
}

impl OpportunityLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Open, serialize or write failures are logged at
    /// WARN and swallowed.
    pub fn append(&self, opportunity: &Opportunity) {
        let json = match serde_json::to_string(opportunity) {
            Ok(json) => json,
            Err(e) => {
                warn!("Error serializing opportunity record: {}", e);
                return;
            }
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path);
        let mut file = match file {
            Ok(file) => file,
            Err(e) => {
                warn!("Error opening opportunity log {:?}: {}", self.path, e);
                return;
            }
        };

        if let Err(e) = write!(file, "{},\n", json) {
            warn!("Error appending to opportunity log {:?}: {}", self.path, e);
        }
    }

    /// Parse every record written so far by wrapping the comma-separated
    /// stream in brackets.
    pub fn read_all(&self) -> Result<Vec<Opportunity>> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read opportunity log {:?}", self.path))?;

        let trimmed = raw.trim_end().trim_end_matches(',');
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let wrapped = format!("[{}]", trimmed);
        serde_json::from_str(&wrapped)
            .with_context(|| format!("Failed to parse opportunity log {:?}", self.path))
    }
}
