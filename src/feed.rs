//! Tick feed decoding and normalization.
//!
//! The collector emits one JSON envelope per second: the reference index
//! value (BRTI), a handful of spot-exchange prices, and a snapshot of every
//! open market. This module narrows those envelopes into fixed-shape
//! [`TickRecord`]s and keeps aggregate counts of everything it drops.
//!
//! Input defects are never fatal: a malformed line, a non-tick envelope, or
//! a market snapshot without a strike is counted and skipped, and the batch
//! continues.

use crate::trade::{Cents, Outcome};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Spot feeds the collector publishes alongside the index.
pub const DEFAULT_FEED_NAMES: [&str; 4] = ["coinbase", "kraken", "bitstamp", "binance"];

// =============================================================================
// Wire types
// =============================================================================

/// One decoded collector envelope. Unknown top-level fields land in
/// `extra`, which is also where the per-exchange spot prices live (they are
/// keyed by feed name at the top level of the envelope).
#[derive(Debug, Clone, Deserialize)]
pub struct RawEnvelope {
    #[serde(rename = "type", default)]
    pub kind: String,
    /// RFC3339 timestamp written by the collector.
    #[serde(default)]
    pub ts: String,
    /// Reference index value. 0 means the index feed was down.
    #[serde(default)]
    pub brti: f64,
    #[serde(default)]
    pub markets: Vec<RawMarketSnap>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// One market's snapshot inside an envelope. Missing numeric fields decode
/// as 0 and missing strings as "", matching the collector's omitempty
/// encoding. Fields this engine does not use (last_price, volume, books)
/// are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMarketSnap {
    #[serde(default)]
    pub ticker: String,
    #[serde(default)]
    pub yes_bid: Cents,
    #[serde(default)]
    pub yes_ask: Cents,
    #[serde(default)]
    pub strike: f64,
    #[serde(default)]
    pub secs_left: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub result: String,
}

// =============================================================================
// Normalized record
// =============================================================================

/// One market's state at one observed timestamp. Created once from input,
/// never mutated.
#[derive(Debug, Clone)]
pub struct TickRecord {
    pub ticker: String,
    pub timestamp: DateTime<Utc>,
    /// Countdown to settlement. Trading closes while this is still above
    /// the configured close offset.
    pub secs_left: i64,
    /// Reference index value driving settlement.
    pub index_value: f64,
    pub strike: f64,
    /// YES ask/bid in cents, 0 = no quote.
    pub yes_bid: Cents,
    pub yes_ask: Cents,
    /// Free-form lifecycle label from the venue.
    pub status: String,
    /// Declared settlement outcome, if the venue has published one.
    pub declared_result: Option<Outcome>,
    /// Spot-exchange prices observed at the same instant, keyed by feed
    /// name. Only strictly positive values are kept.
    pub exchange_feeds: BTreeMap<String, f64>,
}

impl TickRecord {
    /// NO ask is always derived from the YES bid; it is never an
    /// independent quote and must not be treated as one.
    pub fn no_ask(&self) -> Cents {
        100 - self.yes_bid
    }

    /// Whether the market is still open for trading at this tick.
    pub fn is_open(&self, close_offset_secs: i64) -> bool {
        self.secs_left > close_offset_secs
    }

    /// Signed distance of the index from the strike (positive = above).
    pub fn distance_from_strike(&self) -> f64 {
        self.index_value - self.strike
    }
}

// =============================================================================
// Normalizer
// =============================================================================

#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Top-level envelope keys to read as exchange feeds.
    pub feed_names: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            feed_names: DEFAULT_FEED_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Aggregate drop counts for a normalization pass. These are the only
/// record of input defects; nothing in this module raises for bad data.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NormalizeStats {
    pub lines: u64,
    pub malformed_lines: u64,
    pub envelopes: u64,
    /// Envelopes whose kind was not "tick" (heartbeats etc.).
    pub ignored_envelopes: u64,
    /// Tick envelopes with no index value.
    pub zero_index_envelopes: u64,
    /// Tick envelopes whose timestamp failed to parse.
    pub bad_timestamps: u64,
    pub records: u64,
    /// Market snapshots dropped for a zero/absent strike.
    pub dropped_zero_strike: u64,
}

#[derive(Debug, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
    stats: NormalizeStats,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self {
            config,
            stats: NormalizeStats::default(),
        }
    }

    pub fn stats(&self) -> &NormalizeStats {
        &self.stats
    }

    /// Decode one JSONL line. Blank lines are skipped silently, malformed
    /// lines are counted and skipped.
    pub fn parse_line(&mut self, line: &str) -> Option<RawEnvelope> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        self.stats.lines += 1;
        match serde_json::from_str::<RawEnvelope>(line) {
            Ok(envelope) => Some(envelope),
            Err(_) => {
                self.stats.malformed_lines += 1;
                None
            }
        }
    }

    /// Narrow one envelope into zero or more records.
    pub fn normalize(&mut self, envelope: &RawEnvelope) -> Vec<TickRecord> {
        self.stats.envelopes += 1;
        if envelope.kind != "tick" {
            self.stats.ignored_envelopes += 1;
            return Vec::new();
        }
        if envelope.brti == 0.0 {
            self.stats.zero_index_envelopes += 1;
            return Vec::new();
        }
        let timestamp = match DateTime::parse_from_rfc3339(&envelope.ts) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(_) => {
                self.stats.bad_timestamps += 1;
                return Vec::new();
            }
        };

        let exchange_feeds = self.collect_feeds(envelope);

        let mut records = Vec::with_capacity(envelope.markets.len());
        for snap in &envelope.markets {
            // No strike means the record cannot be timed against close.
            if snap.strike == 0.0 {
                self.stats.dropped_zero_strike += 1;
                continue;
            }
            self.stats.records += 1;
            records.push(TickRecord {
                ticker: snap.ticker.clone(),
                timestamp,
                secs_left: snap.secs_left,
                index_value: envelope.brti,
                strike: snap.strike,
                yes_bid: snap.yes_bid,
                yes_ask: snap.yes_ask,
                status: snap.status.clone(),
                declared_result: Outcome::parse(&snap.result),
                exchange_feeds: exchange_feeds.clone(),
            });
        }
        records
    }

    fn collect_feeds(&self, envelope: &RawEnvelope) -> BTreeMap<String, f64> {
        let mut feeds = BTreeMap::new();
        for name in &self.config.feed_names {
            if let Some(value) = envelope.extra.get(name).and_then(|v| v.as_f64()) {
                if value > 0.0 {
                    feeds.insert(name.clone(), value);
                }
            }
        }
        feeds
    }
}

// =============================================================================
// JSONL adapter
// =============================================================================

/// Read and normalize a set of JSONL capture files. This is the file-level
/// collaborator for the CLI; the evaluation core only ever sees the
/// resulting records.
pub fn read_jsonl_files<P: AsRef<Path>>(
    paths: &[P],
    normalizer: &mut Normalizer,
) -> Result<Vec<TickRecord>> {
    let mut records = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open capture file {}", path.display()))?;
        for line in BufReader::new(file).lines() {
            let line = line
                .with_context(|| format!("failed to read line from {}", path.display()))?;
            if let Some(envelope) = normalizer.parse_line(&line) {
                records.extend(normalizer.normalize(&envelope));
            }
        }
    }
    tracing::info!(
        files = paths.len(),
        records = records.len(),
        malformed = normalizer.stats().malformed_lines,
        "loaded capture files"
    );
    Ok(records)
}
