//! Per-market timelines.
//!
//! Groups normalized tick records by market ticker and orders each group by
//! timestamp. The sort is stable: records sharing a timestamp keep their
//! arrival order, which the nearest-tick search depends on for
//! deterministic tie-breaking.

use crate::feed::TickRecord;
use crate::settlement::Resolution;
use std::collections::HashMap;
use std::sync::OnceLock;

/// One market's ordered tick sequence. Read-only after construction; the
/// settlement cache is written at most once.
#[derive(Debug)]
pub struct MarketTimeline {
    ticker: String,
    ticks: Vec<TickRecord>,
    settlement: OnceLock<Option<Resolution>>,
}

impl MarketTimeline {
    fn new(ticker: String, mut ticks: Vec<TickRecord>) -> Self {
        // sort_by_key is a stable sort; equal timestamps keep input order.
        ticks.sort_by_key(|t| t.timestamp);
        Self {
            ticker,
            ticks,
            settlement: OnceLock::new(),
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Ticks sorted ascending by timestamp.
    pub fn ticks(&self) -> &[TickRecord] {
        &self.ticks
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub(crate) fn settlement_cache(&self) -> &OnceLock<Option<Resolution>> {
        &self.settlement
    }

    /// Test-only constructor for building timelines directly from records.
    #[cfg(test)]
    pub(crate) fn from_ticks(ticker: &str, ticks: Vec<TickRecord>) -> Self {
        Self::new(ticker.to_string(), ticks)
    }
}

/// All timelines from one batch, in the order markets were first
/// encountered in the input stream. That order is the documented output
/// order for single-strategy trade lists.
#[derive(Debug, Default)]
pub struct TimelineSet {
    timelines: Vec<MarketTimeline>,
}

impl TimelineSet {
    /// Fold a record stream into per-market timelines. Records never move
    /// across timelines; the whole collection is owned by this run.
    pub fn from_records(records: impl IntoIterator<Item = TickRecord>) -> Self {
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<TickRecord>> = HashMap::new();
        for record in records {
            if !groups.contains_key(&record.ticker) {
                order.push(record.ticker.clone());
            }
            groups.entry(record.ticker.clone()).or_default().push(record);
        }

        let timelines = order
            .into_iter()
            .map(|ticker| {
                let ticks = groups.remove(&ticker).unwrap_or_default();
                MarketTimeline::new(ticker, ticks)
            })
            .collect();

        let set = Self { timelines };
        tracing::debug!(markets = set.len(), "built timelines");
        set
    }

    pub fn timelines(&self) -> &[MarketTimeline] {
        &self.timelines
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarketTimeline> {
        self.timelines.iter()
    }

    pub fn get(&self, ticker: &str) -> Option<&MarketTimeline> {
        self.timelines.iter().find(|t| t.ticker() == ticker)
    }

    pub fn len(&self) -> usize {
        self.timelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timelines.is_empty()
    }
}
