//! Settlement resolution.
//!
//! The outcome feed is incomplete and inconsistent: some markets carry a
//! declared result on a late tick, some only flip to a terminal status, and
//! some disappear before either happens. Resolution is an explicit priority
//! chain of tiers, each scanned over the whole timeline before the next is
//! tried, so a weaker signal can never preempt a stronger one:
//!
//! 1. Declared result on any tick (newest first) — authoritative.
//! 2. Terminal status ("finalized"/"determined") — index vs strike at that
//!    tick.
//! 3. Last tick still inside the open-trading window — index vs strike.
//!
//! A market with none of these is unresolvable and excluded from all
//! evaluation. The result is cached on the timeline and never recomputed.

use crate::feed::TickRecord;
use crate::timeline::{MarketTimeline, TimelineSet};
use crate::trade::Outcome;
use rayon::prelude::*;
use serde::Serialize;

/// Lifecycle labels that mark a market as past the point of settlement.
pub const TERMINAL_STATUSES: [&str; 2] = ["finalized", "determined"];

/// Which tier of the priority chain produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    /// A tick carried an explicit yes/no result.
    DeclaredResult,
    /// Inferred from index vs strike at a terminal-status tick.
    TerminalStatus,
    /// Inferred from index vs strike at the last open-window tick.
    LastOpenTick,
}

/// A resolved settlement plus its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub outcome: Outcome,
    pub tier: ResolutionTier,
}

pub fn is_terminal_status(status: &str) -> bool {
    TERMINAL_STATUSES.contains(&status)
}

fn index_vs_strike(tick: &TickRecord) -> Outcome {
    if tick.index_value >= tick.strike {
        Outcome::Yes
    } else {
        Outcome::No
    }
}

/// Resolve a market's settlement. Idempotent: the first call computes and
/// caches, every later call returns the cached value.
pub fn resolve(timeline: &MarketTimeline, close_offset_secs: i64) -> Option<Resolution> {
    *timeline
        .settlement_cache()
        .get_or_init(|| resolve_uncached(timeline, close_offset_secs))
}

fn resolve_uncached(timeline: &MarketTimeline, close_offset_secs: i64) -> Option<Resolution> {
    // Tier 1: any declared result, newest first, over the entire timeline.
    for tick in timeline.ticks().iter().rev() {
        if let Some(outcome) = tick.declared_result {
            return Some(Resolution {
                outcome,
                tier: ResolutionTier::DeclaredResult,
            });
        }
    }

    // Tier 2: newest terminal-status tick.
    for tick in timeline.ticks().iter().rev() {
        if is_terminal_status(&tick.status) {
            return Some(Resolution {
                outcome: index_vs_strike(tick),
                tier: ResolutionTier::TerminalStatus,
            });
        }
    }

    // Tier 3: last tick still inside the open-trading window.
    timeline
        .ticks()
        .iter()
        .rev()
        .find(|t| t.is_open(close_offset_secs))
        .map(|t| Resolution {
            outcome: index_vs_strike(t),
            tier: ResolutionTier::LastOpenTick,
        })
}

/// Per-batch resolution counts.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SettlementSummary {
    pub resolved: usize,
    pub unresolved: usize,
    pub by_declared_result: usize,
    pub by_terminal_status: usize,
    pub by_last_open_tick: usize,
}

/// Resolve every market in the batch. Markets are independent, so this
/// fans out across threads; each timeline's cache is written once.
pub fn resolve_all(set: &TimelineSet, close_offset_secs: i64) -> SettlementSummary {
    let resolutions: Vec<Option<Resolution>> = set
        .timelines()
        .par_iter()
        .map(|timeline| resolve(timeline, close_offset_secs))
        .collect();

    let mut summary = SettlementSummary::default();
    for resolution in resolutions {
        match resolution {
            Some(r) => {
                summary.resolved += 1;
                match r.tier {
                    ResolutionTier::DeclaredResult => summary.by_declared_result += 1,
                    ResolutionTier::TerminalStatus => summary.by_terminal_status += 1,
                    ResolutionTier::LastOpenTick => summary.by_last_open_tick += 1,
                }
            }
            None => summary.unresolved += 1,
        }
    }

    tracing::info!(
        resolved = summary.resolved,
        unresolved = summary.unresolved,
        declared = summary.by_declared_result,
        terminal = summary.by_terminal_status,
        last_open = summary.by_last_open_tick,
        "settlement resolution complete"
    );
    summary
}
