//! Decision rules and strategy evaluation.
//!
//! Each rule is a pure function of the entry tick (plus, for momentum and
//! composite scoring, an earlier tick) that either picks a side and a
//! price or declines. Evaluation never mutates a timeline, and P&L is
//! owned entirely by [`Trade::open`] — rules only ever return
//! `(side, price)`.
//!
//! The five rule families are materially different signal classes, not
//! variations of one rule:
//!
//! - **ThresholdSide**: buy whichever side the market itself prices as
//!   near-certain.
//! - **DistanceFromStrike**: trade the direction of the index's distance
//!   from the strike, optionally gated on a minimum contract price.
//! - **CheapSide**: buy the underdog below a maximum price.
//! - **Momentum**: trade the direction of a recent quote move, gated on a
//!   confidence floor.
//! - **Composite**: integer-score several signals and trade the distance
//!   direction when enough of them fire.

use crate::config::EngineConfig;
use crate::entry;
use crate::feed::TickRecord;
use crate::settlement;
use crate::timeline::{MarketTimeline, TimelineSet};
use crate::trade::{Cents, Outcome, Trade};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Rule parameters
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSideParams {
    /// Minimum ask price (cents) for a side to qualify.
    pub min_price: Cents,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceParams {
    /// Minimum absolute distance (index units) of index from strike.
    pub distance: f64,
    /// Optional floor on the entry price of the chosen side.
    #[serde(default)]
    pub min_price: Option<Cents>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheapSideParams {
    /// Maximum ask price (cents) at which the underdog is still bought.
    pub max_price: Cents,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentumParams {
    /// How far back (seconds of market life) the comparison tick sits.
    pub lookback_secs: i64,
    /// Minimum YES-ask move (cents) to count as momentum.
    pub move_threshold: Cents,
    /// Minimum price (cents) of the side being bought.
    pub min_confidence: Cents,
    /// Acceptance window for the lookback tick.
    pub lookback_tolerance_secs: i64,
}

impl Default for MomentumParams {
    fn default() -> Self {
        Self {
            lookback_secs: 30,
            move_threshold: 8,
            min_confidence: 55,
            lookback_tolerance_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeParams {
    /// Distance signal threshold (index units).
    pub distance: f64,
    /// Momentum signal threshold (cents).
    pub momentum_threshold: Cents,
    /// High-confidence price signal threshold (cents).
    pub price_confidence: Cents,
    pub lookback_secs: i64,
    pub lookback_tolerance_secs: i64,
    /// Minimum number of live exchange feeds for the quorum signal.
    pub min_feeds: usize,
    /// Minimum score required to trade.
    pub min_score: u32,
}

impl Default for CompositeParams {
    fn default() -> Self {
        Self {
            distance: 75.0,
            momentum_threshold: 8,
            price_confidence: 75,
            lookback_secs: 30,
            lookback_tolerance_secs: 15,
            min_feeds: 2,
            min_score: 2,
        }
    }
}

// =============================================================================
// Decision rules
// =============================================================================

/// The decision-policy half of a strategy. Pure: reads the entry tick (and
/// timeline for lookbacks) and returns a side and entry price, or declines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionRule {
    ThresholdSide(ThresholdSideParams),
    DistanceFromStrike(DistanceParams),
    CheapSide(CheapSideParams),
    Momentum(MomentumParams),
    Composite(CompositeParams),
}

impl fmt::Display for DecisionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThresholdSide(p) => write!(f, "threshold>={}c", p.min_price),
            Self::DistanceFromStrike(p) => match p.min_price {
                Some(min) => write!(f, "dist>={} px>={}c", p.distance, min),
                None => write!(f, "dist>={}", p.distance),
            },
            Self::CheapSide(p) => write!(f, "cheap<={}c", p.max_price),
            Self::Momentum(p) => write!(
                f,
                "mom {}s/{}c conf>={}c",
                p.lookback_secs, p.move_threshold, p.min_confidence
            ),
            Self::Composite(p) => write!(f, "composite score>={}", p.min_score),
        }
    }
}

impl DecisionRule {
    /// Apply the rule at an entry tick. Returns the chosen side and entry
    /// price; price-range validity (1..=99) is enforced once, at trade
    /// construction.
    pub fn decide(
        &self,
        timeline: &MarketTimeline,
        entry_tick: &TickRecord,
        config: &EngineConfig,
    ) -> Option<(Outcome, Cents)> {
        match self {
            Self::ThresholdSide(p) => decide_threshold_side(entry_tick, p),
            Self::DistanceFromStrike(p) => decide_distance(entry_tick, p),
            Self::CheapSide(p) => decide_cheap_side(entry_tick, p),
            Self::Momentum(p) => decide_momentum(timeline, entry_tick, p, config),
            Self::Composite(p) => decide_composite(timeline, entry_tick, p, config),
        }
    }
}

fn decide_threshold_side(
    tick: &TickRecord,
    params: &ThresholdSideParams,
) -> Option<(Outcome, Cents)> {
    let yes_ask = tick.yes_ask;
    let no_ask = tick.no_ask();
    let yes_qualifies = yes_ask >= params.min_price;
    let no_qualifies = no_ask >= params.min_price;

    let (side, price) = match (yes_qualifies, no_qualifies) {
        // Both qualify: take the more expensive (higher-confidence) side;
        // an exact price tie goes to YES.
        (true, true) => {
            if yes_ask >= no_ask {
                (Outcome::Yes, yes_ask)
            } else {
                (Outcome::No, no_ask)
            }
        }
        (true, false) => (Outcome::Yes, yes_ask),
        (false, true) => (Outcome::No, no_ask),
        (false, false) => return None,
    };

    // No liquidity at the very top of the book.
    if price >= 99 {
        return None;
    }
    Some((side, price))
}

fn decide_distance(tick: &TickRecord, params: &DistanceParams) -> Option<(Outcome, Cents)> {
    let distance = tick.distance_from_strike();
    let (side, price) = if distance >= params.distance {
        (Outcome::Yes, tick.yes_ask)
    } else if distance <= -params.distance {
        (Outcome::No, tick.no_ask())
    } else {
        return None;
    };

    if let Some(min_price) = params.min_price {
        if price < min_price {
            return None;
        }
    }
    Some((side, price))
}

fn decide_cheap_side(tick: &TickRecord, params: &CheapSideParams) -> Option<(Outcome, Cents)> {
    let yes_ask = tick.yes_ask;
    let no_ask = tick.no_ask();
    if yes_ask > 0 && yes_ask <= params.max_price {
        Some((Outcome::Yes, yes_ask))
    } else if no_ask > 0 && no_ask <= params.max_price {
        Some((Outcome::No, no_ask))
    } else {
        None
    }
}

fn decide_momentum(
    timeline: &MarketTimeline,
    entry_tick: &TickRecord,
    params: &MomentumParams,
    config: &EngineConfig,
) -> Option<(Outcome, Cents)> {
    let earlier = entry::locate_relative(
        timeline,
        entry_tick,
        params.lookback_secs,
        params.lookback_tolerance_secs,
        config.close_offset_secs,
    )?;

    let now = entry_tick.yes_ask;
    let before = earlier.yes_ask;
    if now == 0 || before == 0 {
        return None;
    }

    let change = now - before;
    if change >= params.move_threshold {
        // YES price surging: buy YES if it clears the confidence floor.
        (now >= params.min_confidence).then_some((Outcome::Yes, now))
    } else if change <= -params.move_threshold {
        // YES price dropping means NO is gaining.
        let no_ask = entry_tick.no_ask();
        (no_ask >= params.min_confidence).then_some((Outcome::No, no_ask))
    } else {
        None
    }
}

fn decide_composite(
    timeline: &MarketTimeline,
    entry_tick: &TickRecord,
    params: &CompositeParams,
    config: &EngineConfig,
) -> Option<(Outcome, Cents)> {
    let yes_ask = entry_tick.yes_ask;
    let yes_bid = entry_tick.yes_bid;
    let no_ask = entry_tick.no_ask();
    if yes_ask <= 0 || yes_bid <= 0 {
        return None;
    }

    let distance = entry_tick.distance_from_strike();
    let mut score = 0u32;

    // Signal 1: index far from strike.
    if distance.abs() >= params.distance {
        score += 1;
    }

    // Signal 2: the market already prices one side with high confidence.
    if yes_ask.max(no_ask) >= params.price_confidence {
        score += 1;
    }

    // Signal 3: momentum agreeing with the distance direction.
    let distance_direction = if distance > 0.0 { Outcome::Yes } else { Outcome::No };
    if let Some(earlier) = entry::locate_relative(
        timeline,
        entry_tick,
        params.lookback_secs,
        params.lookback_tolerance_secs,
        config.close_offset_secs,
    ) {
        if earlier.yes_ask > 0 {
            let change = yes_ask - earlier.yes_ask;
            let momentum_direction = if change >= params.momentum_threshold {
                Some(Outcome::Yes)
            } else if change <= -params.momentum_threshold {
                Some(Outcome::No)
            } else {
                None
            };
            if momentum_direction == Some(distance_direction) {
                score += 1;
            }
        }
    }

    // Signal 4: a quorum of exchange feeds unanimous on direction vs
    // strike. Feeds at exactly the strike break unanimity.
    let feeds = &entry_tick.exchange_feeds;
    if feeds.len() >= params.min_feeds {
        let above = feeds.values().filter(|v| **v > entry_tick.strike).count();
        let below = feeds.values().filter(|v| **v < entry_tick.strike).count();
        if above == feeds.len() || below == feeds.len() {
            score += 1;
        }
    }

    if score < params.min_score {
        return None;
    }

    // Direction always follows the distance sign, whatever fired.
    if distance > 0.0 {
        Some((Outcome::Yes, yes_ask))
    } else if distance < 0.0 {
        Some((Outcome::No, no_ask))
    } else {
        None
    }
}

// =============================================================================
// Strategy evaluation
// =============================================================================

/// A fully parameterized strategy: when to enter, and how to decide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySpec {
    /// Entry time, in seconds before trading close.
    pub entry_secs_before_close: i64,
    pub rule: DecisionRule,
}

impl fmt::Display for StrategySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m {}", self.entry_secs_before_close / 60, self.rule)
    }
}

/// Why a market produced no trade. None of these are errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Entered(Trade),
    /// No derivable settlement; excluded from evaluation.
    Unresolved,
    /// No open-window tick near the entry time.
    NoEntryTick,
    /// Entry conditions not met (or the quoted price was degenerate).
    NoTrade,
}

/// Evaluate one strategy against one market.
pub fn evaluate_market(
    timeline: &MarketTimeline,
    spec: &StrategySpec,
    config: &EngineConfig,
) -> Decision {
    let Some(resolution) = settlement::resolve(timeline, config.close_offset_secs) else {
        return Decision::Unresolved;
    };
    let target = config.target_secs_left(spec.entry_secs_before_close);
    let Some(entry_tick) = entry::locate(
        timeline,
        target,
        config.tick_tolerance_secs,
        config.close_offset_secs,
    ) else {
        return Decision::NoEntryTick;
    };
    let Some((side, price)) = spec.rule.decide(timeline, entry_tick, config) else {
        return Decision::NoTrade;
    };
    match Trade::open(timeline.ticker().to_string(), side, price, resolution.outcome) {
        Some(trade) => Decision::Entered(trade),
        None => Decision::NoTrade,
    }
}

/// Evaluate one strategy against one market, discarding the reason when no
/// trade results.
pub fn evaluate(
    timeline: &MarketTimeline,
    spec: &StrategySpec,
    config: &EngineConfig,
) -> Option<Trade> {
    match evaluate_market(timeline, spec, config) {
        Decision::Entered(trade) => Some(trade),
        _ => None,
    }
}

/// Per-run counts over all markets, one entry per taxonomy class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationSummary {
    pub markets: usize,
    pub unresolved: usize,
    pub no_entry_tick: usize,
    pub no_trade: usize,
    pub trades: usize,
}

/// Result of running one strategy across a batch.
#[derive(Debug, Clone)]
pub struct StrategyRun {
    /// Trades in the order markets were first encountered.
    pub trades: Vec<Trade>,
    pub summary: EvaluationSummary,
}

/// Run one strategy over every market, in encounter order.
pub fn run(set: &TimelineSet, spec: &StrategySpec, config: &EngineConfig) -> StrategyRun {
    let mut trades = Vec::new();
    let mut summary = EvaluationSummary {
        markets: set.len(),
        ..EvaluationSummary::default()
    };
    for timeline in set.iter() {
        match evaluate_market(timeline, spec, config) {
            Decision::Entered(trade) => {
                trades.push(trade);
                summary.trades += 1;
            }
            Decision::Unresolved => summary.unresolved += 1,
            Decision::NoEntryTick => summary.no_entry_tick += 1,
            Decision::NoTrade => summary.no_trade += 1,
        }
    }
    StrategyRun { trades, summary }
}
