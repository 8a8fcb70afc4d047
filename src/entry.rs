//! Entry tick location.
//!
//! Capture sampling is irregular, so "the market at T seconds before
//! close" means the open-window tick whose countdown is nearest to the
//! target, within a tolerance. Ties on distance go to the first occurrence
//! in sorted timeline order; that convention is applied uniformly here and
//! nowhere else, so every strategy sees the same entry tick.

use crate::feed::TickRecord;
use crate::timeline::MarketTimeline;

/// Find the tick nearest to `target_secs_left` among ticks still inside
/// the open-trading window. A closed-market tick is never returned,
/// regardless of proximity. Returns `None` when the nearest eligible tick
/// is further than `tolerance_secs` from the target.
pub fn locate<'a>(
    timeline: &'a MarketTimeline,
    target_secs_left: i64,
    tolerance_secs: i64,
    close_offset_secs: i64,
) -> Option<&'a TickRecord> {
    let mut best: Option<(&TickRecord, i64)> = None;
    for tick in timeline.ticks() {
        if !tick.is_open(close_offset_secs) {
            continue;
        }
        let diff = (tick.secs_left - target_secs_left).abs();
        // Strict < keeps the first occurrence on equal distance.
        match best {
            Some((_, best_diff)) if diff >= best_diff => {}
            _ => best = Some((tick, diff)),
        }
    }
    best.and_then(|(tick, diff)| (diff <= tolerance_secs).then_some(tick))
}

/// Find a tick roughly `lookback_secs` earlier in market life than the
/// anchor, i.e. at a larger countdown. Used for momentum comparisons.
pub fn locate_relative<'a>(
    timeline: &'a MarketTimeline,
    anchor: &TickRecord,
    lookback_secs: i64,
    tolerance_secs: i64,
    close_offset_secs: i64,
) -> Option<&'a TickRecord> {
    locate(
        timeline,
        anchor.secs_left + lookback_secs,
        tolerance_secs,
        close_offset_secs,
    )
}
