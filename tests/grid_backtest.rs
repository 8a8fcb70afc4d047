//! End-to-end pipeline test: raw collector JSONL through normalization,
//! timeline construction, settlement, and a parameter-grid sweep.
//!
//! The capture below covers three markets on one strike (101250) with all
//! three settlement paths represented:
//!
//! - M1 settles NO via a declared result (even though its final index
//!   reading sits above the strike).
//! - M2 settles YES via terminal status plus index-vs-strike.
//! - M3 has neither and falls back to its last open-window tick, where the
//!   index sits below the strike: NO.

use kalshi_backtest::strategy::{self, ThresholdSideParams};
use kalshi_backtest::{
    feed, settlement, DecisionRule, EngineConfig, GridRunner, GridSpec, Normalizer, RankMetric,
    ResolutionTier, StrategySpec, TimelineSet,
};
use std::fs::File;
use std::io::Write;

fn capture_lines() -> String {
    let mut lines = String::new();
    // Entry window for a 300s-before-close strategy: target secs_left is
    // 294 + 300 = 594, and this tick at 600 is the only one in tolerance.
    lines.push_str(concat!(
        r#"{"type":"tick","ts":"2025-01-07T14:00:00Z","brti":101300.0,"coinbase":101295.0,"kraken":101305.0,"markets":["#,
        r#"{"ticker":"M1","yes_bid":20,"yes_ask":70,"strike":101250.0,"secs_left":600,"status":"active"},"#,
        r#"{"ticker":"M2","yes_bid":85,"yes_ask":90,"strike":101250.0,"secs_left":600,"status":"active"},"#,
        r#"{"ticker":"M3","yes_bid":40,"yes_ask":45,"strike":101250.0,"secs_left":600,"status":"active"}]}"#,
        "\n",
    ));
    // Noise the loader must survive.
    lines.push_str("{this line is not json}\n");
    lines.push_str(r#"{"type":"heartbeat","ts":"2025-01-07T14:02:00Z"}"#);
    lines.push('\n');
    // Last open-window tick (secs_left 300 > close offset 294). Index is
    // below the strike here, which decides M3's fallback settlement.
    lines.push_str(concat!(
        r#"{"type":"tick","ts":"2025-01-07T14:05:00Z","brti":101100.0,"coinbase":101095.0,"markets":["#,
        r#"{"ticker":"M1","yes_bid":25,"yes_ask":60,"strike":101250.0,"secs_left":300,"status":"active"},"#,
        r#"{"ticker":"M2","yes_bid":90,"yes_ask":96,"strike":101250.0,"secs_left":300,"status":"active"},"#,
        r#"{"ticker":"M3","yes_bid":30,"yes_ask":35,"strike":101250.0,"secs_left":300,"status":"active"}]}"#,
        "\n",
    ));
    // Post-close ticks carrying the settlement evidence.
    lines.push_str(concat!(
        r#"{"type":"tick","ts":"2025-01-07T14:05:10Z","brti":101400.0,"markets":["#,
        r#"{"ticker":"M1","yes_bid":0,"yes_ask":0,"strike":101250.0,"secs_left":290,"status":"finalized","result":"no"},"#,
        r#"{"ticker":"M2","yes_bid":0,"yes_ask":0,"strike":101250.0,"secs_left":290,"status":"determined"},"#,
        r#"{"ticker":"M3","yes_bid":0,"yes_ask":0,"strike":101250.0,"secs_left":290,"status":"active"}]}"#,
        "\n",
    ));
    lines
}

fn load() -> (TimelineSet, Normalizer) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.jsonl");
    let mut file = File::create(&path).unwrap();
    file.write_all(capture_lines().as_bytes()).unwrap();

    let mut normalizer = Normalizer::default();
    let records = feed::read_jsonl_files(&[&path], &mut normalizer).unwrap();
    (TimelineSet::from_records(records), normalizer)
}

fn threshold(min_price: i64) -> DecisionRule {
    DecisionRule::ThresholdSide(ThresholdSideParams { min_price })
}

#[test]
fn test_load_and_settle_all_three_tiers() {
    let (set, normalizer) = load();
    let stats = normalizer.stats();
    assert_eq!(stats.malformed_lines, 1);
    assert_eq!(stats.ignored_envelopes, 1);
    assert_eq!(stats.records, 9);

    assert_eq!(set.len(), 3);
    let config = EngineConfig::default();
    let summary = settlement::resolve_all(&set, config.close_offset_secs);
    assert_eq!(summary.resolved, 3);
    assert_eq!(summary.unresolved, 0);
    assert_eq!(summary.by_declared_result, 1);
    assert_eq!(summary.by_terminal_status, 1);
    assert_eq!(summary.by_last_open_tick, 1);

    let m1 = settlement::resolve(set.get("M1").unwrap(), config.close_offset_secs).unwrap();
    assert_eq!(m1.tier, ResolutionTier::DeclaredResult);
    assert_eq!(m1.outcome.as_str(), "no");

    let m2 = settlement::resolve(set.get("M2").unwrap(), config.close_offset_secs).unwrap();
    assert_eq!(m2.tier, ResolutionTier::TerminalStatus);
    assert_eq!(m2.outcome.as_str(), "yes");

    let m3 = settlement::resolve(set.get("M3").unwrap(), config.close_offset_secs).unwrap();
    assert_eq!(m3.tier, ResolutionTier::LastOpenTick);
    assert_eq!(m3.outcome.as_str(), "no");
}

#[test]
fn test_single_strategy_over_capture() {
    let (set, _) = load();
    let config = EngineConfig::default();
    // At the 600s tick: M1 no_ask=80 beats yes_ask=70, M2 yes_ask=90
    // beats no_ask=15, M3 only no_ask=60 qualifies.
    let spec = StrategySpec {
        entry_secs_before_close: 300,
        rule: threshold(55),
    };
    let run = strategy::run(&set, &spec, &config);
    assert_eq!(run.summary.markets, 3);
    assert_eq!(run.summary.trades, 3);

    let pnl: Vec<i64> = run.trades.iter().map(|t| t.pnl).collect();
    // M1 NO at 80 wins (+20), M2 YES at 90 wins (+10), M3 NO at 60 wins
    // (+40). Encounter order is first-appearance order in the capture.
    assert_eq!(pnl, vec![20, 10, 40]);
}

#[test]
fn test_entry_tolerance_miss_yields_no_trades() {
    let (set, _) = load();
    let config = EngineConfig::default();
    // Target secs_left 294 + 540 = 834; nearest tick (600) misses the 30s
    // window.
    let spec = StrategySpec {
        entry_secs_before_close: 540,
        rule: threshold(55),
    };
    let run = strategy::run(&set, &spec, &config);
    assert_eq!(run.summary.trades, 0);
    assert_eq!(run.summary.no_entry_tick, 3);
}

#[test]
fn test_grid_sweep_and_ranking() {
    let (set, _) = load();
    let runner = GridRunner::new(EngineConfig {
        min_sample_size: 2,
        ..EngineConfig::default()
    })
    .unwrap();

    let grid = GridSpec {
        entry_offsets_secs: vec![300, 6],
        rules: vec![threshold(55), threshold(68), threshold(95)],
    };
    let report = runner.run(&set, &grid);
    assert_eq!(report.cells.len(), 6);

    // 300s entries hit the 600s tick: thr 55 trades all three markets
    // (+70), thr 68 drops M3 (+30), thr 95 trades nothing.
    assert_eq!(report.cells[0].metrics.trades, 3);
    assert_eq!(report.cells[0].metrics.total_pnl, 70);
    assert_eq!(report.cells[1].metrics.trades, 2);
    assert_eq!(report.cells[1].metrics.total_pnl, 30);
    assert_eq!(report.cells[2].metrics.trades, 0);

    // 6s entries hit the 300s tick: M1 NO at 75 (+25), M2 YES at 96 (+4),
    // M3 NO at 70 (+30). Only M2 clears the 95c threshold.
    assert_eq!(report.cells[3].metrics.total_pnl, 59);
    assert_eq!(report.cells[4].metrics.total_pnl, 59);
    assert_eq!(report.cells[5].metrics.trades, 1);
    assert_eq!(report.cells[5].metrics.total_pnl, 4);

    // Ranking floor excludes the single-trade 95c cell and the empty one.
    let ranked = report.ranked_by(RankMetric::TotalPnl);
    assert_eq!(ranked.len(), 4);
    let best = report.best(RankMetric::TotalPnl).unwrap();
    assert_eq!(best.spec.entry_secs_before_close, 300);
    assert_eq!(best.spec.rule, threshold(55));
    // The tied 59-P&L pair keeps grid insertion order.
    assert_eq!(ranked[1].spec.rule, threshold(55));
    assert_eq!(ranked[2].spec.rule, threshold(68));
    assert_eq!(ranked[3].metrics.total_pnl, 30);
}
