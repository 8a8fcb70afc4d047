//! Parameter-grid sweeps and ranking.
//!
//! A grid is a declarative cross product of entry offsets and decision
//! rules. Every cell is independent: each one runs its strategy over all
//! markets and aggregates into a [`Metrics`], so cells fan out across
//! threads and collect back in insertion order. Adding a rule family or a
//! dimension never touches the aggregation or ranking code.

use crate::config::EngineConfig;
use crate::metrics::{self, Metrics};
use crate::strategy::{self, DecisionRule, EvaluationSummary, StrategySpec};
use crate::timeline::TimelineSet;
use crate::trade::Trade;
use anyhow::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Cross product of parameter dimensions: entry offsets (seconds before
/// trading close) by decision rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub entry_offsets_secs: Vec<i64>,
    pub rules: Vec<DecisionRule>,
}

impl GridSpec {
    /// Cell specs in insertion order: offsets outer, rules inner.
    pub fn cells(&self) -> Vec<StrategySpec> {
        let mut cells = Vec::with_capacity(self.len());
        for &offset in &self.entry_offsets_secs {
            for rule in &self.rules {
                cells.push(StrategySpec {
                    entry_secs_before_close: offset,
                    rule: rule.clone(),
                });
            }
        }
        cells
    }

    pub fn len(&self) -> usize {
        self.entry_offsets_secs.len() * self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One evaluated parameter combination.
#[derive(Debug, Clone, Serialize)]
pub struct GridCell {
    pub spec: StrategySpec,
    /// Trades in market-encounter order (the drawdown order).
    pub trades: Vec<Trade>,
    pub metrics: Metrics,
    pub summary: EvaluationSummary,
}

/// Metric a ranking sorts on. Each is independently sortable, always
/// descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMetric {
    TotalPnl,
    AvgPnl,
    WinRate,
    RiskRatio,
}

impl RankMetric {
    pub fn value(&self, metrics: &Metrics) -> f64 {
        match self {
            Self::TotalPnl => metrics.total_pnl as f64,
            Self::AvgPnl => metrics.avg_pnl,
            Self::WinRate => metrics.win_rate_pct,
            Self::RiskRatio => metrics.risk_ratio,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::TotalPnl => "total P&L",
            Self::AvgPnl => "avg P&L",
            Self::WinRate => "win rate",
            Self::RiskRatio => "risk ratio",
        }
    }
}

/// Drives grid evaluation. Construction validates the configuration; data
/// defects later never fail the sweep.
#[derive(Debug, Clone)]
pub struct GridRunner {
    config: EngineConfig,
}

impl GridRunner {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate every cell of the grid over the batch. Cells are
    /// independent and run in parallel; the report keeps insertion order.
    pub fn run(&self, set: &TimelineSet, grid: &GridSpec) -> GridReport {
        let specs = grid.cells();
        tracing::info!(
            markets = set.len(),
            cells = specs.len(),
            offsets = grid.entry_offsets_secs.len(),
            rules = grid.rules.len(),
            "running parameter grid"
        );

        let cells: Vec<GridCell> = specs
            .into_par_iter()
            .map(|spec| {
                let run = strategy::run(set, &spec, &self.config);
                GridCell {
                    metrics: metrics::aggregate(&run.trades),
                    summary: run.summary,
                    trades: run.trades,
                    spec,
                }
            })
            .collect();

        GridReport {
            cells,
            min_sample_size: self.config.min_sample_size,
        }
    }
}

/// All evaluated cells plus ranking views over them.
#[derive(Debug, Clone, Serialize)]
pub struct GridReport {
    /// Every cell, in grid insertion order, including cells below the
    /// ranking sample-size floor.
    pub cells: Vec<GridCell>,
    pub min_sample_size: usize,
}

impl GridReport {
    /// Cells with at least `min_sample_size` trades, sorted descending on
    /// the metric. The sort is stable, so ties keep insertion order.
    pub fn ranked_by(&self, metric: RankMetric) -> Vec<&GridCell> {
        let mut eligible: Vec<&GridCell> = self
            .cells
            .iter()
            .filter(|c| c.metrics.trades >= self.min_sample_size)
            .collect();
        eligible.sort_by(|a, b| {
            metric
                .value(&b.metrics)
                .total_cmp(&metric.value(&a.metrics))
        });
        eligible
    }

    pub fn top(&self, metric: RankMetric, n: usize) -> Vec<&GridCell> {
        let mut ranked = self.ranked_by(metric);
        ranked.truncate(n);
        ranked
    }

    /// Worst cells by the metric, ascending.
    pub fn bottom(&self, metric: RankMetric, n: usize) -> Vec<&GridCell> {
        let mut ranked = self.ranked_by(metric);
        ranked.reverse();
        ranked.truncate(n);
        ranked
    }

    pub fn best(&self, metric: RankMetric) -> Option<&GridCell> {
        self.ranked_by(metric).first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::ThresholdSideParams;
    use crate::timeline::test_support::{tick, with_quotes, with_result};
    use crate::trade::Outcome;

    fn threshold(min_price: i64) -> DecisionRule {
        DecisionRule::ThresholdSide(ThresholdSideParams { min_price })
    }

    fn one_market_set() -> TimelineSet {
        TimelineSet::from_records(vec![
            with_quotes(tick("M", 0, 714), 20, 70),
            with_quotes(tick("M", 120, 594), 22, 72),
            with_result(tick("M", 600, 290), Outcome::No),
        ])
    }

    fn runner(min_sample_size: usize) -> GridRunner {
        GridRunner::new(EngineConfig {
            min_sample_size,
            ..EngineConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_config_fails_before_running() {
        let bad = EngineConfig {
            close_offset_secs: 0,
            ..EngineConfig::default()
        };
        assert!(GridRunner::new(bad).is_err());
    }

    #[test]
    fn test_cross_product_cell_count_and_order() {
        let grid = GridSpec {
            entry_offsets_secs: vec![420, 300],
            rules: vec![threshold(55), threshold(68), threshold(85)],
        };
        assert_eq!(grid.len(), 6);

        let report = runner(0).run(&one_market_set(), &grid);
        assert_eq!(report.cells.len(), 6);
        // Offsets outer, rules inner.
        assert_eq!(report.cells[0].spec.entry_secs_before_close, 420);
        assert_eq!(report.cells[2].spec.entry_secs_before_close, 420);
        assert_eq!(report.cells[3].spec.entry_secs_before_close, 300);
        assert_eq!(report.cells[1].spec.rule, threshold(68));
    }

    #[test]
    fn test_cells_aggregated_independently() {
        let grid = GridSpec {
            entry_offsets_secs: vec![420, 300],
            rules: vec![threshold(55), threshold(68), threshold(85)],
        };
        let report = runner(0).run(&one_market_set(), &grid);
        // NO side qualifies at no_ask=80/78 for thresholds 55 and 68; at
        // 85 nothing qualifies.
        for row in report.cells.chunks(3) {
            assert_eq!(row[0].metrics.trades, 1);
            assert_eq!(row[1].metrics.trades, 1);
            assert_eq!(row[2].metrics.trades, 0);
        }
    }

    #[test]
    fn test_ranking_descending_with_insertion_order_ties() {
        let grid = GridSpec {
            entry_offsets_secs: vec![420, 300],
            rules: vec![threshold(55), threshold(68), threshold(85)],
        };
        let report = runner(1).run(&one_market_set(), &grid);
        let ranked = report.ranked_by(RankMetric::TotalPnl);
        // Four trading cells; empty cells are excluded by the floor.
        assert_eq!(ranked.len(), 4);
        for pair in ranked.windows(2) {
            assert!(pair[0].metrics.total_pnl >= pair[1].metrics.total_pnl);
        }
        // The 300s entries buy NO at 78 (+22), the 420s at 80 (+20); the
        // 300s cells rank first, and the equal-P&L pair within each offset
        // keeps insertion order.
        assert_eq!(ranked[0].spec.entry_secs_before_close, 300);
        assert_eq!(ranked[0].spec.rule, threshold(55));
        assert_eq!(ranked[1].spec.rule, threshold(68));
    }

    #[test]
    fn test_min_sample_size_excludes_from_ranking_only() {
        let grid = GridSpec {
            entry_offsets_secs: vec![420],
            rules: vec![threshold(55)],
        };
        let report = runner(5).run(&one_market_set(), &grid);
        // Reported but not ranked.
        assert_eq!(report.cells.len(), 1);
        assert_eq!(report.cells[0].metrics.trades, 1);
        assert!(report.ranked_by(RankMetric::TotalPnl).is_empty());
        assert!(report.best(RankMetric::AvgPnl).is_none());
    }
}
