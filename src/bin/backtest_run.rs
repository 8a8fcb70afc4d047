//! Grid Backtest Runner CLI
//!
//! Loads collector JSONL captures, builds per-market timelines, resolves
//! settlements, sweeps the threshold-side grid (thresholds x entry
//! minutes), and prints ranking tables. All file I/O and presentation
//! lives here; the library core only ever sees decoded records.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin backtest_run -- data/*.jsonl
//! cargo run --bin backtest_run -- --close-offset 294 --tolerance 30 \
//!     --min-trades 10 --top 10 data/*.jsonl
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Configuration or runtime error

use anyhow::{ensure, Result};
use clap::Parser;
use kalshi_backtest::config::{
    DEFAULT_CLOSE_OFFSET_SECS, DEFAULT_MIN_SAMPLE_SIZE, DEFAULT_TICK_TOLERANCE_SECS,
};
use kalshi_backtest::grid::GridCell;
use kalshi_backtest::strategy::ThresholdSideParams;
use kalshi_backtest::{
    feed, settlement, DecisionRule, EngineConfig, GridReport, GridRunner, GridSpec, Normalizer,
    RankMetric, TimelineSet,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Grid backtest over recorded binary-option tick captures.
#[derive(Debug, Parser)]
#[command(name = "backtest_run")]
struct Args {
    /// JSONL capture files to load.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Seconds still on the settlement countdown when trading closes.
    #[arg(long, default_value_t = DEFAULT_CLOSE_OFFSET_SECS)]
    close_offset: i64,

    /// Entry tick acceptance window in seconds.
    #[arg(long, default_value_t = DEFAULT_TICK_TOLERANCE_SECS)]
    tolerance: i64,

    /// Minimum trades for a cell to enter rankings.
    #[arg(long, default_value_t = DEFAULT_MIN_SAMPLE_SIZE)]
    min_trades: usize,

    /// Rows per ranking table.
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Price thresholds (cents) for the threshold-side rule.
    #[arg(long, value_delimiter = ',', default_values_t = [55, 60, 65, 68, 70, 75, 80, 85, 90, 95])]
    thresholds: Vec<i64>,

    /// Entry times in minutes before trading close.
    #[arg(long, value_delimiter = ',', default_values_t = (1..=12).collect::<Vec<i64>>())]
    minutes: Vec<i64>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = EngineConfig {
        close_offset_secs: args.close_offset,
        tick_tolerance_secs: args.tolerance,
        min_sample_size: args.min_trades,
    };
    let runner = GridRunner::new(config)?;
    ensure!(!args.thresholds.is_empty(), "at least one threshold required");
    ensure!(!args.minutes.is_empty(), "at least one entry minute required");

    let mut normalizer = Normalizer::default();
    let records = feed::read_jsonl_files(&args.files, &mut normalizer)?;
    let stats = *normalizer.stats();

    let set = TimelineSet::from_records(records);
    let settlement_summary = settlement::resolve_all(&set, config.close_offset_secs);

    let grid = GridSpec {
        entry_offsets_secs: args.minutes.iter().map(|m| m * 60).collect(),
        rules: args
            .thresholds
            .iter()
            .map(|&min_price| DecisionRule::ThresholdSide(ThresholdSideParams { min_price }))
            .collect(),
    };
    let report = runner.run(&set, &grid);

    println!("{}", "=".repeat(100));
    println!("GRID SEARCH RESULTS: Kalshi BTC binary options");
    println!("{}", "=".repeat(100));
    println!(
        "Files: {}  Lines: {}  Malformed: {}  Records: {}  Dropped (no strike): {}",
        args.files.len(),
        stats.lines,
        stats.malformed_lines,
        stats.records,
        stats.dropped_zero_strike
    );
    println!(
        "Markets: {}  Settled: {} (declared {}, terminal {}, last-open {})  Unresolved: {}",
        set.len(),
        settlement_summary.resolved,
        settlement_summary.by_declared_result,
        settlement_summary.by_terminal_status,
        settlement_summary.by_last_open_tick,
        settlement_summary.unresolved
    );
    println!(
        "Close offset: {}s  Tolerance: {}s  Min trades for ranking: {}",
        config.close_offset_secs, config.tick_tolerance_secs, config.min_sample_size
    );

    print_all_cells(&report);
    for metric in [
        RankMetric::TotalPnl,
        RankMetric::AvgPnl,
        RankMetric::WinRate,
        RankMetric::RiskRatio,
    ] {
        print_ranking(&report, metric, args.top);
    }
    print_worst(&report, args.top);

    Ok(())
}

fn print_cell_row(rank: Option<usize>, cell: &GridCell) {
    let m = &cell.metrics;
    let rank = rank.map(|r| format!("{r:>4}")).unwrap_or_else(|| "    ".into());
    println!(
        "{rank} {:<28} {:>7} {:>5} {:>7.1}% {:>+10} {:>+8.2} {:>8.2} {:>+8.3} {:>8}",
        cell.spec.to_string(),
        m.trades,
        m.wins,
        m.win_rate_pct,
        m.total_pnl,
        m.avg_pnl,
        m.std_pnl,
        m.risk_ratio,
        m.max_drawdown
    );
}

fn print_header() {
    println!(
        "{:>4} {:<28} {:>7} {:>5} {:>8} {:>10} {:>8} {:>8} {:>8} {:>8}",
        "", "Cell", "Trades", "Wins", "WinRate", "TotalPnL", "AvgPnL", "StdPnL", "Risk", "MaxDD"
    );
    println!("{}", "-".repeat(100));
}

fn print_all_cells(report: &GridReport) {
    println!("\n{}", "=".repeat(100));
    println!("ALL CELLS ({})", report.cells.len());
    println!("{}", "=".repeat(100));
    print_header();
    for cell in &report.cells {
        if cell.metrics.trades == 0 {
            println!("     {:<28} {:>7}", cell.spec.to_string(), "--");
        } else {
            print_cell_row(None, cell);
        }
    }
}

fn print_ranking(report: &GridReport, metric: RankMetric, n: usize) {
    println!("\n{}", "=".repeat(100));
    println!(
        "TOP {} BY {} (min {} trades)",
        n,
        metric.label().to_uppercase(),
        report.min_sample_size
    );
    println!("{}", "=".repeat(100));
    print_header();
    for (i, cell) in report.top(metric, n).iter().enumerate() {
        print_cell_row(Some(i + 1), cell);
    }
}

fn print_worst(report: &GridReport, n: usize) {
    println!("\n{}", "=".repeat(100));
    println!("WORST {} BY TOTAL P&L (min {} trades)", n, report.min_sample_size);
    println!("{}", "=".repeat(100));
    print_header();
    for (i, cell) in report.bottom(RankMetric::TotalPnl, n).iter().enumerate() {
        print_cell_row(Some(i + 1), cell);
    }
}
