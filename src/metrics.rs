//! Trade-list aggregation.
//!
//! Reduces a list of trades into the summary statistics the ranking layer
//! sorts on. Drawdown is computed over the running cumulative P&L in the
//! order the trades are given; callers own that order (strategy runs emit
//! trades in market-encounter order).

use crate::trade::{Cents, Trade};
use serde::Serialize;

/// Aggregate statistics for one trade list. All-zero for an empty list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub trades: usize,
    /// Trades with positive P&L.
    pub wins: usize,
    /// Trades with zero or negative P&L.
    pub losses: usize,
    /// Percent of trades won, 0..=100.
    pub win_rate_pct: f64,
    pub total_pnl: Cents,
    pub avg_pnl: f64,
    /// Mean P&L over winning trades only (0 if none).
    pub avg_win: f64,
    /// Mean P&L over losing trades only (0 if none).
    pub avg_loss: f64,
    /// Sample standard deviation of per-trade P&L (n-1 divisor, 0 when
    /// n <= 1).
    pub std_pnl: f64,
    /// avg_pnl / std_pnl, 0 when std_pnl is 0.
    pub risk_ratio: f64,
    /// Largest peak-to-trough drop of the running cumulative P&L.
    pub max_drawdown: Cents,
}

pub fn aggregate(trades: &[Trade]) -> Metrics {
    if trades.is_empty() {
        return Metrics::default();
    }

    let n = trades.len();
    let wins = trades.iter().filter(|t| t.is_win()).count();
    let losses = n - wins;
    let total_pnl: Cents = trades.iter().map(|t| t.pnl).sum();
    let avg_pnl = total_pnl as f64 / n as f64;

    let win_sum: Cents = trades.iter().filter(|t| t.is_win()).map(|t| t.pnl).sum();
    let loss_sum: Cents = trades.iter().filter(|t| !t.is_win()).map(|t| t.pnl).sum();
    let avg_win = if wins > 0 { win_sum as f64 / wins as f64 } else { 0.0 };
    let avg_loss = if losses > 0 { loss_sum as f64 / losses as f64 } else { 0.0 };

    let std_pnl = if n > 1 {
        let variance = trades
            .iter()
            .map(|t| {
                let delta = t.pnl as f64 - avg_pnl;
                delta * delta
            })
            .sum::<f64>()
            / (n - 1) as f64;
        variance.sqrt()
    } else {
        0.0
    };
    let risk_ratio = if std_pnl > 0.0 { avg_pnl / std_pnl } else { 0.0 };

    let mut cumulative: Cents = 0;
    let mut peak: Cents = 0;
    let mut max_drawdown: Cents = 0;
    for trade in trades {
        cumulative += trade.pnl;
        if cumulative > peak {
            peak = cumulative;
        }
        max_drawdown = max_drawdown.max(peak - cumulative);
    }

    Metrics {
        trades: n,
        wins,
        losses,
        win_rate_pct: 100.0 * wins as f64 / n as f64,
        total_pnl,
        avg_pnl,
        avg_win,
        avg_loss,
        std_pnl,
        risk_ratio,
        max_drawdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trade::Outcome;

    fn trade(pnl_sign_side: Outcome, entry_price: Cents, settlement: Outcome) -> Trade {
        Trade::open("M".into(), pnl_sign_side, entry_price, settlement).unwrap()
    }

    #[test]
    fn test_empty_list_is_zeroed() {
        let m = aggregate(&[]);
        assert_eq!(m, Metrics::default());
        assert_eq!(m.trades, 0);
        assert_eq!(m.win_rate_pct, 0.0);
        assert_eq!(m.risk_ratio, 0.0);
    }

    #[test]
    fn test_basic_aggregation() {
        let trades = vec![
            trade(Outcome::Yes, 70, Outcome::Yes), // +30
            trade(Outcome::Yes, 60, Outcome::No),  // -60
            trade(Outcome::No, 40, Outcome::No),   // +60
        ];
        let m = aggregate(&trades);
        assert_eq!(m.trades, 3);
        assert_eq!(m.wins, 2);
        assert_eq!(m.losses, 1);
        assert_eq!(m.total_pnl, 30);
        assert!((m.avg_pnl - 10.0).abs() < 1e-9);
        assert!((m.win_rate_pct - 200.0 / 3.0).abs() < 1e-9);
        assert!((m.avg_win - 45.0).abs() < 1e-9);
        assert!((m.avg_loss + 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_sample_std_and_risk_ratio() {
        // P&L values +30 and -60: mean -15, sample variance 4050.
        let trades = vec![
            trade(Outcome::Yes, 70, Outcome::Yes),
            trade(Outcome::Yes, 60, Outcome::No),
        ];
        let m = aggregate(&trades);
        let expected_std = 4050.0_f64.sqrt();
        assert!((m.std_pnl - expected_std).abs() < 1e-9);
        assert!((m.risk_ratio - (-15.0 / expected_std)).abs() < 1e-9);
    }

    #[test]
    fn test_std_zero_for_single_trade() {
        let trades = vec![trade(Outcome::Yes, 70, Outcome::Yes)];
        let m = aggregate(&trades);
        assert_eq!(m.std_pnl, 0.0);
        assert_eq!(m.risk_ratio, 0.0);
    }

    #[test]
    fn test_max_drawdown_peak_to_trough() {
        // Cumulative path: +30, +60, 0, -60, -20 -> peak 60, trough -60.
        let trades = vec![
            trade(Outcome::Yes, 70, Outcome::Yes), // +30
            trade(Outcome::Yes, 70, Outcome::Yes), // +30
            trade(Outcome::Yes, 60, Outcome::No),  // -60
            trade(Outcome::Yes, 60, Outcome::No),  // -60
            trade(Outcome::No, 60, Outcome::No),   // +40
        ];
        let m = aggregate(&trades);
        assert_eq!(m.max_drawdown, 120);
    }

    #[test]
    fn test_drawdown_zero_for_monotonic_gains() {
        let trades = vec![
            trade(Outcome::Yes, 70, Outcome::Yes),
            trade(Outcome::Yes, 80, Outcome::Yes),
        ];
        assert_eq!(aggregate(&trades).max_drawdown, 0);
    }
}
