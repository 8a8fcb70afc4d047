//! Trade records and binary outcomes.
//!
//! Every strategy settles into the same `Trade` shape, and P&L is computed
//! in exactly one place (`Trade::open`) so evaluators cannot drift apart on
//! the payoff arithmetic.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Contract prices and P&L in cents. A winning side pays out 100c.
pub type Cents = i64;

/// Full payout of one contract, in cents.
pub const CONTRACT_PAYOUT: Cents = 100;

/// Resolved side of a binary market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Yes,
    No,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::Yes => Self::No,
            Self::No => Self::Yes,
        }
    }

    /// Parse a declared result field. Case-insensitive; anything other
    /// than yes/no (including the empty string) is not a declaration.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One simulated fill, held to settlement. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trade {
    pub ticker: String,
    pub side: Outcome,
    /// Entry price in cents, always in [1, 99].
    pub entry_price: Cents,
    pub settlement: Outcome,
    /// `100 - entry_price` on a win, `-entry_price` on a loss.
    pub pnl: Cents,
}

impl Trade {
    /// Construct a trade, rejecting degenerate entry prices. A 0c quote
    /// means "no quote" and a 100c contract has no edge left to buy, so
    /// neither is ever a valid fill.
    pub fn open(ticker: String, side: Outcome, entry_price: Cents, settlement: Outcome) -> Option<Self> {
        if !(1..=99).contains(&entry_price) {
            return None;
        }
        let pnl = if side == settlement {
            CONTRACT_PAYOUT - entry_price
        } else {
            -entry_price
        };
        Some(Self {
            ticker,
            side,
            entry_price,
            settlement,
            pnl,
        })
    }

    pub fn is_win(&self) -> bool {
        self.pnl > 0
    }
}
