//! Kalshi BTC Binary-Option Backtest Engine
//!
//! Deterministic batch evaluation of trading strategies against recorded
//! tick snapshots of short-lived binary-option markets.
//!
//! # Pipeline
//!
//! ```text
//! JSONL envelopes ─▶ feed (normalize) ─▶ timeline (group + stable sort)
//!                                              │
//!                          ┌───────────────────┼──────────────────┐
//!                          ▼                   ▼                  ▼
//!                    settlement           entry locator       strategy
//!                    (priority chain)     (nearest tick)      (5 rule
//!                          │                   │               families)
//!                          └───────────┬───────┘                  │
//!                                      ▼                          ▼
//!                                  metrics (aggregate) ─▶ grid (sweep + rank)
//! ```
//!
//! # Determinism
//!
//! - Timelines sort stably; timestamp ties keep arrival order.
//! - Nearest-tick ties go to the first occurrence in timeline order.
//! - Settlement is resolved once per market and cached.
//! - Grid cells are evaluated in parallel but collected in insertion
//!   order; ranking sorts are stable.

pub mod config;
pub mod entry;
pub mod feed;
pub mod grid;
pub mod metrics;
pub mod settlement;
pub mod strategy;
pub mod timeline;
pub mod trade;

pub use config::EngineConfig;
pub use feed::{Normalizer, NormalizerConfig, TickRecord};
pub use grid::{GridReport, GridRunner, GridSpec, RankMetric};
pub use metrics::Metrics;
pub use settlement::{Resolution, ResolutionTier};
pub use strategy::{DecisionRule, StrategySpec};
pub use timeline::{MarketTimeline, TimelineSet};
pub use trade::{Cents, Outcome, Trade};
