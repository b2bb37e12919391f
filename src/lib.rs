//! # powerbook-replay
//!
//! Replays a historical order-event log for a continuous intraday power
//! market and reconstructs, for every instant in the log, the state of a
//! per-delivery-product limit order book together with the stream of
//! executions implied by those events.
//!
//! ## Key features
//! - Deterministic, single-threaded replay of an append-only, revision-
//!   ordered event log.
//! - One price-time-priority limit order book per delivery product, with
//!   exact-decimal matching (no binary-float price comparisons).
//! - Two derived output streams: top-of-book ticks and executed trades.
//! - A uniform-frequency bar builder and a Dual Thrust breakout evaluator
//!   layered on top of the replay output.
//!
//! This crate does not place orders, model fees, or run a live matching
//! venue; it replays a fixed input log and returns well-typed results.

/// Error kinds returned by the crate.
pub mod error;

/// Core types shared across the crate: sides, actions, ids, and the decimal
/// price representation.
pub mod types;

/// Loads, types, and sorts the raw event log; answers point-in-time
/// snapshot queries.
pub mod event;

/// A resting order on one side of a [`book::Book`].
pub mod order;

/// Per-product price-time-priority limit order book.
pub mod book;

/// Executed trades and the append-only table that accumulates them.
pub mod trade;

/// Top-of-book ticks and the append-only table that accumulates them.
pub mod tick;

/// Dispatches events to the correct book, emitting trades and ticks.
pub mod engine;

/// Drives the event sequence through the matching engine and materialises
/// its output streams.
pub mod replay;

/// Derives a uniform-frequency bar series from a replay's output streams.
pub mod timeseries;

/// The Dual Thrust breakout strategy evaluator.
pub mod strategy;

/// The configuration surface consumed by the time-series builder and the
/// strategy evaluator.
pub mod config;

pub use crate::{
    book::{Book, ModifyOutcome},
    config::RunConfig,
    engine::MatchingEngine,
    error::ReplayError,
    event::{Event, EventStore, SnapshotOrder},
    order::RestingOrder,
    replay::ReplayDriver,
    strategy::{DualThrust, DualThrustConfig, Signal},
    tick::{Tick, TickTable},
    timeseries::{Bar, TimeSeriesBuilder},
    trade::{Trade, TradeTable},
    types::{Action, OrderId, Price, ProductKey, Quantity, Side, Timestamp},
};
