use chrono::Duration;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{error::ReplayError, timeseries::Bar, types::Timestamp};

/// Validated Dual Thrust parameters.
///
/// `n` is the rolling lookback in bars; `k1`/`k2` scale the recent range
/// into the upper/lower breakout bands; `open_offset`/`close_offset` define
/// the trading window `[delivery_start - open_offset, delivery_start -
/// close_offset]` relative to the product's delivery start.
#[derive(Clone, Debug)]
pub struct DualThrustConfig {
    pub n: usize,
    pub k1: Decimal,
    pub k2: Decimal,
    pub open_offset: Duration,
    pub close_offset: Duration,
}

impl DualThrustConfig {
    pub fn new(
        n: usize,
        k1: Decimal,
        k2: Decimal,
        open_offset: Duration,
        close_offset: Duration,
    ) -> Result<Self, ReplayError> {
        if n < 1 {
            return Err(ReplayError::InvalidConfig("n must be >= 1".to_string()));
        }
        if k1 <= Decimal::ZERO || k2 <= Decimal::ZERO {
            return Err(ReplayError::InvalidConfig(
                "k1 and k2 must be positive".to_string(),
            ));
        }
        if close_offset < Duration::zero() || open_offset < close_offset {
            return Err(ReplayError::InvalidConfig(
                "open_offset must be >= close_offset >= 0".to_string(),
            ));
        }
        Ok(Self {
            n,
            k1,
            k2,
            open_offset,
            close_offset,
        })
    }
}

/// A single bar's Dual Thrust evaluation, emitted only for bars within the
/// trading window.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Signal {
    pub time: Timestamp,
    /// +1 buy, -1 sell, 0 no signal (including when history is
    /// insufficient).
    pub signal: i8,
    pub upper_band: Option<Decimal>,
    pub lower_band: Option<Decimal>,
}

/// The Dual Thrust breakout strategy evaluator.
pub struct DualThrust;

impl DualThrust {
    /// Evaluates Dual Thrust over `bars`, restricted to
    /// `[delivery_start - open_offset, delivery_start - close_offset]`.
    /// Bars outside the window are omitted from the returned series; bars
    /// inside it with fewer than `n` preceding bars get signal 0 and no
    /// bands.
    pub fn evaluate(
        bars: &[Bar],
        config: &DualThrustConfig,
        delivery_start: Timestamp,
    ) -> Vec<Signal> {
        let window_start = delivery_start - config.open_offset;
        let window_end = delivery_start - config.close_offset;

        let mut out = Vec::new();
        for (i, bar) in bars.iter().enumerate() {
            if bar.time < window_start || bar.time > window_end {
                continue;
            }

            if i < config.n {
                out.push(Signal {
                    time: bar.time,
                    signal: 0,
                    upper_band: None,
                    lower_band: None,
                });
                continue;
            }

            let prior = &bars[i - config.n..i];
            let hh = prior.iter().filter_map(|b| b.best_ask).max();
            let ll = prior.iter().filter_map(|b| b.best_bid).min();
            let close = bars[i - 1].mid;

            let (upper, lower) = match (hh, ll, close) {
                (Some(hh), Some(ll), Some(close)) => {
                    let range = (hh - close).abs().max((close - ll).abs());
                    (
                        Some(close + config.k1 * range),
                        Some(close - config.k2 * range),
                    )
                }
                _ => (None, None),
            };

            let mut signal = 0i8;
            if let (Some(bid), Some(upper)) = (bar.best_bid, upper) {
                if bid > upper {
                    signal = 1;
                }
            }
            if let (Some(ask), Some(lower)) = (bar.best_ask, lower) {
                if ask < lower {
                    signal = -1;
                }
            }

            out.push(Signal {
                time: bar.time,
                signal,
                upper_band: upper,
                lower_band: lower,
            });
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::types::{ProductKey, Quantity};

    fn bar(minute: i64, bid: &str, ask: &str) -> Bar {
        let time = ProductKey::from_timestamp(1_700_000_000 + minute * 60, 0).unwrap();
        let bid: Decimal = bid.parse().unwrap();
        let ask: Decimal = ask.parse().unwrap();
        Bar {
            time,
            best_bid: Some(bid),
            best_ask: Some(ask),
            best_bid_qty: 1 as Quantity,
            best_ask_qty: 1 as Quantity,
            mid: Some((bid + ask) / dec!(2)),
            vwap: Some((bid + ask) / dec!(2)),
            traded_qty: 0,
            buy_vol: 0,
            sell_vol: 0,
            total_bid_depth: 1,
            total_ask_depth: 1,
        }
    }

    #[test]
    fn signals_confined_to_trading_window() {
        let delivery_start = chrono::Utc.timestamp_opt(1_700_000_000 + 12 * 3600, 0).unwrap();
        let config = DualThrustConfig::new(
            15,
            dec!(0.5),
            dec!(0.5),
            Duration::minutes(60),
            Duration::minutes(15),
        )
        .unwrap();

        // Build a flat series, then a run of bars with an elevated best_bid
        // from minute 11*60+30 (11:30) through 11*60+50 (11:50), all in
        // "hour 11" offsets from a synthetic midnight base.
        let base = -11 * 60 - 60; // minutes relative to delivery_start at 12:00, start at 10:00
        let mut bars = Vec::new();
        for m in 0..200 {
            let minute = base + m;
            if (-30..=-10).contains(&minute) {
                bars.push(bar(minute, "1000", "10"));
            } else {
                bars.push(bar(minute, "10", "11"));
            }
        }

        let signals = DualThrust::evaluate(&bars, &config, delivery_start);
        assert!(!signals.is_empty());
        for s in &signals {
            assert!(s.time >= delivery_start - config.open_offset);
            assert!(s.time <= delivery_start - config.close_offset);
        }
        // At least one +1 must appear, since best_bid was pushed far above any
        // plausible band during the elevated run.
        assert!(signals.iter().any(|s| s.signal == 1));
        // No signal may occur outside the configured window by construction,
        // already checked above via the time bounds assertion.
    }

    #[test]
    fn insufficient_history_emits_zero_signal() {
        let delivery_start = chrono::Utc.timestamp_opt(1_700_000_000 + 3600, 0).unwrap();
        let config = DualThrustConfig::new(
            15,
            dec!(0.5),
            dec!(0.5),
            Duration::minutes(120),
            Duration::minutes(0),
        )
        .unwrap();
        let bars: Vec<Bar> = (0..5).map(|m| bar(m, "10", "11")).collect();
        let signals = DualThrust::evaluate(&bars, &config, delivery_start);
        assert!(signals.iter().all(|s| s.signal == 0 && s.upper_band.is_none()));
    }

    #[test]
    fn rejects_invalid_window() {
        assert!(DualThrustConfig::new(
            15,
            dec!(0.5),
            dec!(0.5),
            Duration::minutes(5),
            Duration::minutes(15),
        )
        .is_err());
    }
}
