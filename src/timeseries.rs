use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    tick::TickTable,
    trade::TradeTable,
    types::{Price, ProductKey, Quantity, Side, Timestamp},
};

/// A fixed-duration aggregate record in the derived time series. Derived
/// only; never persisted by the core.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Bar {
    pub time: Timestamp,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub best_bid_qty: Quantity,
    pub best_ask_qty: Quantity,
    pub mid: Option<Decimal>,
    pub vwap: Option<Decimal>,
    pub traded_qty: Quantity,
    pub buy_vol: Quantity,
    pub sell_vol: Quantity,
    pub total_bid_depth: Quantity,
    pub total_ask_depth: Quantity,
}

/// Builds a uniform-frequency [`Bar`] series for a single product from a
/// replay's tick and trade tables.
pub struct TimeSeriesBuilder;

impl TimeSeriesBuilder {
    /// Builds the bar series. `freq` must be a positive multiple of one
    /// minute. Returns an empty series, not an error, when `product` is
    /// unknown or inactive in either table.
    pub fn build(
        ticks: &TickTable,
        trades: &TradeTable,
        product: ProductKey,
        freq: Duration,
    ) -> Vec<Bar> {
        let mut ticks_sorted: Vec<_> = ticks.for_product(product).collect();
        let mut trades_sorted: Vec<_> = trades.for_product(product).collect();
        if ticks_sorted.is_empty() && trades_sorted.is_empty() {
            return Vec::new();
        }
        ticks_sorted.sort_by_key(|t| t.time);
        trades_sorted.sort_by_key(|t| t.time);

        let min_time = ticks_sorted
            .first()
            .map(|t| t.time)
            .into_iter()
            .chain(trades_sorted.first().map(|t| t.time))
            .min()
            .unwrap();
        let max_time = ticks_sorted
            .last()
            .map(|t| t.time)
            .into_iter()
            .chain(trades_sorted.last().map(|t| t.time))
            .max()
            .unwrap();

        let bucket_start = floor_to_bucket(min_time, freq);
        let bucket_end = floor_to_bucket(max_time, freq);

        let mut bars = Vec::new();
        let mut tick_idx = 0usize;
        let mut trade_idx = 0usize;
        let mut last_bid: Option<Price> = None;
        let mut last_ask: Option<Price> = None;
        let mut last_bid_qty: Quantity = 0;
        let mut last_ask_qty: Quantity = 0;

        let mut cursor = bucket_start;
        while cursor <= bucket_end {
            let bar_end = cursor + freq;

            let mut total_bid_depth: Quantity = 0;
            let mut total_ask_depth: Quantity = 0;
            while tick_idx < ticks_sorted.len() && ticks_sorted[tick_idx].time < bar_end {
                let t = ticks_sorted[tick_idx];
                last_bid = t.best_bid;
                last_ask = t.best_ask;
                last_bid_qty = t.best_bid_qty;
                last_ask_qty = t.best_ask_qty;
                total_bid_depth += t.best_bid_qty;
                total_ask_depth += t.best_ask_qty;
                tick_idx += 1;
            }

            let mut buy_vol: Quantity = 0;
            let mut sell_vol: Quantity = 0;
            while trade_idx < trades_sorted.len() && trades_sorted[trade_idx].time < bar_end {
                let tr = trades_sorted[trade_idx];
                match tr.aggressor_side {
                    Side::Buy => buy_vol += tr.quantity,
                    Side::Sell => sell_vol += tr.quantity,
                }
                trade_idx += 1;
            }

            let mid = match (last_bid, last_ask) {
                (Some(b), Some(a)) => Some((b + a) / Decimal::from(2)),
                _ => None,
            };
            let vwap = match (last_bid, last_ask) {
                (Some(b), Some(a)) if last_bid_qty + last_ask_qty > 0 => {
                    let bid_q = Decimal::from(last_bid_qty);
                    let ask_q = Decimal::from(last_ask_qty);
                    Some((b * bid_q + a * ask_q) / (bid_q + ask_q))
                }
                _ => None,
            };

            bars.push(Bar {
                time: cursor,
                best_bid: last_bid,
                best_ask: last_ask,
                best_bid_qty: last_bid_qty,
                best_ask_qty: last_ask_qty,
                mid,
                vwap,
                traded_qty: buy_vol + sell_vol,
                buy_vol,
                sell_vol,
                total_bid_depth,
                total_ask_depth,
            });

            cursor = bar_end;
        }

        bars
    }
}

fn floor_to_bucket(time: Timestamp, freq: Duration) -> Timestamp {
    let epoch = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
    let elapsed_secs = (time - epoch).num_seconds();
    let freq_secs = freq.num_seconds().max(1);
    let floored = elapsed_secs.div_euclid(freq_secs) * freq_secs;
    epoch + Duration::seconds(floored)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::tick::Tick;
    use crate::trade::Trade;

    fn ts(m: i64) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::minutes(m)
    }

    fn product() -> ProductKey {
        Utc.with_ymd_and_hms(2024, 1, 1, 13, 0, 0).unwrap()
    }

    #[test]
    fn forward_fills_across_empty_bars() {
        let mut ticks = TickTable::new();
        ticks.push(Tick {
            time: ts(0),
            product_key: product(),
            best_bid: Some("50".parse().unwrap()),
            best_ask: Some("51".parse().unwrap()),
            best_bid_qty: 10,
            best_ask_qty: 5,
        });
        ticks.push(Tick {
            time: ts(3),
            product_key: product(),
            best_bid: Some("52".parse().unwrap()),
            best_ask: Some("53".parse().unwrap()),
            best_bid_qty: 8,
            best_ask_qty: 4,
        });
        let trades = TradeTable::new();

        let bars = TimeSeriesBuilder::build(&ticks, &trades, product(), Duration::minutes(1));
        assert_eq!(bars.len(), 4);
        assert_eq!(bars[0].best_bid, Some("50".parse().unwrap()));
        assert_eq!(bars[1].best_bid, Some("50".parse().unwrap()));
        assert_eq!(bars[2].best_bid, Some("50".parse().unwrap()));
        assert_eq!(bars[3].best_bid, Some("52".parse().unwrap()));
        for bar in &bars {
            if let (Some(b), Some(a), Some(m)) = (bar.best_bid, bar.best_ask, bar.mid) {
                assert!(b <= m && m <= a);
            }
        }
    }

    #[test]
    fn unknown_product_returns_empty() {
        let ticks = TickTable::new();
        let trades = TradeTable::new();
        let bars = TimeSeriesBuilder::build(&ticks, &trades, product(), Duration::minutes(1));
        assert!(bars.is_empty());
    }

    #[test]
    fn trade_volume_split_by_aggressor() {
        let mut ticks = TickTable::new();
        ticks.push(Tick {
            time: ts(0),
            product_key: product(),
            best_bid: Some("50".parse().unwrap()),
            best_ask: Some("51".parse().unwrap()),
            best_bid_qty: 10,
            best_ask_qty: 5,
        });
        let mut trades = TradeTable::new();
        trades.push(Trade {
            time: ts(0),
            product_key: product(),
            price: "50".parse().unwrap(),
            quantity: 3,
            aggressor_side: Side::Buy,
        });
        trades.push(Trade {
            time: ts(0),
            product_key: product(),
            price: "51".parse().unwrap(),
            quantity: 2,
            aggressor_side: Side::Sell,
        });

        let bars = TimeSeriesBuilder::build(&ticks, &trades, product(), Duration::minutes(1));
        assert_eq!(bars[0].buy_vol, 3);
        assert_eq!(bars[0].sell_vol, 2);
        assert_eq!(bars[0].traded_qty, 5);
    }
}
