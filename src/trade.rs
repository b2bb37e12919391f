use serde::Serialize;

use crate::types::{Price, ProductKey, Quantity, Side, Timestamp};

/// An executed trade, emitted by [`Book::cross`](crate::book::Book::cross).
/// Never mutated once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Trade {
    pub time: Timestamp,
    pub product_key: ProductKey,
    /// The resting order's price; the price-taker pays the posted price.
    pub price: Price,
    pub quantity: Quantity,
    /// The side of the incoming event that crossed and consumed liquidity.
    pub aggressor_side: Side,
}

/// The append-only table of trades accumulated over a replay run.
#[derive(Clone, Debug, Default)]
pub struct TradeTable {
    rows: Vec<Trade>,
}

impl TradeTable {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub(crate) fn push(&mut self, trade: Trade) {
        self.rows.push(trade);
    }

    pub fn rows(&self) -> &[Trade] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows for a single product, in replay order.
    pub fn for_product(&self, product_key: ProductKey) -> impl Iterator<Item = &Trade> {
        self.rows.iter().filter(move |t| t.product_key == product_key)
    }
}
