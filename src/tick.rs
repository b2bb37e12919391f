use serde::Serialize;

use crate::types::{Price, ProductKey, Quantity, Timestamp};

/// A top-of-book snapshot, emitted only when the quadruple
/// `(best_bid, best_ask, best_bid_qty, best_ask_qty)` changes relative to the
/// previous tick for the same product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Tick {
    pub time: Timestamp,
    pub product_key: ProductKey,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub best_bid_qty: Quantity,
    pub best_ask_qty: Quantity,
}

impl Tick {
    /// The `(best_bid, best_ask, best_bid_qty, best_ask_qty)` quadruple,
    /// compared for change-detection.
    pub fn quadruple(&self) -> (Option<Price>, Option<Price>, Quantity, Quantity) {
        (self.best_bid, self.best_ask, self.best_bid_qty, self.best_ask_qty)
    }
}

/// The append-only table of top-of-book ticks accumulated over a replay run.
#[derive(Clone, Debug, Default)]
pub struct TickTable {
    rows: Vec<Tick>,
}

impl TickTable {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub(crate) fn push(&mut self, tick: Tick) {
        self.rows.push(tick);
    }

    pub fn rows(&self) -> &[Tick] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows for a single product, in replay order.
    pub fn for_product(&self, product_key: ProductKey) -> impl Iterator<Item = &Tick> {
        self.rows.iter().filter(move |t| t.product_key == product_key)
    }
}
