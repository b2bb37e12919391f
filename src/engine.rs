use std::collections::HashMap;

use crate::{
    book::{Book, ModifyOutcome},
    event::Event,
    order::RestingOrder,
    tick::Tick,
    trade::Trade,
    types::{Action, OrderId, Price, ProductKey, Quantity, Side},
};

type Quadruple = (Option<Price>, Option<Price>, Quantity, Quantity);

const EMPTY_QUADRUPLE: Quadruple = (None, None, 0, 0);

/// Dispatches each event to the correct [`Book`], emitting trades and
/// top-of-book deltas synchronously. One event produces zero or more
/// [`Trade`]s and zero or one [`Tick`]; these are the engine's sole
/// observable effect.
#[derive(Default)]
pub struct MatchingEngine {
    books: HashMap<ProductKey, Book>,
    /// `initial_id -> (product_key, side)` for every currently resting
    /// order, mirroring the union of resting-order identities across all
    /// books.
    index: HashMap<OrderId, (ProductKey, Side)>,
    current_best: HashMap<ProductKey, Quadruple>,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes a single event, returning the trades it produced and, if
    /// the product's top of book changed, the new tick.
    pub fn process_event(&mut self, event: &Event) -> (Vec<Trade>, Option<Tick>) {
        let mut in_place_handled = false;

        if let Some(&(old_product, old_side)) = self.index.get(&event.initial_id) {
            if event.action == Action::Modify && old_side == event.side {
                let outcome = self
                    .books
                    .get_mut(&old_product)
                    .map(|book| book.modify(old_side, event.initial_id, event.price, event.quantity))
                    .unwrap_or(ModifyOutcome::Removed);
                match outcome {
                    ModifyOutcome::Preserved => in_place_handled = true,
                    ModifyOutcome::Removed => {
                        self.index.remove(&event.initial_id);
                    }
                }
            } else {
                if let Some(book) = self.books.get_mut(&old_product) {
                    book.cancel(old_side, event.initial_id);
                }
                self.index.remove(&event.initial_id);
            }
        }

        let mut trades = Vec::new();
        if !in_place_handled
            && matches!(event.action, Action::Add | Action::Modify)
            && event.quantity > 0
        {
            let book = self.books.entry(event.product_key).or_default();
            let (executions, residual) = book.cross(event.side, event.price, event.quantity);
            trades.extend(executions.into_iter().map(|exec| Trade {
                time: event.transaction_time,
                product_key: event.product_key,
                price: exec.price,
                quantity: exec.quantity,
                aggressor_side: event.side,
            }));

            if residual > 0 {
                book.insert(RestingOrder {
                    initial_id: event.initial_id,
                    side: event.side,
                    price: event.price,
                    remaining_quantity: residual,
                    enqueue_time: event.transaction_time,
                });
                self.index
                    .insert(event.initial_id, (event.product_key, event.side));
            }
        }

        let tick = self.recompute_tick(event);
        (trades, tick)
    }

    fn recompute_tick(&mut self, event: &Event) -> Option<Tick> {
        let book = self.books.entry(event.product_key).or_default();
        let (best_bid, best_bid_qty) = book
            .best(Side::Buy)
            .map(|(p, q)| (Some(p), q))
            .unwrap_or((None, 0));
        let (best_ask, best_ask_qty) = book
            .best(Side::Sell)
            .map(|(p, q)| (Some(p), q))
            .unwrap_or((None, 0));
        let quadruple = (best_bid, best_ask, best_bid_qty, best_ask_qty);

        let prev = self
            .current_best
            .get(&event.product_key)
            .copied()
            .unwrap_or(EMPTY_QUADRUPLE);
        if prev == quadruple {
            return None;
        }
        self.current_best.insert(event.product_key, quadruple);
        Some(Tick {
            time: event.transaction_time,
            product_key: event.product_key,
            best_bid,
            best_ask,
            best_bid_qty,
            best_ask_qty,
        })
    }
}
