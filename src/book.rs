use std::{
    cmp::Reverse,
    collections::{BTreeMap, HashMap, VecDeque},
};

use crate::{
    order::RestingOrder,
    types::{OrderId, Price, Quantity, Side},
};

/// One execution produced by [`Book::cross`]: a fill against a single
/// resting order, at that order's price.
#[derive(Clone, Copy, Debug)]
pub struct Execution {
    pub price: Price,
    pub quantity: Quantity,
}

/// Result of [`Book::modify`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModifyOutcome {
    /// The resting order's quantity was decreased in place; its queue
    /// position is unchanged and the caller has nothing further to do.
    Preserved,
    /// The resting order was removed from the book. The caller is
    /// responsible for treating the new price/quantity as a fresh order:
    /// crossing it and inserting any residual.
    Removed,
}

/// A per-product price-time-priority limit order book.
///
/// Bids are ordered by price descending, then `enqueue_time` ascending.
/// Asks are ordered by price ascending, then `enqueue_time` ascending. At
/// equal price and `enqueue_time`, orders are processed in `initial_id`
/// ascending order (see [`insert_sorted`]).
#[derive(Default)]
pub struct Book {
    bids: BTreeMap<Reverse<Price>, VecDeque<RestingOrder>>,
    asks: BTreeMap<Price, VecDeque<RestingOrder>>,
    bid_index: HashMap<OrderId, Price>,
    ask_index: HashMap<OrderId, Price>,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(&self, side: Side) -> &HashMap<OrderId, Price> {
        match side {
            Side::Buy => &self.bid_index,
            Side::Sell => &self.ask_index,
        }
    }

    fn index_mut(&mut self, side: Side) -> &mut HashMap<OrderId, Price> {
        match side {
            Side::Buy => &mut self.bid_index,
            Side::Sell => &mut self.ask_index,
        }
    }

    /// The resting order currently indexed under `initial_id` on `side`, if
    /// any.
    pub fn peek(&self, side: Side, initial_id: OrderId) -> Option<&RestingOrder> {
        let price = *self.index(side).get(&initial_id)?;
        let level = match side {
            Side::Buy => self.bids.get(&Reverse(price)),
            Side::Sell => self.asks.get(&price),
        }?;
        level.iter().find(|o| o.initial_id == initial_id)
    }

    /// The best price and aggregate quantity resting at it, for `side`.
    pub fn best(&self, side: Side) -> Option<(Price, Quantity)> {
        match side {
            Side::Buy => self.bids.iter().next().map(|(Reverse(p), level)| {
                (*p, level.iter().map(|o| o.remaining_quantity).sum())
            }),
            Side::Sell => self
                .asks
                .iter()
                .next()
                .map(|(p, level)| (*p, level.iter().map(|o| o.remaining_quantity).sum())),
        }
    }

    /// Inserts a new resting order. O(log L) to find/create the price
    /// level, O(1) at the back for the common case of a fresh
    /// `enqueue_time`.
    pub fn insert(&mut self, order: RestingOrder) {
        let side = order.side;
        let price = order.price;
        self.index_mut(side).insert(order.initial_id, price);
        let level = match side {
            Side::Buy => self.bids.entry(Reverse(price)).or_default(),
            Side::Sell => self.asks.entry(price).or_default(),
        };
        insert_sorted(level, order);
    }

    /// Removes the resting order indexed under `initial_id` on `side`, if
    /// any. A no-op, not an error, if unknown.
    pub fn cancel(&mut self, side: Side, initial_id: OrderId) -> Option<RestingOrder> {
        let price = self.index_mut(side).remove(&initial_id)?;
        let (level_empty, removed) = match side {
            Side::Buy => {
                let level = self.bids.get_mut(&Reverse(price))?;
                let pos = level.iter().position(|o| o.initial_id == initial_id)?;
                let removed = level.remove(pos);
                (level.is_empty(), removed)
            }
            Side::Sell => {
                let level = self.asks.get_mut(&price)?;
                let pos = level.iter().position(|o| o.initial_id == initial_id)?;
                let removed = level.remove(pos);
                (level.is_empty(), removed)
            }
        };
        if level_empty {
            match side {
                Side::Buy => self.bids.remove(&Reverse(price)),
                Side::Sell => self.asks.remove(&price),
            };
        }
        removed
    }

    /// Mutates a resting order's quantity in place, preserving its queue
    /// position. Only valid when the price is unchanged and the new
    /// quantity is strictly less than the current one (see [`Book::modify`]);
    /// the caller is responsible for enforcing that.
    pub fn decrease_in_place(
        &mut self,
        side: Side,
        initial_id: OrderId,
        new_quantity: Quantity,
    ) -> bool {
        let Some(&price) = self.index(side).get(&initial_id) else {
            return false;
        };
        let level = match side {
            Side::Buy => self.bids.get_mut(&Reverse(price)),
            Side::Sell => self.asks.get_mut(&price),
        };
        let Some(level) = level else { return false };
        let Some(order) = level.iter_mut().find(|o| o.initial_id == initial_id) else {
            return false;
        };
        order.remaining_quantity = new_quantity;
        true
    }

    /// Applies a Modify to the resting order indexed under `initial_id` on
    /// `side`, given its new price and quantity.
    ///
    /// A quantity decrease at an unchanged price preserves queue priority
    /// and is applied in place. Anything else — a price change, a quantity
    /// increase, or a non-positive new quantity — removes the resting
    /// order; a later price-time-priority insertion then starts it at the
    /// back of its (possibly new) level. A no-op if `initial_id` is not
    /// resting on `side`.
    pub fn modify(
        &mut self,
        side: Side,
        initial_id: OrderId,
        new_price: Price,
        new_quantity: Quantity,
    ) -> ModifyOutcome {
        let preserves_priority = new_quantity > 0
            && self.peek(side, initial_id).is_some_and(|existing| {
                existing.price == new_price && new_quantity < existing.remaining_quantity
            });

        if preserves_priority {
            self.decrease_in_place(side, initial_id, new_quantity);
            return ModifyOutcome::Preserved;
        }

        self.cancel(side, initial_id);
        ModifyOutcome::Removed
    }

    /// Walks the side opposite `incoming_side` while its best price crosses
    /// `limit_price`, executing `min(residual, resting.remaining)` at each
    /// resting order's own price, in price-time order. Returns the
    /// executions produced and the unfilled residual quantity.
    pub fn cross(
        &mut self,
        incoming_side: Side,
        limit_price: Price,
        quantity: Quantity,
    ) -> (Vec<Execution>, Quantity) {
        let opposite = incoming_side.opposite();
        let mut residual = quantity;
        let mut executions = Vec::new();

        loop {
            if residual == 0 {
                break;
            }
            let crosses = match opposite {
                Side::Sell => self
                    .asks
                    .iter()
                    .next()
                    .map(|(p, _)| *p <= limit_price)
                    .unwrap_or(false),
                Side::Buy => self
                    .bids
                    .iter()
                    .next()
                    .map(|(Reverse(p), _)| *p >= limit_price)
                    .unwrap_or(false),
            };
            if !crosses {
                break;
            }

            let (price, fill_qty, fully_filled, filled_id, level_empty_after) = match opposite {
                Side::Sell => {
                    let (&price, level) = self.asks.iter_mut().next().unwrap();
                    let front = level.front_mut().unwrap();
                    let fill_qty = residual.min(front.remaining_quantity);
                    front.remaining_quantity -= fill_qty;
                    let fully_filled = front.remaining_quantity == 0;
                    let filled_id = front.initial_id;
                    if fully_filled {
                        level.pop_front();
                    }
                    (price, fill_qty, fully_filled, filled_id, level.is_empty())
                }
                Side::Buy => {
                    let (&Reverse(price), level) = self.bids.iter_mut().next().unwrap();
                    let front = level.front_mut().unwrap();
                    let fill_qty = residual.min(front.remaining_quantity);
                    front.remaining_quantity -= fill_qty;
                    let fully_filled = front.remaining_quantity == 0;
                    let filled_id = front.initial_id;
                    if fully_filled {
                        level.pop_front();
                    }
                    (price, fill_qty, fully_filled, filled_id, level.is_empty())
                }
            };

            if fully_filled {
                self.index_mut(opposite).remove(&filled_id);
            }
            if level_empty_after {
                match opposite {
                    Side::Sell => self.asks.remove(&price),
                    Side::Buy => self.bids.remove(&Reverse(price)),
                };
            }

            executions.push(Execution {
                price,
                quantity: fill_qty,
            });
            residual -= fill_qty;
        }

        (executions, residual)
    }
}

/// Inserts `order` into `level`, maintaining ascending order by
/// `(enqueue_time, initial_id)`. Levels are almost always appended to
/// (orders arrive in non-decreasing `enqueue_time`), so this is O(1)
/// amortised; the scan from the back only does work when two orders in the
/// same event share an `enqueue_time`.
fn insert_sorted(level: &mut VecDeque<RestingOrder>, order: RestingOrder) {
    let mut pos = level.len();
    while pos > 0 {
        let prior = &level[pos - 1];
        let prior_key = (prior.enqueue_time, prior.initial_id);
        let new_key = (order.enqueue_time, order.initial_id);
        if prior_key <= new_key {
            break;
        }
        pos -= 1;
    }
    level.insert(pos, order);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn order(id: OrderId, side: Side, price: Price, quantity: Quantity, t: i64) -> RestingOrder {
        RestingOrder {
            initial_id: id,
            side,
            price,
            remaining_quantity: quantity,
            enqueue_time: Utc.timestamp_opt(t, 0).unwrap(),
        }
    }

    #[test]
    fn cancel_of_unknown_id_is_a_noop() {
        let mut book = Book::new();
        assert_eq!(book.cancel(Side::Buy, 999), None);
    }

    #[test]
    fn equal_enqueue_time_breaks_ties_by_initial_id() {
        let mut book = Book::new();
        book.insert(order(2, Side::Buy, dec!(50.0), 10, 100));
        book.insert(order(1, Side::Buy, dec!(50.0), 5, 100));

        let (executions, residual) = book.cross(Side::Sell, dec!(50.0), 12);
        assert_eq!(residual, 0);
        assert_eq!(executions.len(), 2);
        // initial_id 1 queued at the same enqueue_time as 2, but sorts first.
        assert_eq!(executions[0].quantity, 5);
        assert_eq!(executions[1].quantity, 7);
    }

    #[test]
    fn level_is_removed_once_fully_drained() {
        let mut book = Book::new();
        book.insert(order(1, Side::Sell, dec!(50.0), 10, 100));
        let (_, residual) = book.cross(Side::Buy, dec!(50.0), 10);
        assert_eq!(residual, 0);
        assert_eq!(book.best(Side::Sell), None);
        assert_eq!(book.peek(Side::Sell, 1), None);
    }

    #[test]
    fn cross_stops_when_price_no_longer_crosses() {
        let mut book = Book::new();
        book.insert(order(1, Side::Sell, dec!(51.0), 10, 100));
        let (executions, residual) = book.cross(Side::Buy, dec!(50.0), 10);
        assert!(executions.is_empty());
        assert_eq!(residual, 10);
        assert_eq!(book.best(Side::Sell), Some((dec!(51.0), 10)));
    }

    #[test]
    fn decrease_in_place_preserves_queue_position() {
        let mut book = Book::new();
        book.insert(order(1, Side::Buy, dec!(50.0), 10, 100));
        book.insert(order(2, Side::Buy, dec!(50.0), 10, 101));
        assert!(book.decrease_in_place(Side::Buy, 1, 3));

        let (executions, _) = book.cross(Side::Sell, dec!(50.0), 5);
        assert_eq!(executions[0].quantity, 3);
        assert_eq!(executions[1].quantity, 2);
    }

    #[test]
    fn modify_preserves_priority_on_quantity_decrease() {
        let mut book = Book::new();
        book.insert(order(1, Side::Buy, dec!(50.0), 10, 100));
        book.insert(order(2, Side::Buy, dec!(50.0), 5, 101));

        let outcome = book.modify(Side::Buy, 1, dec!(50.0), 7);
        assert_eq!(outcome, ModifyOutcome::Preserved);

        let (executions, _) = book.cross(Side::Sell, dec!(50.0), 8);
        assert_eq!(executions[0].quantity, 7);
        assert_eq!(executions[1].quantity, 1);
    }

    #[test]
    fn modify_removes_on_price_change() {
        let mut book = Book::new();
        book.insert(order(1, Side::Buy, dec!(50.0), 10, 100));
        book.insert(order(2, Side::Buy, dec!(50.0), 5, 101));

        let outcome = book.modify(Side::Buy, 1, dec!(51.0), 10);
        assert_eq!(outcome, ModifyOutcome::Removed);
        assert_eq!(book.peek(Side::Buy, 1), None);
        assert_eq!(book.best(Side::Buy), Some((dec!(50.0), 5)));
    }

    #[test]
    fn modify_removes_on_quantity_increase() {
        let mut book = Book::new();
        book.insert(order(1, Side::Buy, dec!(50.0), 10, 100));

        let outcome = book.modify(Side::Buy, 1, dec!(50.0), 12);
        assert_eq!(outcome, ModifyOutcome::Removed);
        assert_eq!(book.peek(Side::Buy, 1), None);
    }

    #[test]
    fn modify_of_unknown_id_is_removed_noop() {
        let mut book = Book::new();
        let outcome = book.modify(Side::Buy, 999, dec!(50.0), 5);
        assert_eq!(outcome, ModifyOutcome::Removed);
    }
}
