use crate::types::{OrderId, Price, Quantity, Side, Timestamp};

/// A resting order on one side of a [`Book`](crate::book::Book).
///
/// Created by `Add`, mutated in place only by partial execution or by a
/// priority-preserving `Modify`, removed by `Delete`, full execution, or a
/// `Modify` that changes price or increases quantity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestingOrder {
    pub initial_id: OrderId,
    pub side: Side,
    pub price: Price,
    pub remaining_quantity: Quantity,
    pub enqueue_time: Timestamp,
}
