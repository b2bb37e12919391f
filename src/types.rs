use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Stable identity of a resting order across its revisions.
///
/// `InitialId` in the source CSV; distinct from `RevisionNo`, which only
/// orders the revisions of a single `OrderId`.
pub type OrderId = i64;

/// Identity of a delivery product: its `DeliveryStart` instant.
pub type ProductKey = DateTime<Utc>;

/// Exact decimal price. Equality/ordering must never go through a float, so
/// this is the only type used for `Price` anywhere in the crate.
pub type Price = Decimal;

/// Integer lot quantity.
pub type Quantity = u64;

/// UTC instant used for all timestamps in the crate.
pub type Timestamp = DateTime<Utc>;

/// Side of a resting order, or of the aggressor in a trade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side a resting order would need to be on to cross against this side.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// The action carried by an event record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Add,
    Modify,
    Delete,
    /// Any `ActionCode` not in `{A, M, D}`. Routed to the same
    /// removal-then-ignore path as `Delete`.
    Other,
}
