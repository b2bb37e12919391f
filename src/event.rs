use std::{
    collections::{BTreeMap, HashMap},
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::info;

use crate::{
    error::ReplayError,
    types::{Action, OrderId, Price, ProductKey, Quantity, Side, Timestamp},
};

/// Required columns, in the order they must be looked up in the header.
const REQUIRED_COLUMNS: &[&str] = &[
    "InitialId",
    "RevisionNo",
    "ActionCode",
    "Side",
    "Price",
    "Quantity",
    "DeliveryStart",
    "DeliveryEnd",
    "TransactionTime",
    "CreationTime",
    "ValidityTime",
];

/// Columns parsed into their own typed `Event` fields. Every other header,
/// including `CreationTime`/`ValidityTime`, is carried through verbatim in
/// `Event::passthrough`.
const TYPED_COLUMNS: &[&str] = &[
    "InitialId",
    "RevisionNo",
    "ActionCode",
    "Side",
    "Price",
    "Quantity",
    "DeliveryStart",
    "DeliveryEnd",
    "TransactionTime",
];

/// An immutable event-log record.
///
/// `(transaction_time, revision_no)` is the total replay order (see
/// [`EventStore::load`]).
#[derive(Clone, Debug)]
pub struct Event {
    pub initial_id: OrderId,
    pub revision_no: i64,
    pub action: Action,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
    pub product_key: ProductKey,
    pub delivery_end: Timestamp,
    pub transaction_time: Timestamp,
    /// `CreationTime`, `ValidityTime`, and any columns beyond the required
    /// set, verbatim as parsed from the CSV. Never interpreted by matching.
    pub passthrough: BTreeMap<String, String>,
}

/// Projection of an event's latest state, as returned by
/// [`EventStore::snapshot`].
#[derive(Clone, Debug)]
pub struct SnapshotOrder {
    pub initial_id: OrderId,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
    pub delivery_start: ProductKey,
    pub delivery_end: Timestamp,
    pub action: Action,
    pub transaction_time: Timestamp,
}

/// Loads, types, and sorts the raw event log; answers point-in-time snapshot
/// queries.
pub struct EventStore {
    events: Vec<Event>,
    products: Vec<ProductKey>,
    product_duration: HashMap<ProductKey, chrono::Duration>,
    min_transaction_time: Option<Timestamp>,
    max_transaction_time: Option<Timestamp>,
}

impl EventStore {
    /// Loads and types the event log at `path`.
    ///
    /// Skips one leading comment line, then parses the header row. Fails
    /// with [`ReplayError::MalformedInput`] when a required column is
    /// missing or unparsable, with [`ReplayError::EmptyLog`] when zero
    /// events remain.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let file = File::open(path.as_ref()).map_err(|e| ReplayError::MalformedInput {
            row: 0,
            column: String::new(),
            reason: format!("could not open file: {e}"),
        })?;
        let mut reader = BufReader::new(file);

        // Skip the leading comment line.
        let mut discard = String::new();
        reader
            .read_line(&mut discard)
            .map_err(|e| ReplayError::MalformedInput {
                row: 0,
                column: String::new(),
                reason: format!("could not read leading comment line: {e}"),
            })?;

        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let mut positions = HashMap::with_capacity(REQUIRED_COLUMNS.len());
        for &col in REQUIRED_COLUMNS {
            let pos = headers.iter().position(|h| h == col).ok_or_else(|| {
                ReplayError::MalformedInput {
                    row: 0,
                    column: col.to_string(),
                    reason: "required column missing from header".to_string(),
                }
            })?;
            positions.insert(col, pos);
        }

        let mut events = Vec::new();
        for (row_idx, record) in csv_reader.records().enumerate() {
            let record = record?;
            let row = row_idx + 1; // 1-based, past the header.
            let event = parse_event(&record, &positions, &headers, row)?;
            events.push(event);
        }

        if events.is_empty() {
            return Err(ReplayError::EmptyLog);
        }

        events.sort_by(|a, b| {
            (a.transaction_time, a.revision_no).cmp(&(b.transaction_time, b.revision_no))
        });

        let min_transaction_time = events.iter().map(|e| e.transaction_time).min();
        let max_transaction_time = events.iter().map(|e| e.delivery_end).max();

        let mut product_duration = HashMap::new();
        let mut products: Vec<ProductKey> = Vec::new();
        for e in &events {
            if !products.contains(&e.product_key) {
                products.push(e.product_key);
            }
            product_duration
                .entry(e.product_key)
                .or_insert_with(|| e.delivery_end - e.product_key);
        }
        products.sort();

        info!(
            events = events.len(),
            products = products.len(),
            "loaded event log"
        );

        Ok(Self {
            events,
            products,
            product_duration,
            min_transaction_time,
            max_transaction_time,
        })
    }

    /// Iterates the events in replay order.
    pub fn iter_events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// The earliest `TransactionTime` across all events.
    pub fn min_transaction_time(&self) -> Option<Timestamp> {
        self.min_transaction_time
    }

    /// The latest `DeliveryEnd` across all events.
    pub fn max_transaction_time(&self) -> Option<Timestamp> {
        self.max_transaction_time
    }

    /// All `DeliveryStart` product keys, sorted ascending and deduplicated.
    pub fn products(&self) -> &[ProductKey] {
        &self.products
    }

    /// `DeliveryEnd - DeliveryStart` for the given product.
    pub fn product_duration(&self, product: ProductKey) -> Option<chrono::Duration> {
        self.product_duration.get(&product).copied()
    }

    /// Returns the active orders at `at_time`: for each `InitialId` whose
    /// latest event with `TransactionTime <= at_time` has
    /// `action in {Add, Modify}` and `quantity > 0`, the projection of that
    /// event. Ordering is unspecified.
    pub fn snapshot(&self, at_time: Timestamp) -> Vec<SnapshotOrder> {
        let mut latest: HashMap<OrderId, &Event> = HashMap::new();
        for event in &self.events {
            if event.transaction_time > at_time {
                continue;
            }
            latest.insert(event.initial_id, event);
        }

        latest
            .into_values()
            .filter(|e| matches!(e.action, Action::Add | Action::Modify) && e.quantity > 0)
            .map(|e| SnapshotOrder {
                initial_id: e.initial_id,
                side: e.side,
                price: e.price,
                quantity: e.quantity,
                delivery_start: e.product_key,
                delivery_end: e.delivery_end,
                action: e.action,
                transaction_time: e.transaction_time,
            })
            .collect()
    }
}

fn parse_event(
    record: &csv::StringRecord,
    positions: &HashMap<&str, usize>,
    headers: &csv::StringRecord,
    row: usize,
) -> Result<Event, ReplayError> {
    let field = |col: &str| -> Result<&str, ReplayError> {
        let pos = positions[col];
        record.get(pos).ok_or_else(|| ReplayError::MalformedInput {
            row,
            column: col.to_string(),
            reason: "missing value".to_string(),
        })
    };

    let parse_err = |col: &str, reason: String| ReplayError::MalformedInput {
        row,
        column: col.to_string(),
        reason,
    };

    let initial_id: OrderId = field("InitialId")?
        .trim()
        .parse()
        .map_err(|e| parse_err("InitialId", format!("{e}")))?;
    let revision_no: i64 = field("RevisionNo")?
        .trim()
        .parse()
        .map_err(|e| parse_err("RevisionNo", format!("{e}")))?;
    let action = match field("ActionCode")?.trim() {
        "A" => Action::Add,
        "M" => Action::Modify,
        "D" => Action::Delete,
        _ => Action::Other,
    };
    let side = match field("Side")?.trim() {
        "BUY" => Side::Buy,
        "SELL" => Side::Sell,
        other => return Err(parse_err("Side", format!("unrecognized side `{other}`"))),
    };
    let price: Price = field("Price")?
        .trim()
        .parse()
        .map_err(|e| parse_err("Price", format!("{e}")))?;
    let quantity: Quantity = field("Quantity")?
        .trim()
        .parse()
        .map_err(|e| parse_err("Quantity", format!("{e}")))?;
    let product_key = parse_timestamp(field("DeliveryStart")?, "DeliveryStart", row)?;
    let delivery_end = parse_timestamp(field("DeliveryEnd")?, "DeliveryEnd", row)?;
    let transaction_time = parse_timestamp(field("TransactionTime")?, "TransactionTime", row)?;

    let typed: std::collections::HashSet<&str> = TYPED_COLUMNS.iter().copied().collect();
    let mut passthrough = BTreeMap::new();
    for (idx, header) in headers.iter().enumerate() {
        if typed.contains(header) {
            continue;
        }
        if let Some(value) = record.get(idx) {
            passthrough.insert(header.to_string(), value.to_string());
        }
    }

    Ok(Event {
        initial_id,
        revision_no,
        action,
        side,
        price,
        quantity,
        product_key,
        delivery_end,
        transaction_time,
        passthrough,
    })
}

/// Parses an ISO-8601 instant. Naive (unzoned) values are interpreted as UTC.
fn parse_timestamp(value: &str, column: &str, row: usize) -> Result<Timestamp, ReplayError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
        }
    }
    Err(ReplayError::MalformedInput {
        row,
        column: column.to_string(),
        reason: format!("unparsable timestamp `{value}`"),
    })
}
