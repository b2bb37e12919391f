use std::time::Instant;

use tracing::info;

use crate::{engine::MatchingEngine, error::ReplayError, event::EventStore, tick::TickTable, trade::TradeTable};

/// Drives the [`EventStore`]'s sorted event sequence through the
/// [`MatchingEngine`] and collects both output streams into materialised,
/// append-only tables.
pub struct ReplayDriver {
    store: EventStore,
    engine: MatchingEngine,
    ticks: TickTable,
    trades: TradeTable,
    has_run: bool,
}

impl ReplayDriver {
    pub fn new(store: EventStore) -> Self {
        Self {
            store,
            engine: MatchingEngine::new(),
            ticks: TickTable::new(),
            trades: TradeTable::new(),
            has_run: false,
        }
    }

    /// Runs the replay to completion. Fails with [`ReplayError::AlreadyRun`]
    /// if called more than once.
    pub fn run(&mut self) -> Result<(), ReplayError> {
        if self.has_run {
            return Err(ReplayError::AlreadyRun);
        }
        self.has_run = true;

        let start = Instant::now();
        let mut events_processed = 0usize;
        for event in self.store.iter_events() {
            let (trades, tick) = self.engine.process_event(event);
            for trade in trades {
                self.trades.push(trade);
            }
            if let Some(tick) = tick {
                self.ticks.push(tick);
            }
            events_processed += 1;
        }

        info!(
            events = events_processed,
            trades = self.trades.len(),
            ticks = self.ticks.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "replay complete"
        );

        Ok(())
    }

    pub fn tick_table(&self) -> &TickTable {
        &self.ticks
    }

    pub fn trade_table(&self) -> &TradeTable {
        &self.trades
    }

    pub fn event_store(&self) -> &EventStore {
        &self.store
    }
}
