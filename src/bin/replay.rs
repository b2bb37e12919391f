use chrono::Duration;
use clap::Parser;
use rust_decimal::Decimal;
use tracing::info;

use powerbook_replay::{
    DualThrustConfig, EventStore, ReplayDriver, RunConfig, TimeSeriesBuilder,
};

/// Replays an intraday power market event log and evaluates a Dual Thrust
/// breakout strategy over the derived bar series for one delivery product.
#[derive(Parser, Debug)]
#[command(about = None, long_about = None)]
struct Args {
    /// Path to the event log CSV.
    #[arg(long)]
    input: String,
    /// `DeliveryStart` of the product to evaluate, RFC3339
    /// (e.g. `2024-01-01T12:00:00Z`). Defaults to the first product in the
    /// log, by `DeliveryStart` ascending.
    #[arg(long)]
    product: Option<String>,
    /// Bar frequency in minutes.
    #[arg(long, default_value_t = 1)]
    frequency_minutes: i64,
    /// Dual Thrust lookback, in bars.
    #[arg(long, default_value_t = 15)]
    n: usize,
    #[arg(long, default_value_t = 0.5)]
    k1: f64,
    #[arg(long, default_value_t = 0.5)]
    k2: f64,
    /// Minutes before `DeliveryStart` the trading window opens.
    #[arg(long, default_value_t = 60)]
    open_offset_minutes: i64,
    /// Minutes before `DeliveryStart` the trading window closes.
    #[arg(long, default_value_t = 15)]
    close_offset_minutes: i64,
    /// Print the derived bar series and signals as JSON instead of a
    /// one-line summary.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let store = EventStore::load(&args.input)?;

    let product = match &args.product {
        Some(raw) => raw.parse().map_err(|e| {
            anyhow::anyhow!("could not parse --product as an RFC3339 instant: {e}")
        })?,
        None => *store
            .products()
            .first()
            .ok_or_else(|| anyhow::anyhow!("event log has no products"))?,
    };

    let strategy = DualThrustConfig::new(
        args.n,
        Decimal::try_from(args.k1)?,
        Decimal::try_from(args.k2)?,
        Duration::minutes(args.open_offset_minutes),
        Duration::minutes(args.close_offset_minutes),
    )?;
    let config = RunConfig::new(Duration::minutes(args.frequency_minutes), strategy)?;

    let mut driver = ReplayDriver::new(store);
    driver.run()?;

    let bars = TimeSeriesBuilder::build(
        driver.tick_table(),
        driver.trade_table(),
        product,
        config.frequency,
    );
    let signals = powerbook_replay::DualThrust::evaluate(&bars, &config.strategy, product);

    let buy_signals = signals.iter().filter(|s| s.signal == 1).count();
    let sell_signals = signals.iter().filter(|s| s.signal == -1).count();
    let events = driver.event_store().iter_events().count();
    let trades = driver.trade_table().len();
    let ticks = driver.tick_table().len();

    info!(
        product = %product,
        events,
        trades,
        ticks,
        bars = bars.len(),
        buy_signals,
        sell_signals,
        "run summary"
    );

    if args.json {
        let payload = serde_json::json!({
            "product": product,
            "bars": bars,
            "signals": signals,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "product={product} events={events} trades={trades} ticks={ticks} bars={} buy_signals={buy_signals} sell_signals={sell_signals}",
            bars.len(),
        );
    }

    Ok(())
}
