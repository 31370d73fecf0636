//! Kestrel Replay - synthetic workload replay and benchmarking.
//!
//! Drives a seeded L2 stream through the order book, then runs the tick
//! translator, indicator kernels and risk checks over derived data, and
//! reports per-operation latency distributions.

mod cli;
mod workload;

use std::fs;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use kestrel_core::indicators::{ema, ohlc, rsi, window_count, Ohlc};
use kestrel_core::{
    BatchSummary, EngineError, Ladder, OrderBook, Price, PriceBand, RiskEngine, Scale, Side,
    TickTranslator, VarModel,
};
use kestrel_metrics::{LatencyRecorder, Operation};
use kestrel_proto::{Event, RecordParser, Tick};
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use cli::{Args, LadderKind};
use workload::SyntheticFeed;

const INSTRUMENT_ID: u64 = 1;
const EMA_ALPHA: f32 = 0.05;
const RSI_PERIOD: usize = 14;
const OHLC_WINDOW: usize = 100;
const VAR_ROUNDS: usize = 1_000;

/// Outcome counts of the book phase, keyed by error kind.
#[derive(Debug, Default)]
struct BookStats {
    applied: u64,
    duplicate: u64,
    crossed: u64,
    invalid: u64,
    other: u64,
}

impl BookStats {
    fn record(&mut self, result: Result<(), EngineError>) {
        match result {
            Ok(()) => self.applied += 1,
            Err(EngineError::DuplicateLevel) => self.duplicate += 1,
            Err(EngineError::WouldCross) => self.crossed += 1,
            Err(EngineError::InvalidParameter) => self.invalid += 1,
            Err(_) => self.other += 1,
        }
    }

    fn rejected(&self) -> u64 {
        self.duplicate + self.crossed + self.invalid + self.other
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    if let Some(core) = args.core {
        pin_to_core(core)?;
    }

    let scale = Scale::new(args.scale).with_context(|| format!("invalid --scale {}", args.scale))?;
    let tick_raw = scale.encode(args.tick_size).context("invalid --tick-size")?;
    if tick_raw == 0 {
        bail!("--tick-size {} rounds to zero at scale {}", args.tick_size, args.scale);
    }
    let mid_raw = scale.encode(args.start_price).context("invalid --start-price")?;

    let mut feed = SyntheticFeed::new(args.seed, mid_raw, tick_raw, args.levels, scale.factor());
    let mut recorder = LatencyRecorder::new();

    info!(
        seed = args.seed,
        updates = args.updates,
        levels = args.levels,
        ladder = ?args.ladder,
        scale = args.scale,
        "starting replay"
    );

    let mids = match args.ladder {
        LadderKind::Dense => {
            let band = PriceBand::centred(Price(feed.mid_raw()), tick_raw, args.band_slots)
                .context("invalid dense ladder band")?;
            let mut book = OrderBook::dense(scale, band);
            replay_book(&mut book, &mut feed, args.updates, &mut recorder)
        }
        LadderKind::Sorted => {
            let mut book = OrderBook::sorted(scale);
            replay_book(&mut book, &mut feed, args.updates, &mut recorder)
        }
    };

    run_ticks(&args, &mut feed, &mut recorder)?;
    run_indicators(&mids, &mut recorder);
    run_risk(&args, &mut feed, scale, &mut recorder)?;
    run_var(&args, &mut feed, scale, &mut recorder)?;

    for (op, summary) in recorder.summaries() {
        info!(op = %op, "{summary}");
    }
    Ok(())
}

fn init_tracing(default_filter: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .with_context(|| format!("invalid --log-level {default_filter:?}"))?,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

fn pin_to_core(core: usize) -> Result<()> {
    let ids = core_affinity::get_core_ids().context("cannot enumerate CPU cores")?;
    let id = ids
        .into_iter()
        .find(|c| c.id == core)
        .with_context(|| format!("core {core} is not available"))?;
    if core_affinity::set_for_current(id) {
        info!(core, "pinned replay thread");
    } else {
        warn!(core, "failed to pin replay thread, continuing unpinned");
    }
    Ok(())
}

/// Apply the snapshot and `updates` incremental updates. Returns the mid
/// price after every update that left the book two-sided.
fn replay_book<L: Ladder>(
    book: &mut OrderBook<L>,
    feed: &mut SyntheticFeed,
    updates: usize,
    recorder: &mut LatencyRecorder,
) -> Vec<f32> {
    let mut stats = BookStats::default();
    for u in feed.snapshot() {
        stats.record(book.update_level(u.side, u.price_raw, u.quantity_raw, u.action));
    }
    debug!(
        bids = book.level_count(Side::Bid),
        asks = book.level_count(Side::Ask),
        "snapshot loaded"
    );

    let scale = book.scale();
    let mut mids = Vec::with_capacity(updates);
    let started = Instant::now();

    for _ in 0..updates {
        let u = feed.next_update();
        let result = recorder.time(Operation::LevelUpdate, || {
            book.update_level(u.side, u.price_raw, u.quantity_raw, u.action)
        });
        stats.record(result);

        let (bid, ask) = recorder.time(Operation::TopOfBook, || book.best_bid_ask());
        if bid != 0 && ask != 0 {
            mids.push(scale.decode(bid + (ask - bid) / 2) as f32);
        }
    }

    let elapsed = started.elapsed();
    info!(
        applied = stats.applied,
        rejected = stats.rejected(),
        duplicate = stats.duplicate,
        crossed = stats.crossed,
        invalid = stats.invalid,
        sequence = book.sequence(),
        elapsed = ?elapsed,
        per_sec = (updates as f64 / elapsed.as_secs_f64().max(f64::EPSILON)) as u64,
        "book replay done"
    );
    debug!(
        bids = ?book.depth::<5>(Side::Bid),
        asks = ?book.depth::<5>(Side::Ask),
        "final top five"
    );
    mids
}

fn load_ticks(args: &Args, feed: &mut SyntheticFeed) -> Result<Vec<Tick>> {
    match &args.ticks {
        Some(path) => {
            let bytes = fs::read(path)
                .with_context(|| format!("failed to read tick capture {}", path.display()))?;
            let ticks = RecordParser::read_unaligned::<Tick>(&bytes)
                .with_context(|| format!("failed to parse tick capture {}", path.display()))?
                .collect();
            Ok(ticks)
        }
        None => {
            let mut ticks = Vec::new();
            feed.ticks(args.updates.max(args.tick_batch), &mut ticks);
            Ok(ticks)
        }
    }
}

fn run_ticks(args: &Args, feed: &mut SyntheticFeed, recorder: &mut LatencyRecorder) -> Result<()> {
    let ticks = load_ticks(args, feed)?;
    let batch = args.tick_batch.max(1);
    let mut translator = TickTranslator::new(INSTRUMENT_ID);
    let mut events = vec![Event::default(); batch];
    let mut total = BatchSummary::default();

    for chunk in ticks.chunks(batch) {
        total += recorder.time(Operation::TickBatch, || translator.translate(chunk, &mut events));
    }

    if total.malformed > 0 {
        warn!(malformed = total.malformed, "malformed ticks in stream");
    }
    info!(
        ticks = ticks.len(),
        trades = total.trades,
        quotes = total.quotes,
        malformed = total.malformed,
        "tick translation done"
    );
    Ok(())
}

fn run_indicators(mids: &[f32], recorder: &mut LatencyRecorder) {
    if mids.is_empty() {
        warn!("book was never two-sided, skipping indicators");
        return;
    }
    let mut out = vec![0.0f32; mids.len()];

    recorder.time(Operation::Ema, || ema(mids, &mut out, EMA_ALPHA));
    let last_ema = out[mids.len() - 1];

    recorder.time(Operation::Rsi, || rsi(mids, &mut out, RSI_PERIOD));
    let last_rsi = out[mids.len() - 1];

    let mut bars = vec![Ohlc::NAN; window_count(mids.len(), OHLC_WINDOW)];
    let written = recorder.time(Operation::Ohlc, || ohlc(mids, &mut bars, OHLC_WINDOW));

    info!(
        samples = mids.len(),
        ema = last_ema,
        rsi = last_rsi,
        bars = written,
        last_bar = ?bars.last(),
        "indicators done"
    );
}

fn run_risk(
    args: &Args,
    feed: &mut SyntheticFeed,
    scale: Scale,
    recorder: &mut LatencyRecorder,
) -> Result<()> {
    let size = args.risk_batch.max(1);
    let rounds = (args.updates / size).clamp(1, 10_000);
    let engine = RiskEngine::new(scale);
    let mut accepted = vec![0u8; size];
    let (mut orders, mut passed) = (0usize, 0usize);

    for round in 0..rounds {
        let batch = feed.risk_batch(size);
        let count = recorder
            .time(Operation::RiskBatch, || {
                engine.validate_into(&batch.orders, &batch.positions, &batch.limits, &mut accepted)
            })
            .context("risk batch rejected as a whole")?;
        orders += batch.orders.len();
        passed += count;

        if round == 0 {
            for (i, verdict) in engine
                .verdicts(&batch.orders, &batch.positions, &batch.limits)
                .enumerate()
            {
                if let Err(reason) = verdict {
                    debug!(order = i, %reason, "order rejected");
                }
            }
        }
    }

    info!(batches = rounds, orders, accepted = passed, rejected = orders - passed, "risk checks done");
    Ok(())
}

fn run_var(
    args: &Args,
    feed: &mut SyntheticFeed,
    scale: Scale,
    recorder: &mut LatencyRecorder,
) -> Result<()> {
    let portfolio = feed.portfolio(args.assets);
    let model = VarModel::default();
    let mut var_raw = 0;
    for _ in 0..VAR_ROUNDS {
        var_raw = recorder
            .time(Operation::Var, || {
                model.var_fixed(
                    &portfolio.weights,
                    &portfolio.correlations,
                    &portfolio.volatilities,
                    scale,
                )
            })
            .context("portfolio VaR")?;
    }
    info!(assets = args.assets, var = scale.decode(var_raw), "portfolio VaR done");
    Ok(())
}
