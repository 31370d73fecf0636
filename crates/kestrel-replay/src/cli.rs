//! Command line configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Ladder implementation backing the replayed book.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LadderKind {
    /// Flat slot array over a bounded tick band.
    Dense,
    /// Tree keyed by price.
    Sorted,
}

/// Kestrel replay: synthetic L2 workload and latency benchmark
#[derive(Debug, Parser)]
#[command(name = "kestrel-replay", version)]
pub struct Args {
    /// Number of incremental L2 updates after the initial snapshot
    #[arg(long, default_value_t = 1_000_000)]
    pub updates: usize,

    /// Levels per side in the snapshot, also the max distance from mid in ticks
    #[arg(long, default_value_t = 20)]
    pub levels: u32,

    /// RNG seed; the same seed replays the same stream
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Starting mid price
    #[arg(long, default_value_t = 20_000.0)]
    pub start_price: f64,

    /// Tick size in price units
    #[arg(long, default_value_t = 0.01)]
    pub tick_size: f64,

    /// Decimal places of the fixed-point representation
    #[arg(long, default_value_t = 9)]
    pub scale: u8,

    /// Ladder implementation
    #[arg(long, value_enum, default_value_t = LadderKind::Dense)]
    pub ladder: LadderKind,

    /// Slots per side of a dense ladder, centred on the start price
    #[arg(long, default_value_t = 1 << 16)]
    pub band_slots: u32,

    /// Ticks per translated batch
    #[arg(long, default_value_t = 1_024)]
    pub tick_batch: usize,

    /// Orders per risk batch (at most 64 returns a mask)
    #[arg(long, default_value_t = 64)]
    pub risk_batch: usize,

    /// Assets in the synthetic VaR portfolio
    #[arg(long, default_value_t = 32)]
    pub assets: usize,

    /// Pin the replay thread to this CPU core
    #[arg(long)]
    pub core: Option<usize>,

    /// Raw tick capture (packed 32-byte records) to translate instead of synthetic ticks
    #[arg(long)]
    pub ticks: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
