//! Seeded synthetic market data.
//!
//! The L2 stream is a random walk of the mid price in whole ticks. Each
//! update picks a side and a distance from mid of 1..=levels ticks, then
//! either replaces the level with a random quantity or, one time in ten,
//! deletes it.

use kestrel_core::{Action, Side};
use kestrel_proto::{Aggressor, LimitRecord, OrderRecord, PositionRecord, SideMask, Tick};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const DELETE_PROBABILITY: f64 = 0.1;

const TRADE_PROBABILITY: f64 = 0.3;
const CORRELATION: f32 = 0.3;

/// One raw ABI update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawUpdate {
    pub side: i32,
    pub price_raw: u64,
    pub quantity_raw: u64,
    pub action: i32,
}

pub struct SyntheticFeed {
    rng: StdRng,
    mid_ticks: u64,
    tick_raw: u64,
    levels: u32,
    lot_raw: u64,
    timestamp_ns: u64,
}

impl SyntheticFeed {
    /// `lot_raw` is the raw quantity of one unit at the book's scale.
    pub fn new(seed: u64, mid_raw: u64, tick_raw: u64, levels: u32, lot_raw: u64) -> Self {
        let levels = levels.max(1);
        Self {
            rng: StdRng::seed_from_u64(seed),
            mid_ticks: (mid_raw / tick_raw.max(1)).max(levels as u64 + 1),
            tick_raw: tick_raw.max(1),
            levels,
            lot_raw: lot_raw.max(1),
            timestamp_ns: 1,
        }
    }

    #[inline(always)]
    pub fn mid_raw(&self) -> u64 {
        self.mid_ticks * self.tick_raw
    }

    /// Quantity for a level `i` ticks from mid: exponential decay with
    /// +/-20% noise.
    fn level_qty(&mut self, i: u32) -> u64 {
        let decay = (-0.5 * i as f64).exp();
        let noise = 0.8 + 0.4 * self.rng.gen::<f64>();
        ((self.lot_raw as f64 * decay * noise) as u64).max(1)
    }

    /// Initial book: `levels` bids and asks one tick apart around mid.
    pub fn snapshot(&mut self) -> Vec<RawUpdate> {
        let mut out = Vec::with_capacity(self.levels as usize * 2);
        for i in 1..=self.levels {
            for side in [Side::Bid, Side::Ask] {
                let quantity_raw = self.level_qty(i);
                out.push(RawUpdate {
                    side: side as i32,
                    price_raw: self.price_at(side, i),
                    quantity_raw,
                    action: Action::Add as i32,
                });
            }
        }
        out
    }

    #[inline(always)]
    fn price_at(&self, side: Side, distance: u32) -> u64 {
        let ticks = match side {
            Side::Bid => self.mid_ticks - distance as u64,
            Side::Ask => self.mid_ticks + distance as u64,
        };
        ticks * self.tick_raw
    }

    pub fn next_update(&mut self) -> RawUpdate {
        match self.rng.gen_range(0..4) {
            0 => self.mid_ticks = (self.mid_ticks - 1).max(self.levels as u64 + 1),
            3 => self.mid_ticks += 1,
            _ => {}
        }

        let side = if self.rng.gen_bool(0.5) { Side::Bid } else { Side::Ask };
        let distance = self.rng.gen_range(1..=self.levels);
        let price_raw = self.price_at(side, distance);

        if self.rng.gen_bool(DELETE_PROBABILITY) {
            return RawUpdate {
                side: side as i32,
                price_raw,
                quantity_raw: 0,
                action: Action::Delete as i32,
            };
        }
        let quantity_raw = ((self.lot_raw as f64 * self.rng.gen_range(0.01..1.0)) as u64).max(1);
        RawUpdate {
            side: side as i32,
            price_raw,
            quantity_raw,
            action: Action::Update as i32,
        }
    }

    /// Append `n` ticks around the current mid, timestamps increasing.
    pub fn ticks(&mut self, n: usize, out: &mut Vec<Tick>) {
        out.reserve(n);
        for _ in 0..n {
            self.timestamp_ns += self.rng.gen_range(1..1_000);
            let distance = self.rng.gen_range(0..=self.levels) as u64;
            let price_raw = (self.mid_ticks + distance).saturating_sub(self.levels as u64 / 2)
                * self.tick_raw;
            let quantity_raw = self.level_qty(distance as u32);
            let tick = if self.rng.gen_bool(TRADE_PROBABILITY) {
                let aggressor = if self.rng.gen_bool(0.5) { Aggressor::Buy } else { Aggressor::Sell };
                Tick::trade(self.timestamp_ns, price_raw, quantity_raw, aggressor)
            } else {
                Tick::quote(self.timestamp_ns, price_raw, quantity_raw)
            };
            out.push(tick);
        }
    }

    /// `n` orders near mid for one account, with positions and limits
    /// tight enough that some orders fail.
    pub fn risk_batch(&mut self, n: usize) -> RiskBatch {
        const ACCOUNT: u64 = 1;
        const INSTRUMENT: u64 = 1;
        let lot = self.lot_raw;
        let mut batch = RiskBatch::with_capacity(n);
        for _ in 0..n {
            let side = self.rng.gen_range(0..2u8);
            let qty = lot * self.rng.gen_range(1..20);
            let price = self.mid_raw();
            let net = self.rng.gen_range(-50i64..=50) * lot as i64;
            batch.orders.push(OrderRecord::new(INSTRUMENT, ACCOUNT, side, price, qty));
            batch.positions.push(PositionRecord::new(INSTRUMENT, ACCOUNT, net, price));
            batch.limits.push(LimitRecord::new(
                ACCOUNT,
                60 * lot,
                15 * lot,
                price.saturating_mul(12),
                SideMask::BOTH,
            ));
        }
        batch
    }

    /// Constant-correlation portfolio of `n` assets.
    pub fn portfolio(&mut self, n: usize) -> Portfolio {
        let weights = (0..n).map(|_| self.rng.gen_range(-1_000.0f32..1_000.0)).collect();
        let volatilities = (0..n).map(|_| self.rng.gen_range(0.005f32..0.05)).collect();
        let mut correlations = vec![CORRELATION; n * n];
        for i in 0..n {
            correlations[i * n + i] = 1.0;
        }
        Portfolio {
            weights,
            correlations,
            volatilities,
        }
    }
}

/// Parallel order, position and limit arrays.
pub struct RiskBatch {
    pub orders: Vec<OrderRecord>,
    pub positions: Vec<PositionRecord>,
    pub limits: Vec<LimitRecord>,
}

impl RiskBatch {
    fn with_capacity(n: usize) -> Self {
        Self {
            orders: Vec::with_capacity(n),
            positions: Vec::with_capacity(n),
            limits: Vec::with_capacity(n),
        }
    }
}

pub struct Portfolio {
    pub weights: Vec<f32>,
    pub correlations: Vec<f32>,
    pub volatilities: Vec<f32>,
}
