//! Raw tick to normalized event translation.
//!
//! One event per tick, written in place. A tick is malformed when its
//! timestamp goes backwards, its price or quantity is zero, or it is
//! flagged as a trade without a buy/sell aggressor. Malformed events keep
//! the tick's timestamp, carry zero price and quantity, and do not
//! advance the monotonicity watermark.

use core::ops::AddAssign;

use kestrel_proto::{Aggressor, Event, EventKind, Tick, TickFlags};

/// Per-batch event counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub trades: u64,
    pub quotes: u64,
    pub malformed: u64,
}

impl BatchSummary {
    /// Total events written.
    #[inline(always)]
    pub fn total(&self) -> u64 {
        self.trades + self.quotes + self.malformed
    }

    #[inline(always)]
    fn record(&mut self, kind: EventKind) {
        match kind {
            EventKind::Trade => self.trades += 1,
            EventKind::Quote => self.quotes += 1,
            EventKind::Malformed => self.malformed += 1,
        }
    }
}

impl AddAssign for BatchSummary {
    fn add_assign(&mut self, other: Self) {
        self.trades += other.trades;
        self.quotes += other.quotes;
        self.malformed += other.malformed;
    }
}

/// Streaming translator for one instrument.
///
/// The last accepted timestamp survives across batches, so a feed can be
/// translated in arbitrary chunks with the same result as one batch.
#[derive(Clone, Copy, Debug)]
pub struct TickTranslator {
    instrument_id: u64,
    last_ts: Option<u64>,
}

impl TickTranslator {
    pub const fn new(instrument_id: u64) -> Self {
        Self {
            instrument_id,
            last_ts: None,
        }
    }

    #[inline(always)]
    pub fn instrument_id(&self) -> u64 {
        self.instrument_id
    }

    /// Timestamp of the last accepted tick.
    #[inline(always)]
    pub fn last_timestamp(&self) -> Option<u64> {
        self.last_ts
    }

    /// Forget the monotonicity watermark.
    pub fn reset(&mut self) {
        self.last_ts = None;
    }

    /// Classify a tick without touching state.
    #[inline(always)]
    fn classify(&self, tick: &Tick) -> (EventKind, u8) {
        if let Some(last) = self.last_ts {
            if tick.timestamp_ns < last {
                return (EventKind::Malformed, 0);
            }
        }
        if tick.price_raw == 0 || tick.quantity_raw == 0 {
            return (EventKind::Malformed, 0);
        }
        if !tick.tick_flags().contains(TickFlags::TRADE) {
            return (EventKind::Quote, 0);
        }
        match Aggressor::try_from(tick.aggressor) {
            Ok(Aggressor::Buy) | Ok(Aggressor::Sell) => (EventKind::Trade, tick.aggressor),
            _ => (EventKind::Malformed, 0),
        }
    }

    /// Translate one tick.
    #[inline(always)]
    pub fn translate_one(&mut self, tick: &Tick) -> Event {
        let (kind, aggressor) = self.classify(tick);
        let (price_raw, quantity_raw) = match kind {
            EventKind::Malformed => (0, 0),
            _ => {
                self.last_ts = Some(tick.timestamp_ns);
                (tick.price_raw, tick.quantity_raw)
            }
        };
        Event {
            timestamp_ns: tick.timestamp_ns,
            instrument_id: self.instrument_id,
            price_raw,
            quantity_raw,
            kind: kind as u8,
            aggressor,
            _padding: [0; 6],
        }
    }

    /// Translate `min(ticks.len(), out.len())` ticks into `out`.
    pub fn translate(&mut self, ticks: &[Tick], out: &mut [Event]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for (tick, event) in ticks.iter().zip(out.iter_mut()) {
            *event = self.translate_one(tick);
            if let Some(kind) = event.event_kind() {
                summary.record(kind);
            }
        }
        summary
    }
}

/// Translate a self-contained batch.
pub fn process_tick_batch(ticks: &[Tick], out: &mut [Event], instrument_id: u64) -> BatchSummary {
    TickTranslator::new(instrument_id).translate(ticks, out)
}
