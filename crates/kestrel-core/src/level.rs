//! Price levels and the tick band of a dense ladder.

use crate::error::EngineError;
use crate::fixed::{Price, Quantity};

/// Maximum number of slots in a dense ladder side.
/// 2^24 slots is 128 MiB of quantities plus a 2 MiB occupancy bitmap.
pub const MAX_SLOTS: u32 = 1 << 24;

/// A single aggregated price level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct Level {
    /// Level price.
    pub price: Price,
    /// Aggregate quantity resting at the price.
    pub quantity: Quantity,
}

impl Level {
    #[inline(always)]
    pub const fn new(price: Price, quantity: Quantity) -> Self {
        Self { price, quantity }
    }
}

/// Occupancy of one side of the book.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SideState {
    Empty,
    Populated,
}

/// The bounded price range covered by a dense ladder.
///
/// Slot `i` holds price `base + i * tick`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceBand {
    base: Price,
    tick: u64,
    slots: u32,
}

impl PriceBand {
    /// Create a band of `slots` prices starting at `base`, `tick` apart.
    pub fn new(base: Price, tick: u64, slots: u32) -> Result<Self, EngineError> {
        if tick == 0 || slots == 0 || slots > MAX_SLOTS {
            return Err(EngineError::InvalidParameter);
        }
        // The highest representable price must fit in a u64.
        (slots as u64 - 1)
            .checked_mul(tick)
            .and_then(|span| base.0.checked_add(span))
            .ok_or(EngineError::Overflow)?;
        Ok(Self { base, tick, slots })
    }

    /// Band centred on `mid`, `slots` wide, clamped at the low end so the
    /// base stays above zero and on the tick grid of `mid`.
    pub fn centred(mid: Price, tick: u64, slots: u32) -> Result<Self, EngineError> {
        if tick == 0 {
            return Err(EngineError::InvalidParameter);
        }
        let half = (slots as u64 / 2).saturating_mul(tick);
        let mut base = mid.0.saturating_sub(half);
        // Keep `mid` on the grid.
        base += (mid.0 - base) % tick;
        if base == 0 {
            base = tick;
        }
        Self::new(Price(base), tick, slots)
    }

    /// Lowest price in the band.
    #[inline(always)]
    pub const fn base(&self) -> Price {
        self.base
    }

    /// Price increment between slots.
    #[inline(always)]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Number of slots.
    #[inline(always)]
    pub const fn slots(&self) -> usize {
        self.slots as usize
    }

    /// Convert price to slot index.
    ///
    /// Prices below the base, above the top or off the tick grid are invalid.
    #[inline(always)]
    pub fn index_of(&self, price: Price) -> Result<usize, EngineError> {
        if price.0 < self.base.0 {
            return Err(EngineError::InvalidParameter);
        }
        let offset = price.0 - self.base.0;
        if offset % self.tick != 0 {
            return Err(EngineError::InvalidParameter);
        }
        let idx = offset / self.tick;
        if idx < self.slots as u64 {
            Ok(idx as usize)
        } else {
            Err(EngineError::InvalidParameter)
        }
    }

    /// Convert slot index back to price.
    #[inline(always)]
    pub const fn price_at(&self, idx: usize) -> Price {
        Price(self.base.0 + idx as u64 * self.tick)
    }
}
