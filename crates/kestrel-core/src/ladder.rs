//! Price ladders: one side of the book as an ordered price → quantity map.
//!
//! Two layouts are provided:
//! - [`DenseLadder`]: slots indexed by tick offset over a bounded band.
//!   No allocation after construction, O(1) updates, O(1) best read.
//! - [`SortedLadder`]: a `BTreeMap` for unbounded tick bands.
//!   O(log n) updates, cached best.

use std::collections::BTreeMap;
use crate::error::EngineError;
use crate::fixed::{Price, Quantity};
use crate::level::{Level, PriceBand};
use crate::side::Side;

/// One side of an L2 book.
///
/// Implementations keep their best level cached so [`Ladder::best`] is O(1).
pub trait Ladder {
    /// Side this ladder orders for.
    fn side(&self) -> Side;

    /// Check that `price` can be stored, without mutating.
    fn check_price(&self, price: Price) -> Result<(), EngineError>;

    /// Quantity at `price`, if a level exists.
    fn get(&self, price: Price) -> Option<Quantity>;

    /// Insert or replace a level. `qty` must be non-zero.
    ///
    /// Returns the previous quantity at the price.
    fn set(&mut self, price: Price, qty: Quantity) -> Result<Option<Quantity>, EngineError>;

    /// Remove a level. Returns the removed quantity, `None` if absent.
    fn remove(&mut self, price: Price) -> Option<Quantity>;

    /// Remove every level.
    fn clear(&mut self);

    /// Best level (highest bid / lowest ask).
    fn best(&self) -> Option<Level>;

    /// Number of levels.
    fn len(&self) -> usize;

    /// Sum of quantities over all levels (saturating).
    fn total_qty(&self) -> Quantity;

    /// Visit levels from best outward until `f` returns `false`.
    fn for_each_from_best<F: FnMut(Level) -> bool>(&self, f: F);

    /// Check if the ladder holds no level.
    #[inline(always)]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

const WORD_BITS: usize = 64;

/// Dense ladder over a [`PriceBand`].
///
/// Quantities live in a flat slot array; a one-bit-per-slot occupancy
/// bitmap lets the next-best search skip 64 empty slots per word.
pub struct DenseLadder {
    /// Quantity per slot, 0 = empty.
    qty: Box<[u64]>,
    /// Bit `i` set iff slot `i` holds a level.
    occupancy: Box<[u64]>,
    /// Best slot index (None if side is empty).
    best_idx: Option<u32>,
    band: PriceBand,
    side: Side,
    count: usize,
    total_qty: Quantity,
}

impl DenseLadder {
    /// Create an empty ladder covering `band`.
    pub fn new(side: Side, band: PriceBand) -> Self {
        let slots = band.slots();
        let words = slots.div_ceil(WORD_BITS);
        Self {
            qty: vec![0u64; slots].into_boxed_slice(),
            occupancy: vec![0u64; words].into_boxed_slice(),
            best_idx: None,
            band,
            side,
            count: 0,
            total_qty: Quantity::ZERO,
        }
    }

    /// Band covered by this ladder.
    #[inline(always)]
    pub fn band(&self) -> &PriceBand {
        &self.band
    }

    #[inline(always)]
    fn mark(&mut self, idx: usize) {
        self.occupancy[idx / WORD_BITS] |= 1u64 << (idx % WORD_BITS);
    }

    #[inline(always)]
    fn unmark(&mut self, idx: usize) {
        self.occupancy[idx / WORD_BITS] &= !(1u64 << (idx % WORD_BITS));
    }

    /// Highest occupied slot strictly below `idx`.
    #[inline]
    fn highest_below(&self, idx: usize) -> Option<usize> {
        if idx == 0 {
            return None;
        }
        let last = idx - 1;
        let mut word = last / WORD_BITS;
        let mut bits = self.occupancy[word] & (u64::MAX >> (WORD_BITS - 1 - last % WORD_BITS));
        loop {
            if bits != 0 {
                return Some(word * WORD_BITS + (WORD_BITS - 1 - bits.leading_zeros() as usize));
            }
            if word == 0 {
                return None;
            }
            word -= 1;
            bits = self.occupancy[word];
        }
    }

    /// Lowest occupied slot strictly above `idx`.
    #[inline]
    fn lowest_above(&self, idx: usize) -> Option<usize> {
        let first = idx + 1;
        if first >= self.band.slots() {
            return None;
        }
        let mut word = first / WORD_BITS;
        let mut bits = self.occupancy[word] & (u64::MAX << (first % WORD_BITS));
        loop {
            if bits != 0 {
                return Some(word * WORD_BITS + bits.trailing_zeros() as usize);
            }
            word += 1;
            if word >= self.occupancy.len() {
                return None;
            }
            bits = self.occupancy[word];
        }
    }

    /// Next slot after `idx` moving away from the best price.
    #[inline(always)]
    fn next_worse(&self, idx: usize) -> Option<usize> {
        match self.side {
            Side::Bid => self.highest_below(idx),
            Side::Ask => self.lowest_above(idx),
        }
    }

    /// Find next best price after the current best is removed.
    #[inline]
    fn find_next_best(&mut self, removed: usize) {
        self.best_idx = self.next_worse(removed).map(|i| i as u32);
    }

    #[inline(always)]
    fn level_at(&self, idx: usize) -> Level {
        Level::new(self.band.price_at(idx), Quantity(self.qty[idx]))
    }
}

impl Ladder for DenseLadder {
    #[inline(always)]
    fn side(&self) -> Side {
        self.side
    }

    #[inline(always)]
    fn check_price(&self, price: Price) -> Result<(), EngineError> {
        self.band.index_of(price).map(|_| ())
    }

    #[inline(always)]
    fn get(&self, price: Price) -> Option<Quantity> {
        let idx = self.band.index_of(price).ok()?;
        match self.qty[idx] {
            0 => None,
            q => Some(Quantity(q)),
        }
    }

    #[inline]
    fn set(&mut self, price: Price, qty: Quantity) -> Result<Option<Quantity>, EngineError> {
        debug_assert!(!qty.is_zero(), "zero quantity must go through remove");
        let idx = self.band.index_of(price)?;
        let prev = self.qty[idx];
        self.qty[idx] = qty.0;
        self.total_qty = self.total_qty.saturating_sub(Quantity(prev)).saturating_add(qty);

        if prev != 0 {
            return Ok(Some(Quantity(prev)));
        }

        self.mark(idx);
        self.count += 1;
        match self.best_idx {
            Some(best) if !self.side.is_better(idx as u64, best as u64) => {}
            _ => self.best_idx = Some(idx as u32),
        }
        Ok(None)
    }

    #[inline]
    fn remove(&mut self, price: Price) -> Option<Quantity> {
        let idx = self.band.index_of(price).ok()?;
        let prev = self.qty[idx];
        if prev == 0 {
            return None;
        }
        self.qty[idx] = 0;
        self.unmark(idx);
        self.count -= 1;
        self.total_qty = self.total_qty.saturating_sub(Quantity(prev));

        if self.best_idx == Some(idx as u32) {
            self.find_next_best(idx);
        }
        Some(Quantity(prev))
    }

    fn clear(&mut self) {
        // Only touch occupied slots.
        for word_idx in 0..self.occupancy.len() {
            let mut bits = self.occupancy[word_idx];
            while bits != 0 {
                let bit = bits.trailing_zeros() as usize;
                self.qty[word_idx * WORD_BITS + bit] = 0;
                bits &= bits - 1;
            }
            self.occupancy[word_idx] = 0;
        }
        self.best_idx = None;
        self.count = 0;
        self.total_qty = Quantity::ZERO;
    }

    #[inline(always)]
    fn best(&self) -> Option<Level> {
        self.best_idx.map(|idx| self.level_at(idx as usize))
    }

    #[inline(always)]
    fn len(&self) -> usize {
        self.count
    }

    #[inline(always)]
    fn total_qty(&self) -> Quantity {
        self.total_qty
    }

    fn for_each_from_best<F: FnMut(Level) -> bool>(&self, mut f: F) {
        let mut cursor = self.best_idx.map(|i| i as usize);
        while let Some(idx) = cursor {
            if !f(self.level_at(idx)) {
                return;
            }
            cursor = self.next_worse(idx);
        }
    }
}

/// Tree ladder for instruments without a bounded tick band.
///
/// Inserting a new price allocates a tree node; updates and deletes of
/// existing prices do not.
pub struct SortedLadder {
    levels: BTreeMap<u64, u64>,
    best: Option<Level>,
    side: Side,
    total_qty: Quantity,
}

impl SortedLadder {
    /// Create an empty ladder.
    pub fn new(side: Side) -> Self {
        Self {
            levels: BTreeMap::new(),
            best: None,
            side,
            total_qty: Quantity::ZERO,
        }
    }

    #[inline]
    fn extremum(&self) -> Option<Level> {
        let entry = match self.side {
            Side::Bid => self.levels.last_key_value(),
            Side::Ask => self.levels.first_key_value(),
        };
        entry.map(|(&p, &q)| Level::new(Price(p), Quantity(q)))
    }
}

impl Ladder for SortedLadder {
    #[inline(always)]
    fn side(&self) -> Side {
        self.side
    }

    #[inline(always)]
    fn check_price(&self, price: Price) -> Result<(), EngineError> {
        if price.is_zero() {
            return Err(EngineError::InvalidParameter);
        }
        Ok(())
    }

    #[inline]
    fn get(&self, price: Price) -> Option<Quantity> {
        self.levels.get(&price.0).map(|&q| Quantity(q))
    }

    #[inline]
    fn set(&mut self, price: Price, qty: Quantity) -> Result<Option<Quantity>, EngineError> {
        debug_assert!(!qty.is_zero(), "zero quantity must go through remove");
        self.check_price(price)?;
        let prev = self.levels.insert(price.0, qty.0).map(Quantity);
        self.total_qty = self
            .total_qty
            .saturating_sub(prev.unwrap_or(Quantity::ZERO))
            .saturating_add(qty);

        match self.best {
            Some(best) if best.price == price => self.best = Some(Level::new(price, qty)),
            Some(best) if !self.side.is_better(price.0, best.price.0) => {}
            _ => self.best = Some(Level::new(price, qty)),
        }
        Ok(prev)
    }

    #[inline]
    fn remove(&mut self, price: Price) -> Option<Quantity> {
        let prev = self.levels.remove(&price.0).map(Quantity)?;
        self.total_qty = self.total_qty.saturating_sub(prev);
        if self.best.map(|b| b.price) == Some(price) {
            self.best = self.extremum();
        }
        Some(prev)
    }

    fn clear(&mut self) {
        self.levels.clear();
        self.best = None;
        self.total_qty = Quantity::ZERO;
    }

    #[inline(always)]
    fn best(&self) -> Option<Level> {
        self.best
    }

    #[inline(always)]
    fn len(&self) -> usize {
        self.levels.len()
    }

    #[inline(always)]
    fn total_qty(&self) -> Quantity {
        self.total_qty
    }

    fn for_each_from_best<F: FnMut(Level) -> bool>(&self, mut f: F) {
        let mut visit = |(&p, &q): (&u64, &u64)| f(Level::new(Price(p), Quantity(q)));
        match self.side {
            Side::Bid => {
                for entry in self.levels.iter().rev() {
                    if !visit(entry) {
                        return;
                    }
                }
            }
            Side::Ask => {
                for entry in self.levels.iter() {
                    if !visit(entry) {
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band() -> PriceBand {
        PriceBand::new(Price(100), 1, 1_000).unwrap()
    }

    #[test]
    fn test_dense_best_update() {
        let mut bids = DenseLadder::new(Side::Bid, band());
        bids.set(Price(500), Quantity(10)).unwrap();
        assert_eq!(bids.best().map(|l| l.price), Some(Price(500)));

        // Better bid
        bids.set(Price(510), Quantity(5)).unwrap();
        assert_eq!(bids.best().map(|l| l.price), Some(Price(510)));

        // Worse bid, best unchanged
        bids.set(Price(490), Quantity(5)).unwrap();
        assert_eq!(bids.best().map(|l| l.price), Some(Price(510)));
        assert_eq!(bids.len(), 3);
        assert_eq!(bids.total_qty(), Quantity(20));
    }

    #[test]
    fn test_dense_next_best_after_delete() {
        let mut asks = DenseLadder::new(Side::Ask, band());
        for p in [300u64, 250, 900] {
            asks.set(Price(p), Quantity(1)).unwrap();
        }
        assert_eq!(asks.best().map(|l| l.price), Some(Price(250)));
        assert_eq!(asks.remove(Price(250)), Some(Quantity(1)));
        assert_eq!(asks.best().map(|l| l.price), Some(Price(300)));
        asks.remove(Price(300));
        // Crosses several bitmap words.
        assert_eq!(asks.best().map(|l| l.price), Some(Price(900)));
        asks.remove(Price(900));
        assert_eq!(asks.best(), None);
        assert!(asks.is_empty());
    }

    #[test]
    fn test_dense_scan_word_edges() {
        let mut bids = DenseLadder::new(Side::Bid, band());
        // Slots 0, 63, 64, 127 straddle word boundaries.
        for slot in [0u64, 63, 64, 127] {
            bids.set(Price(100 + slot), Quantity(1)).unwrap();
        }
        let mut seen = Vec::new();
        bids.for_each_from_best(|l| {
            seen.push(l.price.0 - 100);
            true
        });
        assert_eq!(seen, vec![127, 64, 63, 0]);

        for expected in [64u64, 63, 0] {
            let best = bids.best().unwrap().price;
            bids.remove(best);
            assert_eq!(bids.best().map(|l| l.price.0 - 100), Some(expected));
        }
    }

    #[test]
    fn test_dense_replace_quantity() {
        let mut bids = DenseLadder::new(Side::Bid, band());
        assert_eq!(bids.set(Price(200), Quantity(3)).unwrap(), None);
        assert_eq!(bids.set(Price(200), Quantity(7)).unwrap(), Some(Quantity(3)));
        assert_eq!(bids.get(Price(200)), Some(Quantity(7)));
        assert_eq!(bids.total_qty(), Quantity(7));
        assert_eq!(bids.len(), 1);
    }

    #[test]
    fn test_dense_out_of_band() {
        let mut bids = DenseLadder::new(Side::Bid, band());
        assert_eq!(bids.set(Price(50), Quantity(1)), Err(EngineError::InvalidParameter));
        assert_eq!(bids.remove(Price(50)), None);
        assert_eq!(bids.get(Price(5_000)), None);
    }

    #[test]
    fn test_dense_clear() {
        let mut asks = DenseLadder::new(Side::Ask, band());
        for p in 100..200u64 {
            asks.set(Price(p), Quantity(2)).unwrap();
        }
        asks.clear();
        assert!(asks.is_empty());
        assert_eq!(asks.best(), None);
        assert_eq!(asks.get(Price(150)), None);
        assert_eq!(asks.total_qty(), Quantity::ZERO);
    }

    #[test]
    fn test_sorted_best_tracking() {
        let mut bids = SortedLadder::new(Side::Bid);
        bids.set(Price(100), Quantity(1)).unwrap();
        bids.set(Price(105), Quantity(2)).unwrap();
        bids.set(Price(95), Quantity(3)).unwrap();
        assert_eq!(bids.best(), Some(Level::new(Price(105), Quantity(2))));

        // Quantity change at the best is reflected in the cache.
        bids.set(Price(105), Quantity(9)).unwrap();
        assert_eq!(bids.best(), Some(Level::new(Price(105), Quantity(9))));

        bids.remove(Price(105));
        assert_eq!(bids.best(), Some(Level::new(Price(100), Quantity(1))));
        assert_eq!(bids.total_qty(), Quantity(4));
    }

    #[test]
    fn test_sorted_iteration_order() {
        let mut asks = SortedLadder::new(Side::Ask);
        for p in [30u64, 10, 20] {
            asks.set(Price(p), Quantity(1)).unwrap();
        }
        let mut seen = Vec::new();
        asks.for_each_from_best(|l| {
            seen.push(l.price.0);
            seen.len() < 2
        });
        assert_eq!(seen, vec![10, 20]);
    }

    #[test]
    fn test_sorted_rejects_zero_price() {
        let mut asks = SortedLadder::new(Side::Ask);
        assert_eq!(asks.set(Price(0), Quantity(1)), Err(EngineError::InvalidParameter));
    }
}
