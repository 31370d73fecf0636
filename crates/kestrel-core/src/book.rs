//! L2 order book view.
//!
//! The book keeps two ladders (bids descending, asks ascending) and a
//! cached top of book that is refreshed before every mutation returns.
//! Raw ABI updates are parsed once into a [`LevelUpdate`] and dispatched
//! to typed operations.

use arrayvec::ArrayVec;
use crate::error::EngineError;
use crate::fixed::{Price, Quantity, Scale};
use crate::ladder::{DenseLadder, Ladder, SortedLadder};
use crate::level::{Level, PriceBand, SideState};
use crate::side::{Action, Side};

/// A decoded level mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelUpdate {
    /// Insert a new level.
    Add { side: Side, price: Price, qty: Quantity },
    /// Insert or replace a level.
    Upsert { side: Side, price: Price, qty: Quantity },
    /// Remove a level if present.
    Delete { side: Side, price: Price },
    /// Remove every level on a side.
    Clear { side: Side },
}

impl LevelUpdate {
    /// Decode the raw ABI union.
    ///
    /// `Update` with zero quantity becomes `Delete`. `Add` keeps its zero
    /// quantity so the duplicate check still runs before it deletes.
    #[inline]
    pub fn from_raw(
        side: i32,
        price_raw: u64,
        quantity_raw: u64,
        action: i32,
    ) -> Result<Self, EngineError> {
        let side = Side::from_code(side)?;
        let action = Action::from_code(action)?;

        if action == Action::Clear {
            return Ok(LevelUpdate::Clear { side });
        }
        if price_raw == 0 {
            return Err(EngineError::InvalidParameter);
        }

        let price = Price(price_raw);
        let qty = Quantity(quantity_raw);
        Ok(match action {
            Action::Add => LevelUpdate::Add { side, price, qty },
            Action::Update if qty.is_zero() => LevelUpdate::Delete { side, price },
            Action::Update => LevelUpdate::Upsert { side, price, qty },
            Action::Delete => LevelUpdate::Delete { side, price },
            Action::Clear => LevelUpdate::Clear { side },
        })
    }

    /// Side the update applies to.
    #[inline(always)]
    pub const fn side(&self) -> Side {
        match *self {
            LevelUpdate::Add { side, .. }
            | LevelUpdate::Upsert { side, .. }
            | LevelUpdate::Delete { side, .. }
            | LevelUpdate::Clear { side } => side,
        }
    }
}

/// Cached best bid and ask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TopOfBook {
    pub bid: Option<Level>,
    pub ask: Option<Level>,
}

impl TopOfBook {
    /// Best prices as raw values, 0 for an empty side.
    #[inline(always)]
    pub fn raw_prices(&self) -> (u64, u64) {
        (
            self.bid.map_or(0, |l| l.price.0),
            self.ask.map_or(0, |l| l.price.0),
        )
    }
}

/// The L2 book for a single instrument.
pub struct OrderBook<L: Ladder> {
    /// Bid side (buyers).
    bids: L,
    /// Ask side (sellers).
    asks: L,
    /// Cached extrema, consistent with the ladders after every call.
    top: TopOfBook,
    /// Fixed-point scale of prices and quantities.
    scale: Scale,
    /// Count of applied mutations.
    sequence: u64,
}

impl OrderBook<DenseLadder> {
    /// Book over a bounded tick band. No allocation after construction.
    pub fn dense(scale: Scale, band: PriceBand) -> Self {
        Self::from_ladders(
            scale,
            DenseLadder::new(Side::Bid, band),
            DenseLadder::new(Side::Ask, band),
        )
    }
}

impl OrderBook<SortedLadder> {
    /// Book with unbounded price range.
    pub fn sorted(scale: Scale) -> Self {
        Self::from_ladders(scale, SortedLadder::new(Side::Bid), SortedLadder::new(Side::Ask))
    }
}

impl<L: Ladder> OrderBook<L> {
    /// Create a book from two empty ladders.
    ///
    /// # Panics
    /// Debug-panics if the ladders are not a bid and an ask ladder.
    pub fn from_ladders(scale: Scale, bids: L, asks: L) -> Self {
        debug_assert_eq!(bids.side(), Side::Bid);
        debug_assert_eq!(asks.side(), Side::Ask);
        let mut book = Self {
            bids,
            asks,
            top: TopOfBook::default(),
            scale,
            sequence: 0,
        };
        book.refresh(Side::Bid);
        book.refresh(Side::Ask);
        book
    }

    /// Fixed-point scale of this book.
    #[inline(always)]
    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// Number of mutations applied so far.
    #[inline(always)]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Apply a raw ABI update.
    #[inline]
    pub fn update_level(
        &mut self,
        side: i32,
        price_raw: u64,
        quantity_raw: u64,
        action: i32,
    ) -> Result<(), EngineError> {
        self.apply(LevelUpdate::from_raw(side, price_raw, quantity_raw, action)?)
    }

    /// Apply a decoded update.
    #[inline]
    pub fn apply(&mut self, update: LevelUpdate) -> Result<(), EngineError> {
        match update {
            LevelUpdate::Add { side, price, qty } => self.add_level(side, price, qty),
            LevelUpdate::Upsert { side, price, qty } => self.upsert_level(side, price, qty),
            LevelUpdate::Delete { side, price } => self.delete_level(side, price),
            LevelUpdate::Clear { side } => {
                self.clear_side(side);
                Ok(())
            }
        }
    }

    /// Insert a new level. Fails if the price already has a level.
    ///
    /// Zero quantity on an absent price is a delete of nothing.
    #[inline]
    pub fn add_level(&mut self, side: Side, price: Price, qty: Quantity) -> Result<(), EngineError> {
        if price.is_zero() {
            return Err(EngineError::InvalidParameter);
        }
        if self.side(side).get(price).is_some() {
            return Err(EngineError::DuplicateLevel);
        }
        if qty.is_zero() {
            return self.delete_level(side, price);
        }
        self.side(side).check_price(price)?;
        self.ensure_uncrossed(side, price)?;

        self.side_mut(side).set(price, qty)?;
        // A new level only moves the top if it is better than the current one.
        let improves = self
            .cached(side)
            .map_or(true, |best| side.is_better(price.0, best.price.0));
        if improves {
            self.set_cached(side, Some(Level::new(price, qty)));
        }
        self.sequence += 1;
        Ok(())
    }

    /// Insert or replace a level. Zero quantity deletes.
    #[inline]
    pub fn upsert_level(&mut self, side: Side, price: Price, qty: Quantity) -> Result<(), EngineError> {
        if qty.is_zero() {
            return self.delete_level(side, price);
        }
        if price.is_zero() {
            return Err(EngineError::InvalidParameter);
        }
        self.side(side).check_price(price)?;
        self.ensure_uncrossed(side, price)?;

        self.side_mut(side).set(price, qty)?;
        self.refresh(side);
        self.sequence += 1;
        Ok(())
    }

    /// Remove a level. Removing an absent price is a no-op.
    #[inline]
    pub fn delete_level(&mut self, side: Side, price: Price) -> Result<(), EngineError> {
        if price.is_zero() {
            return Err(EngineError::InvalidParameter);
        }
        if self.side_mut(side).remove(price).is_some() {
            // Only a removal of the top needs the ladder's next-best scan.
            if self.cached(side).map(|l| l.price) == Some(price) {
                self.refresh(side);
            }
            self.sequence += 1;
        }
        Ok(())
    }

    /// Remove every level on `side`.
    #[inline]
    pub fn clear_side(&mut self, side: Side) {
        self.side_mut(side).clear();
        self.set_cached(side, None);
        self.sequence += 1;
    }

    /// Reject a level at `price` on `side` that would lock or cross the book.
    #[inline(always)]
    fn ensure_uncrossed(&self, side: Side, price: Price) -> Result<(), EngineError> {
        let crosses = match side {
            Side::Bid => self.top.ask.map_or(false, |ask| price.0 >= ask.price.0),
            Side::Ask => self.top.bid.map_or(false, |bid| price.0 <= bid.price.0),
        };
        if crosses {
            return Err(EngineError::WouldCross);
        }
        Ok(())
    }

    #[inline(always)]
    fn refresh(&mut self, side: Side) {
        let best = self.side(side).best();
        self.set_cached(side, best);
    }

    #[inline(always)]
    fn cached(&self, side: Side) -> Option<Level> {
        match side {
            Side::Bid => self.top.bid,
            Side::Ask => self.top.ask,
        }
    }

    #[inline(always)]
    fn set_cached(&mut self, side: Side, level: Option<Level>) {
        match side {
            Side::Bid => self.top.bid = level,
            Side::Ask => self.top.ask = level,
        }
    }

    /// Cached best bid and ask as raw prices, 0 for an empty side.
    #[inline(always)]
    pub fn best_bid_ask(&self) -> (u64, u64) {
        self.top.raw_prices()
    }

    /// Cached top of book.
    #[inline(always)]
    pub fn top(&self) -> TopOfBook {
        self.top
    }

    /// Get best bid level.
    #[inline(always)]
    pub fn best_bid(&self) -> Option<Level> {
        self.top.bid
    }

    /// Get best ask level.
    #[inline(always)]
    pub fn best_ask(&self) -> Option<Level> {
        self.top.ask
    }

    /// Get the spread (best ask - best bid).
    pub fn spread(&self) -> Option<Price> {
        match (self.top.bid, self.top.ask) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    /// Get midpoint price.
    pub fn midpoint(&self) -> Option<Price> {
        match (self.top.bid, self.top.ask) {
            (Some(bid), Some(ask)) => Some(Price(bid.price.0 + (ask.price.0 - bid.price.0) / 2)),
            (Some(bid), None) => Some(bid.price),
            (None, Some(ask)) => Some(ask.price),
            (None, None) => None,
        }
    }

    /// Up to `N` levels of `side`, best first.
    pub fn depth<const N: usize>(&self, side: Side) -> ArrayVec<Level, N> {
        let mut out = ArrayVec::new();
        self.side(side).for_each_from_best(|level| {
            out.push(level);
            !out.is_full()
        });
        out
    }

    /// Quantity resting at `price` on `side`.
    #[inline]
    pub fn quantity_at(&self, side: Side, price: Price) -> Option<Quantity> {
        self.side(side).get(price)
    }

    /// Occupancy state of one side.
    #[inline(always)]
    pub fn side_state(&self, side: Side) -> SideState {
        match self.cached(side) {
            Some(_) => SideState::Populated,
            None => SideState::Empty,
        }
    }

    /// Number of levels on one side.
    #[inline(always)]
    pub fn level_count(&self, side: Side) -> usize {
        self.side(side).len()
    }

    /// Total quantity resting on one side.
    #[inline(always)]
    pub fn total_qty(&self, side: Side) -> Quantity {
        self.side(side).total_qty()
    }

    /// Check if book is empty.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.top.bid.is_none() && self.top.ask.is_none()
    }

    /// Get immutable reference to appropriate side.
    #[inline(always)]
    pub fn side(&self, side: Side) -> &L {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    #[inline(always)]
    fn side_mut(&mut self, side: Side) -> &mut L {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }
}
