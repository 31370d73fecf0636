//! Record definitions.
//!
//! Sizes and field offsets are part of the ABI. They are asserted at
//! compile time and mirrored in `kestrel-ffi/include/kestrel.h`.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use core::mem::{offset_of, size_of};

/// Aggressor side carried by a raw tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Aggressor {
    /// No aggressor (quotes, auctions).
    None = 0,
    /// Buyer lifted the offer.
    Buy = 1,
    /// Seller hit the bid.
    Sell = 2,
}

impl TryFrom<u8> for Aggressor {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(Aggressor::None),
            1 => Ok(Aggressor::Buy),
            2 => Ok(Aggressor::Sell),
            _ => Err(()),
        }
    }
}

/// Normalized event kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum EventKind {
    Quote = 0,
    Trade = 1,
    Malformed = 2,
}

impl TryFrom<u8> for EventKind {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(EventKind::Quote),
            1 => Ok(EventKind::Trade),
            2 => Ok(EventKind::Malformed),
            _ => Err(()),
        }
    }
}

bitflags! {
    /// Flag bits of a raw tick. Unknown bits are reserved and ignored.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct TickFlags: u8 {
        /// The tick reports an execution rather than a quote.
        const TRADE = 0b0000_0001;
    }
}

bitflags! {
    /// Sides an account may trade, as carried by `LimitRecord::allowed_sides_mask`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct SideMask: u8 {
        const BID = 0b01;
        const ASK = 0b10;
        const BOTH = Self::BID.bits() | Self::ASK.bits();
    }
}

/// Raw market tick (32 bytes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Tick {
    pub timestamp_ns: u64,          // 8 bytes
    pub price_raw: u64,             // 8 bytes
    pub quantity_raw: u64,          // 8 bytes
    pub aggressor: u8,              // 1 byte (0=None, 1=Buy, 2=Sell)
    pub flags: u8,                  // 1 byte (bit0=TRADE)
    pub _padding: [u8; 6],          // 6 bytes
}

const _: () = assert!(size_of::<Tick>() == 32);
const _: () = assert!(offset_of!(Tick, aggressor) == 24);
const _: () = assert!(offset_of!(Tick, flags) == 25);

impl Tick {
    /// Quote tick.
    pub const fn quote(timestamp_ns: u64, price_raw: u64, quantity_raw: u64) -> Self {
        Self {
            timestamp_ns,
            price_raw,
            quantity_raw,
            aggressor: Aggressor::None as u8,
            flags: 0,
            _padding: [0; 6],
        }
    }

    /// Trade tick with the given aggressor.
    pub const fn trade(
        timestamp_ns: u64,
        price_raw: u64,
        quantity_raw: u64,
        aggressor: Aggressor,
    ) -> Self {
        Self {
            timestamp_ns,
            price_raw,
            quantity_raw,
            aggressor: aggressor as u8,
            flags: TickFlags::TRADE.bits(),
            _padding: [0; 6],
        }
    }

    /// Decoded flag bits.
    #[inline(always)]
    pub const fn tick_flags(&self) -> TickFlags {
        TickFlags::from_bits_truncate(self.flags)
    }
}

/// Normalized market event (40 bytes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Event {
    pub timestamp_ns: u64,          // 8 bytes
    pub instrument_id: u64,         // 8 bytes
    pub price_raw: u64,             // 8 bytes
    pub quantity_raw: u64,          // 8 bytes
    pub kind: u8,                   // 1 byte (0=Quote, 1=Trade, 2=Malformed)
    pub aggressor: u8,              // 1 byte (trades only)
    pub _padding: [u8; 6],          // 6 bytes
}

const _: () = assert!(size_of::<Event>() == 40);
const _: () = assert!(offset_of!(Event, kind) == 32);

impl Event {
    /// Decoded kind, `None` for codes this crate never writes.
    #[inline(always)]
    pub fn event_kind(&self) -> Option<EventKind> {
        EventKind::try_from(self.kind).ok()
    }
}

/// Pre-trade order (40 bytes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct OrderRecord {
    pub instrument_id: u64,         // 8 bytes
    pub account_id: u64,            // 8 bytes
    pub price_raw: u64,             // 8 bytes
    pub quantity_raw: u64,          // 8 bytes
    pub side: u8,                   // 1 byte (0=Bid, 1=Ask)
    pub _padding: [u8; 7],          // 7 bytes
}

const _: () = assert!(size_of::<OrderRecord>() == 40);
const _: () = assert!(offset_of!(OrderRecord, side) == 32);

impl OrderRecord {
    pub const fn new(
        instrument_id: u64,
        account_id: u64,
        side: u8,
        price_raw: u64,
        quantity_raw: u64,
    ) -> Self {
        Self {
            instrument_id,
            account_id,
            price_raw,
            quantity_raw,
            side,
            _padding: [0; 7],
        }
    }
}

/// Position snapshot (32 bytes). Long positions are positive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct PositionRecord {
    pub instrument_id: u64,         // 8 bytes
    pub account_id: u64,            // 8 bytes
    pub net_quantity_raw: i64,      // 8 bytes
    pub average_price_raw: u64,     // 8 bytes
}

const _: () = assert!(size_of::<PositionRecord>() == 32);
const _: () = assert!(offset_of!(PositionRecord, net_quantity_raw) == 16);

impl PositionRecord {
    pub const fn new(
        instrument_id: u64,
        account_id: u64,
        net_quantity_raw: i64,
        average_price_raw: u64,
    ) -> Self {
        Self {
            instrument_id,
            account_id,
            net_quantity_raw,
            average_price_raw,
        }
    }

    /// Flat position for an account.
    pub const fn flat(instrument_id: u64, account_id: u64) -> Self {
        Self::new(instrument_id, account_id, 0, 0)
    }
}

/// Per-account risk limits (40 bytes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct LimitRecord {
    pub account_id: u64,            // 8 bytes
    pub max_position_raw: u64,      // 8 bytes
    pub max_order_qty_raw: u64,     // 8 bytes
    pub max_notional_raw: u64,      // 8 bytes
    pub allowed_sides_mask: u8,     // 1 byte (bit0=Bid, bit1=Ask)
    pub _padding: [u8; 7],          // 7 bytes
}

const _: () = assert!(size_of::<LimitRecord>() == 40);
const _: () = assert!(offset_of!(LimitRecord, allowed_sides_mask) == 32);

impl LimitRecord {
    pub const fn new(
        account_id: u64,
        max_position_raw: u64,
        max_order_qty_raw: u64,
        max_notional_raw: u64,
        allowed_sides: SideMask,
    ) -> Self {
        Self {
            account_id,
            max_position_raw,
            max_order_qty_raw,
            max_notional_raw,
            allowed_sides_mask: allowed_sides.bits(),
            _padding: [0; 7],
        }
    }

    /// Limits that never bind, on both sides.
    pub const fn unlimited(account_id: u64) -> Self {
        Self::new(account_id, u64::MAX, u64::MAX, u64::MAX, SideMask::BOTH)
    }

    /// Decoded side mask. Unknown bits are dropped.
    #[inline(always)]
    pub const fn allowed_sides(&self) -> SideMask {
        SideMask::from_bits_truncate(self.allowed_sides_mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_sizes() {
        assert_eq!(size_of::<Tick>(), 32);
        assert_eq!(size_of::<Event>(), 40);
        assert_eq!(size_of::<OrderRecord>(), 40);
        assert_eq!(size_of::<PositionRecord>(), 32);
        assert_eq!(size_of::<LimitRecord>(), 40);
    }

    #[test]
    fn test_tick_constructors() {
        let t = Tick::trade(7, 100, 5, Aggressor::Sell);
        assert!(t.tick_flags().contains(TickFlags::TRADE));
        assert_eq!(Aggressor::try_from(t.aggressor), Ok(Aggressor::Sell));

        let q = Tick::quote(7, 100, 5);
        assert!(q.tick_flags().is_empty());
    }

    #[test]
    fn test_side_mask() {
        let limit = LimitRecord::new(1, 0, 0, 0, SideMask::ASK);
        assert!(!limit.allowed_sides().contains(SideMask::BID));
        assert!(limit.allowed_sides().contains(SideMask::ASK));
    }

    #[test]
    fn test_reserved_flag_bits_ignored() {
        let mut t = Tick::quote(1, 1, 1);
        t.flags = 0b1111_0000;
        assert!(t.tick_flags().is_empty());
    }
}
