//! Book side and level action codes.

use kestrel_proto::SideMask;
use crate::error::EngineError;

/// Side of the order book.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    /// Bid side (buyers).
    Bid = 0,
    /// Ask side (sellers).
    Ask = 1,
}

impl Side {
    /// Get the opposite side.
    #[inline(always)]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    /// True if `candidate` is a better price than `current` on this side.
    #[inline(always)]
    pub const fn is_better(self, candidate: u64, current: u64) -> bool {
        match self {
            // Bids: higher is better
            Side::Bid => candidate > current,
            // Asks: lower is better
            Side::Ask => candidate < current,
        }
    }

    /// Bit of this side in an allowed-sides mask.
    #[inline(always)]
    pub const fn mask(self) -> SideMask {
        match self {
            Side::Bid => SideMask::BID,
            Side::Ask => SideMask::ASK,
        }
    }

    /// Decode a raw ABI side code.
    #[inline(always)]
    pub const fn from_code(code: i32) -> Result<Self, EngineError> {
        match code {
            0 => Ok(Side::Bid),
            1 => Ok(Side::Ask),
            _ => Err(EngineError::InvalidParameter),
        }
    }
}

impl TryFrom<u8> for Side {
    type Error = EngineError;

    #[inline(always)]
    fn try_from(value: u8) -> Result<Self, EngineError> {
        Side::from_code(value as i32)
    }
}

impl TryFrom<i32> for Side {
    type Error = EngineError;

    #[inline(always)]
    fn try_from(value: i32) -> Result<Self, EngineError> {
        Side::from_code(value)
    }
}

/// Level action carried by the ABI `update_l2_level` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Action {
    /// Insert a new level; fails if the price exists.
    Add = 0,
    /// Upsert a level; quantity zero deletes.
    Update = 1,
    /// Remove a level; absent is not an error.
    Delete = 2,
    /// Remove every level on a side.
    Clear = 3,
}

impl Action {
    /// Decode a raw ABI action code.
    #[inline(always)]
    pub const fn from_code(code: i32) -> Result<Self, EngineError> {
        match code {
            0 => Ok(Action::Add),
            1 => Ok(Action::Update),
            2 => Ok(Action::Delete),
            3 => Ok(Action::Clear),
            _ => Err(EngineError::InvalidParameter),
        }
    }
}

impl TryFrom<i32> for Action {
    type Error = EngineError;

    #[inline(always)]
    fn try_from(value: i32) -> Result<Self, EngineError> {
        Action::from_code(value)
    }
}
