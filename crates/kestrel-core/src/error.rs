//! Engine error kinds and their ABI status codes.

use core::fmt;

/// Status code for success.
pub const STATUS_OK: i32 = 0;

/// Engine error kinds.
///
/// Each kind has a stable negative status code used at the C boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum EngineError {
    /// Level already exists on an Add.
    DuplicateLevel = -1,
    /// Mutation would leave best bid >= best ask.
    WouldCross = -2,
    /// Out-of-domain argument (side, action, price, alpha, period, window...).
    InvalidParameter = -3,
    /// Result does not fit in 64 bits.
    Overflow = -4,
    /// Operands carry different fixed-point scales.
    ScaleMismatch = -5,
}

impl EngineError {
    /// ABI status code for this error.
    #[inline(always)]
    pub const fn status(self) -> i32 {
        self as i32
    }

    /// Decode a status code. `Ok(())` for `STATUS_OK`, `None` for unknown codes.
    pub const fn from_status(status: i32) -> Option<Result<(), Self>> {
        match status {
            STATUS_OK => Some(Ok(())),
            -1 => Some(Err(EngineError::DuplicateLevel)),
            -2 => Some(Err(EngineError::WouldCross)),
            -3 => Some(Err(EngineError::InvalidParameter)),
            -4 => Some(Err(EngineError::Overflow)),
            -5 => Some(Err(EngineError::ScaleMismatch)),
            _ => None,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            EngineError::DuplicateLevel => "price level already exists",
            EngineError::WouldCross => "update would cross or lock the book",
            EngineError::InvalidParameter => "invalid parameter",
            EngineError::Overflow => "fixed-point overflow",
            EngineError::ScaleMismatch => "fixed-point scale mismatch",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for EngineError {}

/// Collapse a result into an ABI status code.
#[inline(always)]
pub fn status_of(result: Result<(), EngineError>) -> i32 {
    match result {
        Ok(()) => STATUS_OK,
        Err(e) => e.status(),
    }
}
