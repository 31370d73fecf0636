//! Pre-trade order validation.
//!
//! Orders, positions and limits are parallel arrays: entry `i` of each
//! describes order `i`. Validation never mutates positions.

use core::fmt;

use kestrel_proto::{LimitRecord, OrderRecord, PositionRecord};

use crate::error::EngineError;
use crate::fixed::Scale;
use crate::side::Side;

/// Largest batch that fits in the acceptance bitmask.
pub const MASK_BITS: usize = 64;

/// First rule an order failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// Side code is neither bid nor ask.
    InvalidSide,
    /// Position or limit record belongs to another account or instrument.
    AccountMismatch,
    /// Account may not trade this side.
    SideNotAllowed,
    /// Order quantity above the per-order cap.
    OrderQtyExceeded,
    /// Resulting net position above the position cap.
    PositionLimitExceeded,
    /// Notional above the notional cap.
    NotionalExceeded,
    /// Notional does not fit in 64 bits.
    NotionalOverflow,
}

impl RejectReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            RejectReason::InvalidSide => "invalid side",
            RejectReason::AccountMismatch => "account mismatch",
            RejectReason::SideNotAllowed => "side not allowed",
            RejectReason::OrderQtyExceeded => "order quantity exceeded",
            RejectReason::PositionLimitExceeded => "position limit exceeded",
            RejectReason::NotionalExceeded => "notional exceeded",
            RejectReason::NotionalOverflow => "notional overflow",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a batch, shaped by batch size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchVerdict {
    /// Bit `i` set iff order `i` was accepted (batches of at most 64).
    Mask(u64),
    /// Number of accepted orders (larger batches).
    Count(usize),
}

impl BatchVerdict {
    /// The ABI return word.
    #[inline(always)]
    pub const fn to_word(self) -> u64 {
        match self {
            BatchVerdict::Mask(mask) => mask,
            BatchVerdict::Count(count) => count as u64,
        }
    }
}

/// Stateless pre-trade checker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RiskEngine {
    scale: Scale,
}

impl RiskEngine {
    /// Checker multiplying notionals at `scale`.
    pub const fn new(scale: Scale) -> Self {
        Self { scale }
    }

    #[inline(always)]
    pub const fn scale(&self) -> Scale {
        self.scale
    }

    /// Run every rule against one order.
    pub fn check_order(
        &self,
        order: &OrderRecord,
        position: &PositionRecord,
        limit: &LimitRecord,
    ) -> Result<(), RejectReason> {
        let side = Side::try_from(order.side).map_err(|_| RejectReason::InvalidSide)?;

        if position.account_id != order.account_id
            || position.instrument_id != order.instrument_id
            || limit.account_id != order.account_id
        {
            return Err(RejectReason::AccountMismatch);
        }

        if !limit.allowed_sides().contains(side.mask()) {
            return Err(RejectReason::SideNotAllowed);
        }

        if order.quantity_raw > limit.max_order_qty_raw {
            return Err(RejectReason::OrderQtyExceeded);
        }

        let qty = order.quantity_raw as i128;
        let net = position.net_quantity_raw as i128;
        let projected = match side {
            Side::Bid => net + qty,
            Side::Ask => net - qty,
        };
        if projected.unsigned_abs() > limit.max_position_raw as u128 {
            return Err(RejectReason::PositionLimitExceeded);
        }

        let notional = self
            .scale
            .mul_raw(order.quantity_raw, order.price_raw)
            .map_err(|_| RejectReason::NotionalOverflow)?;
        if notional > limit.max_notional_raw {
            return Err(RejectReason::NotionalExceeded);
        }

        Ok(())
    }

    /// Per-order verdicts in batch order.
    pub fn verdicts<'a>(
        &'a self,
        orders: &'a [OrderRecord],
        positions: &'a [PositionRecord],
        limits: &'a [LimitRecord],
    ) -> impl Iterator<Item = Result<(), RejectReason>> + 'a {
        orders
            .iter()
            .zip(positions)
            .zip(limits)
            .map(move |((o, p), l)| self.check_order(o, p, l))
    }

    /// Acceptance bitmask for at most 64 orders.
    pub fn validate_mask(
        &self,
        orders: &[OrderRecord],
        positions: &[PositionRecord],
        limits: &[LimitRecord],
    ) -> Result<u64, EngineError> {
        let n = batch_len(orders, positions, limits)?;
        if n > MASK_BITS {
            return Err(EngineError::InvalidParameter);
        }
        let mask = self
            .verdicts(orders, positions, limits)
            .enumerate()
            .filter(|(_, v)| v.is_ok())
            .fold(0u64, |mask, (i, _)| mask | (1u64 << i));
        Ok(mask)
    }

    /// Write 1 (accepted) or 0 (rejected) per order into `accepted`.
    /// Returns the accepted count.
    pub fn validate_into(
        &self,
        orders: &[OrderRecord],
        positions: &[PositionRecord],
        limits: &[LimitRecord],
        accepted: &mut [u8],
    ) -> Result<usize, EngineError> {
        let n = batch_len(orders, positions, limits)?;
        if accepted.len() < n {
            return Err(EngineError::InvalidParameter);
        }
        let mut count = 0;
        for (slot, verdict) in accepted.iter_mut().zip(self.verdicts(orders, positions, limits)) {
            *slot = verdict.is_ok() as u8;
            count += verdict.is_ok() as usize;
        }
        Ok(count)
    }

    /// Mask for small batches, count beyond. The acceptance vector, when
    /// given, is filled in either case.
    pub fn validate(
        &self,
        orders: &[OrderRecord],
        positions: &[PositionRecord],
        limits: &[LimitRecord],
        accepted: Option<&mut [u8]>,
    ) -> Result<BatchVerdict, EngineError> {
        let n = batch_len(orders, positions, limits)?;
        if let Some(accepted) = accepted {
            let count = self.validate_into(orders, positions, limits, accepted)?;
            if n > MASK_BITS {
                return Ok(BatchVerdict::Count(count));
            }
            let mask = accepted[..n]
                .iter()
                .enumerate()
                .fold(0u64, |mask, (i, &a)| mask | ((a as u64) << i));
            return Ok(BatchVerdict::Mask(mask));
        }

        if n <= MASK_BITS {
            self.validate_mask(orders, positions, limits).map(BatchVerdict::Mask)
        } else {
            let count = self
                .verdicts(orders, positions, limits)
                .filter(Result::is_ok)
                .count();
            Ok(BatchVerdict::Count(count))
        }
    }
}

/// Common length of the three parallel arrays.
#[inline]
fn batch_len(
    orders: &[OrderRecord],
    positions: &[PositionRecord],
    limits: &[LimitRecord],
) -> Result<usize, EngineError> {
    let n = orders.len();
    if positions.len() != n || limits.len() != n {
        return Err(EngineError::InvalidParameter);
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_proto::SideMask;

    const ACCT: u64 = 7;
    const INST: u64 = 1;

    fn engine() -> RiskEngine {
        RiskEngine::new(Scale::new(0).unwrap())
    }

    fn limit(max_pos: u64, max_qty: u64, max_notional: u64) -> LimitRecord {
        LimitRecord::new(ACCT, max_pos, max_qty, max_notional, SideMask::BOTH)
    }

    #[test]
    fn test_order_qty_rejected() {
        let orders = [OrderRecord::new(INST, ACCT, 0, 100, 10)];
        let positions = [PositionRecord::flat(INST, ACCT)];
        let limits = [limit(1_000, 5, 1_000_000)];

        let mask = engine().validate_mask(&orders, &positions, &limits).unwrap();
        assert_eq!(mask & 1, 0);
        assert_eq!(positions[0], PositionRecord::flat(INST, ACCT));
        assert_eq!(
            engine().check_order(&orders[0], &positions[0], &limits[0]),
            Err(RejectReason::OrderQtyExceeded)
        );
    }

    #[test]
    fn test_accepts_within_limits() {
        let order = OrderRecord::new(INST, ACCT, 1, 100, 5);
        let position = PositionRecord::flat(INST, ACCT);
        assert_eq!(engine().check_order(&order, &position, &limit(5, 5, 500)), Ok(()));
    }

    #[test]
    fn test_side_not_allowed() {
        let order = OrderRecord::new(INST, ACCT, 1, 100, 1);
        let position = PositionRecord::flat(INST, ACCT);
        let bids_only = LimitRecord::new(ACCT, 100, 100, 100_000, SideMask::BID);
        assert_eq!(
            engine().check_order(&order, &position, &bids_only),
            Err(RejectReason::SideNotAllowed)
        );
    }

    #[test]
    fn test_position_limit_by_side() {
        let position = PositionRecord::new(INST, ACCT, 8, 100);
        let limits = limit(10, 100, u64::MAX);

        let buy = OrderRecord::new(INST, ACCT, 0, 100, 3);
        assert_eq!(
            engine().check_order(&buy, &position, &limits),
            Err(RejectReason::PositionLimitExceeded)
        );

        // selling 18 from +8 lands on -10
        let sell = OrderRecord::new(INST, ACCT, 1, 100, 18);
        assert_eq!(engine().check_order(&sell, &position, &limits), Ok(()));
        let sell_more = OrderRecord::new(INST, ACCT, 1, 100, 19);
        assert_eq!(
            engine().check_order(&sell_more, &position, &limits),
            Err(RejectReason::PositionLimitExceeded)
        );
    }

    #[test]
    fn test_notional_rules() {
        let position = PositionRecord::flat(INST, ACCT);
        let order = OrderRecord::new(INST, ACCT, 0, 100, 10);
        assert_eq!(
            engine().check_order(&order, &position, &limit(u64::MAX, u64::MAX, 999)),
            Err(RejectReason::NotionalExceeded)
        );
        assert_eq!(
            engine().check_order(&order, &position, &limit(u64::MAX, u64::MAX, 1_000)),
            Ok(())
        );

        let huge = OrderRecord::new(INST, ACCT, 0, u64::MAX, 2);
        assert_eq!(
            engine().check_order(&huge, &position, &limit(u64::MAX, u64::MAX, u64::MAX)),
            Err(RejectReason::NotionalOverflow)
        );
    }

    #[test]
    fn test_notional_uses_scale() {
        // 2.5 * 4.0 = 10.0 at 9 decimals
        let engine = RiskEngine::new(Scale::CANONICAL);
        let order = OrderRecord::new(INST, ACCT, 0, 4_000_000_000, 2_500_000_000);
        let position = PositionRecord::flat(INST, ACCT);
        let ok = limit(u64::MAX, u64::MAX, 10_000_000_000);
        let tight = limit(u64::MAX, u64::MAX, 9_999_999_999);
        assert_eq!(engine.check_order(&order, &position, &ok), Ok(()));
        assert_eq!(
            engine.check_order(&order, &position, &tight),
            Err(RejectReason::NotionalExceeded)
        );
    }

    #[test]
    fn test_mismatch_and_bad_side() {
        let position = PositionRecord::flat(INST, ACCT);
        let limits = LimitRecord::unlimited(ACCT);

        let other = OrderRecord::new(INST, ACCT + 1, 0, 1, 1);
        assert_eq!(
            engine().check_order(&other, &position, &limits),
            Err(RejectReason::AccountMismatch)
        );
        let bad_side = OrderRecord::new(INST, ACCT, 5, 1, 1);
        assert_eq!(
            engine().check_order(&bad_side, &position, &limits),
            Err(RejectReason::InvalidSide)
        );
    }

    #[test]
    fn test_large_batch_counts() {
        let n = 100;
        let orders: Vec<_> = (0..n)
            .map(|i| OrderRecord::new(INST, ACCT, 0, 1, if i % 4 == 0 { 50 } else { 1 }))
            .collect();
        let positions = vec![PositionRecord::flat(INST, ACCT); n];
        let limits = vec![limit(u64::MAX, 10, u64::MAX); n];

        let mut accepted = vec![0u8; n];
        let count = engine()
            .validate_into(&orders, &positions, &limits, &mut accepted)
            .unwrap();
        assert_eq!(count, 75);
        assert_eq!(accepted[0], 0);
        assert_eq!(accepted[1], 1);

        assert_eq!(
            engine().validate(&orders, &positions, &limits, None),
            Ok(BatchVerdict::Count(75))
        );
        assert_eq!(
            engine().validate_mask(&orders, &positions, &limits),
            Err(EngineError::InvalidParameter)
        );
    }

    #[test]
    fn test_validate_small_batch_with_vector() {
        let orders = [
            OrderRecord::new(INST, ACCT, 0, 1, 1),
            OrderRecord::new(INST, ACCT, 0, 1, 50),
            OrderRecord::new(INST, ACCT, 1, 1, 2),
        ];
        let positions = [PositionRecord::flat(INST, ACCT); 3];
        let limits = [limit(u64::MAX, 10, u64::MAX); 3];
        let mut accepted = [9u8; 3];

        let verdict = engine()
            .validate(&orders, &positions, &limits, Some(&mut accepted))
            .unwrap();
        assert_eq!(verdict, BatchVerdict::Mask(0b101));
        assert_eq!(accepted, [1, 0, 1]);
        assert_eq!(verdict.to_word(), 5);
    }

    #[test]
    fn test_length_mismatch() {
        let orders = [OrderRecord::new(INST, ACCT, 0, 1, 1)];
        assert_eq!(
            engine().validate_mask(&orders, &[], &[]),
            Err(EngineError::InvalidParameter)
        );
    }
}
